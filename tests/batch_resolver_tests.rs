//! Batch resolution over CSV files with a mocked Geoclient API
use property_info_api::batch_resolver::{BatchResolver, Table};
use property_info_api::config::GeoclientConfig;
use property_info_api::geoclient::GeoclientService;
use property_info_api::models::RowStatus;
use std::io::Write;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn resolver(base_url: String) -> BatchResolver {
    let geoclient = GeoclientService::new(&GeoclientConfig {
        api_key: Some("test_key".to_string()),
        base_url,
    })
    .unwrap();
    BatchResolver::new(geoclient, Duration::ZERO)
}

fn write_csv(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

async fn mount_bbl(server: &MockServer, house_number: &str, bbl: &str) {
    Mock::given(method("GET"))
        .and(path("/address.json"))
        .and(query_param("houseNumber", house_number))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"address": {"bbl": bbl}})),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn resolves_rows_and_rewrites_file_in_place() {
    let mock_server = MockServer::start().await;
    mount_bbl(&mock_server, "123", "1000477501").await;
    mount_bbl(&mock_server, "350", "1008350041").await;

    let file = write_csv(
        "address,zip_code,owner\n\
         123 Broadway,10006,Acme\n\
         Broadway,10006,Nobody\n\
         350 5th Avenue,10118.0,Empire\n",
    );

    let summary = resolver(mock_server.uri()).process(file.path()).await;

    assert_eq!(summary.aborted, None);
    assert_eq!(summary.total_rows, 3);
    assert_eq!(summary.resolved(), 2);
    assert_eq!(summary.skipped(), 1);
    assert!(matches!(summary.outcomes[1].status, RowStatus::Skipped { .. }));

    let table = Table::read(file.path()).unwrap();
    assert_eq!(table.headers, vec!["address", "zip_code", "owner", "acris_link"]);
    assert_eq!(
        table.rows[0][3],
        "https://propertyinformationportal.nyc.gov/parcels/parcel/1000477501"
    );
    assert_eq!(table.rows[1][3], "");
    assert_eq!(
        table.rows[2][3],
        "https://propertyinformationportal.nyc.gov/parcels/parcel/1008350041"
    );
    // Untouched columns survive the rewrite
    assert_eq!(table.rows[2][2], "Empire");
}

#[tokio::test]
async fn zip_code_is_sent_as_locality() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/address.json"))
        .and(query_param("zip", "10118"))
        .and(query_param("street", "5th Avenue"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"address": {"bbl": "1008350041"}})),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let file = write_csv("address,zip_code\n350 5th Avenue,10118.0\n");
    let summary = resolver(mock_server.uri()).process(file.path()).await;

    assert_eq!(summary.resolved(), 1);
}

#[tokio::test]
async fn unresolved_rows_keep_existing_link() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
        .mount(&mock_server)
        .await;

    let file = write_csv(
        "address,zip_code,acris_link\n\
         1 Nowhere Lane,10001,https://example.com/old\n\
         2 Nowhere Lane,10001,\n",
    );

    let summary = resolver(mock_server.uri()).process(file.path()).await;

    assert_eq!(summary.not_found(), 2);
    let table = Table::read(file.path()).unwrap();
    assert_eq!(table.headers.len(), 3);
    assert_eq!(table.rows[0][2], "https://example.com/old");
    assert_eq!(table.rows[1][2], "");
}

#[tokio::test]
async fn stray_trailing_cells_do_not_become_links() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
        .mount(&mock_server)
        .await;

    let file = write_csv(
        "address,zip_code\n\
         1 Nowhere Lane,10001,stray\n\
         2 Nowhere Lane,10001\n",
    );

    let summary = resolver(mock_server.uri()).process(file.path()).await;

    assert_eq!(summary.not_found(), 2);
    let table = Table::read(file.path()).unwrap();
    assert_eq!(table.headers, vec!["address", "zip_code", "acris_link"]);
    assert_eq!(table.rows[0], vec!["1 Nowhere Lane", "10001", ""]);
    assert_eq!(table.rows[1], vec!["2 Nowhere Lane", "10001", ""]);
}

#[tokio::test]
async fn missing_required_column_aborts_without_touching_file() {
    let mock_server = MockServer::start().await;
    let original = "address,postcode\n123 Broadway,10006\n";
    let file = write_csv(original);

    let summary = resolver(mock_server.uri()).process(file.path()).await;

    assert!(summary.is_aborted());
    assert!(summary.aborted.unwrap().contains("zip_code"));
    assert!(summary.outcomes.is_empty());
    assert_eq!(std::fs::read_to_string(file.path()).unwrap(), original);
}

#[tokio::test]
async fn missing_file_is_reported_not_raised() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    let summary = resolver(mock_server.uri())
        .process(&dir.path().join("absent.csv"))
        .await;

    assert!(summary.is_aborted());
    assert_eq!(summary.total_rows, 0);
}

#[tokio::test]
async fn pacing_delay_applies_between_requests() {
    let mock_server = MockServer::start().await;
    mount_bbl(&mock_server, "1", "1").await;
    mount_bbl(&mock_server, "2", "2").await;
    mount_bbl(&mock_server, "3", "3").await;

    let geoclient = GeoclientService::new(&GeoclientConfig {
        api_key: None,
        base_url: mock_server.uri(),
    })
    .unwrap();
    let resolver = BatchResolver::new(geoclient, Duration::from_millis(100));
    let file = write_csv("address,zip_code\n1 A St,10001\n2 B St,10001\n3 C St,10001\n");

    let started = std::time::Instant::now();
    let summary = resolver.process(file.path()).await;

    assert_eq!(summary.resolved(), 3);
    // Two pauses between three requests, none after the last
    assert!(started.elapsed() >= Duration::from_millis(200));
}
