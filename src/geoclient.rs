use crate::config::GeoclientConfig;
use crate::errors::AppError;
use crate::models::GeoclientResponse;
use reqwest::Client;
use std::fmt;
use std::time::Duration;

/// Prefix of the NYC property information portal page for a parcel.
pub const PARCEL_PORTAL_URL: &str = "https://propertyinformationportal.nyc.gov/parcels/parcel/";

const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

/// Portal link for a resolved BBL.
pub fn parcel_link(bbl: &str) -> String {
    format!("{}{}", PARCEL_PORTAL_URL, bbl)
}

/// Where a street address sits: one of these is sent to the geocoder,
/// never both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locality {
    Borough(String),
    Zip(String),
}

impl Locality {
    pub fn kind(&self) -> LocalityKind {
        match self {
            Locality::Borough(_) => LocalityKind::Borough,
            Locality::Zip(_) => LocalityKind::Zip,
        }
    }

    /// Query parameter name and value for the Geoclient API.
    pub fn query_param(&self) -> (&'static str, &str) {
        match self {
            Locality::Borough(borough) => ("borough", borough.as_str()),
            Locality::Zip(zip) => ("zip", zip.as_str()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalityKind {
    Borough,
    Zip,
}

impl LocalityKind {
    pub fn wrap(self, value: impl Into<String>) -> Locality {
        match self {
            LocalityKind::Borough => Locality::Borough(value.into()),
            LocalityKind::Zip => Locality::Zip(value.into()),
        }
    }
}

impl fmt::Display for LocalityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocalityKind::Borough => write!(f, "borough"),
            LocalityKind::Zip => write!(f, "zip"),
        }
    }
}

/// A free-text address broken into the parts the geocoder expects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressParts {
    pub house_number: String,
    pub street: String,
    pub locality: Locality,
}

/// Splits `"<house number> <street ...> <locality>"`.
///
/// The first token is the house number, the last is the borough or ZIP
/// (per `kind`), and everything between is the street, rejoined with single
/// spaces. Needs at least three tokens.
pub fn split_address(input: &str, kind: LocalityKind) -> Option<AddressParts> {
    let tokens: Vec<&str> = input.split_whitespace().collect();
    if tokens.len() < 3 {
        return None;
    }

    let last = tokens.len() - 1;
    Some(AddressParts {
        house_number: tokens[0].to_string(),
        street: tokens[1..last].join(" "),
        locality: kind.wrap(tokens[last]),
    })
}

/// Splits `"<house number> <street ...>"` into its house number and street.
/// Needs at least two tokens.
pub fn split_house_and_street(address: &str) -> Option<(String, String)> {
    let mut tokens = address.split_whitespace();
    let house_number = tokens.next()?;
    let street = tokens.collect::<Vec<_>>().join(" ");
    if street.is_empty() {
        return None;
    }
    Some((house_number.to_string(), street))
}

/// Client for the NYC Geoclient `address.json` endpoint.
#[derive(Clone)]
pub struct GeoclientService {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl GeoclientService {
    pub fn new(config: &GeoclientConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| {
                AppError::ExternalApiError(format!("Failed to create Geoclient client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
        })
    }

    /// Looks up the BBL for an address.
    ///
    /// Returns `None` on any failure (transport error, non-200 status,
    /// unparsable body, or a body without `address.bbl`). Failures are
    /// logged, never returned.
    pub async fn resolve(
        &self,
        house_number: &str,
        street: &str,
        locality: &Locality,
    ) -> Option<String> {
        let url = format!("{}/address.json", self.base_url);
        let (locality_param, locality_value) = locality.query_param();

        tracing::debug!(
            "Geoclient lookup: houseNumber={} street={} {}={}",
            house_number,
            street,
            locality_param,
            locality_value
        );

        let response = self
            .client
            .get(&url)
            .query(&[
                ("houseNumber", house_number),
                ("street", street),
                (locality_param, locality_value),
            ])
            // Sent even when no key is configured
            .header(SUBSCRIPTION_KEY_HEADER, self.api_key.as_deref().unwrap_or(""))
            .send()
            .await;

        let response = match response {
            Ok(response) => response,
            Err(e) => {
                tracing::error!("Geoclient request failed: {}", e);
                return None;
            }
        };

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::error!("Geoclient returned error {}: {}", status, error_text);
            return None;
        }

        match response.json::<GeoclientResponse>().await {
            Ok(body) => {
                let bbl = body.bbl();
                if bbl.is_none() {
                    tracing::info!(
                        "No BBL in Geoclient response for {} {}",
                        house_number,
                        street
                    );
                }
                bbl
            }
            Err(e) => {
                tracing::error!("Failed to parse Geoclient response: {}", e);
                None
            }
        }
    }

    pub async fn resolve_parts(&self, parts: &AddressParts) -> Option<String> {
        self.resolve(&parts.house_number, &parts.street, &parts.locality)
            .await
    }
}
