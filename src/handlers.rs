use crate::errors::{AppError, ResultExt};
use crate::job_queue::JobQueue;
use crate::models::{
    FetchStatusResponse, PropertyInfoResponse, PropertyRequest, FETCH_PROPERTY_TASK,
};
use crate::property_store::{is_complete, PropertyRepository};
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use moka::future::Cache;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

/// Largest accepted request body.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Cached property rows.
    pub store: Arc<dyn PropertyRepository>,
    /// Where fetch jobs are submitted.
    pub queue: Arc<dyn JobQueue>,
    /// Addresses with a fetch job submitted inside the dedup window.
    /// `None` when dedup is disabled and every request may submit a job.
    pub in_flight: Option<Cache<String, i64>>,
}

impl AppState {
    /// `dedup_ttl` of zero disables in-flight suppression.
    pub fn new(
        store: Arc<dyn PropertyRepository>,
        queue: Arc<dyn JobQueue>,
        dedup_ttl: Duration,
    ) -> Self {
        let in_flight = (!dedup_ttl.is_zero()).then(|| {
            Cache::builder()
                .time_to_live(dedup_ttl)
                .max_capacity(10_000)
                .build()
        });

        Self {
            store,
            queue,
            in_flight,
        }
    }
}

/// Builds the HTTP application: `/property-info`, `/health` and middleware.
pub fn router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        .route("/property-info", post(property_info))
        .layer(ServiceBuilder::new().layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES)));

    Router::new()
        .route("/health", get(health))
        .merge(api_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Health check endpoint.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "property-info-api",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// POST /property-info
///
/// Returns the cached row for `address` when it is complete. Otherwise
/// submits a fetch job and answers with the `fetching` status right away;
/// the caller is expected to ask again later.
pub async fn property_info(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PropertyRequest>,
) -> Result<Json<PropertyInfoResponse>, AppError> {
    tracing::info!("POST /property-info - address: {}", request.address);

    if request.address.trim().is_empty() {
        return Err(AppError::BadRequest("address must not be empty".to_string()));
    }

    let response = lookup_or_enqueue(&state, &request.address)
        .await
        .context("POST /property-info")?;

    Ok(Json(response))
}

/// Cached-or-fetch decision for one address.
pub async fn lookup_or_enqueue(
    state: &AppState,
    address: &str,
) -> Result<PropertyInfoResponse, AppError> {
    if let Some(property) = state.store.find_by_address(address).await? {
        if is_complete(&property) {
            tracing::debug!("Serving cached property '{}'", address);
            return Ok(PropertyInfoResponse::Ready(property));
        }
        tracing::debug!(
            "Cached property '{}' incomplete, missing: {:?}",
            address,
            property.missing_fields()
        );
    }

    submit_fetch(state, address).await?;
    Ok(PropertyInfoResponse::Fetching(FetchStatusResponse::fetching()))
}

async fn submit_fetch(state: &AppState, address: &str) -> Result<(), AppError> {
    if let Some(in_flight) = &state.in_flight {
        let entry = in_flight
            .entry(address.to_string())
            .or_insert(chrono::Utc::now().timestamp())
            .await;
        if !entry.is_fresh() {
            tracing::debug!("Fetch for '{}' already in flight, not resubmitting", address);
            return Ok(());
        }
    }

    match state.queue.enqueue(FETCH_PROPERTY_TASK, address).await {
        Ok(job_id) => {
            tracing::info!("Submitted fetch job {} for '{}'", job_id, address);
            Ok(())
        }
        Err(e) => {
            if let Some(in_flight) = &state.in_flight {
                in_flight.invalidate(address).await;
            }
            Err(e)
        }
    }
}
