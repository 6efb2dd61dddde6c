//! Property fetch worker
//!
//! Consumes fetch jobs from the queue and, for each address:
//! 1. Acquires attributes from every configured source
//! 2. Derives `price_per_sqft` and `gross_yield`
//! 3. Upserts the full row into the property store
//!
//! A job either writes a whole row or writes nothing; any source failure
//! fails the job before the store is touched.
use crate::errors::AppError;
use crate::job_queue::JobQueue;
use crate::models::{FetchJob, Property, PropertyAttributes, FETCH_PROPERTY_TASK};
use crate::property_store::PropertyRepository;
use crate::sources::SourceSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// `listing_price / size`; `None` when either is missing or size is zero.
pub fn derive_price_per_sqft(listing_price: Option<f64>, size: Option<f64>) -> Option<f64> {
    match (listing_price, size) {
        (Some(price), Some(size)) if size != 0.0 => Some(price / size),
        _ => None,
    }
}

/// Annual rent over listing price; `None` when either is missing or the
/// price is zero.
pub fn derive_gross_yield(rent_estimate: Option<f64>, listing_price: Option<f64>) -> Option<f64> {
    match (rent_estimate, listing_price) {
        (Some(rent), Some(price)) if price != 0.0 => Some((rent * 12.0) / price),
        _ => None,
    }
}

/// Assembles the row to store for `address` from merged source data.
pub fn build_property(address: &str, attributes: PropertyAttributes) -> Property {
    Property {
        id: None,
        address: address.to_string(),
        price_per_sqft: derive_price_per_sqft(attributes.listing_price, attributes.size),
        gross_yield: derive_gross_yield(attributes.rent_estimate, attributes.listing_price),
        property_type: attributes.property_type,
        size: attributes.size,
        year_built: attributes.year_built,
        listing_price: attributes.listing_price,
        last_sold_price: attributes.last_sold_price,
        rent_estimate: attributes.rent_estimate,
        days_on_market: attributes.days_on_market,
        estimated_value_zillow: attributes.estimated_value_zillow,
        estimated_value_redfin: attributes.estimated_value_redfin,
        photos: attributes.photos,
        description: attributes.description,
        cap_rate: attributes.cap_rate,
        historical_prices: attributes.historical_prices,
        tax_history: attributes.tax_history,
        hoa_fees: attributes.hoa_fees,
        hoa_rules: attributes.hoa_rules,
        roi_inputs: attributes.roi_inputs,
    }
}

pub struct PropertyFetchWorker {
    store: Arc<dyn PropertyRepository>,
    sources: SourceSet,
}

impl PropertyFetchWorker {
    pub fn new(store: Arc<dyn PropertyRepository>, sources: SourceSet) -> Self {
        Self { store, sources }
    }

    /// Job body: fetch, derive and upsert one address.
    pub async fn process_address(&self, address: &str) -> Result<Property, AppError> {
        let attributes = self.sources.acquire(address).await?;
        let property = build_property(address, attributes);

        let missing = property.missing_fields();
        if !missing.is_empty() {
            tracing::warn!(
                "Property '{}' still incomplete after fetch, missing: {:?}",
                address,
                missing
            );
        }

        self.store.upsert(&property).await
    }

    /// Claims and runs at most one job. Returns whether a job was claimed.
    ///
    /// Only queue failures are returned as errors; a failing job is
    /// recorded on the queue and counts as handled.
    pub async fn run_once(&self, queue: &dyn JobQueue) -> Result<bool, AppError> {
        let Some(job) = queue.claim_next().await? else {
            return Ok(false);
        };

        self.handle_job(queue, job).await?;
        Ok(true)
    }

    async fn handle_job(&self, queue: &dyn JobQueue, job: FetchJob) -> Result<(), AppError> {
        if job.task_name != FETCH_PROPERTY_TASK {
            tracing::error!("Job {} has unknown task '{}'", job.id, job.task_name);
            return queue
                .mark_failed(job.id, &format!("unknown task '{}'", job.task_name))
                .await;
        }

        tracing::info!(
            "Fetching property data for '{}' (job {}, attempt {})",
            job.address,
            job.id,
            job.attempts
        );

        match self.process_address(&job.address).await {
            Ok(stored) => {
                tracing::info!(
                    "✓ Stored property '{}' (id {:?}, complete: {})",
                    stored.address,
                    stored.id,
                    stored.is_complete()
                );
                queue.mark_completed(job.id).await
            }
            Err(e) => {
                tracing::error!("❌ Fetch job {} for '{}' failed: {}", job.id, job.address, e);
                queue.mark_failed(job.id, &e.to_string()).await
            }
        }
    }

    /// Runs `concurrency` job loops until `shutdown` flips to `true` (or its
    /// sender is dropped). Each loop sleeps `poll_interval` when the queue
    /// is empty or unreachable.
    pub async fn run(
        self: Arc<Self>,
        queue: Arc<dyn JobQueue>,
        concurrency: usize,
        poll_interval: Duration,
        shutdown: watch::Receiver<bool>,
    ) {
        let mut handles = Vec::with_capacity(concurrency);
        for slot in 0..concurrency.max(1) {
            let worker = Arc::clone(&self);
            let queue = Arc::clone(&queue);
            let shutdown = shutdown.clone();
            handles.push(tokio::spawn(async move {
                worker.job_loop(slot, queue, poll_interval, shutdown).await
            }));
        }

        for handle in handles {
            if let Err(e) = handle.await {
                tracing::error!("Worker loop panicked: {}", e);
            }
        }
        tracing::info!("Fetch worker stopped");
    }

    async fn job_loop(
        &self,
        slot: usize,
        queue: Arc<dyn JobQueue>,
        poll_interval: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) {
        tracing::debug!("Worker loop {} started", slot);

        loop {
            if *shutdown.borrow() {
                break;
            }

            match self.run_once(queue.as_ref()).await {
                // Drain back-to-back while there is work
                Ok(true) => continue,
                Ok(false) => {}
                Err(e) => tracing::error!("Worker loop {} could not poll queue: {}", slot, e),
            }

            tokio::select! {
                _ = tokio::time::sleep(poll_interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        tracing::debug!("Worker loop {} exiting", slot);
    }
}
