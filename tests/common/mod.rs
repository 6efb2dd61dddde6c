//! In-memory store and queue used to exercise the orchestrator and worker
//! without Postgres.
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use property_info_api::errors::AppError;
use property_info_api::job_queue::JobQueue;
use property_info_api::models::{FetchJob, JobStatus, Property};
use property_info_api::property_store::PropertyRepository;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
pub struct InMemoryStore {
    rows: Mutex<HashMap<String, Property>>,
    next_id: AtomicI32,
    pub fail_reads: AtomicBool,
}

impl InMemoryStore {
    pub fn with_rows(rows: Vec<Property>) -> Self {
        let store = Self::default();
        for property in rows {
            let id = store.next_id.fetch_add(1, Ordering::SeqCst) + 1;
            store.rows.lock().unwrap().insert(
                property.address.clone(),
                Property {
                    id: Some(id),
                    ..property
                },
            );
        }
        store
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub fn get(&self, address: &str) -> Option<Property> {
        self.rows.lock().unwrap().get(address).cloned()
    }
}

#[async_trait]
impl PropertyRepository for InMemoryStore {
    async fn find_by_address(&self, address: &str) -> Result<Option<Property>, AppError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(AppError::DatabaseError(sqlx::Error::PoolTimedOut));
        }
        Ok(self.get(address))
    }

    async fn upsert(&self, property: &Property) -> Result<Property, AppError> {
        let mut rows = self.rows.lock().unwrap();
        let id = match rows.get(&property.address).and_then(|p| p.id) {
            Some(id) => id,
            None => self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
        };
        let stored = Property {
            id: Some(id),
            ..property.clone()
        };
        rows.insert(stored.address.clone(), stored.clone());
        Ok(stored)
    }
}

#[derive(Debug, Clone)]
pub struct QueuedJob {
    pub id: Uuid,
    pub task_name: String,
    pub address: String,
    pub status: JobStatus,
    pub attempts: i32,
    pub last_error: Option<String>,
}

#[derive(Default)]
pub struct InMemoryQueue {
    jobs: Mutex<Vec<QueuedJob>>,
    pub fail_enqueue: AtomicBool,
}

impl InMemoryQueue {
    pub fn jobs(&self) -> Vec<QueuedJob> {
        self.jobs.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.jobs.lock().unwrap().len()
    }

    pub fn with_status(&self, status: JobStatus) -> Vec<QueuedJob> {
        self.jobs()
            .into_iter()
            .filter(|job| job.status == status)
            .collect()
    }
}

#[async_trait]
impl JobQueue for InMemoryQueue {
    async fn enqueue(&self, task_name: &str, address: &str) -> Result<Uuid, AppError> {
        if self.fail_enqueue.load(Ordering::SeqCst) {
            return Err(AppError::QueueError("broker unreachable".into()));
        }
        let id = Uuid::new_v4();
        self.jobs.lock().unwrap().push(QueuedJob {
            id,
            task_name: task_name.to_string(),
            address: address.to_string(),
            status: JobStatus::Pending,
            attempts: 0,
            last_error: None,
        });
        Ok(id)
    }

    async fn claim_next(&self) -> Result<Option<FetchJob>, AppError> {
        let mut jobs = self.jobs.lock().unwrap();
        let Some(job) = jobs.iter_mut().find(|j| j.status == JobStatus::Pending) else {
            return Ok(None);
        };
        job.status = JobStatus::Running;
        job.attempts += 1;
        Ok(Some(FetchJob {
            id: job.id,
            task_name: job.task_name.clone(),
            address: job.address.clone(),
            attempts: job.attempts,
            created_at: Utc::now(),
        }))
    }

    async fn mark_completed(&self, job_id: Uuid) -> Result<(), AppError> {
        self.finish(job_id, JobStatus::Completed, None);
        Ok(())
    }

    async fn mark_failed(&self, job_id: Uuid, error: &str) -> Result<(), AppError> {
        self.finish(job_id, JobStatus::Failed, Some(error.to_string()));
        Ok(())
    }
}

impl InMemoryQueue {
    fn finish(&self, job_id: Uuid, status: JobStatus, error: Option<String>) {
        let mut jobs = self.jobs.lock().unwrap();
        if let Some(job) = jobs.iter_mut().find(|j| j.id == job_id) {
            job.status = status;
            job.last_error = error;
        }
    }
}

/// A row with every descriptive field populated.
pub fn complete_property(address: &str) -> Property {
    Property {
        id: None,
        address: address.to_string(),
        property_type: Some("Condo".into()),
        size: Some(1000.0),
        year_built: Some(2001),
        listing_price: Some(500_000.0),
        last_sold_price: Some(450_000.0),
        rent_estimate: Some(3000.0),
        days_on_market: Some(12),
        price_per_sqft: Some(500.0),
        estimated_value_zillow: Some(510_000.0),
        estimated_value_redfin: Some(505_000.0),
        photos: Some("a.jpg,b.jpg".into()),
        description: Some("Corner unit".into()),
        gross_yield: Some(0.072),
        cap_rate: Some(0.05),
        historical_prices: Some(r#"{"2019": 400000}"#.into()),
        tax_history: Some(r#"{"2023": 6000}"#.into()),
        hoa_fees: Some(450.0),
        hoa_rules: Some("No pets over 25lb".into()),
        roi_inputs: Some(r#"{"down_payment": 100000}"#.into()),
    }
}
