//! Property Info API Library
//!
//! Cached-or-fetch property data behind an HTTP endpoint, plus NYC parcel
//! (BBL) resolution through the Geoclient API.
//!
//! # Modules
//!
//! - `api`: API-layer namespace.
//! - `core`: Domain-layer namespace.
//! - `integrations`: External service namespace.
//! - `batch_resolver`: BBL resolution over a CSV table.
//! - `config`: Configuration management.
//! - `db`: Database connection and schema.
//! - `errors`: Error handling types.
//! - `fetch_worker`: Background worker that fills in property rows.
//! - `geoclient`: NYC Geoclient client and address splitting.
//! - `handlers`: HTTP request handlers and router.
//! - `job_queue`: Fetch job queue.
//! - `models`: Data models.
//! - `property_store`: Property persistence.
//! - `sources`: Upstream property data sources.

pub mod api;
pub mod core;
pub mod integrations;

pub mod batch_resolver;
pub mod config;
pub mod db;
pub mod errors;
pub mod fetch_worker;
pub mod geoclient;
pub mod handlers;
pub mod job_queue;
pub mod models;
pub mod property_store;
pub mod sources;
