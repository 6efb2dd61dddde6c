//! Upstream data sources for property attributes.
//!
//! Each source covers part of the [`PropertyAttributes`] field set. The
//! worker asks every source in precedence order and keeps, per field, the
//! first value it gets. The built-in sources return fixed figures until real
//! valuation, listing and tax-record APIs are wired in.

use crate::errors::AppError;
use crate::models::PropertyAttributes;
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait PropertySource: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    async fn fetch(&self, address: &str) -> Result<PropertyAttributes, AppError>;
}

/// Ordered list of sources; earlier sources win field conflicts.
#[derive(Clone, Default)]
pub struct SourceSet {
    sources: Vec<Arc<dyn PropertySource>>,
}

impl SourceSet {
    pub fn new(sources: Vec<Arc<dyn PropertySource>>) -> Self {
        Self { sources }
    }

    /// Listing data first, then valuation, then tax records.
    pub fn standard() -> Self {
        Self::new(vec![
            Arc::new(ListingSource),
            Arc::new(ValuationSource),
            Arc::new(TaxRecordsSource),
        ])
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Queries every source and merges by precedence.
    ///
    /// Fails as soon as any source fails, so a job never writes a row built
    /// from a partial set of upstreams.
    pub async fn acquire(&self, address: &str) -> Result<PropertyAttributes, AppError> {
        let mut merged = PropertyAttributes::default();

        for source in &self.sources {
            let attributes = source.fetch(address).await.map_err(|e| {
                tracing::warn!("Source '{}' failed for '{}': {}", source.name(), address, e);
                AppError::WithContext {
                    source: Box::new(e),
                    context: format!("source '{}'", source.name()),
                }
            })?;
            tracing::debug!("Source '{}' answered for '{}'", source.name(), address);
            merged.merge_missing(attributes);
        }

        Ok(merged)
    }
}

/// Listing portal data: what the property is and what it is offered at.
pub struct ListingSource;

#[async_trait]
impl PropertySource for ListingSource {
    fn name(&self) -> &str {
        "listing"
    }

    async fn fetch(&self, _address: &str) -> Result<PropertyAttributes, AppError> {
        Ok(PropertyAttributes {
            property_type: Some("Single Family".to_string()),
            size: Some(2000.0),
            year_built: Some(1995),
            listing_price: Some(350_000.0),
            days_on_market: Some(35),
            photos: Some("url1,url2,url3".to_string()),
            description: Some("Beautiful home in great location...".to_string()),
            hoa_fees: Some(200.0),
            hoa_rules: Some("No RVs, No short-term rentals".to_string()),
            ..Default::default()
        })
    }
}

/// Automated valuation and rent models.
pub struct ValuationSource;

#[async_trait]
impl PropertySource for ValuationSource {
    fn name(&self) -> &str {
        "valuation"
    }

    async fn fetch(&self, _address: &str) -> Result<PropertyAttributes, AppError> {
        Ok(PropertyAttributes {
            last_sold_price: Some(300_000.0),
            rent_estimate: Some(2200.0),
            estimated_value_zillow: Some(355_000.0),
            estimated_value_redfin: Some(360_000.0),
            cap_rate: Some(0.065),
            historical_prices: Some(r#"{"2020": 250000, "2022": 300000}"#.to_string()),
            roi_inputs: Some(r#"{"down_payment": 70000, "mortgage_rate": 0.06}"#.to_string()),
            ..Default::default()
        })
    }
}

/// Municipal tax records.
pub struct TaxRecordsSource;

#[async_trait]
impl PropertySource for TaxRecordsSource {
    fn name(&self) -> &str {
        "tax_records"
    }

    async fn fetch(&self, _address: &str) -> Result<PropertyAttributes, AppError> {
        Ok(PropertyAttributes {
            tax_history: Some(r#"{"2022": 3500, "2023": 3600}"#.to_string()),
            ..Default::default()
        })
    }
}
