use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// ============ Database Models ============

/// One cached property, keyed by its unique address.
///
/// Every descriptive attribute stays `None` until a fetch job populates it.
/// Serialized as a flat JSON object, which is also the `/property-info`
/// response body when the row is complete.
#[derive(Debug, Clone, PartialEq, Default, FromRow, Serialize, Deserialize)]
pub struct Property {
    /// Surrogate key assigned by the database; `None` before the first insert.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i32>,
    pub address: String,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub property_type: Option<String>,
    /// Living area in square feet.
    pub size: Option<f64>,
    pub year_built: Option<i32>,
    pub listing_price: Option<f64>,
    pub last_sold_price: Option<f64>,
    pub rent_estimate: Option<f64>,
    pub days_on_market: Option<i32>,
    pub price_per_sqft: Option<f64>,
    pub estimated_value_zillow: Option<f64>,
    pub estimated_value_redfin: Option<f64>,
    /// Comma-separated photo URLs, in display order.
    pub photos: Option<String>,
    pub description: Option<String>,
    pub gross_yield: Option<f64>,
    pub cap_rate: Option<f64>,
    /// JSON object keyed by year.
    pub historical_prices: Option<String>,
    /// JSON object keyed by year.
    pub tax_history: Option<String>,
    pub hoa_fees: Option<f64>,
    pub hoa_rules: Option<String>,
    /// JSON object keyed by parameter name.
    pub roi_inputs: Option<String>,
}

impl Property {
    /// Column names of every attribute that must be populated for a row to
    /// be servable. The identity columns are not part of it.
    pub const DESCRIPTIVE_FIELDS: [&'static str; 19] = [
        "type",
        "size",
        "year_built",
        "listing_price",
        "last_sold_price",
        "rent_estimate",
        "days_on_market",
        "price_per_sqft",
        "estimated_value_zillow",
        "estimated_value_redfin",
        "photos",
        "description",
        "gross_yield",
        "cap_rate",
        "historical_prices",
        "tax_history",
        "hoa_fees",
        "hoa_rules",
        "roi_inputs",
    ];

    /// A row holding nothing but its address.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Default::default()
        }
    }

    /// Names of the descriptive fields that are still `None`, in column order.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let populated = [
            self.property_type.is_some(),
            self.size.is_some(),
            self.year_built.is_some(),
            self.listing_price.is_some(),
            self.last_sold_price.is_some(),
            self.rent_estimate.is_some(),
            self.days_on_market.is_some(),
            self.price_per_sqft.is_some(),
            self.estimated_value_zillow.is_some(),
            self.estimated_value_redfin.is_some(),
            self.photos.is_some(),
            self.description.is_some(),
            self.gross_yield.is_some(),
            self.cap_rate.is_some(),
            self.historical_prices.is_some(),
            self.tax_history.is_some(),
            self.hoa_fees.is_some(),
            self.hoa_rules.is_some(),
            self.roi_inputs.is_some(),
        ];

        Self::DESCRIPTIVE_FIELDS
            .iter()
            .zip(populated)
            .filter(|(_, is_set)| !is_set)
            .map(|(name, _)| *name)
            .collect()
    }

    /// True iff every descriptive field is populated.
    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }
}

/// Attribute values yielded by a data source for one address.
///
/// Mirrors the acquirable columns of [`Property`]. `price_per_sqft` and
/// `gross_yield` are absent on purpose: the fetch worker derives them.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PropertyAttributes {
    pub property_type: Option<String>,
    pub size: Option<f64>,
    pub year_built: Option<i32>,
    pub listing_price: Option<f64>,
    pub last_sold_price: Option<f64>,
    pub rent_estimate: Option<f64>,
    pub days_on_market: Option<i32>,
    pub estimated_value_zillow: Option<f64>,
    pub estimated_value_redfin: Option<f64>,
    pub photos: Option<String>,
    pub description: Option<String>,
    pub cap_rate: Option<f64>,
    pub historical_prices: Option<String>,
    pub tax_history: Option<String>,
    pub hoa_fees: Option<f64>,
    pub hoa_rules: Option<String>,
    pub roi_inputs: Option<String>,
}

impl PropertyAttributes {
    /// Fills every field that is still `None` from `lower`. Fields already
    /// set keep their value, so callers merge in precedence order.
    pub fn merge_missing(&mut self, lower: PropertyAttributes) {
        self.property_type = self.property_type.take().or(lower.property_type);
        self.size = self.size.or(lower.size);
        self.year_built = self.year_built.or(lower.year_built);
        self.listing_price = self.listing_price.or(lower.listing_price);
        self.last_sold_price = self.last_sold_price.or(lower.last_sold_price);
        self.rent_estimate = self.rent_estimate.or(lower.rent_estimate);
        self.days_on_market = self.days_on_market.or(lower.days_on_market);
        self.estimated_value_zillow = self.estimated_value_zillow.or(lower.estimated_value_zillow);
        self.estimated_value_redfin = self.estimated_value_redfin.or(lower.estimated_value_redfin);
        self.photos = self.photos.take().or(lower.photos);
        self.description = self.description.take().or(lower.description);
        self.cap_rate = self.cap_rate.or(lower.cap_rate);
        self.historical_prices = self.historical_prices.take().or(lower.historical_prices);
        self.tax_history = self.tax_history.take().or(lower.tax_history);
        self.hoa_fees = self.hoa_fees.or(lower.hoa_fees);
        self.hoa_rules = self.hoa_rules.take().or(lower.hoa_rules);
        self.roi_inputs = self.roi_inputs.take().or(lower.roi_inputs);
    }
}

// ============ Fetch Job Models ============

/// Task identifier carried by every property fetch job.
pub const FETCH_PROPERTY_TASK: &str = "fetch_property_data";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

/// A claimed unit of work for the fetch worker.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct FetchJob {
    pub id: Uuid,
    pub task_name: String,
    pub address: String,
    pub attempts: i32,
    pub created_at: DateTime<Utc>,
}

// ============ API Models ============

/// Body of `POST /property-info`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyRequest {
    pub address: String,
}

/// Returned while a fetch job is (or may be) filling in the row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchStatusResponse {
    pub status: String,
    pub message: String,
}

impl FetchStatusResponse {
    pub fn fetching() -> Self {
        Self {
            status: "fetching".to_string(),
            message: "Data is being gathered, check back soon.".to_string(),
        }
    }
}

/// Either the full cached row or the pending marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyInfoResponse {
    Ready(Property),
    Fetching(FetchStatusResponse),
}

// ============ Geoclient Models ============

/// The subset of a Geoclient `address.json` body this crate reads.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeoclientResponse {
    #[serde(default)]
    pub address: Option<GeoclientAddress>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeoclientAddress {
    /// Usually a string, but tolerated as a number.
    #[serde(default)]
    pub bbl: Option<serde_json::Value>,
}

impl GeoclientResponse {
    pub fn bbl(&self) -> Option<String> {
        let raw = self.address.as_ref()?.bbl.as_ref()?;
        let bbl = match raw {
            serde_json::Value::String(s) => s.trim().to_string(),
            serde_json::Value::Number(n) => n.to_string(),
            _ => return None,
        };
        (!bbl.is_empty()).then_some(bbl)
    }
}

// ============ Batch Models ============

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RowStatus {
    /// A parcel was found and its portal link written to `acris_link`.
    Resolved { link: String },
    /// The geocoder returned no parcel; the cell was left alone.
    NotFound,
    /// The row could not be sent to the geocoder at all.
    Skipped { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowOutcome {
    /// Zero-based data row index (header excluded).
    pub row: usize,
    #[serde(flatten)]
    pub status: RowStatus,
}

/// Result of one batch run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchSummary {
    pub total_rows: usize,
    pub outcomes: Vec<RowOutcome>,
    /// Set when the run stopped early (unreadable file, missing columns,
    /// failed write-back). Outcomes gathered before that point are kept.
    pub aborted: Option<String>,
}

impl BatchSummary {
    pub fn resolved(&self) -> usize {
        self.count(|s| matches!(s, RowStatus::Resolved { .. }))
    }

    pub fn not_found(&self) -> usize {
        self.count(|s| matches!(s, RowStatus::NotFound))
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, RowStatus::Skipped { .. }))
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.is_some()
    }

    fn count(&self, pred: impl Fn(&RowStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.status)).count()
    }
}
