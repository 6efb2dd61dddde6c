use crate::errors::{AppError, ResultExt};
use crate::models::Property;
use async_trait::async_trait;
use sqlx::PgPool;

/// Lookup and write access to cached properties.
///
/// Implementations must keep `address` unique: `upsert` on an existing
/// address updates that row in place, never inserts a second one.
#[async_trait]
pub trait PropertyRepository: Send + Sync {
    async fn find_by_address(&self, address: &str) -> Result<Option<Property>, AppError>;

    /// Inserts the row, or overwrites every descriptive column of the row
    /// already stored under the same address. Returns the stored row.
    async fn upsert(&self, property: &Property) -> Result<Property, AppError>;
}

/// Whether a cached row may be served without refetching.
pub fn is_complete(property: &Property) -> bool {
    property.is_complete()
}

const SELECT_PROPERTY: &str = r#"
    SELECT id, address, type, size, year_built, listing_price, last_sold_price,
           rent_estimate, days_on_market, price_per_sqft, estimated_value_zillow,
           estimated_value_redfin, photos, description, gross_yield, cap_rate,
           historical_prices, tax_history, hoa_fees, hoa_rules, roi_inputs
    FROM properties
    WHERE address = $1
"#;

/// Insert-or-update keyed on the unique address column, so concurrent
/// workers writing the same address cannot race into duplicate rows.
const UPSERT_PROPERTY: &str = r#"
    INSERT INTO properties (
        address, type, size, year_built, listing_price, last_sold_price,
        rent_estimate, days_on_market, price_per_sqft, estimated_value_zillow,
        estimated_value_redfin, photos, description, gross_yield, cap_rate,
        historical_prices, tax_history, hoa_fees, hoa_rules, roi_inputs
    )
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)
    ON CONFLICT (address) DO UPDATE SET
        type = EXCLUDED.type,
        size = EXCLUDED.size,
        year_built = EXCLUDED.year_built,
        listing_price = EXCLUDED.listing_price,
        last_sold_price = EXCLUDED.last_sold_price,
        rent_estimate = EXCLUDED.rent_estimate,
        days_on_market = EXCLUDED.days_on_market,
        price_per_sqft = EXCLUDED.price_per_sqft,
        estimated_value_zillow = EXCLUDED.estimated_value_zillow,
        estimated_value_redfin = EXCLUDED.estimated_value_redfin,
        photos = EXCLUDED.photos,
        description = EXCLUDED.description,
        gross_yield = EXCLUDED.gross_yield,
        cap_rate = EXCLUDED.cap_rate,
        historical_prices = EXCLUDED.historical_prices,
        tax_history = EXCLUDED.tax_history,
        hoa_fees = EXCLUDED.hoa_fees,
        hoa_rules = EXCLUDED.hoa_rules,
        roi_inputs = EXCLUDED.roi_inputs
    RETURNING id, address, type, size, year_built, listing_price, last_sold_price,
              rent_estimate, days_on_market, price_per_sqft, estimated_value_zillow,
              estimated_value_redfin, photos, description, gross_yield, cap_rate,
              historical_prices, tax_history, hoa_fees, hoa_rules, roi_inputs
"#;

/// Postgres-backed property store.
#[derive(Clone)]
pub struct PgPropertyStore {
    pool: PgPool,
}

impl PgPropertyStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PropertyRepository for PgPropertyStore {
    async fn find_by_address(&self, address: &str) -> Result<Option<Property>, AppError> {
        let property = sqlx::query_as::<_, Property>(SELECT_PROPERTY)
            .bind(address)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Failed to look up property '{}'", address))?;

        Ok(property)
    }

    async fn upsert(&self, property: &Property) -> Result<Property, AppError> {
        // The transaction rolls back on drop if anything below fails
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to start property transaction")?;

        let stored = sqlx::query_as::<_, Property>(UPSERT_PROPERTY)
            .bind(&property.address)
            .bind(&property.property_type)
            .bind(property.size)
            .bind(property.year_built)
            .bind(property.listing_price)
            .bind(property.last_sold_price)
            .bind(property.rent_estimate)
            .bind(property.days_on_market)
            .bind(property.price_per_sqft)
            .bind(property.estimated_value_zillow)
            .bind(property.estimated_value_redfin)
            .bind(&property.photos)
            .bind(&property.description)
            .bind(property.gross_yield)
            .bind(property.cap_rate)
            .bind(&property.historical_prices)
            .bind(&property.tax_history)
            .bind(property.hoa_fees)
            .bind(&property.hoa_rules)
            .bind(&property.roi_inputs)
            .fetch_one(&mut *tx)
            .await
            .with_context(|| format!("Failed to upsert property '{}'", property.address))?;

        tx.commit()
            .await
            .context("Failed to commit property transaction")?;

        tracing::debug!(
            "Upserted property id={:?} address={}",
            stored.id,
            stored.address
        );
        Ok(stored)
    }
}
