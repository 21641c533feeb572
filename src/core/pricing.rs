//! Price resolution for services.
//!
//! Flat-priced services ignore the customer type. Tiered services must have a tier
//! for the requested customer type; a missing tier is reported as
//! [`Error::PriceNotConfigured`] rather than silently pricing at zero.

use crate::{
    core::{availability::DateRange, status::CustomerType},
    entities::{PriceTier, price_tier, service},
    errors::{Error, Result},
};
use chrono::NaiveDate;
use sea_orm::prelude::*;
use serde::Serialize;

/// A computed price for a date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PriceQuote {
    /// Price per day
    pub unit_price: i64,
    /// Number of days
    pub qty: i64,
    /// `unit_price * qty`
    pub total: i64,
}

impl PriceQuote {
    /// Prices `range` at `unit_price` per day.
    ///
    /// # Errors
    /// [`Error::Validation`] on `total` when the amount does not fit in an `i64`.
    pub fn for_range(unit_price: i64, range: DateRange) -> Result<Self> {
        let qty = range.days();
        Ok(Self {
            unit_price,
            qty,
            total: line_total(unit_price, qty)?,
        })
    }
}

/// `unit_price * qty`, rejecting amounts too large to store.
pub fn line_total(unit_price: i64, qty: i64) -> Result<i64> {
    unit_price
        .checked_mul(qty)
        .ok_or_else(|| Error::validation("total", "total price is too large"))
}

/// Adds line amounts into a booking total, rejecting overflow.
pub fn sum_totals<I>(amounts: I) -> Result<i64>
where
    I: IntoIterator<Item = i64>,
{
    amounts.into_iter().try_fold(0_i64, |acc, amount| {
        acc.checked_add(amount)
            .ok_or_else(|| Error::validation("total", "total price is too large"))
    })
}

/// Resolves the unit price of an already loaded service.
pub async fn resolve_service_price<C>(
    conn: &C,
    service: &service::Model,
    customer_type: CustomerType,
) -> Result<i64>
where
    C: ConnectionTrait,
{
    if !service.is_price_per_type {
        return Ok(service.base_price);
    }

    let tier = PriceTier::find()
        .filter(price_tier::Column::ServiceId.eq(service.id))
        .filter(price_tier::Column::CustomerType.eq(customer_type.as_str()))
        .one(conn)
        .await?;

    tier.map(|t| t.price).ok_or_else(|| Error::PriceNotConfigured {
        service_id: service.id,
        customer_type: customer_type.as_str().to_string(),
    })
}

/// Resolves the unit price of `service_id` for `customer_type`.
pub async fn resolve_price<C>(conn: &C, service_id: i64, customer_type: CustomerType) -> Result<i64>
where
    C: ConnectionTrait,
{
    let service = crate::core::service::require_service(conn, service_id).await?;
    resolve_service_price(conn, &service, customer_type).await
}

/// Quotes unit price, day count and total for a prospective booking.
pub async fn quote_price(
    db: &DatabaseConnection,
    service_id: i64,
    customer_type: CustomerType,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<PriceQuote> {
    let range = DateRange::new(start_date, end_date)?;
    let unit_price = resolve_price(db, service_id, customer_type).await?;
    PriceQuote::for_range(unit_price, range)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_flat_price_ignores_customer_type() -> Result<()> {
        let db = setup_test_db().await?;
        let service = create_test_service(&db, "Field", 50_000).await?;

        for customer_type in CustomerType::ALL {
            assert_eq!(resolve_price(&db, service.id, customer_type).await?, 50_000);
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_tiered_price_lookup() -> Result<()> {
        let db = setup_test_db().await?;
        let service = create_tiered_service(&db, "Auditorium", &[
            (CustomerType::Student, 20_000),
            (CustomerType::General, 35_000),
        ])
        .await?;

        assert_eq!(
            resolve_price(&db, service.id, CustomerType::Student).await?,
            20_000
        );
        assert_eq!(
            resolve_price(&db, service.id, CustomerType::General).await?,
            35_000
        );

        let missing = resolve_price(&db, service.id, CustomerType::Affiliate).await;
        assert!(matches!(
            missing,
            Err(Error::PriceNotConfigured { customer_type, .. }) if customer_type == "affiliate"
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_quote_price_multiplies_inclusive_days() -> Result<()> {
        let db = setup_test_db().await?;
        let service = create_test_service(&db, "Field", 50_000).await?;

        let quote = quote_price(
            &db,
            service.id,
            CustomerType::General,
            date(2024, 1, 10),
            date(2024, 1, 12),
        )
        .await?;
        assert_eq!(quote, PriceQuote {
            unit_price: 50_000,
            qty: 3,
            total: 150_000
        });
        Ok(())
    }

    #[tokio::test]
    async fn test_quote_price_rejects_overflowing_total() -> Result<()> {
        let db = setup_test_db().await?;
        let service = create_test_service(&db, "Stadium", i64::MAX / 2).await?;

        let result = quote_price(
            &db,
            service.id,
            CustomerType::General,
            date(2024, 1, 10),
            date(2024, 1, 12),
        )
        .await;
        assert!(matches!(result, Err(Error::Validation { field, .. }) if field == "total"));
        Ok(())
    }

    #[test]
    fn test_sum_totals() {
        assert!(matches!(sum_totals([100, 250]), Ok(350)));
        assert!(matches!(sum_totals([]), Ok(0)));
        assert!(matches!(
            sum_totals([i64::MAX, 1]),
            Err(Error::Validation { field, .. }) if field == "total"
        ));
    }

    #[tokio::test]
    async fn test_quote_price_unknown_service() -> Result<()> {
        let db = setup_test_db().await?;
        let result = quote_price(
            &db,
            77,
            CustomerType::General,
            date(2024, 1, 10),
            date(2024, 1, 12),
        )
        .await;
        assert!(matches!(result, Err(Error::ServiceNotFound { .. })));
        Ok(())
    }
}
