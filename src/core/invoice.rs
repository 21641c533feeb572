//! Invoice number generation.
//!
//! Numbers look like `INV-20240110-0007`: a configurable prefix, the issue date
//! and a per-day sequence. The sequence is stored in `invoice_counters` and
//! advanced inside the caller's transaction, so a rolled-back booking never
//! consumes a number.

use crate::{
    entities::{InvoiceCounter, invoice_counter},
    errors::{Error, Result},
};
use chrono::{NaiveDate, Utc};
use sea_orm::{Set, SqlErr, prelude::*, sea_query::Expr};

/// Prefix used when none is configured.
pub const DEFAULT_INVOICE_PREFIX: &str = "INV";

/// Issues invoice numbers for new bookings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceGenerator {
    prefix: String,
}

impl Default for InvoiceGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_INVOICE_PREFIX)
    }
}

impl InvoiceGenerator {
    /// Creates a generator with the given prefix.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Configured prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Advances today's counter and formats the next invoice number.
    pub async fn next<C>(&self, conn: &C) -> Result<String>
    where
        C: ConnectionTrait,
    {
        self.next_for_date(conn, Utc::now().date_naive()).await
    }

    /// Advances the counter for `date` and formats the next invoice number.
    pub async fn next_for_date<C>(&self, conn: &C, date: NaiveDate) -> Result<String>
    where
        C: ConnectionTrait,
    {
        let day_prefix = format!("{}-{}", self.prefix, date.format("%Y%m%d"));
        let sequence = advance_counter(conn, &day_prefix).await?;
        Ok(format!("{day_prefix}-{sequence:04}"))
    }
}

async fn advance_counter<C>(conn: &C, day_prefix: &str) -> Result<i64>
where
    C: ConnectionTrait,
{
    let now = Utc::now().naive_utc();

    // Increment in SQL so two writers never read the same value
    let updated = InvoiceCounter::update_many()
        .col_expr(
            invoice_counter::Column::LastValue,
            Expr::col(invoice_counter::Column::LastValue).add(1),
        )
        .col_expr(invoice_counter::Column::UpdatedAt, Expr::value(now))
        .filter(invoice_counter::Column::Prefix.eq(day_prefix))
        .exec(conn)
        .await?;

    if updated.rows_affected == 0 {
        let counter = invoice_counter::ActiveModel {
            prefix: Set(day_prefix.to_string()),
            last_value: Set(1),
            updated_at: Set(now),
            ..Default::default()
        };
        return match counter.insert(conn).await {
            Ok(created) => Ok(created.last_value),
            // Another writer created today's counter first
            Err(e) if is_unique_violation(&e) => Err(Error::DuplicateInvoice {
                invoice_number: format!("{day_prefix}-0001"),
            }),
            Err(e) => Err(e.into()),
        };
    }

    InvoiceCounter::find()
        .filter(invoice_counter::Column::Prefix.eq(day_prefix))
        .one(conn)
        .await?
        .map(|c| c.last_value)
        .ok_or_else(|| Error::Database(DbErr::RecordNotFound(day_prefix.to_string())))
}

/// Whether a database error is a unique constraint violation.
#[must_use]
pub fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;
    use std::collections::HashSet;

    #[tokio::test]
    async fn test_sequence_increments_per_day() -> Result<()> {
        let db = setup_test_db().await?;
        let invoices = InvoiceGenerator::default();

        let first = invoices.next_for_date(&db, date(2024, 1, 10)).await?;
        let second = invoices.next_for_date(&db, date(2024, 1, 10)).await?;
        let next_day = invoices.next_for_date(&db, date(2024, 1, 11)).await?;

        assert_eq!(first, "INV-20240110-0001");
        assert_eq!(second, "INV-20240110-0002");
        assert_eq!(next_day, "INV-20240111-0001");
        Ok(())
    }

    #[tokio::test]
    async fn test_custom_prefix() -> Result<()> {
        let db = setup_test_db().await?;
        let invoices = InvoiceGenerator::new("BK");

        assert_eq!(invoices.prefix(), "BK");
        assert_eq!(
            invoices.next_for_date(&db, date(2025, 12, 31)).await?,
            "BK-20251231-0001"
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_numbers_are_distinct() -> Result<()> {
        let db = setup_test_db().await?;
        let invoices = InvoiceGenerator::default();

        let mut seen = HashSet::new();
        for _ in 0..50 {
            assert!(seen.insert(invoices.next(&db).await?));
        }
        Ok(())
    }
}
