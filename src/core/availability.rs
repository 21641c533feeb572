//! Availability checking for date-range bookings.
//!
//! A service is a single resource: two bookings conflict when their inclusive
//! date ranges share at least one day. Line items of rejected or cancelled
//! bookings no longer hold their dates and are ignored.

use crate::{
    core::status::BookingStatus,
    entities::{BookingLineItem, booking, booking_line_item},
    errors::{Error, Result},
};
use chrono::NaiveDate;
use sea_orm::{QueryOrder, prelude::*};
use serde::Serialize;

/// An inclusive range of days, guaranteed to satisfy `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Builds a range, rejecting an `end` earlier than `start`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if end < start {
            return Err(Error::validation(
                "end_date",
                format!("end date {end} is before start date {start}"),
            ));
        }
        Ok(Self { start, end })
    }

    /// First day of the range.
    #[must_use]
    pub const fn start(&self) -> NaiveDate {
        self.start
    }

    /// Last day of the range.
    #[must_use]
    pub const fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of days covered, counting both ends (a same-day range is 1).
    #[must_use]
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// Whether the two ranges share at least one day.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

/// Answer to an availability query, as shown to customers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Availability {
    /// Whether the range is free
    pub available: bool,
    /// Human-readable summary
    pub message: String,
}

/// Returns the line items of `service_id` that still hold a day in `range`.
pub async fn find_conflicts<C>(
    conn: &C,
    service_id: i64,
    range: DateRange,
) -> Result<Vec<booking_line_item::Model>>
where
    C: ConnectionTrait,
{
    let released: Vec<&str> = BookingStatus::RELEASED
        .iter()
        .map(|s| s.as_str())
        .collect();

    BookingLineItem::find()
        .inner_join(crate::entities::Booking)
        .filter(booking_line_item::Column::ServiceId.eq(service_id))
        .filter(booking_line_item::Column::StartDate.lte(range.end()))
        .filter(booking_line_item::Column::EndDate.gte(range.start()))
        .filter(booking::Column::BookingStatus.is_not_in(released))
        .order_by_asc(booking_line_item::Column::StartDate)
        .all(conn)
        .await
        .map_err(Into::into)
}

/// Whether no active booking of `service_id` overlaps `range`.
pub async fn is_available<C>(conn: &C, service_id: i64, range: DateRange) -> Result<bool>
where
    C: ConnectionTrait,
{
    Ok(find_conflicts(conn, service_id, range).await?.is_empty())
}

/// Fails with [`Error::DateRangeUnavailable`] when `range` is taken.
pub async fn ensure_available<C>(conn: &C, service_id: i64, range: DateRange) -> Result<()>
where
    C: ConnectionTrait,
{
    if is_available(conn, service_id, range).await? {
        return Ok(());
    }
    tracing::warn!(
        service_id,
        start_date = %range.start(),
        end_date = %range.end(),
        "Requested date range is already booked"
    );
    Err(Error::DateRangeUnavailable {
        service_id,
        start_date: range.start(),
        end_date: range.end(),
    })
}

/// Checks a customer's requested dates for an existing service.
pub async fn check_availability(
    db: &DatabaseConnection,
    service_id: i64,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<Availability> {
    let range = DateRange::new(start_date, end_date)?;
    crate::core::service::require_service(db, service_id).await?;

    let available = is_available(db, service_id, range).await?;
    tracing::debug!(service_id, %start_date, %end_date, available, "Checked availability");

    let message = if available {
        "Schedule available".to_string()
    } else {
        "Schedule not available".to_string()
    };
    Ok(Availability { available, message })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    fn range(start: NaiveDate, end: NaiveDate) -> DateRange {
        DateRange::new(start, end).unwrap()
    }

    #[test]
    fn test_date_range_rejects_reversed_bounds() {
        let result = DateRange::new(date(2024, 1, 15), date(2024, 1, 10));
        assert!(matches!(result, Err(Error::Validation { field, .. }) if field == "end_date"));
    }

    #[test]
    fn test_day_count_is_inclusive() {
        assert_eq!(range(date(2024, 1, 10), date(2024, 1, 10)).days(), 1);
        assert_eq!(range(date(2024, 1, 10), date(2024, 1, 15)).days(), 6);
        // Crosses the leap day
        assert_eq!(range(date(2024, 2, 28), date(2024, 3, 1)).days(), 3);
    }

    #[test]
    fn test_overlap_semantics() {
        let existing = range(date(2024, 1, 10), date(2024, 1, 15));
        assert!(existing.overlaps(&range(date(2024, 1, 12), date(2024, 1, 20))));
        assert!(existing.overlaps(&range(date(2024, 1, 1), date(2024, 1, 10))));
        assert!(existing.overlaps(&range(date(2024, 1, 15), date(2024, 1, 15))));
        assert!(existing.overlaps(&range(date(2024, 1, 1), date(2024, 1, 31))));
        assert!(!existing.overlaps(&range(date(2024, 1, 16), date(2024, 1, 20))));
        assert!(!existing.overlaps(&range(date(2024, 1, 1), date(2024, 1, 9))));
    }

    #[tokio::test]
    async fn test_existing_booking_blocks_overlapping_range() -> Result<()> {
        let db = setup_test_db().await?;
        let service = create_test_service(&db, "Hall", 50_000).await?;

        let wanted = range(date(2024, 1, 12), date(2024, 1, 20));
        assert!(is_available(&db, service.id, wanted).await?);

        create_test_booking(&db, service.id, date(2024, 1, 10), date(2024, 1, 15)).await?;

        assert!(!is_available(&db, service.id, wanted).await?);
        assert!(is_available(&db, service.id, range(date(2024, 1, 16), date(2024, 1, 20))).await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_other_services_do_not_conflict() -> Result<()> {
        let db = setup_test_db().await?;
        let hall = create_test_service(&db, "Hall", 50_000).await?;
        let lab = create_test_service(&db, "Lab", 20_000).await?;
        create_test_booking(&db, hall.id, date(2024, 1, 10), date(2024, 1, 15)).await?;

        assert!(is_available(&db, lab.id, range(date(2024, 1, 10), date(2024, 1, 15))).await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_cancelled_bookings_release_dates() -> Result<()> {
        let db = setup_test_db().await?;
        let service = create_test_service(&db, "Hall", 50_000).await?;
        let booking =
            create_test_booking(&db, service.id, date(2024, 1, 10), date(2024, 1, 15)).await?;
        let wanted = range(date(2024, 1, 14), date(2024, 1, 14));
        assert!(!is_available(&db, service.id, wanted).await?);

        set_booking_status(&db, booking.id, BookingStatus::Cancelled).await?;
        assert!(is_available(&db, service.id, wanted).await?);

        set_booking_status(&db, booking.id, BookingStatus::Rejected).await?;
        assert!(is_available(&db, service.id, wanted).await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_check_availability_report() -> Result<()> {
        let db = setup_test_db().await?;
        let service = create_test_service(&db, "Hall", 50_000).await?;
        create_test_booking(&db, service.id, date(2024, 1, 10), date(2024, 1, 15)).await?;

        let report =
            check_availability(&db, service.id, date(2024, 1, 12), date(2024, 1, 20)).await?;
        assert!(!report.available);
        assert_eq!(report.message, "Schedule not available");

        let missing = check_availability(&db, 999, date(2024, 1, 12), date(2024, 1, 20)).await;
        assert!(matches!(missing, Err(Error::ServiceNotFound { .. })));
        Ok(())
    }
}
