//! Booking lifecycle business logic.
//!
//! A booking is written as one unit: booking row, line items and (for internal
//! bookings) an automatic payment either all commit or all roll back. Every
//! booking transaction starts by bumping `reservation_seq` on each booked
//! service. That write takes the service's row lock (the database write lock on
//! `SQLite`), so the availability check that follows and the line-item insert
//! cannot interleave with another booking of the same service.

use crate::{
    core::{
        availability::{DateRange, ensure_available},
        invoice::{InvoiceGenerator, is_unique_violation},
        pricing::{line_total, resolve_service_price, sum_totals},
        status::{BookingStatus, CustomerType, PaymentStatus},
    },
    entities::{Booking, BookingLineItem, Payment, Service, booking, booking_line_item, payment,
        service},
    errors::{Error, Result},
};
use chrono::{NaiveDate, Utc};
use sea_orm::{DatabaseTransaction, QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr};
use serde::{Deserialize, Serialize};
use std::future::Future;

const MAX_INVOICE_ATTEMPTS: usize = 3;
const INTERNAL_PAYMENT_METHOD: &str = "transfer";

/// A single-service booking request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRequest {
    /// Customer the booking is for; internal bookings may leave this empty
    #[serde(default)]
    pub user_id: Option<i64>,
    /// Service to book
    pub service_id: i64,
    /// Customer type used for pricing
    pub customer_type: CustomerType,
    /// First day (inclusive)
    pub start_date: NaiveDate,
    /// Last day (inclusive)
    pub end_date: NaiveDate,
}

/// One validated line of a booking about to be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRequest {
    /// Service to book
    pub service_id: i64,
    /// Customer type used for pricing
    pub customer_type: CustomerType,
    /// Booked days
    pub range: DateRange,
}

/// Who is creating the booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingOrigin {
    /// A customer booking for themselves; starts `waiting` with no payment
    Customer,
    /// An administrator booking on someone's behalf; starts `approved` and paid
    Internal {
        /// Administrator creating the booking
        admin_id: i64,
    },
}

/// A booking together with its line items and payments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookingDetails {
    /// The booking row
    pub booking: booking::Model,
    /// Booked date ranges with price snapshots
    pub line_items: Vec<booking_line_item::Model>,
    /// Payments, newest first
    pub payments: Vec<payment::Model>,
}

/// Filters for [`list_bookings`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BookingFilter {
    /// Only bookings in this status
    pub status: Option<BookingStatus>,
    /// Invoice number substring
    pub search: Option<String>,
}

/// Parses the stored status of a booking.
pub fn booking_status(booking: &booking::Model) -> Result<BookingStatus> {
    booking.booking_status.parse()
}

/// Creates a customer booking for one service.
///
/// The booking starts `waiting` without a payment; the customer submits one
/// later through `core::payment::submit_payment`.
pub async fn create_booking(
    db: &DatabaseConnection,
    invoices: &InvoiceGenerator,
    request: &BookingRequest,
) -> Result<BookingDetails> {
    let line = LineRequest {
        service_id: request.service_id,
        customer_type: request.customer_type,
        range: DateRange::new(request.start_date, request.end_date)?,
    };
    place_booking(db, invoices, request.user_id, &[line], BookingOrigin::Customer).await
}

/// Creates an administrator booking: `approved`, flagged internal, with an
/// automatic `paid` payment for the full amount.
pub async fn create_internal_booking(
    db: &DatabaseConnection,
    invoices: &InvoiceGenerator,
    request: &BookingRequest,
    admin_id: i64,
) -> Result<BookingDetails> {
    let line = LineRequest {
        service_id: request.service_id,
        customer_type: request.customer_type,
        range: DateRange::new(request.start_date, request.end_date)?,
    };
    place_booking(
        db,
        invoices,
        request.user_id,
        &[line],
        BookingOrigin::Internal { admin_id },
    )
    .await
}

/// Writes a booking over `lines` in its own transaction, retrying when the
/// generated invoice number collides.
pub async fn place_booking(
    db: &DatabaseConnection,
    invoices: &InvoiceGenerator,
    user_id: Option<i64>,
    lines: &[LineRequest],
    origin: BookingOrigin,
) -> Result<BookingDetails> {
    retry_on_invoice_collision(|| async move {
        let txn = db.begin().await?;
        let details = insert_booking(&txn, invoices, user_id, lines, origin).await?;
        txn.commit().await?;
        Ok(details)
    })
    .await
}

/// Runs `attempt` again when it fails with [`Error::DuplicateInvoice`].
///
/// Each attempt must own its transaction so a failed one rolls back fully.
pub(crate) async fn retry_on_invoice_collision<T, F, Fut>(mut attempt: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut tries = 0;
    loop {
        tries += 1;
        match attempt().await {
            Err(Error::DuplicateInvoice { invoice_number }) if tries < MAX_INVOICE_ATTEMPTS => {
                tracing::warn!(%invoice_number, tries, "Invoice number collided, retrying booking");
            }
            other => return other,
        }
    }
}

/// Bumps `reservation_seq` on a service and returns the locked row.
pub(crate) async fn lock_service<C>(conn: &C, service_id: i64) -> Result<service::Model>
where
    C: ConnectionTrait,
{
    let locked = Service::update_many()
        .col_expr(
            service::Column::ReservationSeq,
            Expr::col(service::Column::ReservationSeq).add(1),
        )
        .filter(service::Column::Id.eq(service_id))
        .exec(conn)
        .await?;

    if locked.rows_affected == 0 {
        return Err(Error::ServiceNotFound {
            id: service_id.to_string(),
        });
    }

    crate::core::service::require_service(conn, service_id).await
}

struct PricedLine {
    service: service::Model,
    customer_type: CustomerType,
    range: DateRange,
    unit_price: i64,
}

impl PricedLine {
    fn amount(&self) -> Result<i64> {
        line_total(self.unit_price, self.range.days())
    }
}

/// Inserts a booking inside `txn` without committing.
///
/// Callers that need to do more work in the same transaction (cart checkout)
/// commit themselves.
pub(crate) async fn insert_booking(
    txn: &DatabaseTransaction,
    invoices: &InvoiceGenerator,
    user_id: Option<i64>,
    lines: &[LineRequest],
    origin: BookingOrigin,
) -> Result<BookingDetails> {
    if lines.is_empty() {
        return Err(Error::validation("line_items", "a booking needs at least one item"));
    }

    // Two lines of one request must not claim the same day either
    for (i, line) in lines.iter().enumerate() {
        if let Some(clash) = lines[..i]
            .iter()
            .find(|other| other.service_id == line.service_id && other.range.overlaps(&line.range))
        {
            return Err(Error::DateRangeUnavailable {
                service_id: line.service_id,
                start_date: clash.range.start().max(line.range.start()),
                end_date: clash.range.end().min(line.range.end()),
            });
        }
    }

    // Lock in id order so concurrent multi-service bookings cannot deadlock
    let mut service_ids: Vec<i64> = lines.iter().map(|l| l.service_id).collect();
    service_ids.sort_unstable();
    service_ids.dedup();
    let mut services = Vec::with_capacity(service_ids.len());
    for id in service_ids {
        let service = lock_service(txn, id).await?;
        if !service.is_active {
            return Err(Error::ServiceInactive { id });
        }
        services.push(service);
    }

    let mut priced = Vec::with_capacity(lines.len());
    for line in lines {
        let Some(service) = services.iter().find(|s| s.id == line.service_id) else {
            return Err(Error::ServiceNotFound {
                id: line.service_id.to_string(),
            });
        };
        ensure_available(txn, line.service_id, line.range).await?;
        let unit_price = resolve_service_price(txn, service, line.customer_type).await?;
        priced.push(PricedLine {
            service: service.clone(),
            customer_type: line.customer_type,
            range: line.range,
            unit_price,
        });
    }

    let total_amount = sum_totals(
        priced
            .iter()
            .map(PricedLine::amount)
            .collect::<Result<Vec<_>>>()?,
    )?;
    let invoice_number = invoices.next(txn).await?;
    let now = Utc::now();

    let status = match origin {
        BookingOrigin::Customer => BookingStatus::Waiting,
        BookingOrigin::Internal { .. } => BookingStatus::Approved,
    };

    let created = booking::ActiveModel {
        user_id: Set(user_id),
        invoice_number: Set(invoice_number.clone()),
        total_amount: Set(total_amount),
        booking_status: Set(status.as_str().to_string()),
        is_internal: Set(matches!(origin, BookingOrigin::Internal { .. })),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(txn)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            Error::DuplicateInvoice {
                invoice_number: invoice_number.clone(),
            }
        } else {
            e.into()
        }
    })?;

    let mut line_items = Vec::with_capacity(priced.len());
    for line in &priced {
        let item = booking_line_item::ActiveModel {
            booking_id: Set(created.id),
            service_id: Set(line.service.id),
            name: Set(line.service.name.clone()),
            price: Set(line.unit_price),
            start_date: Set(line.range.start()),
            end_date: Set(line.range.end()),
            qty: Set(line.range.days()),
            customer_type: Set(line.customer_type.as_str().to_string()),
            ..Default::default()
        }
        .insert(txn)
        .await?;
        line_items.push(item);
    }

    let mut payments = Vec::new();
    if let BookingOrigin::Internal { admin_id } = origin {
        let paid = payment::ActiveModel {
            booking_id: Set(created.id),
            payment_status: Set(PaymentStatus::Paid.as_str().to_string()),
            amount_paid: Set(total_amount),
            method: Set(INTERNAL_PAYMENT_METHOD.to_string()),
            proof_filename: Set(None),
            verified_by_admin_id: Set(Some(admin_id)),
            verified_at: Set(Some(now)),
            verifier_note: Set(None),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(txn)
        .await?;
        payments.push(paid);
    }

    tracing::info!(
        booking_id = created.id,
        invoice_number = %created.invoice_number,
        total_amount,
        items = line_items.len(),
        internal = created.is_internal,
        "Created booking"
    );

    Ok(BookingDetails {
        booking: created,
        line_items,
        payments,
    })
}

/// Finds a booking by id.
pub async fn get_booking(
    db: &DatabaseConnection,
    booking_id: i64,
) -> Result<Option<booking::Model>> {
    Booking::find_by_id(booking_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Loads a booking or fails with [`Error::BookingNotFound`].
pub async fn require_booking<C>(conn: &C, booking_id: i64) -> Result<booking::Model>
where
    C: ConnectionTrait,
{
    Booking::find_by_id(booking_id)
        .one(conn)
        .await?
        .ok_or(Error::BookingNotFound { id: booking_id })
}

/// Loads a booking with its line items and payments.
pub async fn get_booking_details(
    db: &DatabaseConnection,
    booking_id: i64,
) -> Result<BookingDetails> {
    let booking = require_booking(db, booking_id).await?;

    let line_items = BookingLineItem::find()
        .filter(booking_line_item::Column::BookingId.eq(booking_id))
        .order_by_asc(booking_line_item::Column::Id)
        .all(db)
        .await?;

    let payments = Payment::find()
        .filter(payment::Column::BookingId.eq(booking_id))
        .order_by_desc(payment::Column::Id)
        .all(db)
        .await?;

    Ok(BookingDetails {
        booking,
        line_items,
        payments,
    })
}

/// Lists bookings newest first, optionally filtered by status and invoice number.
pub async fn list_bookings(
    db: &DatabaseConnection,
    filter: &BookingFilter,
) -> Result<Vec<booking::Model>> {
    let mut query = Booking::find().order_by_desc(booking::Column::Id);

    if let Some(status) = filter.status {
        query = query.filter(booking::Column::BookingStatus.eq(status.as_str()));
    }
    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        query = query.filter(booking::Column::InvoiceNumber.contains(search));
    }

    query.all(db).await.map_err(Into::into)
}

/// Counts every booking a user owns.
pub async fn count_user_bookings(db: &DatabaseConnection, user_id: i64) -> Result<u64> {
    Booking::find()
        .filter(booking::Column::UserId.eq(user_id))
        .count(db)
        .await
        .map_err(Into::into)
}

/// Marks an approved booking as completed.
///
/// This is the only path to `completed`; payment changes never produce it.
pub async fn complete_booking(db: &DatabaseConnection, booking_id: i64) -> Result<booking::Model> {
    let txn = db.begin().await?;
    let existing = require_booking(&txn, booking_id).await?;
    let current = booking_status(&existing)?;

    if current != BookingStatus::Approved {
        return Err(Error::InvalidStatusTransition {
            booking_id,
            from: current.as_str().to_string(),
            to: BookingStatus::Completed.as_str().to_string(),
        });
    }

    let mut active: booking::ActiveModel = existing.into();
    active.booking_status = Set(BookingStatus::Completed.as_str().to_string());
    active.updated_at = Set(Utc::now());
    let updated = active.update(&txn).await?;
    txn.commit().await?;

    tracing::info!(booking_id, "Booking completed");
    Ok(updated)
}
