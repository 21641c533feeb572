//! Payment recording and verification.
//!
//! A booking's status follows its latest payment through
//! [`derive_booking_status`]. This module is the only code that writes a derived
//! status: each payment change and the matching booking update are committed
//! together, and each verification produces an [`AuditEntry`] for the activity
//! log.

use crate::{
    core::{
        availability::{DateRange, ensure_available},
        booking::{booking_status, lock_service, require_booking},
        status::{BookingStatus, PaymentStatus, derive_booking_status},
    },
    entities::{BookingLineItem, Payment, booking, booking_line_item, payment},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};

const MAX_NOTE_LEN: usize = 500;

/// An administrator's verdict on a payment.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PaymentVerification {
    /// New payment status
    pub payment_status: PaymentStatus,
    /// Optional note for the customer and the audit log
    #[serde(default, alias = "note")]
    pub verifier_note: Option<String>,
    /// Administrator performing the verification
    pub verifier_id: i64,
}

/// A customer's payment submission.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PaymentSubmission {
    /// Amount the customer reports having paid
    pub amount_paid: i64,
    /// Payment method, e.g. `"transfer"`
    pub method: String,
    /// Stored filename of the uploaded proof
    #[serde(default)]
    pub proof_filename: Option<String>,
}

/// Record handed to the activity log after a verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditEntry {
    /// Verified payment
    pub payment_id: i64,
    /// Booking whose status was re-derived
    pub booking_id: i64,
    /// Payment status that was set
    pub payment_status: PaymentStatus,
    /// Booking status that resulted
    pub booking_status: BookingStatus,
    /// Verifier note
    pub notes: Option<String>,
    /// Administrator who acted
    pub actor: i64,
}

impl AuditEntry {
    /// Emits the entry on the `audit` tracing target.
    pub fn emit(&self) {
        tracing::info!(
            target: "audit",
            payment_id = self.payment_id,
            booking_id = self.booking_id,
            payment_status = %self.payment_status,
            booking_status = %self.booking_status,
            notes = self.notes.as_deref().unwrap_or(""),
            actor = self.actor,
            "Payment verified"
        );
    }
}

/// Result of a verification: the updated rows plus the audit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationOutcome {
    /// Booking with its re-derived status
    pub booking: booking::Model,
    /// Updated or created payment
    pub payment: payment::Model,
    /// Activity log record
    pub audit: AuditEntry,
}

fn validate_note(note: Option<&str>) -> Result<()> {
    if note.is_some_and(|n| n.chars().count() > MAX_NOTE_LEN) {
        return Err(Error::validation(
            "verifier_note",
            format!("note cannot exceed {MAX_NOTE_LEN} characters"),
        ));
    }
    Ok(())
}

/// Completed bookings are final; payment changes may not reopen them.
fn ensure_not_completed(booking: &booking::Model, to: BookingStatus) -> Result<()> {
    if booking_status(booking)? == BookingStatus::Completed {
        return Err(Error::InvalidStatusTransition {
            booking_id: booking.id,
            from: BookingStatus::Completed.as_str().to_string(),
            to: to.as_str().to_string(),
        });
    }
    Ok(())
}

/// Re-claims the dates of a released booking that a payment change would
/// make active again.
///
/// The services are locked first, as when booking, so the check cannot race a
/// concurrent booking of the same days. The booking's own line items do not
/// count yet because its stored status is still released.
async fn reclaim_dates<C>(conn: &C, booking: &booking::Model, to: BookingStatus) -> Result<()>
where
    C: ConnectionTrait,
{
    if booking_status(booking)?.holds_dates() || !to.holds_dates() {
        return Ok(());
    }

    let items = BookingLineItem::find()
        .filter(booking_line_item::Column::BookingId.eq(booking.id))
        .all(conn)
        .await?;

    let mut service_ids: Vec<i64> = items.iter().map(|item| item.service_id).collect();
    service_ids.sort_unstable();
    service_ids.dedup();
    for service_id in service_ids {
        lock_service(conn, service_id).await?;
    }

    for item in &items {
        let range = DateRange::new(item.start_date, item.end_date)?;
        ensure_available(conn, item.service_id, range).await?;
    }
    tracing::debug!(booking_id = booking.id, "Released booking re-claimed its dates");
    Ok(())
}

/// Overwrites the booking status with the one implied by `payment_status`.
async fn apply_payment_status<C>(
    conn: &C,
    booking: booking::Model,
    payment_status: PaymentStatus,
) -> Result<booking::Model>
where
    C: ConnectionTrait,
{
    let derived = derive_booking_status(payment_status);
    let mut active: booking::ActiveModel = booking.into();
    active.booking_status = Set(derived.as_str().to_string());
    active.updated_at = Set(Utc::now());
    active.update(conn).await.map_err(Into::into)
}

/// Returns the most recent payment of a booking.
pub async fn latest_payment<C>(conn: &C, booking_id: i64) -> Result<Option<payment::Model>>
where
    C: ConnectionTrait,
{
    Payment::find()
        .filter(payment::Column::BookingId.eq(booking_id))
        .order_by_desc(payment::Column::Id)
        .one(conn)
        .await
        .map_err(Into::into)
}

/// Records a customer payment as `pending` and moves the booking to `waiting`.
pub async fn submit_payment(
    db: &DatabaseConnection,
    booking_id: i64,
    submission: PaymentSubmission,
) -> Result<(booking::Model, payment::Model)> {
    if submission.amount_paid <= 0 {
        return Err(Error::validation("amount_paid", "amount must be positive"));
    }
    if submission.method.trim().is_empty() {
        return Err(Error::validation("method", "payment method is required"));
    }

    let txn = db.begin().await?;
    let booking = require_booking(&txn, booking_id).await?;
    let derived = derive_booking_status(PaymentStatus::Pending);
    ensure_not_completed(&booking, derived)?;
    reclaim_dates(&txn, &booking, derived).await?;

    let created = payment::ActiveModel {
        booking_id: Set(booking_id),
        payment_status: Set(PaymentStatus::Pending.as_str().to_string()),
        amount_paid: Set(submission.amount_paid),
        method: Set(submission.method.trim().to_string()),
        proof_filename: Set(submission.proof_filename),
        verified_by_admin_id: Set(None),
        verified_at: Set(None),
        verifier_note: Set(None),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let booking = apply_payment_status(&txn, booking, PaymentStatus::Pending).await?;
    txn.commit().await?;

    tracing::info!(booking_id, payment_id = created.id, "Payment submitted for verification");
    Ok((booking, created))
}

async fn verify_in_txn<C>(
    conn: &C,
    booking: booking::Model,
    existing: Option<payment::Model>,
    verification: &PaymentVerification,
) -> Result<VerificationOutcome>
where
    C: ConnectionTrait,
{
    let status = verification.payment_status;
    let derived = derive_booking_status(status);
    ensure_not_completed(&booking, derived)?;
    reclaim_dates(conn, &booking, derived).await?;
    let now = Utc::now();

    let payment = match existing {
        Some(found) => {
            let mut active: payment::ActiveModel = found.into();
            active.payment_status = Set(status.as_str().to_string());
            active.verifier_note = Set(verification.verifier_note.clone());
            active.verified_by_admin_id = Set(Some(verification.verifier_id));
            active.verified_at = Set(Some(now));
            active.update(conn).await?
        }
        None => {
            payment::ActiveModel {
                booking_id: Set(booking.id),
                payment_status: Set(status.as_str().to_string()),
                amount_paid: Set(0),
                method: Set(String::new()),
                proof_filename: Set(None),
                verified_by_admin_id: Set(Some(verification.verifier_id)),
                verified_at: Set(Some(now)),
                verifier_note: Set(verification.verifier_note.clone()),
                created_at: Set(now),
                ..Default::default()
            }
            .insert(conn)
            .await?
        }
    };

    let booking = apply_payment_status(conn, booking, status).await?;
    let audit = AuditEntry {
        payment_id: payment.id,
        booking_id: booking.id,
        payment_status: status,
        booking_status: booking_status(&booking)?,
        notes: verification.verifier_note.clone(),
        actor: verification.verifier_id,
    };

    Ok(VerificationOutcome {
        booking,
        payment,
        audit,
    })
}

/// Sets the status of a payment and re-derives its booking's status.
pub async fn record_payment_verification(
    db: &DatabaseConnection,
    payment_id: i64,
    verification: &PaymentVerification,
) -> Result<VerificationOutcome> {
    validate_note(verification.verifier_note.as_deref())?;

    let txn = db.begin().await?;
    let existing = Payment::find_by_id(payment_id)
        .one(&txn)
        .await?
        .ok_or(Error::PaymentNotFound { id: payment_id })?;
    let booking = require_booking(&txn, existing.booking_id).await?;

    let outcome = verify_in_txn(&txn, booking, Some(existing), verification).await?;
    txn.commit().await?;

    outcome.audit.emit();
    Ok(outcome)
}

/// Verifies the latest payment of a booking, creating a payment row when the
/// booking has none yet.
pub async fn verify_booking_payment(
    db: &DatabaseConnection,
    booking_id: i64,
    verification: &PaymentVerification,
) -> Result<VerificationOutcome> {
    validate_note(verification.verifier_note.as_deref())?;

    let txn = db.begin().await?;
    let booking = require_booking(&txn, booking_id).await?;
    let existing = latest_payment(&txn, booking_id).await?;

    let outcome = verify_in_txn(&txn, booking, existing, verification).await?;
    txn.commit().await?;

    outcome.audit.emit();
    Ok(outcome)
}
