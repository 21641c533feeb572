//! Booking and payment endpoints.
//!
//! - POST /bookings - Book a service; internal booking when called by an admin
//! - GET /bookings - List bookings (admin)
//! - GET /bookings/:id - Booking details (owner or admin)
//! - POST /bookings/:id/payments - Submit payment proof (owner)
//! - PUT /bookings/:id/payment - Verify the latest payment (admin)
//! - POST /bookings/:id/complete - Mark an approved booking completed (admin)
//! - PUT /payments/:id - Verify a specific payment (admin)

use super::{AppState, error::ApiError, identity};
use crate::{
    core::{
        booking::{self, BookingDetails, BookingFilter, BookingRequest},
        payment::{self, PaymentSubmission, PaymentVerification, VerificationOutcome},
        status::PaymentStatus,
    },
    entities::{booking as booking_entity, payment as payment_entity},
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
};
use serde::{Deserialize, Serialize};

/// Administrator's verdict on a payment.
#[derive(Debug, Deserialize)]
pub struct VerifyPaymentRequest {
    /// New payment status
    pub payment_status: PaymentStatus,
    /// Optional verifier note
    #[serde(default, alias = "note")]
    pub verifier_note: Option<String>,
}

/// Response after a payment submission.
#[derive(Debug, Serialize)]
pub struct SubmitPaymentResponse {
    /// Booking with its re-derived status
    pub booking: booking_entity::Model,
    /// The new pending payment
    pub payment: payment_entity::Model,
}

/// Allows admins and the booking's owner; everyone else gets 403.
fn ensure_can_view(headers: &HeaderMap, booking: &booking_entity::Model) -> Result<(), ApiError> {
    if identity::admin_id(headers)?.is_some() {
        return Ok(());
    }
    match identity::user_id(headers)? {
        Some(user_id) if booking.user_id == Some(user_id) => Ok(()),
        Some(_) => Err(ApiError::forbidden("booking belongs to another user")),
        None => Err(ApiError::unauthorized("sign in required")),
    }
}

/// Create a booking.
///
/// With `x-admin-id` the booking is internal: approved and paid immediately.
/// Otherwise it is booked for the signed-in user and starts waiting.
pub async fn create_booking(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(mut request): Json<BookingRequest>,
) -> Result<(StatusCode, Json<BookingDetails>), ApiError> {
    let details = if let Some(admin_id) = identity::admin_id(&headers)? {
        booking::create_internal_booking(&state.db, &state.invoices, &request, admin_id).await?
    } else {
        request.user_id = Some(identity::require_user(&headers)?);
        booking::create_booking(&state.db, &state.invoices, &request).await?
    };
    Ok((StatusCode::CREATED, Json(details)))
}

/// List bookings, newest first. Requires an administrator.
pub async fn list_bookings(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(filter): Query<BookingFilter>,
) -> Result<Json<Vec<booking_entity::Model>>, ApiError> {
    identity::require_admin(&headers)?;
    Ok(Json(booking::list_bookings(&state.db, &filter).await?))
}

/// Booking details with line items and payments.
pub async fn get_booking(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(booking_id): Path<i64>,
) -> Result<Json<BookingDetails>, ApiError> {
    let details = booking::get_booking_details(&state.db, booking_id).await?;
    ensure_can_view(&headers, &details.booking)?;
    Ok(Json(details))
}

/// Submit payment proof for the caller's booking.
pub async fn submit_payment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(booking_id): Path<i64>,
    Json(submission): Json<PaymentSubmission>,
) -> Result<(StatusCode, Json<SubmitPaymentResponse>), ApiError> {
    let existing = booking::require_booking(&state.db, booking_id).await?;
    ensure_can_view(&headers, &existing)?;

    let (booking, payment) = payment::submit_payment(&state.db, booking_id, submission).await?;
    Ok((
        StatusCode::CREATED,
        Json(SubmitPaymentResponse { booking, payment }),
    ))
}

/// Verify the latest payment of a booking. Requires an administrator.
pub async fn verify_booking_payment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(booking_id): Path<i64>,
    Json(request): Json<VerifyPaymentRequest>,
) -> Result<Json<VerificationOutcome>, ApiError> {
    let verifier_id = identity::require_admin(&headers)?;
    let verification = PaymentVerification {
        payment_status: request.payment_status,
        verifier_note: request.verifier_note,
        verifier_id,
    };
    let outcome = payment::verify_booking_payment(&state.db, booking_id, &verification).await?;
    Ok(Json(outcome))
}

/// Verify a specific payment. Requires an administrator.
pub async fn verify_payment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(payment_id): Path<i64>,
    Json(request): Json<VerifyPaymentRequest>,
) -> Result<Json<VerificationOutcome>, ApiError> {
    let verifier_id = identity::require_admin(&headers)?;
    let verification = PaymentVerification {
        payment_status: request.payment_status,
        verifier_note: request.verifier_note,
        verifier_id,
    };
    let outcome =
        payment::record_payment_verification(&state.db, payment_id, &verification).await?;
    Ok(Json(outcome))
}

/// Mark an approved booking completed. Requires an administrator.
pub async fn complete_booking(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(booking_id): Path<i64>,
) -> Result<Json<booking_entity::Model>, ApiError> {
    identity::require_admin(&headers)?;
    Ok(Json(booking::complete_booking(&state.db, booking_id).await?))
}
