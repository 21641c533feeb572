//! Shared test utilities for the facility booking core.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.

use crate::{
    core::{
        booking::{BookingRequest, create_booking},
        invoice::InvoiceGenerator,
        service::{ServiceInput, TierPrice, create_service},
        status::{BookingStatus, CustomerType},
    },
    entities::{booking, service},
    errors::Result,
};
use chrono::{NaiveDate, Utc};
use sea_orm::{ActiveModelTrait, ConnectOptions, DatabaseConnection, Set};
use std::time::Duration;

/// Customer used by tests that need an authenticated user.
pub const TEST_USER_ID: i64 = 1;
/// Administrator used by tests that verify payments or book internally.
pub const TEST_ADMIN_ID: i64 = 900;

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
///
/// Every pooled connection to `sqlite::memory:` would open its own empty
/// database, so the pool is pinned to a single connection. Concurrency tests
/// queue on it, hence the generous acquire timeout.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(120))
        .sqlx_logging(false);

    let db = sea_orm::Database::connect(options).await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Shorthand for building a calendar date in tests.
///
/// # Panics
/// Panics on an invalid date.
#[allow(clippy::unwrap_used)]
pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

/// Input for an active, flat-priced service.
///
/// # Defaults
/// * `unit`: "General Affairs"
/// * `description`: None
/// * `is_active`: true
pub fn flat_service_input(name: &str, base_price: i64) -> ServiceInput {
    ServiceInput {
        name: name.to_string(),
        unit: "General Affairs".to_string(),
        description: None,
        base_price,
        is_price_per_type: false,
        is_active: true,
        prices: Vec::new(),
    }
}

/// Creates an active flat-priced service.
pub async fn create_test_service(
    db: &DatabaseConnection,
    name: &str,
    base_price: i64,
) -> Result<service::Model> {
    create_service(db, flat_service_input(name, base_price)).await
}

/// Creates an active service priced per customer type.
pub async fn create_tiered_service(
    db: &DatabaseConnection,
    name: &str,
    tiers: &[(CustomerType, i64)],
) -> Result<service::Model> {
    let mut input = flat_service_input(name, 0);
    input.is_price_per_type = true;
    input.prices = tiers
        .iter()
        .map(|&(customer_type, price)| TierPrice {
            customer_type,
            price,
        })
        .collect();
    create_service(db, input).await
}

/// Creates a waiting customer booking of one service for [`TEST_USER_ID`].
pub async fn create_test_booking(
    db: &DatabaseConnection,
    service_id: i64,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<booking::Model> {
    let request = BookingRequest {
        user_id: Some(TEST_USER_ID),
        service_id,
        customer_type: CustomerType::General,
        start_date,
        end_date,
    };
    let details = create_booking(db, &InvoiceGenerator::default(), &request).await?;
    Ok(details.booking)
}

/// Forces a booking into `status`, bypassing the payment workflow.
pub async fn set_booking_status(
    db: &DatabaseConnection,
    booking_id: i64,
    status: BookingStatus,
) -> Result<booking::Model> {
    let existing = crate::core::booking::require_booking(db, booking_id).await?;
    let mut active: booking::ActiveModel = existing.into();
    active.booking_status = Set(status.as_str().to_string());
    active.updated_at = Set(Utc::now());
    active.update(db).await.map_err(Into::into)
}
