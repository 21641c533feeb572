//! HTTP surface over the booking core.
//!
//! Handlers stay thin: they read identity headers, call into `core`, and turn
//! domain errors into JSON error responses.

use crate::core::invoice::InvoiceGenerator;
use sea_orm::DatabaseConnection;

/// Booking and payment endpoints
pub mod bookings;
/// Cart endpoints
pub mod cart;
/// Error responses
pub mod error;
/// Health check
pub mod health;
/// Identity headers
pub mod identity;
/// Rating endpoints
pub mod ratings;
/// Router assembly
pub mod routes;
/// Catalog, availability and price endpoints
pub mod services;

pub use routes::build_router;

/// State shared by every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Connection pool
    pub db: DatabaseConnection,
    /// Invoice numbering for new bookings
    pub invoices: InvoiceGenerator,
}

impl AppState {
    /// Creates the handler state.
    #[must_use]
    pub const fn new(db: DatabaseConnection, invoices: InvoiceGenerator) -> Self {
        Self { db, invoices }
    }
}
