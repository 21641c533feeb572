//! Unified error type for the booking core and its HTTP surface.
//!
//! Every fallible operation in the crate returns [`Result`]. Variants carry
//! enough context for a field-level message; [`Error::kind`] collapses them
//! into the coarse categories the API layer maps onto status codes.

use chrono::NaiveDate;
use thiserror::Error;

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or missing input, rejected before any write
    Validation,
    /// A referenced row does not exist
    NotFound,
    /// The request collides with existing state
    Conflict,
    /// A tiered service has no price for the requested customer type
    PriceNotConfigured,
    /// A transactional write failed and was rolled back
    Persistence,
    /// Startup or environment failure
    Internal,
}

/// All errors produced by the crate.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Service not found: {id}")]
    ServiceNotFound { id: String },

    #[error("Booking not found: {id}")]
    BookingNotFound { id: i64 },

    #[error("Payment not found: {id}")]
    PaymentNotFound { id: i64 },

    #[error("No rating by user {user_id} for service {service_id}")]
    RatingNotFound { service_id: i64, user_id: i64 },

    #[error("Cart item not found: {id}")]
    CartItemNotFound { id: i64 },

    #[error("Service {service_id} is not available from {start_date} to {end_date}")]
    DateRangeUnavailable {
        service_id: i64,
        start_date: NaiveDate,
        end_date: NaiveDate,
    },

    #[error("User {user_id} has already rated service {service_id}")]
    AlreadyRated { service_id: i64, user_id: i64 },

    #[error("Invoice number already issued: {invoice_number}")]
    DuplicateInvoice { invoice_number: String },

    #[error("Booking {booking_id} cannot move from {from} to {to}")]
    InvalidStatusTransition {
        booking_id: i64,
        from: String,
        to: String,
    },

    #[error("Service {id} is not active")]
    ServiceInactive { id: i64 },

    #[error("No price configured for service {service_id} and customer type {customer_type}")]
    PriceNotConfigured {
        service_id: i64,
        customer_type: String,
    },

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Shorthand for a [`Error::Validation`] on a named field.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Classifies this error for callers that only care about the category.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::ServiceNotFound { .. }
            | Self::BookingNotFound { .. }
            | Self::PaymentNotFound { .. }
            | Self::RatingNotFound { .. }
            | Self::CartItemNotFound { .. } => ErrorKind::NotFound,
            Self::DateRangeUnavailable { .. }
            | Self::AlreadyRated { .. }
            | Self::DuplicateInvoice { .. }
            | Self::InvalidStatusTransition { .. }
            | Self::ServiceInactive { .. } => ErrorKind::Conflict,
            Self::PriceNotConfigured { .. } => ErrorKind::PriceNotConfigured,
            Self::Database(_) => ErrorKind::Persistence,
            Self::Config { .. } | Self::Io(_) => ErrorKind::Internal,
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert_eq!(
            Error::validation("end_date", "before start").kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            Error::BookingNotFound { id: 3 }.kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            Error::AlreadyRated {
                service_id: 1,
                user_id: 2
            }
            .kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            Error::PriceNotConfigured {
                service_id: 1,
                customer_type: "affiliate".to_string()
            }
            .kind(),
            ErrorKind::PriceNotConfigured
        );
        assert_eq!(
            Error::Database(sea_orm::DbErr::Custom("boom".to_string())).kind(),
            ErrorKind::Persistence
        );
    }

    #[test]
    fn test_validation_message() {
        let err = Error::validation("rating", "must be between 1 and 5");
        assert_eq!(err.to_string(), "Invalid rating: must be between 1 and 5");
    }
}
