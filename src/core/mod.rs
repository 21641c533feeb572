//! Core business logic, independent of the HTTP layer.
//!
//! Every operation takes a `&DatabaseConnection` (or a generic connection when it
//! must run inside a caller's transaction) and returns [`crate::errors::Result`].

/// Date ranges and overlap checks against held bookings
pub mod availability;
/// Booking creation, lookup and completion
pub mod booking;
/// Visitor carts, session merge and checkout
pub mod cart;
/// Invoice number generation
pub mod invoice;
/// Payment submission and verification
pub mod payment;
/// Unit price and quote calculation
pub mod pricing;
/// Ratings, reviews and statistics
pub mod rating;
/// Service catalog management
pub mod service;
/// Customer types and booking/payment statuses
pub mod status;
