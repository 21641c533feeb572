//! Router configuration.

use super::{AppState, bookings, cart, health::health_check, ratings, services};
use axum::{
    Router,
    routing::{delete, get, post, put},
};
use tower_http::trace::TraceLayer;

/// Build the complete Axum router.
///
/// `/services/:id` takes a slug on GET and a numeric id everywhere else.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        // Catalog
        .route(
            "/services",
            get(services::list_services).post(services::create_service),
        )
        .route(
            "/services/:id",
            get(services::get_service_detail)
                .put(services::update_service)
                .delete(services::delete_service),
        )
        .route(
            "/services/:id/ratings",
            post(ratings::rate)
                .put(ratings::store_rating)
                .patch(ratings::update_rating)
                .delete(ratings::delete_rating),
        )
        .route("/services/:id/ratings/stats", get(ratings::rating_stats))
        .route("/availability", get(services::check_availability))
        .route("/price", get(services::quote_price))
        // Bookings and payments
        .route(
            "/bookings",
            post(bookings::create_booking).get(bookings::list_bookings),
        )
        .route("/bookings/:id", get(bookings::get_booking))
        .route("/bookings/:id/payments", post(bookings::submit_payment))
        .route("/bookings/:id/payment", put(bookings::verify_booking_payment))
        .route("/bookings/:id/complete", post(bookings::complete_booking))
        .route("/payments/:id", put(bookings::verify_payment))
        // Cart
        .route("/cart", get(cart::get_cart).post(cart::add_to_cart))
        .route("/cart/checkout", post(cart::checkout))
        .route("/cart/merge", post(cart::merge))
        .route("/cart/:id", delete(cart::remove_cart_item))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
