//! Service catalog, availability and price endpoints.
//!
//! - GET /services - List active services, `?query=` searches
//! - POST /services - Create a service (admin)
//! - GET /services/:slug - Detail page data
//! - PUT /services/:id - Update a service (admin)
//! - DELETE /services/:id - Delete or deactivate a service (admin)
//! - GET /availability - Check a date range
//! - GET /price - Quote a date range

use super::{AppState, error::ApiError, identity};
use crate::{
    core::{
        availability::{self, Availability},
        pricing::{self, PriceQuote},
        rating::{self, RatingStats},
        service::{self, DeleteOutcome, ServiceInput},
        status::CustomerType,
    },
    entities::{price_tier, rating as rating_entity, service as service_entity},
    errors::{Error, ErrorKind},
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Query parameters for listing services.
#[derive(Debug, Default, Deserialize)]
pub struct ListServicesQuery {
    /// Name or description substring
    pub query: Option<String>,
}

/// Query parameters for the detail page.
#[derive(Debug, Default, Deserialize)]
pub struct DetailQuery {
    /// Customer type to show the price for (default: general)
    pub customer_type: Option<CustomerType>,
}

/// Everything the service detail page shows.
#[derive(Debug, Serialize)]
pub struct ServiceDetailResponse {
    /// The service
    pub service: service_entity::Model,
    /// Per-customer-type prices
    pub price_tiers: Vec<price_tier::Model>,
    /// Unit price for the requested customer type, absent when not configured
    pub price: Option<i64>,
    /// Review statistics
    pub stats: RatingStats,
    /// Reviews, newest first
    pub reviews: Vec<rating_entity::Model>,
    /// The caller's own rating
    pub user_rating: Option<rating_entity::Model>,
    /// Whether the caller may leave a review
    pub can_review: bool,
}

/// Response after deleting a service.
#[derive(Debug, Serialize)]
pub struct DeleteServiceResponse {
    /// What happened to the row
    pub outcome: DeleteOutcome,
}

/// Query parameters for availability checks.
#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    /// Service to check
    pub service_id: i64,
    /// First day (inclusive)
    pub start_date: NaiveDate,
    /// Last day (inclusive)
    pub end_date: NaiveDate,
}

/// Query parameters for price quotes.
#[derive(Debug, Deserialize)]
pub struct PriceQuery {
    /// Service to price
    pub service_id: i64,
    /// Customer type to price as
    pub customer_type: CustomerType,
    /// First day (inclusive)
    pub start_date: NaiveDate,
    /// Last day (inclusive)
    pub end_date: NaiveDate,
}

fn parse_service_id(raw: &str) -> Result<i64, ApiError> {
    raw.parse().map_err(|_| {
        ApiError::from(Error::validation("id", format!("'{raw}' is not a service id")))
    })
}

/// List active services.
pub async fn list_services(
    State(state): State<AppState>,
    Query(params): Query<ListServicesQuery>,
) -> Result<Json<Vec<service_entity::Model>>, ApiError> {
    let services = match params.query.as_deref() {
        Some(query) => service::search_services(&state.db, query).await?,
        None => service::list_active_services(&state.db).await?,
    };
    Ok(Json(services))
}

/// Create a service. Requires an administrator.
pub async fn create_service(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<ServiceInput>,
) -> Result<(StatusCode, Json<service_entity::Model>), ApiError> {
    identity::require_admin(&headers)?;
    let created = service::create_service(&state.db, input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Service detail by slug: prices, rating statistics and reviews.
pub async fn get_service_detail(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(slug): Path<String>,
    Query(params): Query<DetailQuery>,
) -> Result<Json<ServiceDetailResponse>, ApiError> {
    let found = service::get_service_by_slug(&state.db, &slug)
        .await?
        .ok_or_else(|| Error::ServiceNotFound { id: slug.clone() })?;
    let user_id = identity::user_id(&headers)?;

    let customer_type = params.customer_type.unwrap_or(CustomerType::General);
    let price = match pricing::resolve_service_price(&state.db, &found, customer_type).await {
        Ok(price) => Some(price),
        Err(e) if e.kind() == ErrorKind::PriceNotConfigured => None,
        Err(e) => return Err(e.into()),
    };

    let (user_rating, can_review) = match user_id {
        Some(user_id) => (
            rating::get_user_rating(&state.db, found.id, user_id).await?,
            rating::can_review(&state.db, found.id, user_id).await?,
        ),
        None => (None, false),
    };

    Ok(Json(ServiceDetailResponse {
        price_tiers: service::get_price_tiers(&state.db, found.id).await?,
        price,
        stats: rating::compute_stats(&state.db, found.id).await?,
        reviews: rating::list_reviews(&state.db, found.id).await?,
        user_rating,
        can_review,
        service: found,
    }))
}

/// Update a service and replace its price tiers. Requires an administrator.
pub async fn update_service(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(input): Json<ServiceInput>,
) -> Result<Json<service_entity::Model>, ApiError> {
    identity::require_admin(&headers)?;
    let service_id = parse_service_id(&id)?;
    Ok(Json(service::update_service(&state.db, service_id, input).await?))
}

/// Delete a service, or deactivate it when bookings reference it. Requires an
/// administrator.
pub async fn delete_service(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<DeleteServiceResponse>, ApiError> {
    identity::require_admin(&headers)?;
    let service_id = parse_service_id(&id)?;
    let outcome = service::delete_service(&state.db, service_id).await?;
    Ok(Json(DeleteServiceResponse { outcome }))
}

/// Check whether a date range is free.
pub async fn check_availability(
    State(state): State<AppState>,
    Query(params): Query<AvailabilityQuery>,
) -> Result<Json<Availability>, ApiError> {
    let result = availability::check_availability(
        &state.db,
        params.service_id,
        params.start_date,
        params.end_date,
    )
    .await?;
    Ok(Json(result))
}

/// Quote the price of a date range.
pub async fn quote_price(
    State(state): State<AppState>,
    Query(params): Query<PriceQuery>,
) -> Result<Json<PriceQuote>, ApiError> {
    let quote = pricing::quote_price(
        &state.db,
        params.service_id,
        params.customer_type,
        params.start_date,
        params.end_date,
    )
    .await?;
    Ok(Json(quote))
}
