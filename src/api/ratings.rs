//! Rating endpoints, keyed by service and the signed-in user.
//!
//! - POST /services/:id/ratings - First rating; 409 when already rated
//! - PUT /services/:id/ratings - Create or replace
//! - PATCH /services/:id/ratings - Change an existing rating
//! - DELETE /services/:id/ratings - Remove the rating
//! - GET /services/:id/ratings/stats - Aggregated statistics

use super::{AppState, error::ApiError, identity};
use crate::{
    core::rating::{self, RatingInput, RatingStats},
    entities::rating as rating_entity,
};
use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
};

/// Rate a service for the first time.
pub async fn rate(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(service_id): Path<i64>,
    Json(input): Json<RatingInput>,
) -> Result<(StatusCode, Json<rating_entity::Model>), ApiError> {
    let user_id = identity::require_user(&headers)?;
    let created = rating::rate(&state.db, service_id, user_id, &input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Create or replace the caller's rating.
pub async fn store_rating(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(service_id): Path<i64>,
    Json(input): Json<RatingInput>,
) -> Result<Json<rating_entity::Model>, ApiError> {
    let user_id = identity::require_user(&headers)?;
    Ok(Json(
        rating::store_rating(&state.db, service_id, user_id, &input).await?,
    ))
}

/// Change the caller's existing rating.
pub async fn update_rating(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(service_id): Path<i64>,
    Json(input): Json<RatingInput>,
) -> Result<Json<rating_entity::Model>, ApiError> {
    let user_id = identity::require_user(&headers)?;
    Ok(Json(
        rating::update_rating(&state.db, service_id, user_id, &input).await?,
    ))
}

/// Remove the caller's rating.
pub async fn delete_rating(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(service_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let user_id = identity::require_user(&headers)?;
    rating::delete_rating(&state.db, service_id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Rating statistics of a service.
pub async fn rating_stats(
    State(state): State<AppState>,
    Path(service_id): Path<i64>,
) -> Result<Json<RatingStats>, ApiError> {
    Ok(Json(rating::compute_stats(&state.db, service_id).await?))
}
