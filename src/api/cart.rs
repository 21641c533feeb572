//! Cart endpoints.
//!
//! - GET /cart - List the caller's cart
//! - POST /cart - Add or replace a service selection
//! - DELETE /cart/:id - Remove one selection
//! - POST /cart/checkout - Book everything in the cart
//! - POST /cart/merge - Move the anonymous cart to the signed-in user
//!
//! Anonymous callers without a cart token get a fresh one in the
//! `x-cart-session` response header.

use super::{
    AppState,
    error::ApiError,
    identity::{self, CART_SESSION_HEADER},
};
use crate::{
    core::cart::{self, CartItemInput, ResolvedOwner},
    entities::cart as cart_entity,
    errors::Error,
};
use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// The caller's cart.
#[derive(Debug, Serialize)]
pub struct CartResponse {
    /// Cart rows in the order they were added
    pub items: Vec<cart_entity::Model>,
    /// Number of rows
    pub count: u64,
}

/// Response after merging a session cart.
#[derive(Debug, Serialize)]
pub struct MergeResponse {
    /// Rows moved to the user
    pub moved: u64,
}

fn resolve(headers: &HeaderMap) -> Result<ResolvedOwner, ApiError> {
    Ok(cart::resolve_cart_owner(&identity::visitor(headers)?))
}

/// Serializes `body`, attaching the cart token when one was just issued.
fn respond<T: Serialize>(
    status: StatusCode,
    issued_token: Option<String>,
    body: T,
) -> Result<Response, ApiError> {
    let mut response = (status, Json(body)).into_response();
    if let Some(token) = issued_token {
        let value = HeaderValue::from_str(&token)
            .map_err(|_| ApiError::bad_request("cart token is not a valid header value"))?;
        response.headers_mut().insert(CART_SESSION_HEADER, value);
    }
    Ok(response)
}

/// List the caller's cart.
pub async fn get_cart(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let resolved = resolve(&headers)?;
    let items = cart::list_cart_items(&state.db, &resolved.owner).await?;
    let count = cart::count_cart_items(&state.db, &resolved.owner).await?;
    respond(StatusCode::OK, resolved.issued_token, CartResponse { items, count })
}

/// Add a service selection to the caller's cart.
pub async fn add_to_cart(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<CartItemInput>,
) -> Result<Response, ApiError> {
    let resolved = resolve(&headers)?;
    let saved = cart::add_to_cart(&state.db, &resolved.owner, &input).await?;
    respond(StatusCode::CREATED, resolved.issued_token, saved)
}

/// Remove one of the caller's cart rows.
pub async fn remove_cart_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(cart_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let resolved = resolve(&headers)?;
    cart::remove_cart_item(&state.db, &resolved.owner, cart_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Book everything in the caller's cart.
pub async fn checkout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let resolved = resolve(&headers)?;
    let details = cart::checkout_cart(&state.db, &state.invoices, &resolved.owner).await?;
    respond(StatusCode::CREATED, resolved.issued_token, details)
}

/// Move the anonymous cart named by `x-cart-session` to the signed-in user.
pub async fn merge(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<MergeResponse>, ApiError> {
    let ctx = identity::visitor(&headers)?;
    let user_id = identity::require_user(&headers)?;
    let token = ctx
        .session_token
        .ok_or_else(|| Error::validation(CART_SESSION_HEADER, "cart token is required"))?;

    let moved = cart::merge_session_cart(&state.db, &token, user_id).await?;
    Ok(Json(MergeResponse { moved }))
}
