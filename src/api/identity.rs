//! Caller identity taken from request headers.
//!
//! Authentication happens in front of this service; it forwards the signed-in
//! user and administrator ids as headers, plus the anonymous cart token.

use super::error::ApiError;
use crate::core::cart::VisitorContext;
use axum::http::HeaderMap;

/// Signed-in customer id
pub const USER_HEADER: &str = "x-user-id";
/// Signed-in administrator id
pub const ADMIN_HEADER: &str = "x-admin-id";
/// Anonymous cart token, echoed back when a new one is issued
pub const CART_SESSION_HEADER: &str = "x-cart-session";

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Result<Option<&'a str>, ApiError> {
    headers
        .get(name)
        .map(|value| {
            value
                .to_str()
                .map(str::trim)
                .map_err(|_| ApiError::bad_request(format!("{name} must be visible ASCII")))
        })
        .transpose()
        .map(|v| v.filter(|s| !s.is_empty()))
}

fn header_id(headers: &HeaderMap, name: &str) -> Result<Option<i64>, ApiError> {
    header_str(headers, name)?
        .map(|raw| {
            raw.parse::<i64>()
                .map_err(|_| ApiError::bad_request(format!("{name} must be an integer id")))
        })
        .transpose()
}

/// The signed-in user, if any.
pub fn user_id(headers: &HeaderMap) -> Result<Option<i64>, ApiError> {
    header_id(headers, USER_HEADER)
}

/// The signed-in administrator, if any.
pub fn admin_id(headers: &HeaderMap) -> Result<Option<i64>, ApiError> {
    header_id(headers, ADMIN_HEADER)
}

/// The signed-in user, or 401.
pub fn require_user(headers: &HeaderMap) -> Result<i64, ApiError> {
    user_id(headers)?.ok_or_else(|| ApiError::unauthorized("sign in required"))
}

/// The signed-in administrator, or 403.
pub fn require_admin(headers: &HeaderMap) -> Result<i64, ApiError> {
    admin_id(headers)?.ok_or_else(|| ApiError::forbidden("administrator required"))
}

/// Everything the cart needs to know about the caller.
pub fn visitor(headers: &HeaderMap) -> Result<VisitorContext, ApiError> {
    Ok(VisitorContext {
        user_id: user_id(headers)?,
        session_token: header_str(headers, CART_SESSION_HEADER)?.map(str::to_string),
    })
}
