//! Health check endpoint.

use super::AppState;
use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `"ok"` or `"degraded"`
    pub status: &'static str,
    /// Crate version
    pub version: &'static str,
    /// Whether the database answered a ping
    pub database: bool,
}

/// Liveness check; also reports whether the database is reachable.
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let database = state.db.ping().await.is_ok();
    let status = if database {
        StatusCode::OK
    } else {
        tracing::warn!("Health check could not reach the database");
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(HealthResponse {
            status: if database { "ok" } else { "degraded" },
            version: env!("CARGO_PKG_VERSION"),
            database,
        }),
    )
}
