//! Error responses for HTTP handlers.
//!
//! Domain errors are mapped onto status codes through [`ErrorKind`]. Clients get
//! a JSON body with a stable `code` and a message; persistence and internal
//! failures are logged in full and answered with a generic message.

use crate::errors::{Error, ErrorKind};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::fmt;

/// Error returned by every handler.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
    source: Option<Error>,
}

impl ApiError {
    /// Creates an error with an explicit status and code.
    #[must_use]
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            source: None,
        }
    }

    /// 400 for malformed identity headers and similar request problems.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    /// 401 when a route needs a signed-in user.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message)
    }

    /// 403 when a route needs an administrator.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, "FORBIDDEN", message)
    }

    /// HTTP status of this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Machine-readable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.code
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let (status, code) = match err.kind() {
            ErrorKind::Validation => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            ErrorKind::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ErrorKind::Conflict => (StatusCode::CONFLICT, "CONFLICT"),
            ErrorKind::PriceNotConfigured => {
                (StatusCode::UNPROCESSABLE_ENTITY, "PRICE_NOT_CONFIGURED")
            }
            ErrorKind::Persistence => (StatusCode::INTERNAL_SERVER_ERROR, "PERSISTENCE_ERROR"),
            ErrorKind::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_SERVER_ERROR"),
        };

        // Never echo storage details back to the client
        let message = if status.is_server_error() {
            "An internal error occurred".to_string()
        } else {
            err.to_string()
        };

        Self {
            status,
            code,
            message,
            source: Some(err),
        }
    }
}

/// Error response body (JSON).
#[derive(Debug, Serialize)]
struct ErrorResponse {
    code: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            match &self.source {
                Some(source) => tracing::error!(
                    status = %self.status,
                    code = self.code,
                    error = %source,
                    "Internal server error"
                ),
                None => tracing::error!(
                    status = %self.status,
                    code = self.code,
                    message = %self.message,
                    "Internal server error"
                ),
            }
        }

        let body = ErrorResponse {
            code: self.code,
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::DbErr;

    #[test]
    fn test_domain_errors_map_to_statuses() {
        let cases = [
            (
                Error::validation("end_date", "before start"),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (Error::BookingNotFound { id: 1 }, StatusCode::NOT_FOUND),
            (
                Error::AlreadyRated {
                    service_id: 1,
                    user_id: 2,
                },
                StatusCode::CONFLICT,
            ),
            (
                Error::PriceNotConfigured {
                    service_id: 1,
                    customer_type: "student".to_string(),
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                Error::Database(DbErr::Custom("disk full".to_string())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn test_persistence_details_are_hidden() {
        let err = ApiError::from(Error::Database(DbErr::Custom("table ratings locked".into())));
        assert_eq!(err.code(), "PERSISTENCE_ERROR");
        assert!(!err.to_string().contains("ratings"));
    }

    #[test]
    fn test_error_display() {
        let err = ApiError::forbidden("administrator required");
        assert_eq!(err.to_string(), "[FORBIDDEN] administrator required");
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
    }
}
