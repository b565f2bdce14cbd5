//! API error types with IntoResponse
//!
//! Every failure leaves the service as `{success: false, message, error_code,
//! details?}` with the status from the table below.
//!
//! | variant        | status | error_code         |
//! |----------------|--------|--------------------|
//! | `Connection`   | 503    | `connection_error` |
//! | `PoolClosed`   | 503    | `pool_closed`      |
//! | `Validation`   | 422    | `validation_error` |
//! | `NotFound`     | 404    | `not_found`        |
//! | `Unauthorized` | 401    | `unauthorized`     |
//! | `Forbidden`    | 403    | `forbidden`        |
//! | `Conflict`     | 409    | `conflict`         |
//! | `Internal`     | 500    | `internal_error`   |

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use paddybot_core::security::HashError;
use serde_json::json;

use crate::db::DbError;
use crate::models::ValidationError;
use crate::serializers::ErrorResponse;

/// API error type with automatic HTTP status mapping
#[derive(Debug)]
pub enum ApiError {
    /// Backing store unreachable or not started (503, logged)
    Connection { message: String },

    /// Shutdown has begun (503)
    PoolClosed,

    /// Field-level validation failed (422)
    Validation(ValidationError),

    /// Body could not be decoded (422)
    MalformedBody { message: String },

    NotFound { resource: &'static str, id: String },

    Unauthorized { reason: String },

    Forbidden { reason: String },

    /// Unique value already taken (409)
    Conflict { field: &'static str },

    /// Anything else (500, logged)
    Internal { message: String },
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Connection { .. } | Self::PoolClosed => StatusCode::SERVICE_UNAVAILABLE,
            Self::Validation(_) | Self::MalformedBody { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Self::Forbidden { .. } => StatusCode::FORBIDDEN,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Connection { .. } => "connection_error",
            Self::PoolClosed => "pool_closed",
            Self::Validation(_) | Self::MalformedBody { .. } => "validation_error",
            Self::NotFound { .. } => "not_found",
            Self::Unauthorized { .. } => "unauthorized",
            Self::Forbidden { .. } => "forbidden",
            Self::Conflict { .. } => "conflict",
            Self::Internal { .. } => "internal_error",
        }
    }

    fn body(&self) -> ErrorResponse {
        let code = self.error_code();
        match self {
            Self::Connection { message } => {
                // Log the actual error, return generic message
                tracing::error!("Connection error: {}", message);
                ErrorResponse::new("service temporarily unavailable", code)
            }
            Self::PoolClosed => ErrorResponse::new("service is shutting down", code),
            Self::Validation(e) => {
                let mut details = json!({ "field": e.field(), "rule": e.rule() });
                if let Some(limit) = e.limit() {
                    details["limit"] = json!(limit);
                }
                ErrorResponse::new(e.to_string(), code).with_details(details)
            }
            Self::MalformedBody { message } => ErrorResponse::new(message.clone(), code),
            Self::NotFound { resource, id } => {
                ErrorResponse::new(format!("{} '{}' not found", resource, id), code)
            }
            Self::Unauthorized { reason } | Self::Forbidden { reason } => {
                ErrorResponse::new(reason.clone(), code)
            }
            Self::Conflict { field } => ErrorResponse::new(format!("{} already exists", field), code)
                .with_details(json!({ "field": field })),
            Self::Internal { message } => {
                tracing::error!("Internal error: {}", message);
                ErrorResponse::new("an internal error occurred", code)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e)
    }
}

impl From<DbError> for ApiError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::NotFound { resource, id } => Self::NotFound { resource, id },
            DbError::Conflict { field } => Self::Conflict { field },
            DbError::PoolClosed => Self::PoolClosed,
            DbError::NotInitialized | DbError::Connection(_) => Self::Connection {
                message: e.to_string(),
            },
            DbError::Config(_) | DbError::SessionFinished | DbError::Sqlx(_) => Self::Internal {
                message: e.to_string(),
            },
        }
    }
}

impl From<HashError> for ApiError {
    fn from(e: HashError) -> Self {
        Self::Internal {
            message: e.to_string(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        Self::MalformedBody {
            message: e.body_text(),
        }
    }
}
