// HTTP API Error Types
use axum::{extract::rejection::JsonRejection, http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::auth::JwtError;
use crate::database::manager::DatabaseError;
use crate::database::models::WaterfallTier;
use crate::waterfall::WaterfallError;

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),
    ValidationError {
        message: String,
        errors: Vec<String>,
    },
    InvalidJson(String),

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict
    Conflict(String),

    // 500 Internal Server Error
    InternalServerError(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),

    // Status of the failing step, plus what was written before it
    BatchAborted {
        source: Box<ApiError>,
        failed_index: usize,
        applied: Vec<WaterfallTier>,
    },
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::ValidationError { .. } => 400,
            ApiError::InvalidJson(_) => 400,
            ApiError::Unauthorized(_) => 401,
            ApiError::Forbidden(_) => 403,
            ApiError::NotFound(_) => 404,
            ApiError::Conflict(_) => 409,
            ApiError::InternalServerError(_) => 500,
            ApiError::ServiceUnavailable(_) => 503,
            ApiError::BatchAborted { source, .. } => source.status_code(),
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::ValidationError { message, .. } => message,
            ApiError::InvalidJson(msg) => msg,
            ApiError::Unauthorized(msg) => msg,
            ApiError::Forbidden(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::Conflict(msg) => msg,
            ApiError::InternalServerError(msg) => msg,
            ApiError::ServiceUnavailable(msg) => msg,
            ApiError::BatchAborted { source, .. } => source.message(),
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::ValidationError { .. } => "VALIDATION_ERROR",
            ApiError::InvalidJson(_) => "INVALID_JSON",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            ApiError::BatchAborted { source, .. } => source.error_code(),
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        match self {
            ApiError::ValidationError { message, errors } => json!({
                "success": false,
                "error": true,
                "message": message,
                "code": self.error_code(),
                "errors": errors
            }),
            ApiError::BatchAborted {
                source,
                failed_index,
                applied,
            } => {
                let mut response = source.to_json();
                response["failedIndex"] = json!(failed_index);
                response["applied"] = json!(applied);
                response
            }
            _ => json!({
                "success": false,
                "error": true,
                "message": self.message(),
                "code": self.error_code()
            }),
        }
    }
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn validation_error(message: impl Into<String>, errors: Vec<String>) -> Self {
        ApiError::ValidationError {
            message: message.into(),
            errors,
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound(msg) => ApiError::not_found(msg),
            DatabaseError::CheckViolation(msg) => ApiError::bad_request(msg),
            DatabaseError::UniqueViolation(msg) => ApiError::Conflict(msg),
            DatabaseError::ConnectionError(msg) => {
                tracing::error!("Database connection error: {}", msg);
                ApiError::service_unavailable("Database temporarily unavailable")
            }
            DatabaseError::Sqlx(sqlx::Error::PoolTimedOut) | DatabaseError::Sqlx(sqlx::Error::PoolClosed) => {
                ApiError::service_unavailable("Database temporarily unavailable")
            }
            other => {
                // Don't expose internal SQL errors to clients
                tracing::error!("Database error: {}", other);
                ApiError::internal_server_error("An error occurred while processing your request")
            }
        }
    }
}

impl From<WaterfallError> for ApiError {
    fn from(err: WaterfallError) -> Self {
        match err {
            WaterfallError::Validation(errors) => {
                ApiError::validation_error("Invalid waterfall tier", errors)
            }
            WaterfallError::TiersAlreadyExist(_) => ApiError::Conflict(err.to_string()),
            WaterfallError::TierNotFound(_) => ApiError::not_found(err.to_string()),
            WaterfallError::MissingField(field) => ApiError::bad_request(field),
            WaterfallError::InvalidInput(msg) => ApiError::bad_request(msg),
            WaterfallError::Store { context, source } => {
                let mapped = ApiError::from(source);
                match mapped {
                    ApiError::InternalServerError(_) => ApiError::internal_server_error(context),
                    other => other,
                }
            }
            WaterfallError::BatchAborted {
                index,
                applied,
                source,
            } => ApiError::BatchAborted {
                source: Box::new(ApiError::from(*source)),
                failed_index: index,
                applied,
            },
        }
    }
}

impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::InvalidSecret => {
                tracing::error!("JWT secret not configured");
                ApiError::internal_server_error("Authentication is not configured")
            }
            other => ApiError::unauthorized(other.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidJson(rejection.body_text())
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}
