//! Error types for the API layer
//!
//! Typed errors from the core, engine and protocol layers are mapped to
//! HTTP status codes here: parse and validation failures become 400s,
//! missing resources 404s, state conflicts 409s. All errors serialize as
//! a JSON body with a code and a message.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::eval::ProtocolError;
use vigil_core::{StorageError, ValidationError};

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Request body or query string is invalid
    InvalidInput,
    /// Requested resource does not exist
    NotFound,
    /// Request conflicts with resource state
    Conflict,
    /// Unexpected server-side failure
    Internal,
}

impl ErrorCode {
    fn status(self) -> StatusCode {
        match self {
            ErrorCode::InvalidInput => StatusCode::BAD_REQUEST,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::Conflict => StatusCode::CONFLICT,
            ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Structured API error.
#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::InvalidInput,
            message: message.into(),
        }
    }

    pub fn missing_field(field: &str) -> Self {
        Self::bad_request(format!("required field missing: {}", field))
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::NotFound,
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::Conflict,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::Internal,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.code.status(), Json(self)).into_response()
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match &err {
            StorageError::NotFound { .. } => Self::not_found(err.to_string()),
            StorageError::StillReferenced { .. } => Self::conflict(err.to_string()),
            StorageError::LockPoisoned => Self::internal(err.to_string()),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self::bad_request(err.to_string())
    }
}

impl From<ProtocolError> for ApiError {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::Storage(e) => e.into(),
            ProtocolError::Validation(e) => e.into(),
            ProtocolError::Condition(e) => Self::bad_request(e.to_string()),
            ProtocolError::MeasurementDeactivated => {
                Self::conflict("measurement is not in activated state")
            }
            ProtocolError::BadRequest(message) => Self::bad_request(message),
        }
    }
}
