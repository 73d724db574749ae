//! API error handling
//!
//! Every failure leaves the service as `{code, message, details?}`.
//! Infrastructure failures are logged here and reach the client as a generic
//! 500 without details.
//!
//! Author: hephaex@gmail.com

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use erp_core::ErpError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use utoipa::ToSchema;
use validator::ValidationErrors;

/// API error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// Error code
    pub code: String,
    /// Human-readable message
    pub message: String,
    /// Additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub details: Option<Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Option<Value>) -> Self {
        self.details = details;
        self
    }
}

/// Application error type
#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed request input
    #[error("{message}")]
    Validation {
        message: String,
        details: Option<Value>,
    },

    /// Uniqueness violation (username, email, role name)
    #[error("{0}")]
    Conflict(String),

    /// Business-rule guard refused the operation
    #[error("{0}")]
    Invariant(String),

    /// Login failed; the cause is deliberately not disclosed
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("{0}")]
    Unauthenticated(String),

    #[error("{message}")]
    Forbidden { message: String, details: Value },

    #[error("{0} not found")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation {
            message: message.into(),
            details: None,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } | AppError::Conflict(_) | AppError::Invariant(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::InvalidCredentials | AppError::Unauthenticated(_) => {
                StatusCode::UNAUTHORIZED
            }
            AppError::Forbidden { .. } => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = match self {
            AppError::Validation { message, details } => {
                ApiError::new("VALIDATION_ERROR", message).with_details(details)
            }
            AppError::Conflict(msg) => ApiError::new("CONFLICT", msg),
            AppError::Invariant(msg) => ApiError::new("INVARIANT_VIOLATION", msg),
            AppError::InvalidCredentials => {
                ApiError::new("INVALID_CREDENTIALS", "Invalid credentials")
            }
            AppError::Unauthenticated(msg) => ApiError::new("UNAUTHORIZED", msg),
            AppError::Forbidden { message, details } => {
                ApiError::new("FORBIDDEN", message).with_details(Some(details))
            }
            AppError::NotFound(resource) => {
                ApiError::new("NOT_FOUND", format!("{resource} not found"))
            }
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                ApiError::new("INTERNAL_ERROR", "Internal server error")
            }
        };

        (status, Json(error)).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<ErpError> for AppError {
    fn from(err: ErpError) -> Self {
        match err {
            ErpError::NotFound(what) => AppError::NotFound(what),
            ErpError::Conflict(msg) => AppError::Conflict(msg),
            ErpError::ValidationError(msg) => AppError::validation(msg),
            ErpError::InvariantViolation(msg) => AppError::Invariant(msg),
            ErpError::DatabaseError(msg) => AppError::Internal(format!("Database error: {msg}")),
            ErpError::ConfigError(msg) => {
                AppError::Internal(format!("Configuration error: {msg}"))
            }
            ErpError::Other(err) => AppError::Internal(err.to_string()),
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        AppError::Validation {
            message: "Validation failed".to_string(),
            details: serde_json::to_value(&errors).ok(),
        }
    }
}
