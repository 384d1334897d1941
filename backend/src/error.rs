//! Error handling for ConServ
//!
//! Every API error is rendered as `{"ok": false, "error": ..., "code": ...}`.
//! Internal details are logged server-side and never sent to the client.

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication errors
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Staff access required")]
    StaffOnly,

    // Validation errors
    #[error("Validation error: {message}")]
    Validation { field: String, message: String },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid JSON: {0}")]
    InvalidJson(#[from] JsonRejection),

    #[error("Invalid query: {0}")]
    InvalidQuery(#[from] QueryRejection),

    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Degraded dependencies
    #[error("Prices unavailable: {0}")]
    PricesUnavailable(String),

    #[error("AI service not configured")]
    AiNotConfigured,

    #[error("AI extraction failed: {0}")]
    AiExtraction(String),

    #[error("Payment gateway error: {0}")]
    PaymentGateway(String),

    #[error("Maps service error: {0}")]
    MapsService(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

impl AppError {
    /// Shorthand for a field-level validation failure
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        AppError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub ok: bool,
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ErrorResponse {
    pub fn new(code: &str, error: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: error.into(),
            code: code.to_string(),
            field: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                ErrorResponse::new("INVALID_CREDENTIALS", "Invalid email or password."),
            ),
            AppError::TokenExpired => (
                StatusCode::UNAUTHORIZED,
                ErrorResponse::new("TOKEN_EXPIRED", "Your session has expired. Please log in again."),
            ),
            AppError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                ErrorResponse::new("INVALID_TOKEN", "Please log in to continue."),
            ),
            AppError::StaffOnly => (
                StatusCode::FORBIDDEN,
                ErrorResponse::new("STAFF_ONLY", "Staff access required."),
            ),
            AppError::Validation { field, message } => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    field: Some(field.clone()),
                    ..ErrorResponse::new("VALIDATION_ERROR", message.clone())
                },
            ),
            AppError::ValidationError(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new("VALIDATION_ERROR", msg.clone()),
            ),
            AppError::InvalidJson(rejection) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new("INVALID_JSON", format!("Invalid JSON: {}", rejection.body_text())),
            ),
            AppError::InvalidQuery(rejection) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new("INVALID_QUERY", rejection.body_text()),
            ),
            AppError::DuplicateEntry(field) => (
                StatusCode::CONFLICT,
                ErrorResponse {
                    field: Some(field.clone()),
                    ..ErrorResponse::new(
                        "DUPLICATE_ENTRY",
                        format!("That {} is already in use.", field),
                    )
                },
            ),
            AppError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                ErrorResponse::new("NOT_FOUND", format!("{} not found", resource)),
            ),
            AppError::PricesUnavailable(reason) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::new("PRICES_UNAVAILABLE", reason.clone()),
            ),
            AppError::AiNotConfigured => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::new("AI_NOT_CONFIGURED", "OPENAI_API_KEY is not set"),
            ),
            AppError::AiExtraction(msg) => (
                StatusCode::BAD_GATEWAY,
                ErrorResponse::new("AI_EXTRACTION_FAILED", msg.clone()),
            ),
            AppError::PaymentGateway(_) => (
                StatusCode::BAD_GATEWAY,
                ErrorResponse::new(
                    "PAYMENT_GATEWAY_ERROR",
                    "The payment gateway could not start checkout.",
                ),
            ),
            AppError::MapsService(_) => (
                StatusCode::BAD_GATEWAY,
                ErrorResponse::new("MAPS_SERVICE_ERROR", "Could not compute distance"),
            ),
            AppError::StorageError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::new("STORAGE_ERROR", "Could not store the uploaded file."),
            ),
            AppError::Configuration(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::new("CONFIGURATION_ERROR", "Server error"),
            ),
            AppError::DatabaseError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::new("DATABASE_ERROR", "Server error"),
            ),
            AppError::Internal(_) | AppError::InternalError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::new("INTERNAL_ERROR", "Server error"),
            ),
        };

        if status.is_server_error() {
            tracing::error!("Error: {:?}", self);
        } else {
            tracing::debug!("Request rejected: {}", self);
        }

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;
