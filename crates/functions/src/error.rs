//! Unified error handling with Sentry integration.
//!
//! Every handler returns `Result<T, AppError>`. Server-side errors are captured
//! to Sentry and logged before responding; their bodies never carry details.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use order_desk_core::ContinuationTokenError;

use crate::queue::QueueError;
use crate::services::{OrderError, PasswordError};
use crate::store::StoreError;
use crate::validation::ValidationErrors;

/// Application-level error type for the functions.
#[derive(Debug, Error)]
pub enum AppError {
    /// One or more request fields failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    /// Bad request from client.
    #[error("{0}")]
    BadRequest(String),

    /// Function key missing or wrong.
    #[error("Unauthorized")]
    Unauthorized,

    /// Resource not found.
    #[error("{0}")]
    NotFound(String),

    /// Entity store operation failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Queue operation failed.
    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    /// Order placement failed.
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// Password hashing failed.
    #[error("Password error: {0}")]
    Password(#[from] PasswordError),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Store(_)
            | Self::Queue(_)
            | Self::Order(_)
            | Self::Password(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        match self {
            Self::Validation(errors) => (status, Json(errors)).into_response(),
            // Don't expose internal error details to clients
            _ if status.is_server_error() => (status, "Internal server error").into_response(),
            other => (status, other.to_string()).into_response(),
        }
    }
}

impl From<ContinuationTokenError> for AppError {
    fn from(err: ContinuationTokenError) -> Self {
        Self::BadRequest(format!("Invalid continuation token: {err}"))
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
