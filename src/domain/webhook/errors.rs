//! Webhook error types.
//!
//! Error conditions during webhook processing, with HTTP status mapping
//! and retryability semantics. The status code drives the processor's
//! retry behavior: 2xx acknowledges, 4xx rejects permanently, 5xx
//! triggers redelivery.

use axum::http::StatusCode;
use thiserror::Error;

/// Errors that occur during webhook processing.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Signature verification failed.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Failed to parse the webhook payload or signature header.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Required field missing from the webhook payload.
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// Attempted state transition is not valid.
    #[error("Invalid state transition: {0}")]
    InvalidTransition(String),

    /// Event was intentionally skipped (not an error condition).
    #[error("Event ignored: {0}")]
    Ignored(String),

    /// Persistence failed; the processor should redeliver.
    #[error("Database error: {0}")]
    Database(String),
}

impl WebhookError {
    /// Returns true if the processor should retry delivering this event.
    pub fn is_retryable(&self) -> bool {
        matches!(self, WebhookError::Database(_))
    }

    /// Maps the error to the HTTP status answered to the processor.
    pub fn status_code(&self) -> StatusCode {
        match self {
            // Authentication and malformed input - reject, no retry
            WebhookError::InvalidSignature
            | WebhookError::ParseError(_)
            | WebhookError::MissingField(_) => StatusCode::BAD_REQUEST,

            // Benign skips - acknowledge
            WebhookError::Ignored(_) => StatusCode::OK,

            // Processing failures - server error, processor retries
            WebhookError::InvalidTransition(_) | WebhookError::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<crate::domain::foundation::DomainError> for WebhookError {
    fn from(err: crate::domain::foundation::DomainError) -> Self {
        use crate::domain::foundation::ErrorCode;
        match err.code {
            ErrorCode::InvalidStateTransition => WebhookError::InvalidTransition(err.message),
            ErrorCode::DatabaseError => WebhookError::Database(err.message),
            _ => WebhookError::Database(err.to_string()),
        }
    }
}
