//! Payment gateway port for the external card processor.
//!
//! Defines the contract for synchronous processor calls: create charge,
//! create subscription, refund, cancel. The processor's authoritative
//! state changes arrive later through webhooks; these calls only start
//! work and report the immediate status.
//!
//! # Design
//!
//! - **Gateway agnostic**: the interface encodes no provider specifics
//! - **No retry/backoff**: a timeout surfaces immediately to the caller;
//!   how the failure propagates is the command handler's decision

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::Money;

/// Port for the external payment processor.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Creates a charge. Returns the processor's reference and the
    /// immediate status; completion may arrive later via webhook.
    async fn create_charge(&self, request: ChargeRequest) -> Result<GatewayCharge, GatewayError>;

    /// Creates a processor-side subscription.
    async fn create_subscription(
        &self,
        request: SubscriptionRequest,
    ) -> Result<GatewaySubscription, GatewayError>;

    /// Refunds a charge, fully when `amount` is `None`.
    async fn refund(&self, request: RefundRequest) -> Result<GatewayRefund, GatewayError>;

    /// Cancels a processor-side subscription.
    async fn cancel_subscription(&self, subscription_ref: &str) -> Result<(), GatewayError>;
}

/// Request to create a charge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChargeRequest {
    /// Amount and currency to charge.
    pub amount: Money,

    /// Stored instrument reference at the processor, if any.
    pub method_ref: Option<String>,

    /// Free-form correlation metadata (local payment id, user id).
    pub metadata: HashMap<String, String>,
}

/// Immediate result of a charge request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayCharge {
    /// The processor's charge/intent reference.
    pub id: String,

    /// Immediate status of the charge.
    pub status: GatewayChargeStatus,
}

/// Immediate charge status reported by the processor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayChargeStatus {
    /// Settled synchronously.
    Succeeded,

    /// The payer must complete an out-of-band step; the webhook
    /// finishes the transition.
    RequiresAction,

    /// Anything else the processor reports.
    Other(String),
}

/// Request to create a processor-side subscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionRequest {
    /// The processor's customer reference.
    pub customer_ref: String,

    /// The processor's plan/price reference.
    pub plan_ref: String,

    /// Stored instrument reference, if any.
    pub method_ref: Option<String>,

    /// Free-form correlation metadata.
    pub metadata: HashMap<String, String>,
}

/// Result of a subscription creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewaySubscription {
    /// The processor's subscription reference.
    pub id: String,

    /// The processor's subscription status string (e.g. "active",
    /// "trialing").
    pub status: String,

    /// End of the first billing period (Unix seconds).
    pub current_period_end: i64,
}

/// Request to refund a charge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundRequest {
    /// The processor's charge/intent reference.
    pub charge_ref: String,

    /// Amount to refund; `None` refunds the full charge.
    pub amount: Option<Money>,
}

/// Result of a refund.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayRefund {
    /// The processor's refund reference.
    pub id: String,
}

/// Errors from gateway operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayError {
    /// Error code for categorization.
    pub code: GatewayErrorCode,

    /// Human-readable message.
    pub message: String,

    /// The processor's own error code, when available.
    pub provider_code: Option<String>,

    /// Whether the operation can be retried.
    pub retryable: bool,
}

impl GatewayError {
    /// Creates a new gateway error.
    pub fn new(code: GatewayErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider_code: None,
            retryable: code.is_retryable(),
        }
    }

    /// Attaches the processor's error code.
    pub fn with_provider_code(mut self, code: impl Into<String>) -> Self {
        self.provider_code = Some(code.into());
        self
    }

    /// Creates a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::NetworkError, message)
    }

    /// Creates a card declined error.
    pub fn card_declined(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::CardDeclined, message)
    }

    /// Creates a not found error.
    pub fn not_found(resource: &str) -> Self {
        Self::new(GatewayErrorCode::NotFound, format!("{} not found", resource))
    }

    /// Creates a provider error.
    pub fn provider(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::ProviderError, message)
    }
}

impl std::fmt::Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for GatewayError {}

/// Gateway error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayErrorCode {
    /// Network connectivity issue.
    NetworkError,

    /// API authentication failed.
    AuthenticationError,

    /// Card was declined.
    CardDeclined,

    /// Insufficient funds.
    InsufficientFunds,

    /// Resource not found at the processor.
    NotFound,

    /// Rate limit exceeded.
    RateLimitExceeded,

    /// Processor API error.
    ProviderError,

    /// Unknown error.
    Unknown,
}

impl GatewayErrorCode {
    /// Check if this error type is typically retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GatewayErrorCode::NetworkError | GatewayErrorCode::RateLimitExceeded
        )
    }
}

impl std::fmt::Display for GatewayErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            GatewayErrorCode::NetworkError => "network_error",
            GatewayErrorCode::AuthenticationError => "authentication_error",
            GatewayErrorCode::CardDeclined => "card_declined",
            GatewayErrorCode::InsufficientFunds => "insufficient_funds",
            GatewayErrorCode::NotFound => "not_found",
            GatewayErrorCode::RateLimitExceeded => "rate_limit_exceeded",
            GatewayErrorCode::ProviderError => "provider_error",
            GatewayErrorCode::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

impl GatewayChargeStatus {
    /// Parses the processor's status string.
    pub fn from_wire(s: &str) -> Self {
        match s {
            "succeeded" => Self::Succeeded,
            "requires_action" => Self::RequiresAction,
            other => Self::Other(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_gateway_is_object_safe() {
        fn _accepts_dyn(_gateway: &dyn PaymentGateway) {}
    }

    #[test]
    fn gateway_error_retryability() {
        assert!(GatewayErrorCode::NetworkError.is_retryable());
        assert!(GatewayErrorCode::RateLimitExceeded.is_retryable());
        assert!(!GatewayErrorCode::CardDeclined.is_retryable());
        assert!(!GatewayErrorCode::NotFound.is_retryable());
    }

    #[test]
    fn gateway_error_display_includes_code_and_message() {
        let err = GatewayError::card_declined("Your card was declined");
        let s = err.to_string();
        assert!(s.contains("card_declined"));
        assert!(s.contains("Your card was declined"));
    }

    #[test]
    fn charge_status_parses_wire_strings() {
        assert_eq!(
            GatewayChargeStatus::from_wire("succeeded"),
            GatewayChargeStatus::Succeeded
        );
        assert_eq!(
            GatewayChargeStatus::from_wire("requires_action"),
            GatewayChargeStatus::RequiresAction
        );
        assert_eq!(
            GatewayChargeStatus::from_wire("processing"),
            GatewayChargeStatus::Other("processing".to_string())
        );
    }
}
