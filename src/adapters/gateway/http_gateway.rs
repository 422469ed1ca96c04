//! HTTP payment gateway adapter.
//!
//! Implements `PaymentGateway` against the processor's REST API.
//!
//! # Security
//!
//! - API key held as `secrecy::SecretString`, sent as a bearer token
//! - no retry/backoff: a timeout surfaces immediately as a
//!   `NetworkError` and the command handler decides how it propagates

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::ports::{
    ChargeRequest, GatewayCharge, GatewayChargeStatus, GatewayError, GatewayErrorCode,
    GatewayRefund, GatewaySubscription, PaymentGateway, RefundRequest, SubscriptionRequest,
};

/// Gateway API configuration.
#[derive(Clone)]
pub struct GatewayConfig {
    /// Secret API key (sk_live_... or sk_test_...).
    api_key: SecretString,

    /// Base URL for the processor API.
    api_base_url: String,
}

impl GatewayConfig {
    /// Creates a new gateway configuration.
    pub fn new(api_key: impl Into<String>, api_base_url: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::new(api_key.into()),
            api_base_url: api_base_url.into(),
        }
    }
}

/// HTTP gateway adapter.
pub struct HttpPaymentGateway {
    config: GatewayConfig,
    http_client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct WireCharge {
    id: String,
    status: String,
}

#[derive(Debug, Deserialize)]
struct WireSubscription {
    id: String,
    status: String,
    current_period_end: i64,
}

#[derive(Debug, Deserialize)]
struct WireRefund {
    id: String,
}

#[derive(Debug, Deserialize)]
struct WireError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    code: Option<String>,
}

impl HttpPaymentGateway {
    /// Creates a new adapter with the given configuration.
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base_url, path)
    }

    async fn post<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &impl serde::Serialize,
    ) -> Result<T, GatewayError> {
        let response = self
            .http_client
            .post(self.url(path))
            .bearer_auth(self.config.api_key.expose_secret())
            .json(body)
            .send()
            .await
            .map_err(|e| GatewayError::network(e.to_string()))?;

        Self::decode(response).await
    }

    async fn decode<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, GatewayError> {
        let status = response.status();
        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|e| GatewayError::provider(format!("malformed response: {}", e)));
        }

        let wire: WireError = response.json().await.unwrap_or(WireError {
            message: format!("HTTP {}", status),
            code: None,
        });

        let code = match status.as_u16() {
            401 | 403 => GatewayErrorCode::AuthenticationError,
            402 => match wire.code.as_deref() {
                Some("insufficient_funds") => GatewayErrorCode::InsufficientFunds,
                _ => GatewayErrorCode::CardDeclined,
            },
            404 => GatewayErrorCode::NotFound,
            429 => GatewayErrorCode::RateLimitExceeded,
            500..=599 => GatewayErrorCode::ProviderError,
            _ => GatewayErrorCode::Unknown,
        };

        let mut err = GatewayError::new(code, wire.message);
        if let Some(provider_code) = wire.code {
            err = err.with_provider_code(provider_code);
        }
        Err(err)
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn create_charge(&self, request: ChargeRequest) -> Result<GatewayCharge, GatewayError> {
        let body = serde_json::json!({
            "amount": request.amount.amount().to_string(),
            "currency": request.amount.currency().as_str(),
            "payment_method": request.method_ref,
            "metadata": request.metadata,
        });

        let wire: WireCharge = self.post("/v1/charges", &body).await?;
        tracing::debug!(charge_id = %wire.id, status = %wire.status, "Gateway charge created");

        Ok(GatewayCharge {
            status: GatewayChargeStatus::from_wire(&wire.status),
            id: wire.id,
        })
    }

    async fn create_subscription(
        &self,
        request: SubscriptionRequest,
    ) -> Result<GatewaySubscription, GatewayError> {
        let body = serde_json::json!({
            "customer": request.customer_ref,
            "plan": request.plan_ref,
            "payment_method": request.method_ref,
            "metadata": request.metadata,
        });

        let wire: WireSubscription = self.post("/v1/subscriptions", &body).await?;
        tracing::debug!(
            subscription_id = %wire.id,
            status = %wire.status,
            "Gateway subscription created"
        );

        Ok(GatewaySubscription {
            id: wire.id,
            status: wire.status,
            current_period_end: wire.current_period_end,
        })
    }

    async fn refund(&self, request: RefundRequest) -> Result<GatewayRefund, GatewayError> {
        let body = serde_json::json!({
            "charge": request.charge_ref,
            "amount": request.amount.as_ref().map(|a| a.amount().to_string()),
            "currency": request.amount.as_ref().map(|a| a.currency().as_str()),
        });

        let wire: WireRefund = self.post("/v1/refunds", &body).await?;
        tracing::debug!(refund_id = %wire.id, "Gateway refund created");

        Ok(GatewayRefund { id: wire.id })
    }

    async fn cancel_subscription(&self, subscription_ref: &str) -> Result<(), GatewayError> {
        let response = self
            .http_client
            .delete(self.url(&format!("/v1/subscriptions/{}", subscription_ref)))
            .bearer_auth(self.config.api_key.expose_secret())
            .send()
            .await
            .map_err(|e| GatewayError::network(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Self::decode::<serde_json::Value>(response).await.map(|_| ())
        }
    }
}
