//! Payment gateway configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Payment gateway configuration (external card processor)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GatewaySettings {
    /// Gateway API key
    pub api_key: String,

    /// Webhook signing secret shared with the processor
    pub webhook_secret: String,

    /// Base URL for the processor API
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
}

impl GatewaySettings {
    /// Check if using the processor's test mode
    pub fn is_test_mode(&self) -> bool {
        self.api_key.starts_with("sk_test_")
    }

    /// Validate gateway configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.api_key.is_empty() {
            return Err(ValidationError::MissingRequired("GATEWAY_API_KEY"));
        }
        if self.webhook_secret.is_empty() {
            return Err(ValidationError::MissingRequired("GATEWAY_WEBHOOK_SECRET"));
        }

        // Verify key prefixes before any request leaves the process
        if !self.api_key.starts_with("sk_") {
            return Err(ValidationError::InvalidGatewayKey);
        }
        if !self.webhook_secret.starts_with("whsec_") {
            return Err(ValidationError::InvalidWebhookSecret);
        }

        Ok(())
    }
}

fn default_api_base_url() -> String {
    "https://api.processor.example.com".to_string()
}
