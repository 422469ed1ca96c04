//! Configuration error types.

use thiserror::Error;

/// Errors loading configuration from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration error: {0}")]
    Load(#[from] config::ConfigError),
}

/// Errors validating loaded configuration values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing required configuration: {0}")]
    MissingRequired(&'static str),

    #[error("Server port must not be zero")]
    InvalidPort,

    #[error("Request timeout must be between 1 and 300 seconds")]
    InvalidTimeout,

    #[error("Database URL must start with postgres:// or postgresql://")]
    InvalidDatabaseUrl,

    #[error("Minimum pool size cannot exceed maximum")]
    InvalidPoolSize,

    #[error("Connection pool larger than 100 is not supported")]
    PoolSizeTooLarge,

    #[error("Gateway API key must start with sk_")]
    InvalidGatewayKey,

    #[error("Webhook secret must start with whsec_")]
    InvalidWebhookSecret,
}
