//! PostgreSQL repository adapters.
//!
//! sqlx-backed implementations of the persistence ports. Each adapter
//! maps between a row struct and its aggregate via `TryFrom`, with
//! status enums stored as snake_case strings.

mod payment_method_repository;
mod payment_repository;
mod subscription_repository;
mod webhook_event_repository;

pub use payment_method_repository::PostgresPaymentMethodRepository;
pub use payment_repository::PostgresPaymentRepository;
pub use subscription_repository::PostgresSubscriptionRepository;
pub use webhook_event_repository::PostgresWebhookEventRepository;
