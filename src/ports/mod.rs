//! Ports - interfaces between the domain and the outside world.
//!
//! Each port is an async trait implemented by an adapter. Command
//! handlers and reconcilers depend on these traits, never on concrete
//! adapters.

mod event_publisher;
mod payment_gateway;
mod payment_method_repository;
mod payment_repository;
mod subscription_repository;
mod webhook_event_repository;

pub use event_publisher::EventPublisher;
pub use payment_gateway::{
    ChargeRequest, GatewayCharge, GatewayChargeStatus, GatewayError, GatewayErrorCode,
    GatewayRefund, GatewaySubscription, PaymentGateway, RefundRequest, SubscriptionRequest,
};
pub use payment_method_repository::PaymentMethodRepository;
pub use payment_repository::PaymentRepository;
pub use subscription_repository::SubscriptionRepository;
pub use webhook_event_repository::{
    SaveResult, WebhookEventRecord, WebhookEventRepository, WebhookResult,
};
