//! Webhook ingestion domain.
//!
//! The processor notifies this service of asynchronous state changes via
//! signed HTTP posts. This module owns the event envelope, signature
//! verification, the per-event-type reconciler contract, and the
//! idempotent router that ties them together.

mod errors;
mod event;
mod processor;
mod verifier;

pub use errors::WebhookError;
pub use event::{GatewayEvent, GatewayEventData, GatewayEventType};
pub use processor::{
    EventReconciler, EventRouter, IdempotentWebhookProcessor, ReconcileOutcome,
};
pub use verifier::{sign_payload, WebhookVerifier};
