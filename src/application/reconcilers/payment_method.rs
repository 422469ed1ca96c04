//! Payment-method reconciler.
//!
//! `payment_method.attached` requires no local record: instruments are
//! stored through the command surface, and the processor's attachment
//! notice is informational. Logged and acknowledged.

use async_trait::async_trait;

use crate::domain::webhook::{
    EventReconciler, GatewayEvent, GatewayEventType, ReconcileOutcome, WebhookError,
};

/// Reconciler for payment instrument notifications.
pub struct PaymentMethodReconciler;

impl PaymentMethodReconciler {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PaymentMethodReconciler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventReconciler for PaymentMethodReconciler {
    fn handles(&self) -> Vec<GatewayEventType> {
        vec![GatewayEventType::PaymentMethodAttached]
    }

    async fn reconcile(&self, event: &GatewayEvent) -> Result<ReconcileOutcome, WebhookError> {
        tracing::info!(
            event_id = %event.id,
            method = event.object_str("id").unwrap_or("unknown"),
            "Payment method attached processor-side"
        );
        Ok(ReconcileOutcome::Skipped("logged only".to_string()))
    }
}
