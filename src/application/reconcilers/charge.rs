//! Charge reconciler - settles in-flight payments from processor
//! notifications.
//!
//! Handles `charge.succeeded`, `charge.failed`,
//! `payment_intent.succeeded` and `payment_intent.payment_failed`. All
//! four carry a reference the local Payment was correlated with when the
//! gateway acknowledged the charge.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::webhook::{
    EventReconciler, GatewayEvent, GatewayEventType, ReconcileOutcome, WebhookError,
};
use crate::ports::{EventPublisher, PaymentRepository};

use super::publish_after_commit;

/// Reconciler for charge and payment-intent outcomes.
pub struct ChargeReconciler {
    payments: Arc<dyn PaymentRepository>,
    publisher: Arc<dyn EventPublisher>,
}

impl ChargeReconciler {
    pub fn new(payments: Arc<dyn PaymentRepository>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            payments,
            publisher,
        }
    }

    /// The correlation reference inside the event object: charge events
    /// carry the intent under `payment_intent`, intent events carry it
    /// as their own `id`.
    fn reference(event: &GatewayEvent) -> Option<String> {
        event
            .object_str("payment_intent")
            .or_else(|| event.object_str("id"))
            .map(str::to_string)
    }
}

#[async_trait]
impl EventReconciler for ChargeReconciler {
    fn handles(&self) -> Vec<GatewayEventType> {
        vec![
            GatewayEventType::ChargeSucceeded,
            GatewayEventType::ChargeFailed,
            GatewayEventType::PaymentIntentSucceeded,
            GatewayEventType::PaymentIntentFailed,
        ]
    }

    async fn reconcile(&self, event: &GatewayEvent) -> Result<ReconcileOutcome, WebhookError> {
        let reference =
            Self::reference(event).ok_or(WebhookError::MissingField("payment_intent"))?;

        let mut payment = match self
            .payments
            .find_by_processor_reference(&reference)
            .await?
        {
            Some(payment) => payment,
            None => {
                tracing::warn!(
                    event_id = %event.id,
                    reference = %reference,
                    "No payment found for processor reference, acknowledging"
                );
                return Ok(ReconcileOutcome::Skipped(format!(
                    "no payment for reference {}",
                    reference
                )));
            }
        };

        match event.parsed_type() {
            GatewayEventType::ChargeSucceeded | GatewayEventType::PaymentIntentSucceeded => {
                // Charge events carry the settled charge id alongside the
                // intent reference.
                if event.parsed_type() == GatewayEventType::ChargeSucceeded {
                    if let Some(charge_id) = event.object_str("id") {
                        payment.record_charge(charge_id);
                    }
                }
                payment.succeed()?;
            }
            GatewayEventType::ChargeFailed | GatewayEventType::PaymentIntentFailed => {
                let reason = event
                    .object_str("failure_message")
                    .or_else(|| event.object_str("last_payment_error"))
                    .unwrap_or("charge failed")
                    .to_string();
                payment.fail(reason)?;
            }
            other => {
                return Ok(ReconcileOutcome::Skipped(format!(
                    "charge reconciler received {}",
                    other.as_str()
                )));
            }
        }

        self.payments.update(&payment).await?;
        let envelopes = payment
            .drain_events()
            .into_iter()
            .map(|e| e.to_envelope())
            .collect();
        publish_after_commit(self.publisher.as_ref(), envelopes).await;

        Ok(ReconcileOutcome::Applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::events::InMemoryEventBus;
    use crate::domain::foundation::{Currency, DomainError, Money, PaymentId, UserId};
    use crate::domain::payment::{Payment, PaymentStatus};
    use crate::domain::payment_method::PaymentMethodKind;
    use rust_decimal::Decimal;
    use serde_json::json;
    use std::sync::Mutex;

    struct MockPaymentRepository {
        payments: Mutex<Vec<Payment>>,
    }

    impl MockPaymentRepository {
        fn with_payment(payment: Payment) -> Self {
            Self {
                payments: Mutex::new(vec![payment]),
            }
        }

        fn empty() -> Self {
            Self {
                payments: Mutex::new(Vec::new()),
            }
        }

        fn first(&self) -> Payment {
            self.payments.lock().unwrap()[0].clone()
        }
    }

    #[async_trait]
    impl PaymentRepository for MockPaymentRepository {
        async fn save(&self, payment: &Payment) -> Result<(), DomainError> {
            self.payments.lock().unwrap().push(payment.clone());
            Ok(())
        }

        async fn update(&self, payment: &Payment) -> Result<(), DomainError> {
            let mut payments = self.payments.lock().unwrap();
            if let Some(p) = payments.iter_mut().find(|p| p.id == payment.id) {
                *p = payment.clone();
            }
            Ok(())
        }

        async fn find_by_id(&self, id: &PaymentId) -> Result<Option<Payment>, DomainError> {
            Ok(self
                .payments
                .lock()
                .unwrap()
                .iter()
                .find(|p| &p.id == id)
                .cloned())
        }

        async fn find_by_processor_reference(
            &self,
            reference: &str,
        ) -> Result<Option<Payment>, DomainError> {
            Ok(self
                .payments
                .lock()
                .unwrap()
                .iter()
                .find(|p| {
                    p.processor_intent_id.as_deref() == Some(reference)
                        || p.processor_charge_id.as_deref() == Some(reference)
                })
                .cloned())
        }

        async fn list_for_user(&self, _user_id: &UserId) -> Result<Vec<Payment>, DomainError> {
            Ok(vec![])
        }
    }

    fn processing_payment(intent: &str) -> Payment {
        let mut payment = Payment::new(
            PaymentId::new(),
            UserId::new("user-1").unwrap(),
            Money::new(Decimal::new(10_000, 2), Currency::new("USD").unwrap()).unwrap(),
            PaymentMethodKind::Card,
            None,
            None,
        );
        payment.process(intent).unwrap();
        payment
    }

    fn event(event_type: &str, object: serde_json::Value) -> GatewayEvent {
        serde_json::from_value(json!({
            "id": "evt_1",
            "type": event_type,
            "data": {"object": object}
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn intent_succeeded_settles_the_payment() {
        let repo = Arc::new(MockPaymentRepository::with_payment(processing_payment("pi_1")));
        let bus = Arc::new(InMemoryEventBus::new());
        let reconciler = ChargeReconciler::new(repo.clone(), bus.clone());

        let outcome = reconciler
            .reconcile(&event("payment_intent.succeeded", json!({"id": "pi_1"})))
            .await
            .unwrap();

        assert_eq!(outcome, ReconcileOutcome::Applied);
        assert_eq!(repo.first().status, PaymentStatus::Succeeded);
        assert_eq!(bus.events_of_type("payment.processed").len(), 1);
    }

    #[tokio::test]
    async fn charge_succeeded_records_charge_id() {
        let repo = Arc::new(MockPaymentRepository::with_payment(processing_payment("pi_2")));
        let bus = Arc::new(InMemoryEventBus::new());
        let reconciler = ChargeReconciler::new(repo.clone(), bus);

        reconciler
            .reconcile(&event(
                "charge.succeeded",
                json!({"id": "ch_9", "payment_intent": "pi_2"}),
            ))
            .await
            .unwrap();

        let payment = repo.first();
        assert_eq!(payment.status, PaymentStatus::Succeeded);
        assert_eq!(payment.processor_charge_id.as_deref(), Some("ch_9"));
    }

    #[tokio::test]
    async fn charge_failed_records_the_failure_message() {
        let repo = Arc::new(MockPaymentRepository::with_payment(processing_payment("pi_3")));
        let bus = Arc::new(InMemoryEventBus::new());
        let reconciler = ChargeReconciler::new(repo.clone(), bus.clone());

        reconciler
            .reconcile(&event(
                "charge.failed",
                json!({"id": "ch_10", "payment_intent": "pi_3", "failure_message": "card_declined"}),
            ))
            .await
            .unwrap();

        let payment = repo.first();
        assert_eq!(payment.status, PaymentStatus::Failed);
        assert_eq!(payment.failure_reason.as_deref(), Some("card_declined"));
        assert_eq!(bus.events_of_type("payment.failed").len(), 1);
    }

    #[tokio::test]
    async fn unmatched_reference_is_skipped() {
        let repo = Arc::new(MockPaymentRepository::empty());
        let bus = Arc::new(InMemoryEventBus::new());
        let reconciler = ChargeReconciler::new(repo, bus.clone());

        let outcome = reconciler
            .reconcile(&event("payment_intent.succeeded", json!({"id": "pi_missing"})))
            .await
            .unwrap();

        assert!(matches!(outcome, ReconcileOutcome::Skipped(_)));
        assert_eq!(bus.event_count(), 0);
    }

    #[tokio::test]
    async fn replayed_success_applies_once() {
        let repo = Arc::new(MockPaymentRepository::with_payment(processing_payment("pi_4")));
        let bus = Arc::new(InMemoryEventBus::new());
        let reconciler = ChargeReconciler::new(repo.clone(), bus.clone());
        let evt = event("payment_intent.succeeded", json!({"id": "pi_4"}));

        reconciler.reconcile(&evt).await.unwrap();
        reconciler.reconcile(&evt).await.unwrap();

        assert_eq!(repo.first().status, PaymentStatus::Succeeded);
        // The second application is a no-op on the aggregate; no second
        // event is queued.
        assert_eq!(bus.events_of_type("payment.processed").len(), 1);
    }

    #[tokio::test]
    async fn missing_reference_field_is_a_bad_payload() {
        let repo = Arc::new(MockPaymentRepository::empty());
        let bus = Arc::new(InMemoryEventBus::new());
        let reconciler = ChargeReconciler::new(repo, bus);

        let result = reconciler
            .reconcile(&event("payment_intent.succeeded", json!({})))
            .await;

        assert!(matches!(result, Err(WebhookError::MissingField(_))));
    }
}
