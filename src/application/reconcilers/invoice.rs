//! Invoice reconciler - records recurring billing outcomes.
//!
//! `invoice.paid` synthesizes a Succeeded Payment tied to the billed
//! subscription, since the charge itself happened processor-side.
//! `invoice.payment_failed` is logged only; the subscription transition
//! arrives separately as `customer.subscription.updated`.

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::domain::foundation::{Currency, Money, PaymentId, Timestamp};
use crate::domain::payment::Payment;
use crate::domain::payment_method::PaymentMethodKind;
use crate::domain::webhook::{
    EventReconciler, GatewayEvent, GatewayEventType, ReconcileOutcome, WebhookError,
};
use crate::ports::{EventPublisher, PaymentRepository, SubscriptionRepository};

use super::publish_after_commit;

/// Reconciler for subscription invoice outcomes.
pub struct InvoiceReconciler {
    subscriptions: Arc<dyn SubscriptionRepository>,
    payments: Arc<dyn PaymentRepository>,
    publisher: Arc<dyn EventPublisher>,
}

impl InvoiceReconciler {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionRepository>,
        payments: Arc<dyn PaymentRepository>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            subscriptions,
            payments,
            publisher,
        }
    }

    /// Invoice amounts arrive as integer minor units plus a currency
    /// code.
    fn invoice_amount(event: &GatewayEvent) -> Result<Money, WebhookError> {
        let minor_units = event
            .data
            .object
            .get("amount_paid")
            .and_then(|v| v.as_i64())
            .ok_or(WebhookError::MissingField("amount_paid"))?;
        let currency = event
            .object_str("currency")
            .ok_or(WebhookError::MissingField("currency"))?;

        let currency = Currency::new(currency)
            .map_err(|e| WebhookError::ParseError(e.to_string()))?;
        Money::new(Decimal::new(minor_units, 2), currency)
            .map_err(|e| WebhookError::ParseError(e.to_string()))
    }

    async fn handle_invoice_paid(
        &self,
        event: &GatewayEvent,
    ) -> Result<ReconcileOutcome, WebhookError> {
        let subscription_ref = event
            .object_str("subscription")
            .ok_or(WebhookError::MissingField("subscription"))?
            .to_string();

        let mut subscription = match self
            .subscriptions
            .find_by_processor_reference(&subscription_ref)
            .await?
        {
            Some(subscription) => subscription,
            None => {
                tracing::warn!(
                    event_id = %event.id,
                    reference = %subscription_ref,
                    "No subscription found for invoice, acknowledging"
                );
                return Ok(ReconcileOutcome::Skipped(format!(
                    "no subscription for reference {}",
                    subscription_ref
                )));
            }
        };

        // Guard against replays of the same invoice: the synthesized
        // payment carries the invoice id as its charge reference.
        if let Some(invoice_id) = event.object_str("id") {
            if self
                .payments
                .find_by_processor_reference(invoice_id)
                .await?
                .is_some()
            {
                return Ok(ReconcileOutcome::Skipped(format!(
                    "invoice {} already recorded",
                    invoice_id
                )));
            }
        }

        let amount = Self::invoice_amount(event)?;

        // Synthesize the billing record; the processor already settled
        // the charge.
        let mut payment = Payment::new(
            PaymentId::new(),
            subscription.user_id.clone(),
            amount,
            PaymentMethodKind::Card,
            None,
            Some(format!("Subscription {} billing", subscription.plan_id)),
        )
        .with_subscription(subscription.id);
        if let Some(invoice_id) = event.object_str("id") {
            payment.record_charge(invoice_id);
        }
        payment.succeed()?;
        self.payments.save(&payment).await?;

        // Refresh the billing period when the invoice carries one.
        let period_start = event
            .data
            .object
            .get("period_start")
            .and_then(|v| v.as_i64());
        let period_end = event.data.object.get("period_end").and_then(|v| v.as_i64());
        if let (Some(start), Some(end)) = (period_start, period_end) {
            subscription.refresh_period(
                Timestamp::from_unix_secs(start),
                Timestamp::from_unix_secs(end),
            );
            self.subscriptions.update(&subscription).await?;
        }

        let envelopes = payment
            .drain_events()
            .into_iter()
            .map(|e| e.to_envelope())
            .collect();
        publish_after_commit(self.publisher.as_ref(), envelopes).await;

        Ok(ReconcileOutcome::Applied)
    }
}

#[async_trait]
impl EventReconciler for InvoiceReconciler {
    fn handles(&self) -> Vec<GatewayEventType> {
        vec![
            GatewayEventType::InvoicePaid,
            GatewayEventType::InvoicePaymentFailed,
        ]
    }

    async fn reconcile(&self, event: &GatewayEvent) -> Result<ReconcileOutcome, WebhookError> {
        match event.parsed_type() {
            GatewayEventType::InvoicePaid => self.handle_invoice_paid(event).await,
            GatewayEventType::InvoicePaymentFailed => {
                tracing::warn!(
                    event_id = %event.id,
                    subscription = event.object_str("subscription").unwrap_or("unknown"),
                    "Invoice payment failed"
                );
                Ok(ReconcileOutcome::Skipped("logged only".to_string()))
            }
            other => Ok(ReconcileOutcome::Skipped(format!(
                "invoice reconciler received {}",
                other.as_str()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::events::InMemoryEventBus;
    use crate::domain::foundation::{DomainError, PlanId, SubscriptionId, UserId};
    use crate::domain::payment::PaymentStatus;
    use crate::domain::subscription::Subscription;
    use serde_json::json;
    use std::sync::Mutex;

    struct MockSubscriptionRepository {
        subscriptions: Mutex<Vec<Subscription>>,
    }

    impl MockSubscriptionRepository {
        fn with_subscription(sub: Subscription) -> Self {
            Self {
                subscriptions: Mutex::new(vec![sub]),
            }
        }

        fn empty() -> Self {
            Self {
                subscriptions: Mutex::new(Vec::new()),
            }
        }

        fn first(&self) -> Subscription {
            self.subscriptions.lock().unwrap()[0].clone()
        }
    }

    #[async_trait]
    impl SubscriptionRepository for MockSubscriptionRepository {
        async fn save(&self, subscription: &Subscription) -> Result<(), DomainError> {
            self.subscriptions.lock().unwrap().push(subscription.clone());
            Ok(())
        }

        async fn update(&self, subscription: &Subscription) -> Result<(), DomainError> {
            let mut subs = self.subscriptions.lock().unwrap();
            if let Some(s) = subs.iter_mut().find(|s| s.id == subscription.id) {
                *s = subscription.clone();
            }
            Ok(())
        }

        async fn find_by_id(
            &self,
            _id: &SubscriptionId,
        ) -> Result<Option<Subscription>, DomainError> {
            Ok(None)
        }

        async fn find_by_processor_reference(
            &self,
            reference: &str,
        ) -> Result<Option<Subscription>, DomainError> {
            Ok(self
                .subscriptions
                .lock()
                .unwrap()
                .iter()
                .find(|s| s.processor_subscription_id.as_deref() == Some(reference))
                .cloned())
        }

        async fn list_for_user(
            &self,
            _user_id: &UserId,
        ) -> Result<Vec<Subscription>, DomainError> {
            Ok(vec![])
        }
    }

    struct MockPaymentRepository {
        payments: Mutex<Vec<Payment>>,
    }

    impl MockPaymentRepository {
        fn new() -> Self {
            Self {
                payments: Mutex::new(Vec::new()),
            }
        }

        fn saved(&self) -> Vec<Payment> {
            self.payments.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PaymentRepository for MockPaymentRepository {
        async fn save(&self, payment: &Payment) -> Result<(), DomainError> {
            self.payments.lock().unwrap().push(payment.clone());
            Ok(())
        }

        async fn update(&self, _payment: &Payment) -> Result<(), DomainError> {
            Ok(())
        }

        async fn find_by_id(&self, _id: &PaymentId) -> Result<Option<Payment>, DomainError> {
            Ok(None)
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

    fn active_subscription(processor_ref: &str) -> Subscription {
        let mut sub = Subscription::new(
            SubscriptionId::new(),
            UserId::new("user-1").unwrap(),
            PlanId::new("plan_monthly").unwrap(),
            Money::new(Decimal::new(150_000, 2), Currency::new("USD").unwrap()).unwrap(),
        );
        sub.record_processor_refs(processor_ref, None);
        sub.activate(Timestamp::now(), Timestamp::now().add_days(30))
            .unwrap();
        sub.drain_events();
        sub
    }

    fn invoice_paid(invoice_id: &str, subscription: &str) -> GatewayEvent {
        serde_json::from_value(json!({
            "id": "evt_inv_1",
            "type": "invoice.paid",
            "data": {"object": {
                "id": invoice_id,
                "subscription": subscription,
                "amount_paid": 150_000,
                "currency": "usd",
                "period_start": 1_735_689_600,
                "period_end": 1_738_368_000
            }}
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn invoice_paid_synthesizes_succeeded_payment() {
        let subs = Arc::new(MockSubscriptionRepository::with_subscription(
            active_subscription("sub_1"),
        ));
        let payments = Arc::new(MockPaymentRepository::new());
        let bus = Arc::new(InMemoryEventBus::new());
        let reconciler = InvoiceReconciler::new(subs.clone(), payments.clone(), bus.clone());

        let outcome = reconciler
            .reconcile(&invoice_paid("in_1", "sub_1"))
            .await
            .unwrap();

        assert_eq!(outcome, ReconcileOutcome::Applied);
        let saved = payments.saved();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].status, PaymentStatus::Succeeded);
        assert_eq!(saved[0].subscription_id, Some(subs.first().id));
        assert_eq!(saved[0].processor_charge_id.as_deref(), Some("in_1"));
        assert_eq!(bus.events_of_type("payment.processed").len(), 1);
    }

    #[tokio::test]
    async fn invoice_paid_refreshes_the_billing_period() {
        let subs = Arc::new(MockSubscriptionRepository::with_subscription(
            active_subscription("sub_2"),
        ));
        let payments = Arc::new(MockPaymentRepository::new());
        let bus = Arc::new(InMemoryEventBus::new());
        let reconciler = InvoiceReconciler::new(subs.clone(), payments, bus);

        reconciler
            .reconcile(&invoice_paid("in_2", "sub_2"))
            .await
            .unwrap();

        let sub = subs.first();
        assert_eq!(
            sub.current_period_start.unwrap().as_unix_secs(),
            1_735_689_600
        );
        assert_eq!(sub.current_period_end.unwrap().as_unix_secs(), 1_738_368_000);
    }

    #[tokio::test]
    async fn replayed_invoice_is_skipped() {
        let subs = Arc::new(MockSubscriptionRepository::with_subscription(
            active_subscription("sub_3"),
        ));
        let payments = Arc::new(MockPaymentRepository::new());
        let bus = Arc::new(InMemoryEventBus::new());
        let reconciler = InvoiceReconciler::new(subs, payments.clone(), bus);

        reconciler
            .reconcile(&invoice_paid("in_3", "sub_3"))
            .await
            .unwrap();
        let outcome = reconciler
            .reconcile(&invoice_paid("in_3", "sub_3"))
            .await
            .unwrap();

        assert!(matches!(outcome, ReconcileOutcome::Skipped(_)));
        assert_eq!(payments.saved().len(), 1);
    }

    #[tokio::test]
    async fn unmatched_subscription_is_skipped() {
        let subs = Arc::new(MockSubscriptionRepository::empty());
        let payments = Arc::new(MockPaymentRepository::new());
        let bus = Arc::new(InMemoryEventBus::new());
        let reconciler = InvoiceReconciler::new(subs, payments.clone(), bus);

        let outcome = reconciler
            .reconcile(&invoice_paid("in_4", "sub_missing"))
            .await
            .unwrap();

        assert!(matches!(outcome, ReconcileOutcome::Skipped(_)));
        assert!(payments.saved().is_empty());
    }

    #[tokio::test]
    async fn invoice_payment_failed_is_logged_only() {
        let subs = Arc::new(MockSubscriptionRepository::with_subscription(
            active_subscription("sub_5"),
        ));
        let payments = Arc::new(MockPaymentRepository::new());
        let bus = Arc::new(InMemoryEventBus::new());
        let reconciler = InvoiceReconciler::new(subs.clone(), payments.clone(), bus.clone());

        let event: GatewayEvent = serde_json::from_value(json!({
            "id": "evt_inv_fail",
            "type": "invoice.payment_failed",
            "data": {"object": {"subscription": "sub_5"}}
        }))
        .unwrap();

        let outcome = reconciler.reconcile(&event).await.unwrap();

        assert!(matches!(outcome, ReconcileOutcome::Skipped(_)));
        assert!(payments.saved().is_empty());
        assert_eq!(bus.event_count(), 0);
    }
}
