//! CreateSubscriptionHandler - command handler for recurring billing
//! setup.
//!
//! Unlike one-off payments, a gateway failure here propagates to the
//! caller after rolling the local subscription to Canceled, and no
//! billing record is created. The companion Payment for the initial
//! charge is synthesized locally because the billing event itself
//! arrives later via webhook.

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::foundation::{
    DomainError, ErrorCode, Money, PaymentId, PaymentMethodId, PlanId, SubscriptionId, Timestamp,
    UserId,
};
use crate::domain::payment::Payment;
use crate::domain::payment_method::PaymentMethodKind;
use crate::domain::subscription::Subscription;
use crate::ports::{
    EventPublisher, PaymentGateway, PaymentMethodRepository, PaymentRepository,
    SubscriptionRepository, SubscriptionRequest,
};

use super::super::publish_after_commit;

/// Command to start a subscription.
#[derive(Debug, Clone)]
pub struct CreateSubscriptionCommand {
    pub user_id: UserId,
    pub plan_id: PlanId,
    pub amount: Money,
    pub payment_method_id: Option<PaymentMethodId>,
}

/// Result of a successful subscription creation.
#[derive(Debug, Clone)]
pub struct CreateSubscriptionResult {
    pub subscription: Subscription,
    /// The synthesized record of the initial charge.
    pub payment: Payment,
}

/// Handler for creating subscriptions.
pub struct CreateSubscriptionHandler {
    subscriptions: Arc<dyn SubscriptionRepository>,
    payments: Arc<dyn PaymentRepository>,
    methods: Arc<dyn PaymentMethodRepository>,
    gateway: Arc<dyn PaymentGateway>,
    publisher: Arc<dyn EventPublisher>,
}

impl CreateSubscriptionHandler {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionRepository>,
        payments: Arc<dyn PaymentRepository>,
        methods: Arc<dyn PaymentMethodRepository>,
        gateway: Arc<dyn PaymentGateway>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            subscriptions,
            payments,
            methods,
            gateway,
            publisher,
        }
    }

    pub async fn handle(
        &self,
        cmd: CreateSubscriptionCommand,
    ) -> Result<CreateSubscriptionResult, DomainError> {
        // 1. Resolve the stored instrument, when one was named.
        let (method_ref, method_kind) = match &cmd.payment_method_id {
            Some(method_id) => {
                let method = self.methods.find_by_id(method_id).await?.ok_or_else(|| {
                    DomainError::new(
                        ErrorCode::PaymentMethodNotFound,
                        format!("Payment method {} not found", method_id),
                    )
                })?;
                (method.processor_method_id, method.kind)
            }
            None => (None, PaymentMethodKind::Card),
        };

        // 2. Persist the Incomplete subscription before the gateway call
        //    so a crash leaves a traceable record.
        let mut subscription = Subscription::new(
            SubscriptionId::new(),
            cmd.user_id.clone(),
            cmd.plan_id.clone(),
            cmd.amount.clone(),
        );
        self.subscriptions.save(&subscription).await?;

        let mut metadata = HashMap::new();
        metadata.insert("subscription_id".to_string(), subscription.id.to_string());
        metadata.insert("user_id".to_string(), cmd.user_id.to_string());

        // 3. Create the processor-side subscription. Failure cancels the
        //    local record and rethrows - the one path where a gateway
        //    error surfaces to the caller.
        let gateway_sub = match self
            .gateway
            .create_subscription(SubscriptionRequest {
                customer_ref: cmd.user_id.to_string(),
                plan_ref: cmd.plan_id.to_string(),
                method_ref,
                metadata,
            })
            .await
        {
            Ok(sub) => sub,
            Err(err) => {
                tracing::warn!(
                    subscription_id = %subscription.id,
                    error = %err,
                    "Gateway subscription creation failed, cancelling local record"
                );
                subscription.cancel()?;
                self.subscriptions.update(&subscription).await?;
                return Err(DomainError::new(ErrorCode::GatewayError, err.to_string()));
            }
        };

        // 4. Record references and map the processor's status.
        subscription
            .record_processor_refs(gateway_sub.id.as_str(), Some(cmd.user_id.to_string()));
        let now = Timestamp::now();
        let period_end = Timestamp::from_unix_secs(gateway_sub.current_period_end);
        match gateway_sub.status.as_str() {
            "active" => subscription.activate(now, period_end)?,
            "trialing" => subscription.start_trial(now, period_end)?,
            other => {
                tracing::info!(
                    subscription_id = %subscription.id,
                    status = other,
                    "Subscription left incomplete pending webhook"
                );
            }
        }
        self.subscriptions.update(&subscription).await?;

        // 5. Synthesize the companion record of the initial charge; the
        //    processor's own billing event arrives later via webhook.
        let mut payment = Payment::new(
            PaymentId::new(),
            cmd.user_id,
            cmd.amount,
            method_kind,
            cmd.payment_method_id,
            Some(format!("Subscription {} initial charge", cmd.plan_id)),
        )
        .with_subscription(subscription.id);
        payment.succeed()?;
        self.payments.save(&payment).await?;

        // 6. Publish queued events after the writes.
        let mut envelopes: Vec<_> = subscription
            .drain_events()
            .into_iter()
            .map(|e| e.to_envelope())
            .collect();
        envelopes.extend(payment.drain_events().into_iter().map(|e| e.to_envelope()));
        publish_after_commit(self.publisher.as_ref(), envelopes).await;

        Ok(CreateSubscriptionResult {
            subscription,
            payment,
        })
    }
}
