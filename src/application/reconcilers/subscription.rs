//! Subscription reconciler - maps processor subscription status onto
//! local transitions.
//!
//! Handles `customer.subscription.created`, `.updated` and `.deleted`.
//! A delivery that matches the current local status is acknowledged as
//! already applied; at-least-once delivery must not wedge the endpoint
//! in a retry loop.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::foundation::Timestamp;
use crate::domain::subscription::SubscriptionStatus;
use crate::domain::webhook::{
    EventReconciler, GatewayEvent, GatewayEventType, ReconcileOutcome, WebhookError,
};
use crate::ports::{EventPublisher, SubscriptionRepository};

use super::publish_after_commit;

/// Reconciler for processor-side subscription lifecycle changes.
pub struct SubscriptionReconciler {
    subscriptions: Arc<dyn SubscriptionRepository>,
    publisher: Arc<dyn EventPublisher>,
}

impl SubscriptionReconciler {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionRepository>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            subscriptions,
            publisher,
        }
    }

    fn unix_field(event: &GatewayEvent, field: &str) -> Option<Timestamp> {
        event
            .data
            .object
            .get(field)
            .and_then(|v| v.as_i64())
            .map(Timestamp::from_unix_secs)
    }
}

#[async_trait]
impl EventReconciler for SubscriptionReconciler {
    fn handles(&self) -> Vec<GatewayEventType> {
        vec![
            GatewayEventType::SubscriptionCreated,
            GatewayEventType::SubscriptionUpdated,
            GatewayEventType::SubscriptionDeleted,
        ]
    }

    async fn reconcile(&self, event: &GatewayEvent) -> Result<ReconcileOutcome, WebhookError> {
        let reference = event
            .object_str("id")
            .ok_or(WebhookError::MissingField("id"))?
            .to_string();

        let mut subscription = match self
            .subscriptions
            .find_by_processor_reference(&reference)
            .await?
        {
            Some(subscription) => subscription,
            None => {
                tracing::warn!(
                    event_id = %event.id,
                    reference = %reference,
                    "No subscription found for processor reference, acknowledging"
                );
                return Ok(ReconcileOutcome::Skipped(format!(
                    "no subscription for reference {}",
                    reference
                )));
            }
        };

        let target = match event.parsed_type() {
            GatewayEventType::SubscriptionDeleted => SubscriptionStatus::Canceled,
            _ => {
                let status_str = event
                    .object_str("status")
                    .ok_or(WebhookError::MissingField("status"))?;
                match SubscriptionStatus::from_processor(status_str) {
                    Some(status) => status,
                    None => {
                        tracing::warn!(
                            event_id = %event.id,
                            status = status_str,
                            "Unknown processor subscription status, acknowledging"
                        );
                        return Ok(ReconcileOutcome::Skipped(format!(
                            "unknown status {}",
                            status_str
                        )));
                    }
                }
            }
        };

        // Redelivery with the processor's current state: nothing to do.
        // Active repeats still go through activate() to refresh the
        // billing period.
        if subscription.status == target && target != SubscriptionStatus::Active {
            return Ok(ReconcileOutcome::Skipped(format!(
                "subscription already {:?}",
                target
            )));
        }

        let now = Timestamp::now();
        match target {
            SubscriptionStatus::Active => {
                let start = Self::unix_field(event, "current_period_start").unwrap_or(now);
                let end = Self::unix_field(event, "current_period_end")
                    .unwrap_or_else(|| now.add_days(30));
                subscription.activate(start, end)?;
            }
            SubscriptionStatus::Trialing => {
                let start = Self::unix_field(event, "trial_start").unwrap_or(now);
                let end = Self::unix_field(event, "trial_end")
                    .unwrap_or_else(|| now.add_days(14));
                subscription.start_trial(start, end)?;
            }
            SubscriptionStatus::PastDue => subscription.mark_past_due()?,
            SubscriptionStatus::Canceled => subscription.cancel()?,
            SubscriptionStatus::Unpaid => subscription.mark_unpaid()?,
            SubscriptionStatus::Paused => subscription.pause()?,
            SubscriptionStatus::Incomplete => {
                return Ok(ReconcileOutcome::Skipped(
                    "incomplete is the local starting state".to_string(),
                ));
            }
        }

        self.subscriptions.update(&subscription).await?;
        let envelopes = subscription
            .drain_events()
            .into_iter()
            .map(|e| e.to_envelope())
            .collect();
        publish_after_commit(self.publisher.as_ref(), envelopes).await;

        Ok(ReconcileOutcome::Applied)
    }
}
