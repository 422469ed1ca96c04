//! CancelSubscriptionHandler - gateway-call-then-local-cancel.

use std::sync::Arc;

use crate::domain::foundation::{DomainError, ErrorCode, SubscriptionId};
use crate::domain::subscription::Subscription;
use crate::ports::{PaymentGateway, SubscriptionRepository};

/// Command to cancel a subscription.
#[derive(Debug, Clone)]
pub struct CancelSubscriptionCommand {
    pub subscription_id: SubscriptionId,
}

/// Handler for cancelling subscriptions.
///
/// The processor-side subscription is cancelled first; only then does
/// the local record transition. A local record that never reached the
/// processor cancels locally alone.
pub struct CancelSubscriptionHandler {
    subscriptions: Arc<dyn SubscriptionRepository>,
    gateway: Arc<dyn PaymentGateway>,
}

impl CancelSubscriptionHandler {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionRepository>,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        Self {
            subscriptions,
            gateway,
        }
    }

    pub async fn handle(
        &self,
        cmd: CancelSubscriptionCommand,
    ) -> Result<Subscription, DomainError> {
        let mut subscription = self
            .subscriptions
            .find_by_id(&cmd.subscription_id)
            .await?
            .ok_or_else(|| {
                DomainError::new(
                    ErrorCode::SubscriptionNotFound,
                    format!("Subscription {} not found", cmd.subscription_id),
                )
            })?;

        if let Some(processor_ref) = subscription.processor_subscription_id.clone() {
            self.gateway
                .cancel_subscription(&processor_ref)
                .await
                .map_err(|e| DomainError::new(ErrorCode::GatewayError, e.to_string()))?;
        }

        subscription.cancel()?;
        self.subscriptions.update(&subscription).await?;

        Ok(subscription)
    }
}
