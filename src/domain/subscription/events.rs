//! Subscription domain events.
//!
//! Only the first activation emits an event. The remaining lifecycle
//! operations are silent (preserved source behavior).

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    EventEnvelope, EventId, Money, PlanId, SerializableDomainEvent, SubscriptionId, Timestamp,
    UserId,
};
use crate::domain_event;

/// A subscription became active for the first time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionCreated {
    pub event_id: EventId,
    pub subscription_id: SubscriptionId,
    pub user_id: UserId,
    pub plan_id: PlanId,
    pub amount: Money,
    pub period_start: Timestamp,
    pub period_end: Timestamp,
    pub occurred_at: Timestamp,
}

domain_event!(
    SubscriptionCreated,
    event_type = "subscription.created",
    aggregate_id = subscription_id,
    aggregate_type = "Subscription",
    occurred_at = occurred_at,
    event_id = event_id
);

/// Events queued by the Subscription aggregate between load and save.
#[derive(Debug, Clone)]
pub enum SubscriptionEvent {
    Created(SubscriptionCreated),
}

impl SubscriptionEvent {
    /// Returns the event type string for routing and assertions.
    pub fn event_type(&self) -> &'static str {
        match self {
            SubscriptionEvent::Created(_) => "subscription.created",
        }
    }

    /// Converts the event into a transport envelope.
    pub fn to_envelope(&self) -> EventEnvelope {
        match self {
            SubscriptionEvent::Created(e) => e.to_envelope(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::Currency;
    use rust_decimal::Decimal;

    #[test]
    fn created_event_builds_envelope() {
        let subscription_id = SubscriptionId::new();
        let now = Timestamp::now();
        let event = SubscriptionEvent::Created(SubscriptionCreated {
            event_id: EventId::new(),
            subscription_id,
            user_id: UserId::new("user-1").unwrap(),
            plan_id: PlanId::new("plan_monthly").unwrap(),
            amount: Money::new(Decimal::new(150_000, 2), Currency::new("USD").unwrap()).unwrap(),
            period_start: now,
            period_end: now.add_days(30),
            occurred_at: now,
        });

        let envelope = event.to_envelope();
        assert_eq!(envelope.event_type, "subscription.created");
        assert_eq!(envelope.aggregate_id, subscription_id.to_string());
        assert_eq!(envelope.aggregate_type, "Subscription");
    }
}
