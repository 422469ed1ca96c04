//! Payment domain events.
//!
//! Only settlement outcomes emit events: `PaymentProcessed` and
//! `PaymentFailed`. Cancellation and refunds do not (preserved source
//! behavior, flagged for product clarification before changing).

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    EventEnvelope, EventId, Money, PaymentId, PaymentMethodId, SerializableDomainEvent, Timestamp,
    UserId,
};
use crate::domain_event;

use super::PaymentStatus;

/// A charge settled successfully.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentProcessed {
    pub event_id: EventId,
    pub payment_id: PaymentId,
    pub user_id: UserId,
    pub amount: Money,
    pub status: PaymentStatus,
    pub payment_method_id: Option<PaymentMethodId>,
    pub occurred_at: Timestamp,
}

domain_event!(
    PaymentProcessed,
    event_type = "payment.processed",
    aggregate_id = payment_id,
    aggregate_type = "Payment",
    occurred_at = occurred_at,
    event_id = event_id
);

/// A charge failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentFailed {
    pub event_id: EventId,
    pub payment_id: PaymentId,
    pub user_id: UserId,
    pub amount: Money,
    pub reason: String,
    pub payment_method_id: Option<PaymentMethodId>,
    pub occurred_at: Timestamp,
}

domain_event!(
    PaymentFailed,
    event_type = "payment.failed",
    aggregate_id = payment_id,
    aggregate_type = "Payment",
    occurred_at = occurred_at,
    event_id = event_id
);

/// Events queued by the Payment aggregate between load and save.
#[derive(Debug, Clone)]
pub enum PaymentEvent {
    Processed(PaymentProcessed),
    Failed(PaymentFailed),
}

impl PaymentEvent {
    /// Returns the event type string for routing and assertions.
    pub fn event_type(&self) -> &'static str {
        match self {
            PaymentEvent::Processed(_) => "payment.processed",
            PaymentEvent::Failed(_) => "payment.failed",
        }
    }

    /// Converts the event into a transport envelope.
    pub fn to_envelope(&self) -> EventEnvelope {
        match self {
            PaymentEvent::Processed(e) => e.to_envelope(),
            PaymentEvent::Failed(e) => e.to_envelope(),
        }
    }
}
