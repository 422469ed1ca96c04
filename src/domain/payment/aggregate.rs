//! Payment aggregate entity.
//!
//! One `Payment` records one charge attempt. Two writers converge on it:
//! the synchronous command path (gateway round-trip) and the asynchronous
//! webhook path (processor notifications). Transitions are table-checked
//! and idempotent under repetition so at-least-once webhook delivery
//! cannot double-apply an outcome.
//!
//! # Design Decisions
//!
//! - **Pending events**: transitions queue domain events on the instance;
//!   the caller drains them after a successful persistence write
//! - **Settled outcomes are sticky**: `succeed()` on a Succeeded payment
//!   and `fail()` on a Failed payment are no-ops that queue nothing
//! - **Correlation**: `processor_intent_id` / `processor_charge_id` link
//!   webhook events back to this record

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    DomainError, ErrorCode, EventId, Money, PaymentId, PaymentMethodId, StateMachine,
    SubscriptionId, Timestamp, UserId, ValidationError,
};
use crate::domain::payment_method::PaymentMethodKind;

use super::{PaymentEvent, PaymentFailed, PaymentProcessed, PaymentStatus};

/// Payment aggregate - one charge attempt and its lifecycle.
///
/// # Invariants
///
/// - `id` is globally unique; owned exclusively by `user_id`
/// - status transitions follow the `PaymentStatus` table
/// - `refunded_amount` never exceeds `amount` and shares its currency
/// - `failure_reason` is non-empty whenever status is Failed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    /// Unique identifier for this payment.
    pub id: PaymentId,

    /// User who initiated the charge.
    pub user_id: UserId,

    /// Charged amount.
    pub amount: Money,

    /// Current lifecycle status.
    pub status: PaymentStatus,

    /// Kind of instrument used for the charge.
    pub method_kind: PaymentMethodKind,

    /// Stored instrument used, if any.
    pub payment_method_id: Option<PaymentMethodId>,

    /// Subscription this charge bills, for recurring payments.
    pub subscription_id: Option<SubscriptionId>,

    /// The processor's in-flight charge reference. Assigned once the
    /// gateway acknowledges the request; webhook reconciliation finds
    /// this record by it.
    pub processor_intent_id: Option<String>,

    /// The processor's settled charge reference.
    pub processor_charge_id: Option<String>,

    /// Free-form description shown on statements.
    pub description: Option<String>,

    /// Why the charge failed, when it did.
    pub failure_reason: Option<String>,

    /// Cumulative amount returned to the payer.
    pub refunded_amount: Money,

    /// When the charge reached an outcome.
    pub processed_at: Option<Timestamp>,

    /// When the payment was created.
    pub created_at: Timestamp,

    /// When the payment was last updated.
    pub updated_at: Timestamp,

    /// Events queued since load, drained after a successful save.
    #[serde(skip)]
    pending_events: Vec<PaymentEvent>,
}

impl Payment {
    /// Creates a new payment in `Pending`.
    pub fn new(
        id: PaymentId,
        user_id: UserId,
        amount: Money,
        method_kind: PaymentMethodKind,
        payment_method_id: Option<PaymentMethodId>,
        description: Option<String>,
    ) -> Self {
        let now = Timestamp::now();
        let refunded_amount = Money::zero(amount.currency().clone());
        Self {
            id,
            user_id,
            amount,
            status: PaymentStatus::Pending,
            method_kind,
            payment_method_id,
            subscription_id: None,
            processor_intent_id: None,
            processor_charge_id: None,
            description,
            failure_reason: None,
            refunded_amount,
            processed_at: None,
            created_at: now,
            updated_at: now,
            pending_events: Vec::new(),
        }
    }

    /// Rebuilds a payment from persisted fields. The caller assigns the
    /// remaining public fields; the pending-events queue starts empty
    /// because events only accumulate between load and save.
    pub fn rehydrate(
        id: PaymentId,
        user_id: UserId,
        amount: Money,
        status: PaymentStatus,
        method_kind: PaymentMethodKind,
    ) -> Self {
        let mut payment = Self::new(id, user_id, amount, method_kind, None, None);
        payment.status = status;
        payment
    }

    /// Ties this charge to the subscription it bills.
    pub fn with_subscription(mut self, subscription_id: SubscriptionId) -> Self {
        self.subscription_id = Some(subscription_id);
        self
    }

    /// Records the processor's acknowledgement and moves the charge
    /// in-flight.
    ///
    /// Callable from Pending or Processing; repeated acknowledgements
    /// refresh the reference without error.
    pub fn process(&mut self, intent_id: impl Into<String>) -> Result<(), DomainError> {
        self.transition_to(PaymentStatus::Processing)?;
        self.processor_intent_id = Some(intent_id.into());
        self.updated_at = Timestamp::now();
        Ok(())
    }

    /// Records the processor's settled charge reference (webhook path).
    pub fn record_charge(&mut self, charge_id: impl Into<String>) {
        self.processor_charge_id = Some(charge_id.into());
        self.updated_at = Timestamp::now();
    }

    /// Settles the charge successfully and queues `PaymentProcessed`.
    ///
    /// Idempotent: an already-Succeeded payment is left untouched and no
    /// second event is queued.
    ///
    /// # Errors
    ///
    /// Returns an error when called on a Failed, Cancelled or refunded
    /// payment.
    pub fn succeed(&mut self) -> Result<(), DomainError> {
        if self.status == PaymentStatus::Succeeded {
            return Ok(());
        }
        self.transition_to(PaymentStatus::Succeeded)?;
        let now = Timestamp::now();
        self.processed_at = Some(now);
        self.updated_at = now;
        self.pending_events
            .push(PaymentEvent::Processed(PaymentProcessed {
                event_id: EventId::new(),
                payment_id: self.id,
                user_id: self.user_id.clone(),
                amount: self.amount.clone(),
                status: self.status,
                payment_method_id: self.payment_method_id,
                occurred_at: now,
            }));
        Ok(())
    }

    /// Fails the charge and queues `PaymentFailed`.
    ///
    /// Idempotent: an already-Failed payment is left untouched.
    ///
    /// # Errors
    ///
    /// Rejects an empty reason, and any call on a payment that already
    /// settled another way.
    pub fn fail(&mut self, reason: impl Into<String>) -> Result<(), DomainError> {
        let reason = reason.into();
        if reason.trim().is_empty() {
            return Err(ValidationError::empty_field("failure_reason").into());
        }
        if self.status == PaymentStatus::Failed {
            return Ok(());
        }
        self.transition_to(PaymentStatus::Failed)?;
        let now = Timestamp::now();
        self.failure_reason = Some(reason.clone());
        self.processed_at = Some(now);
        self.updated_at = now;
        self.pending_events.push(PaymentEvent::Failed(PaymentFailed {
            event_id: EventId::new(),
            payment_id: self.id,
            user_id: self.user_id.clone(),
            amount: self.amount.clone(),
            reason,
            payment_method_id: self.payment_method_id,
            occurred_at: now,
        }));
        Ok(())
    }

    /// Cancels a pending charge. No event is emitted.
    pub fn cancel(&mut self) -> Result<(), DomainError> {
        self.transition_to(PaymentStatus::Cancelled)?;
        self.updated_at = Timestamp::now();
        Ok(())
    }

    /// Applies a refund, choosing full or partial based on the cumulative
    /// refunded amount. No event is emitted.
    ///
    /// # Errors
    ///
    /// Rejects currency mismatches, refunds exceeding the remaining
    /// amount, and refunds against unsettled payments.
    pub fn apply_refund(&mut self, refund: &Money) -> Result<(), DomainError> {
        let remaining = self.remaining_refundable()?;
        let after = remaining.checked_sub(refund).map_err(DomainError::from)?;
        let total = self
            .refunded_amount
            .checked_add(refund)
            .map_err(DomainError::from)?;

        let target = if after.is_zero() {
            PaymentStatus::Refunded
        } else {
            PaymentStatus::PartiallyRefunded
        };
        self.transition_to(target)?;
        self.refunded_amount = total;
        self.updated_at = Timestamp::now();
        Ok(())
    }

    /// The amount still available to refund.
    pub fn remaining_refundable(&self) -> Result<Money, DomainError> {
        self.amount
            .checked_sub(&self.refunded_amount)
            .map_err(DomainError::from)
    }

    /// The reference webhook reconciliation and refunds correlate on:
    /// the settled charge id when known, the in-flight intent otherwise.
    pub fn processor_reference(&self) -> Option<&str> {
        self.processor_charge_id
            .as_deref()
            .or(self.processor_intent_id.as_deref())
    }

    /// Drains the events queued since load. Call after a successful
    /// persistence write.
    pub fn drain_events(&mut self) -> Vec<PaymentEvent> {
        std::mem::take(&mut self.pending_events)
    }

    /// Returns the queued events without draining (test assertions).
    pub fn pending_events(&self) -> &[PaymentEvent] {
        &self.pending_events
    }

    fn transition_to(&mut self, target: PaymentStatus) -> Result<(), DomainError> {
        self.status = self.status.transition_to(target).map_err(|_| {
            DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!(
                    "Cannot transition payment from {:?} to {:?}",
                    self.status, target
                ),
            )
        })?;
        Ok(())
    }
}
