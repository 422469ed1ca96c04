//! Subscription aggregate entity.
//!
//! Records one recurring billing arrangement. The synchronous command
//! path creates it; processor webhooks drive the rest of its lifecycle
//! by mapping the processor's subscription status onto local
//! transitions.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    DomainError, ErrorCode, EventId, Money, PlanId, StateMachine, SubscriptionId, Timestamp,
    UserId,
};

use super::{SubscriptionCreated, SubscriptionEvent, SubscriptionStatus};

/// Subscription aggregate - one recurring billing arrangement.
///
/// # Invariants
///
/// - status transitions follow the `SubscriptionStatus` table
/// - `current_period_start <= current_period_end` when both are set
/// - `SubscriptionCreated` is emitted exactly once, on the first arrival
///   in Active
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    /// Unique identifier for this subscription.
    pub id: SubscriptionId,

    /// User who owns this subscription.
    pub user_id: UserId,

    /// The billed plan.
    pub plan_id: PlanId,

    /// Amount billed each period.
    pub amount: Money,

    /// Current lifecycle status.
    pub status: SubscriptionStatus,

    /// The processor's subscription reference; webhook reconciliation
    /// finds this record by it.
    pub processor_subscription_id: Option<String>,

    /// The processor's customer reference.
    pub processor_customer_id: Option<String>,

    /// Start of the current billing period.
    pub current_period_start: Option<Timestamp>,

    /// End of the current billing period.
    pub current_period_end: Option<Timestamp>,

    /// When cancellation was recorded.
    pub canceled_at: Option<Timestamp>,

    /// Trial window, when the plan has one.
    pub trial_start: Option<Timestamp>,
    pub trial_end: Option<Timestamp>,

    /// When the subscription was created.
    pub created_at: Timestamp,

    /// When the subscription was last updated.
    pub updated_at: Timestamp,

    /// Events queued since load, drained after a successful save.
    #[serde(skip)]
    pending_events: Vec<SubscriptionEvent>,
}

impl Subscription {
    /// Creates a new subscription in `Incomplete`.
    pub fn new(id: SubscriptionId, user_id: UserId, plan_id: PlanId, amount: Money) -> Self {
        let now = Timestamp::now();
        Self {
            id,
            user_id,
            plan_id,
            amount,
            status: SubscriptionStatus::Incomplete,
            processor_subscription_id: None,
            processor_customer_id: None,
            current_period_start: None,
            current_period_end: None,
            canceled_at: None,
            trial_start: None,
            trial_end: None,
            created_at: now,
            updated_at: now,
            pending_events: Vec::new(),
        }
    }

    /// Rebuilds a subscription from persisted fields. The caller assigns
    /// the remaining public fields; the pending-events queue starts
    /// empty because events only accumulate between load and save.
    pub fn rehydrate(
        id: SubscriptionId,
        user_id: UserId,
        plan_id: PlanId,
        amount: Money,
        status: SubscriptionStatus,
    ) -> Self {
        let mut subscription = Self::new(id, user_id, plan_id, amount);
        subscription.status = status;
        subscription
    }

    /// Records the processor's references once the gateway acknowledges
    /// the subscription.
    pub fn record_processor_refs(
        &mut self,
        subscription_id: impl Into<String>,
        customer_id: Option<String>,
    ) {
        self.processor_subscription_id = Some(subscription_id.into());
        if customer_id.is_some() {
            self.processor_customer_id = customer_id;
        }
        self.updated_at = Timestamp::now();
    }

    /// Activates the subscription, refreshing the billing period.
    ///
    /// Idempotent: callable repeatedly. `SubscriptionCreated` is queued
    /// only the first time the subscription becomes Active (arriving
    /// from Incomplete or Trialing); later refreshes and recoveries are
    /// silent.
    pub fn activate(
        &mut self,
        period_start: Timestamp,
        period_end: Timestamp,
    ) -> Result<(), DomainError> {
        let first_activation = matches!(
            self.status,
            SubscriptionStatus::Incomplete | SubscriptionStatus::Trialing
        );
        self.transition_to(SubscriptionStatus::Active)?;
        self.current_period_start = Some(period_start);
        self.current_period_end = Some(period_end);
        let now = Timestamp::now();
        self.updated_at = now;

        if first_activation {
            self.pending_events
                .push(SubscriptionEvent::Created(SubscriptionCreated {
                    event_id: EventId::new(),
                    subscription_id: self.id,
                    user_id: self.user_id.clone(),
                    plan_id: self.plan_id.clone(),
                    amount: self.amount.clone(),
                    period_start,
                    period_end,
                    occurred_at: now,
                }));
        }
        Ok(())
    }

    /// Starts the trial period.
    pub fn start_trial(
        &mut self,
        trial_start: Timestamp,
        trial_end: Timestamp,
    ) -> Result<(), DomainError> {
        self.transition_to(SubscriptionStatus::Trialing)?;
        self.trial_start = Some(trial_start);
        self.trial_end = Some(trial_end);
        self.updated_at = Timestamp::now();
        Ok(())
    }

    /// Marks a renewal charge as failed; the processor is retrying.
    pub fn mark_past_due(&mut self) -> Result<(), DomainError> {
        self.transition_to(SubscriptionStatus::PastDue)?;
        self.updated_at = Timestamp::now();
        Ok(())
    }

    /// Cancels the subscription.
    pub fn cancel(&mut self) -> Result<(), DomainError> {
        self.transition_to(SubscriptionStatus::Canceled)?;
        self.canceled_at = Some(Timestamp::now());
        self.updated_at = Timestamp::now();
        Ok(())
    }

    /// Marks the subscription unpaid after retries were exhausted.
    pub fn mark_unpaid(&mut self) -> Result<(), DomainError> {
        self.transition_to(SubscriptionStatus::Unpaid)?;
        self.updated_at = Timestamp::now();
        Ok(())
    }

    /// Pauses billing.
    pub fn pause(&mut self) -> Result<(), DomainError> {
        self.transition_to(SubscriptionStatus::Paused)?;
        self.updated_at = Timestamp::now();
        Ok(())
    }

    /// Resumes billing after a pause.
    pub fn resume(&mut self) -> Result<(), DomainError> {
        if self.status != SubscriptionStatus::Paused {
            return Err(DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!("Cannot resume subscription from {:?}", self.status),
            ));
        }
        self.transition_to(SubscriptionStatus::Active)?;
        self.updated_at = Timestamp::now();
        Ok(())
    }

    /// Moves the subscription to a different plan.
    pub fn update_plan(&mut self, plan_id: PlanId, amount: Money) {
        self.plan_id = plan_id;
        self.amount = amount;
        self.updated_at = Timestamp::now();
    }

    /// Refreshes the billing period without a status change (renewal
    /// invoices).
    pub fn refresh_period(&mut self, period_start: Timestamp, period_end: Timestamp) {
        self.current_period_start = Some(period_start);
        self.current_period_end = Some(period_end);
        self.updated_at = Timestamp::now();
    }

    /// Drains the events queued since load. Call after a successful
    /// persistence write.
    pub fn drain_events(&mut self) -> Vec<SubscriptionEvent> {
        std::mem::take(&mut self.pending_events)
    }

    /// Returns the queued events without draining (test assertions).
    pub fn pending_events(&self) -> &[SubscriptionEvent] {
        &self.pending_events
    }

    fn transition_to(&mut self, target: SubscriptionStatus) -> Result<(), DomainError> {
        self.status = self.status.transition_to(target).map_err(|_| {
            DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!(
                    "Cannot transition subscription from {:?} to {:?}",
                    self.status, target
                ),
            )
        })?;
        Ok(())
    }
}
