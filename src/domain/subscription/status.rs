//! Subscription status state machine.

use crate::domain::foundation::StateMachine;
use serde::{Deserialize, Serialize};

/// Status of a recurring billing arrangement.
///
/// Mirrors the processor's subscription lifecycle so webhook updates map
/// onto local transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// Created locally, first payment not yet confirmed.
    Incomplete,

    /// In a trial period before the first charge.
    Trialing,

    /// Billing normally.
    Active,

    /// A renewal charge failed; the processor is retrying.
    PastDue,

    /// Ended, by the user or the processor.
    Canceled,

    /// Retries exhausted without payment.
    Unpaid,

    /// Billing suspended, resumable.
    Paused,
}

impl StateMachine for SubscriptionStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use SubscriptionStatus::*;
        matches!(
            (self, target),
            // From INCOMPLETE
            (Incomplete, Trialing)
                | (Incomplete, Active)
                | (Incomplete, Canceled)
            // From TRIALING
                | (Trialing, Active)
                | (Trialing, PastDue)
                | (Trialing, Canceled)
                | (Trialing, Unpaid)
                | (Trialing, Paused)
            // From ACTIVE
                | (Active, Active) // billing period refresh
                | (Active, PastDue)
                | (Active, Canceled)
                | (Active, Unpaid)
                | (Active, Paused)
            // From PAST_DUE
                | (PastDue, Active)
                | (PastDue, Canceled)
                | (PastDue, Unpaid)
            // From UNPAID
                | (Unpaid, Active)
                | (Unpaid, Canceled)
            // From PAUSED
                | (Paused, Active)
                | (Paused, Canceled)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use SubscriptionStatus::*;
        match self {
            Incomplete => vec![Trialing, Active, Canceled],
            Trialing => vec![Active, PastDue, Canceled, Unpaid, Paused],
            Active => vec![Active, PastDue, Canceled, Unpaid, Paused],
            PastDue => vec![Active, Canceled, Unpaid],
            Unpaid => vec![Active, Canceled],
            Paused => vec![Active, Canceled],
            Canceled => vec![],
        }
    }
}

impl SubscriptionStatus {
    /// Parses the processor's status string.
    pub fn from_processor(s: &str) -> Option<Self> {
        match s {
            "incomplete" => Some(Self::Incomplete),
            "trialing" => Some(Self::Trialing),
            "active" => Some(Self::Active),
            "past_due" => Some(Self::PastDue),
            "canceled" => Some(Self::Canceled),
            "unpaid" => Some(Self::Unpaid),
            "paused" => Some(Self::Paused),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incomplete_can_start_trial_or_activate() {
        let status = SubscriptionStatus::Incomplete;
        assert!(status.can_transition_to(&SubscriptionStatus::Trialing));
        assert!(status.can_transition_to(&SubscriptionStatus::Active));
        assert!(status.can_transition_to(&SubscriptionStatus::Canceled));
        assert!(!status.can_transition_to(&SubscriptionStatus::PastDue));
    }

    #[test]
    fn active_refresh_is_legal() {
        assert!(SubscriptionStatus::Active.can_transition_to(&SubscriptionStatus::Active));
    }

    #[test]
    fn paused_only_resumes_or_cancels() {
        let status = SubscriptionStatus::Paused;
        assert!(status.can_transition_to(&SubscriptionStatus::Active));
        assert!(status.can_transition_to(&SubscriptionStatus::Canceled));
        assert!(!status.can_transition_to(&SubscriptionStatus::PastDue));
    }

    #[test]
    fn past_due_can_recover() {
        assert!(SubscriptionStatus::PastDue.can_transition_to(&SubscriptionStatus::Active));
    }

    #[test]
    fn canceled_is_terminal() {
        assert!(SubscriptionStatus::Canceled.is_terminal());
    }

    #[test]
    fn processor_strings_round_trip() {
        for (s, expected) in [
            ("active", SubscriptionStatus::Active),
            ("trialing", SubscriptionStatus::Trialing),
            ("past_due", SubscriptionStatus::PastDue),
            ("canceled", SubscriptionStatus::Canceled),
            ("unpaid", SubscriptionStatus::Unpaid),
            ("paused", SubscriptionStatus::Paused),
        ] {
            assert_eq!(SubscriptionStatus::from_processor(s), Some(expected));
        }
        assert_eq!(SubscriptionStatus::from_processor("draft"), None);
    }
}
