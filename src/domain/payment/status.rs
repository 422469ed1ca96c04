//! Payment status state machine.

use crate::domain::foundation::StateMachine;
use serde::{Deserialize, Serialize};

/// Status of a single charge attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Created locally, gateway not yet consulted.
    Pending,

    /// Gateway acknowledged the charge; completion arrives via webhook.
    Processing,

    /// Charge settled successfully.
    Succeeded,

    /// Charge failed. `failure_reason` records why.
    Failed,

    /// Charge abandoned before settlement.
    Cancelled,

    /// Full amount returned to the payer.
    Refunded,

    /// Part of the amount returned; more refunds may follow.
    PartiallyRefunded,
}

impl PaymentStatus {
    /// Returns true once the charge has reached an outcome (settled,
    /// failed, cancelled or refunded).
    pub fn is_settled(&self) -> bool {
        !matches!(self, PaymentStatus::Pending | PaymentStatus::Processing)
    }
}

impl StateMachine for PaymentStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use PaymentStatus::*;
        matches!(
            (self, target),
            // From PENDING
            (Pending, Processing)
                | (Pending, Succeeded)
                | (Pending, Failed)
                | (Pending, Cancelled)
            // From PROCESSING
                | (Processing, Processing) // repeated gateway acks
                | (Processing, Succeeded)
                | (Processing, Failed)
            // From SUCCEEDED
                | (Succeeded, Refunded)
                | (Succeeded, PartiallyRefunded)
            // From PARTIALLY_REFUNDED
                | (PartiallyRefunded, PartiallyRefunded)
                | (PartiallyRefunded, Refunded)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use PaymentStatus::*;
        match self {
            Pending => vec![Processing, Succeeded, Failed, Cancelled],
            Processing => vec![Processing, Succeeded, Failed],
            Succeeded => vec![Refunded, PartiallyRefunded],
            PartiallyRefunded => vec![PartiallyRefunded, Refunded],
            Failed | Cancelled | Refunded => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_can_reach_every_first_outcome() {
        let status = PaymentStatus::Pending;
        assert!(status.can_transition_to(&PaymentStatus::Processing));
        assert!(status.can_transition_to(&PaymentStatus::Succeeded));
        assert!(status.can_transition_to(&PaymentStatus::Failed));
        assert!(status.can_transition_to(&PaymentStatus::Cancelled));
    }

    #[test]
    fn pending_cannot_be_refunded() {
        assert!(!PaymentStatus::Pending.can_transition_to(&PaymentStatus::Refunded));
    }

    #[test]
    fn processing_cannot_be_cancelled() {
        assert!(!PaymentStatus::Processing.can_transition_to(&PaymentStatus::Cancelled));
    }

    #[test]
    fn succeeded_only_moves_to_refund_states() {
        let status = PaymentStatus::Succeeded;
        assert!(status.can_transition_to(&PaymentStatus::Refunded));
        assert!(status.can_transition_to(&PaymentStatus::PartiallyRefunded));
        assert!(!status.can_transition_to(&PaymentStatus::Failed));
        assert!(!status.can_transition_to(&PaymentStatus::Succeeded));
    }

    #[test]
    fn partially_refunded_can_complete_the_refund() {
        let status = PaymentStatus::PartiallyRefunded;
        assert!(status.can_transition_to(&PaymentStatus::Refunded));
        assert!(status.can_transition_to(&PaymentStatus::PartiallyRefunded));
    }

    #[test]
    fn failed_cancelled_refunded_are_terminal() {
        assert!(PaymentStatus::Failed.is_terminal());
        assert!(PaymentStatus::Cancelled.is_terminal());
        assert!(PaymentStatus::Refunded.is_terminal());
        assert!(!PaymentStatus::Succeeded.is_terminal());
    }

    #[test]
    fn settled_covers_all_outcomes() {
        assert!(!PaymentStatus::Pending.is_settled());
        assert!(!PaymentStatus::Processing.is_settled());
        assert!(PaymentStatus::Succeeded.is_settled());
        assert!(PaymentStatus::Failed.is_settled());
        assert!(PaymentStatus::PartiallyRefunded.is_settled());
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&PaymentStatus::PartiallyRefunded).unwrap();
        assert_eq!(json, "\"partially_refunded\"");
    }
}
