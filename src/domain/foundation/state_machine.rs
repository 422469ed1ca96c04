//! State machine trait for status enums.
//!
//! Lifecycle statuses (Payment, Subscription) encode their legal
//! transitions as an explicit table. Every mutation goes through
//! `transition_to`, so an illegal transition is rejected before any field
//! is touched.

use super::ValidationError;

/// Trait for status enums that represent state machines.
///
/// Implementors define valid state transitions and get validated
/// transition methods for free.
///
/// # Example
///
/// ```ignore
/// impl StateMachine for PaymentStatus {
///     fn can_transition_to(&self, target: &Self) -> bool {
///         matches!(
///             (self, target),
///             (Pending, Processing) | (Processing, Succeeded) | // ...
///         )
///     }
///
///     fn valid_transitions(&self) -> Vec<Self> {
///         match self {
///             Pending => vec![Processing, Succeeded, Failed, Cancelled],
///             // ... etc
///         }
///     }
/// }
///
/// let new_status = current.transition_to(PaymentStatus::Succeeded)?;
/// ```
pub trait StateMachine: Sized + Copy + PartialEq + std::fmt::Debug {
    /// Returns true if transition from self to target is valid.
    fn can_transition_to(&self, target: &Self) -> bool;

    /// Returns all valid target states from current state.
    fn valid_transitions(&self) -> Vec<Self>;

    /// Performs transition with validation, returning error if invalid.
    fn transition_to(&self, target: Self) -> Result<Self, ValidationError> {
        if self.can_transition_to(&target) {
            Ok(target)
        } else {
            Err(ValidationError::invalid_format(
                "state_transition",
                format!("Cannot transition from {:?} to {:?}", self, target),
            ))
        }
    }

    /// Checks if current state is terminal (no valid outgoing transitions).
    fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum ChargeStatus {
        Created,
        Captured,
        Settled,
        Voided,
    }

    impl StateMachine for ChargeStatus {
        fn can_transition_to(&self, target: &Self) -> bool {
            use ChargeStatus::*;
            matches!(
                (self, target),
                (Created, Captured) | (Created, Voided) | (Captured, Settled)
            )
        }

        fn valid_transitions(&self) -> Vec<Self> {
            use ChargeStatus::*;
            match self {
                Created => vec![Captured, Voided],
                Captured => vec![Settled],
                Settled => vec![],
                Voided => vec![],
            }
        }
    }

    #[test]
    fn transition_to_succeeds_for_valid_transition() {
        let result = ChargeStatus::Created.transition_to(ChargeStatus::Captured);
        assert_eq!(result, Ok(ChargeStatus::Captured));
    }

    #[test]
    fn transition_to_fails_for_invalid_transition() {
        let result = ChargeStatus::Created.transition_to(ChargeStatus::Settled);
        assert!(result.is_err());
    }

    #[test]
    fn terminal_states_have_no_transitions() {
        assert!(ChargeStatus::Settled.is_terminal());
        assert!(ChargeStatus::Voided.is_terminal());
        assert!(!ChargeStatus::Created.is_terminal());
    }
}
