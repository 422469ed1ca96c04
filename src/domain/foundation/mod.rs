//! Shared domain primitives.
//!
//! Value objects, identifiers, errors and event infrastructure used by
//! every aggregate in the crate.

mod errors;
mod events;
mod ids;
mod money;
mod state_machine;
mod timestamp;

pub use errors::{DomainError, ErrorCode, ValidationError};
pub use events::{
    DomainEvent, EventEnvelope, EventId, EventMetadata, SerializableDomainEvent,
};
pub use ids::{PaymentId, PaymentMethodId, PlanId, SubscriptionId, UserId};
pub use money::{Currency, Money};
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
