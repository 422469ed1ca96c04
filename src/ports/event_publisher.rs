//! EventPublisher port - fire-and-forget notification of state
//! transitions to other collaborators (email, search indexing,
//! analytics).
//!
//! Events are published only after the triggering persistence write
//! succeeds. If publication itself fails the local state change is
//! already durable and must not be rolled back: callers log the failure
//! and move on (at-least-once, best-effort semantics).

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, EventEnvelope};

/// Port for publishing domain events.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publishes a single event.
    async fn publish(&self, event: EventEnvelope) -> Result<(), DomainError>;

    /// Publishes multiple events, sequentially with best-effort delivery.
    async fn publish_all(&self, events: Vec<EventEnvelope>) -> Result<(), DomainError>;
}
