//! Application layer - command handlers and webhook reconcilers.

pub mod handlers;
pub mod reconcilers;

use crate::domain::foundation::EventEnvelope;
use crate::ports::EventPublisher;

/// Publishes envelopes after a committed write.
///
/// Failures are swallowed and logged: the state change is already
/// durable and must not be rolled back because a collaborator could not
/// be notified (at-least-once, best-effort semantics).
pub(crate) async fn publish_after_commit(
    publisher: &dyn EventPublisher,
    envelopes: Vec<EventEnvelope>,
) {
    for envelope in envelopes {
        if let Err(err) = publisher.publish(envelope.clone()).await {
            tracing::warn!(
                event_id = %envelope.event_id,
                event_type = %envelope.event_type,
                error = %err,
                "Failed to publish domain event, continuing"
            );
        }
    }
}
