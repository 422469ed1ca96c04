//! In-memory event bus.
//!
//! Synchronous, capturing implementation of `EventPublisher`. Used as
//! the default wiring (downstream collaborators subscribe in-process)
//! and by tests, which assert on the captured envelopes.

use async_trait::async_trait;
use std::sync::RwLock;

use crate::domain::foundation::{DomainError, ErrorCode, EventEnvelope};
use crate::ports::EventPublisher;

/// In-memory event bus with event capture.
///
/// # Example
///
/// ```ignore
/// let bus = Arc::new(InMemoryEventBus::new());
/// bus.publish(envelope).await?;
/// assert_eq!(bus.event_count(), 1);
/// ```
pub struct InMemoryEventBus {
    published: RwLock<Vec<EventEnvelope>>,
    fail_publish: bool,
}

impl InMemoryEventBus {
    /// Creates a new empty bus.
    pub fn new() -> Self {
        Self {
            published: RwLock::new(Vec::new()),
            fail_publish: false,
        }
    }

    /// Creates a bus whose publishes always fail (for asserting
    /// best-effort semantics).
    pub fn failing() -> Self {
        Self {
            published: RwLock::new(Vec::new()),
            fail_publish: true,
        }
    }

    /// Returns all published events.
    pub fn published_events(&self) -> Vec<EventEnvelope> {
        self.published
            .read()
            .expect("InMemoryEventBus: lock poisoned")
            .clone()
    }

    /// Returns events of a specific type.
    pub fn events_of_type(&self, event_type: &str) -> Vec<EventEnvelope> {
        self.published_events()
            .into_iter()
            .filter(|e| e.event_type == event_type)
            .collect()
    }

    /// Returns the count of published events.
    pub fn event_count(&self) -> usize {
        self.published
            .read()
            .expect("InMemoryEventBus: lock poisoned")
            .len()
    }

    /// Clears all published events (test isolation).
    pub fn clear(&self) {
        self.published
            .write()
            .expect("InMemoryEventBus: lock poisoned")
            .clear();
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: EventEnvelope) -> Result<(), DomainError> {
        if self.fail_publish {
            return Err(DomainError::new(
                ErrorCode::InternalError,
                "simulated publish failure",
            ));
        }
        self.published
            .write()
            .expect("InMemoryEventBus: lock poisoned")
            .push(event);
        Ok(())
    }

    async fn publish_all(&self, events: Vec<EventEnvelope>) -> Result<(), DomainError> {
        for event in events {
            self.publish(event).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope(event_type: &str) -> EventEnvelope {
        EventEnvelope::new(event_type, "agg-1", "Payment", json!({}))
    }

    #[tokio::test]
    async fn captures_published_events() {
        let bus = InMemoryEventBus::new();

        bus.publish(envelope("payment.processed")).await.unwrap();
        bus.publish(envelope("payment.failed")).await.unwrap();

        assert_eq!(bus.event_count(), 2);
        assert_eq!(bus.events_of_type("payment.processed").len(), 1);
    }

    #[tokio::test]
    async fn publish_all_preserves_order() {
        let bus = InMemoryEventBus::new();

        bus.publish_all(vec![
            envelope("subscription.created"),
            envelope("payment.processed"),
        ])
        .await
        .unwrap();

        let events = bus.published_events();
        assert_eq!(events[0].event_type, "subscription.created");
        assert_eq!(events[1].event_type, "payment.processed");
    }

    #[tokio::test]
    async fn failing_bus_rejects_publishes() {
        let bus = InMemoryEventBus::failing();

        assert!(bus.publish(envelope("payment.processed")).await.is_err());
        assert_eq!(bus.event_count(), 0);
    }

    #[tokio::test]
    async fn clear_empties_the_capture() {
        let bus = InMemoryEventBus::new();
        bus.publish(envelope("payment.processed")).await.unwrap();

        bus.clear();

        assert_eq!(bus.event_count(), 0);
    }
}
