//! WebhookEventRepository port - the processed-webhook dedup table.
//!
//! The processor guarantees at-least-once delivery, not exactly-once:
//! the same event arrives again after timeouts, 5xx responses, or an
//! acknowledgement the processor never received. This store records each
//! applied event id so redelivery becomes an acknowledged no-op, and
//! keeps the payload for auditing.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::foundation::DomainError;

/// Record of a processed webhook event.
#[derive(Debug, Clone)]
pub struct WebhookEventRecord {
    /// Processor event ID (evt_xxx format). Primary key.
    pub event_id: String,

    /// Event type string (e.g., "charge.succeeded").
    pub event_type: String,

    /// When the event was processed.
    pub processed_at: DateTime<Utc>,

    /// Result of processing: "success" or "ignored".
    pub result: String,

    /// Why the event was ignored, when it was.
    pub skip_reason: Option<String>,

    /// Original event payload for auditing.
    pub payload: serde_json::Value,
}

impl WebhookEventRecord {
    /// Creates a record for an applied event.
    pub fn success(
        event_id: impl Into<String>,
        event_type: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            event_type: event_type.into(),
            processed_at: Utc::now(),
            result: "success".to_string(),
            skip_reason: None,
            payload,
        }
    }

    /// Creates a record for a benignly skipped event.
    pub fn ignored(
        event_id: impl Into<String>,
        event_type: impl Into<String>,
        reason: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            event_type: event_type.into(),
            processed_at: Utc::now(),
            result: "ignored".to_string(),
            skip_reason: Some(reason.into()),
            payload,
        }
    }
}

/// Result of attempting to save a webhook event record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveResult {
    /// First time seeing this event.
    Inserted,
    /// Another delivery already recorded it.
    AlreadyExists,
}

/// Result of webhook processing, as reported to the HTTP layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookResult {
    /// A local transition was applied.
    Processed,
    /// Benign no-op (unknown type, unmatched aggregate).
    Skipped,
    /// Duplicate delivery of an already-processed event.
    AlreadyProcessed,
}

/// Port for storing and retrieving processed webhook events.
///
/// Implementations should back `save` with a PRIMARY KEY constraint on
/// the event id so concurrent deliveries race safely: one inserts, the
/// rest observe `AlreadyExists`.
#[async_trait]
pub trait WebhookEventRepository: Send + Sync {
    /// Finds a previously processed event by its processor event ID.
    async fn find_by_event_id(
        &self,
        event_id: &str,
    ) -> Result<Option<WebhookEventRecord>, DomainError>;

    /// Attempts to save a record with `ON CONFLICT DO NOTHING`
    /// semantics.
    async fn save(&self, record: WebhookEventRecord) -> Result<SaveResult, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_record_has_no_skip_reason() {
        let record =
            WebhookEventRecord::success("evt_1", "charge.succeeded", serde_json::json!({}));

        assert_eq!(record.result, "success");
        assert!(record.skip_reason.is_none());
    }

    #[test]
    fn ignored_record_keeps_the_reason() {
        let record = WebhookEventRecord::ignored(
            "evt_2",
            "invoice.payment_failed",
            "logged only",
            serde_json::json!({}),
        );

        assert_eq!(record.result, "ignored");
        assert_eq!(record.skip_reason.as_deref(), Some("logged only"));
    }

    #[test]
    fn webhook_event_repository_is_object_safe() {
        fn _accepts_dyn(_repo: &dyn WebhookEventRepository) {}
    }
}
