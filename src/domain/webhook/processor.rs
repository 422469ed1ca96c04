//! Webhook routing and idempotent processing.
//!
//! Three pieces cooperate here:
//! - `EventReconciler` - per-event-type logic mapping a processor
//!   notification to a local state transition
//! - `EventRouter` - a registration map from event type to reconciler,
//!   validated at startup so an unhandled type is a deliberate, visible
//!   no-op rather than a silently-falling-through branch
//! - `IdempotentWebhookProcessor` - event-id deduplication around the
//!   router, so at-least-once delivery applies each event once
//!
//! ## Race Condition Handling
//!
//! When the same event is delivered concurrently, the first record save
//! wins (PRIMARY KEY on the event id); the loser observes
//! `AlreadyExists` and acknowledges without re-applying.
//!
//! ## Failure Handling
//!
//! A reconciler failure is NOT recorded: the processor receives a server
//! error and redelivers, and the retry must be able to re-attempt the
//! transition. Only successful and intentionally-skipped events enter
//! the dedup table.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::ports::{SaveResult, WebhookEventRecord, WebhookEventRepository, WebhookResult};

use super::errors::WebhookError;
use super::event::{GatewayEvent, GatewayEventType};

/// Outcome of applying a single event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// A local transition was applied and persisted.
    Applied,

    /// The event was acknowledged without a local change (unknown
    /// aggregate, informational event type).
    Skipped(String),
}

/// Reconciler for one or more processor event types.
///
/// Implementations look up the local aggregate by the processor's
/// correlation id and apply the matching transition. An aggregate that
/// cannot be found is a skip, not an error: the event may belong to an
/// entity created outside this system, or arrive before the synchronous
/// write commits.
#[async_trait]
pub trait EventReconciler: Send + Sync {
    /// The event types this reconciler processes.
    fn handles(&self) -> Vec<GatewayEventType>;

    /// Applies the event to local state.
    async fn reconcile(&self, event: &GatewayEvent) -> Result<ReconcileOutcome, WebhookError>;
}

/// Registration map from event type to reconciler.
pub struct EventRouter {
    reconcilers: HashMap<GatewayEventType, Arc<dyn EventReconciler>>,
}

impl EventRouter {
    /// Every event type the service commits to handling. `validate`
    /// checks the map covers all of them at startup.
    pub const EXPECTED_TYPES: [GatewayEventType; 10] = [
        GatewayEventType::ChargeSucceeded,
        GatewayEventType::ChargeFailed,
        GatewayEventType::PaymentIntentSucceeded,
        GatewayEventType::PaymentIntentFailed,
        GatewayEventType::InvoicePaid,
        GatewayEventType::InvoicePaymentFailed,
        GatewayEventType::SubscriptionCreated,
        GatewayEventType::SubscriptionUpdated,
        GatewayEventType::SubscriptionDeleted,
        GatewayEventType::PaymentMethodAttached,
    ];

    /// Creates an empty router.
    pub fn new() -> Self {
        Self {
            reconcilers: HashMap::new(),
        }
    }

    /// Registers a reconciler for every type it declares.
    pub fn register(mut self, reconciler: Arc<dyn EventReconciler>) -> Self {
        for event_type in reconciler.handles() {
            self.reconcilers.insert(event_type, reconciler.clone());
        }
        self
    }

    /// Checks every expected event type has a registered reconciler.
    ///
    /// Call at startup; a gap here is a wiring bug, not a runtime
    /// condition.
    pub fn validate(&self) -> Result<(), String> {
        let missing: Vec<&str> = Self::EXPECTED_TYPES
            .iter()
            .filter(|t| !self.reconcilers.contains_key(t))
            .map(|t| t.as_str())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(format!(
                "No reconciler registered for event types: {}",
                missing.join(", ")
            ))
        }
    }

    /// Finds the reconciler for an event type.
    pub fn get(&self, event_type: &GatewayEventType) -> Option<&Arc<dyn EventReconciler>> {
        self.reconcilers.get(event_type)
    }

    /// Routes an event to its reconciler.
    ///
    /// Unknown and unregistered types are acknowledged as skips; an
    /// unhandled type must never cause the processor to retry forever.
    pub async fn dispatch(
        &self,
        event: &GatewayEvent,
    ) -> Result<ReconcileOutcome, WebhookError> {
        let event_type = event.parsed_type();
        if event_type == GatewayEventType::Unknown {
            tracing::info!(
                event_id = %event.id,
                event_type = %event.event_type,
                "Unhandled webhook event type, acknowledging"
            );
            return Ok(ReconcileOutcome::Skipped(format!(
                "unhandled event type: {}",
                event.event_type
            )));
        }
        match self.get(&event_type) {
            Some(reconciler) => reconciler.reconcile(event).await,
            None => {
                tracing::warn!(
                    event_id = %event.id,
                    event_type = %event.event_type,
                    "No reconciler registered for known event type"
                );
                Ok(ReconcileOutcome::Skipped(format!(
                    "no reconciler for: {}",
                    event.event_type
                )))
            }
        }
    }
}

impl Default for EventRouter {
    fn default() -> Self {
        Self::new()
    }
}

/// Processes webhook events exactly once from the processor's point of
/// view.
pub struct IdempotentWebhookProcessor {
    repository: Arc<dyn WebhookEventRepository>,
    router: EventRouter,
}

impl IdempotentWebhookProcessor {
    /// Creates a processor over the given dedup store and router.
    pub fn new(repository: Arc<dyn WebhookEventRepository>, router: EventRouter) -> Self {
        Self { repository, router }
    }

    /// Applies one verified event.
    ///
    /// # Returns
    ///
    /// - `Ok(WebhookResult::Processed)` - transition applied
    /// - `Ok(WebhookResult::Skipped)` - benign no-op, acknowledged
    /// - `Ok(WebhookResult::AlreadyProcessed)` - duplicate delivery
    /// - `Err(_)` - processing failed; the processor should redeliver
    pub async fn process(&self, event: GatewayEvent) -> Result<WebhookResult, WebhookError> {
        if self.repository.find_by_event_id(&event.id).await?.is_some() {
            tracing::info!(event_id = %event.id, "Duplicate webhook delivery, acknowledging");
            return Ok(WebhookResult::AlreadyProcessed);
        }

        let outcome = self.router.dispatch(&event).await?;

        let payload = serde_json::to_value(&event)
            .map_err(|e| WebhookError::ParseError(format!("Failed to serialize event: {}", e)))?;
        let record = match &outcome {
            ReconcileOutcome::Applied => {
                WebhookEventRecord::success(&event.id, &event.event_type, payload)
            }
            ReconcileOutcome::Skipped(reason) => {
                WebhookEventRecord::ignored(&event.id, &event.event_type, reason, payload)
            }
        };

        match self.repository.save(record).await? {
            SaveResult::Inserted => Ok(match outcome {
                ReconcileOutcome::Applied => WebhookResult::Processed,
                ReconcileOutcome::Skipped(_) => WebhookResult::Skipped,
            }),
            // Lost the race with a concurrent delivery of the same event.
            SaveResult::AlreadyExists => Ok(WebhookResult::AlreadyProcessed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::event::GatewayEventBuilder;
    use crate::domain::foundation::DomainError;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    // ══════════════════════════════════════════════════════════════
    // Test Infrastructure
    // ══════════════════════════════════════════════════════════════

    struct MockWebhookRepository {
        records: Mutex<HashMap<String, WebhookEventRecord>>,
        force_already_exists: bool,
    }

    impl MockWebhookRepository {
        fn new() -> Self {
            Self {
                records: Mutex::new(HashMap::new()),
                force_already_exists: false,
            }
        }

        fn racing() -> Self {
            Self {
                records: Mutex::new(HashMap::new()),
                force_already_exists: true,
            }
        }

        fn record_count(&self) -> usize {
            self.records.lock().unwrap().len()
        }

        fn result_for(&self, event_id: &str) -> Option<String> {
            self.records
                .lock()
                .unwrap()
                .get(event_id)
                .map(|r| r.result.clone())
        }
    }

    #[async_trait]
    impl WebhookEventRepository for MockWebhookRepository {
        async fn find_by_event_id(
            &self,
            event_id: &str,
        ) -> Result<Option<WebhookEventRecord>, DomainError> {
            Ok(self.records.lock().unwrap().get(event_id).cloned())
        }

        async fn save(&self, record: WebhookEventRecord) -> Result<SaveResult, DomainError> {
            if self.force_already_exists {
                return Ok(SaveResult::AlreadyExists);
            }
            let mut records = self.records.lock().unwrap();
            if records.contains_key(&record.event_id) {
                Ok(SaveResult::AlreadyExists)
            } else {
                records.insert(record.event_id.clone(), record);
                Ok(SaveResult::Inserted)
            }
        }
    }

    struct MockReconciler {
        handles_types: Vec<GatewayEventType>,
        call_count: AtomicU32,
        behavior: MockBehavior,
    }

    enum MockBehavior {
        Apply,
        Skip,
        Fail,
    }

    impl MockReconciler {
        fn applying(handles: Vec<GatewayEventType>) -> Self {
            Self {
                handles_types: handles,
                call_count: AtomicU32::new(0),
                behavior: MockBehavior::Apply,
            }
        }

        fn skipping(handles: Vec<GatewayEventType>) -> Self {
            Self {
                handles_types: handles,
                call_count: AtomicU32::new(0),
                behavior: MockBehavior::Skip,
            }
        }

        fn failing(handles: Vec<GatewayEventType>) -> Self {
            Self {
                handles_types: handles,
                call_count: AtomicU32::new(0),
                behavior: MockBehavior::Fail,
            }
        }

        fn call_count(&self) -> u32 {
            self.call_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl EventReconciler for MockReconciler {
        fn handles(&self) -> Vec<GatewayEventType> {
            self.handles_types.clone()
        }

        async fn reconcile(
            &self,
            _event: &GatewayEvent,
        ) -> Result<ReconcileOutcome, WebhookError> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            match self.behavior {
                MockBehavior::Apply => Ok(ReconcileOutcome::Applied),
                MockBehavior::Skip => {
                    Ok(ReconcileOutcome::Skipped("no matching aggregate".to_string()))
                }
                MockBehavior::Fail => Err(WebhookError::Database("simulated failure".to_string())),
            }
        }
    }

    fn charge_event(id: &str) -> GatewayEvent {
        GatewayEventBuilder::new()
            .id(id)
            .event_type("charge.succeeded")
            .build()
    }

    // ══════════════════════════════════════════════════════════════
    // EventRouter Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn router_finds_reconciler_for_registered_type() {
        let router = EventRouter::new().register(Arc::new(MockReconciler::applying(vec![
            GatewayEventType::ChargeSucceeded,
        ])));

        assert!(router.get(&GatewayEventType::ChargeSucceeded).is_some());
        assert!(router.get(&GatewayEventType::InvoicePaid).is_none());
    }

    #[test]
    fn router_validate_reports_missing_types() {
        let router = EventRouter::new().register(Arc::new(MockReconciler::applying(vec![
            GatewayEventType::ChargeSucceeded,
        ])));

        let err = router.validate().unwrap_err();
        assert!(err.contains("invoice.paid"));
        assert!(!err.contains("charge.succeeded"));
    }

    #[test]
    fn router_validate_passes_with_full_coverage() {
        let router = EventRouter::new().register(Arc::new(MockReconciler::applying(
            EventRouter::EXPECTED_TYPES.to_vec(),
        )));

        assert!(router.validate().is_ok());
    }

    #[tokio::test]
    async fn router_skips_unknown_event_types() {
        let router = EventRouter::new();
        let event = GatewayEventBuilder::new()
            .event_type("customer.created")
            .build();

        let outcome = router.dispatch(&event).await.unwrap();
        assert!(matches!(outcome, ReconcileOutcome::Skipped(_)));
    }

    #[tokio::test]
    async fn router_skips_known_but_unregistered_types() {
        let router = EventRouter::new();
        let event = charge_event("evt_1");

        let outcome = router.dispatch(&event).await.unwrap();
        assert!(matches!(outcome, ReconcileOutcome::Skipped(_)));
    }

    // ══════════════════════════════════════════════════════════════
    // IdempotentWebhookProcessor Tests
    // ══════════════════════════════════════════════════════════════

    fn processor_with(
        repo: Arc<MockWebhookRepository>,
        reconciler: Arc<MockReconciler>,
    ) -> IdempotentWebhookProcessor {
        let router = EventRouter::new().register(reconciler);
        IdempotentWebhookProcessor::new(repo, router)
    }

    #[tokio::test]
    async fn processor_applies_new_event() {
        let repo = Arc::new(MockWebhookRepository::new());
        let reconciler = Arc::new(MockReconciler::applying(vec![
            GatewayEventType::ChargeSucceeded,
        ]));
        let processor = processor_with(repo.clone(), reconciler.clone());

        let result = processor.process(charge_event("evt_new")).await.unwrap();

        assert_eq!(result, WebhookResult::Processed);
        assert_eq!(reconciler.call_count(), 1);
        assert_eq!(repo.result_for("evt_new").as_deref(), Some("success"));
    }

    #[tokio::test]
    async fn processor_acknowledges_duplicate_without_reapplying() {
        let repo = Arc::new(MockWebhookRepository::new());
        let reconciler = Arc::new(MockReconciler::applying(vec![
            GatewayEventType::ChargeSucceeded,
        ]));
        let processor = processor_with(repo.clone(), reconciler.clone());

        processor.process(charge_event("evt_dup")).await.unwrap();
        let result = processor.process(charge_event("evt_dup")).await.unwrap();

        assert_eq!(result, WebhookResult::AlreadyProcessed);
        assert_eq!(reconciler.call_count(), 1);
        assert_eq!(repo.record_count(), 1);
    }

    #[tokio::test]
    async fn processor_records_skips_as_ignored() {
        let repo = Arc::new(MockWebhookRepository::new());
        let reconciler = Arc::new(MockReconciler::skipping(vec![
            GatewayEventType::ChargeSucceeded,
        ]));
        let processor = processor_with(repo.clone(), reconciler);

        let result = processor.process(charge_event("evt_skip")).await.unwrap();

        assert_eq!(result, WebhookResult::Skipped);
        assert_eq!(repo.result_for("evt_skip").as_deref(), Some("ignored"));
    }

    #[tokio::test]
    async fn processor_failure_leaves_no_record_so_retry_reapplies() {
        let repo = Arc::new(MockWebhookRepository::new());
        let reconciler = Arc::new(MockReconciler::failing(vec![
            GatewayEventType::ChargeSucceeded,
        ]));
        let processor = processor_with(repo.clone(), reconciler.clone());

        let result = processor.process(charge_event("evt_fail")).await;

        assert!(result.is_err());
        assert_eq!(repo.record_count(), 0);

        // Redelivery reaches the reconciler again.
        let _ = processor.process(charge_event("evt_fail")).await;
        assert_eq!(reconciler.call_count(), 2);
    }

    #[tokio::test]
    async fn processor_handles_lost_save_race_as_already_processed() {
        let repo = Arc::new(MockWebhookRepository::racing());
        let reconciler = Arc::new(MockReconciler::applying(vec![
            GatewayEventType::ChargeSucceeded,
        ]));
        let processor = processor_with(repo, reconciler);

        let result = processor.process(charge_event("evt_race")).await.unwrap();

        assert_eq!(result, WebhookResult::AlreadyProcessed);
    }

    #[tokio::test]
    async fn processor_acknowledges_unknown_types() {
        let repo = Arc::new(MockWebhookRepository::new());
        let reconciler = Arc::new(MockReconciler::applying(vec![
            GatewayEventType::ChargeSucceeded,
        ]));
        let processor = processor_with(repo.clone(), reconciler);

        let event = GatewayEventBuilder::new()
            .id("evt_unknown")
            .event_type("account.updated")
            .build();
        let result = processor.process(event).await.unwrap();

        assert_eq!(result, WebhookResult::Skipped);
        assert_eq!(repo.result_for("evt_unknown").as_deref(), Some("ignored"));
    }
}
