//! Subscription repository port (write side).

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, SubscriptionId, UserId};
use crate::domain::subscription::Subscription;

/// Repository port for Subscription aggregate persistence.
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// Saves a new subscription.
    async fn save(&self, subscription: &Subscription) -> Result<(), DomainError>;

    /// Updates an existing subscription.
    ///
    /// # Errors
    ///
    /// - `SubscriptionNotFound` if the subscription doesn't exist
    /// - `DatabaseError` on persistence failure
    async fn update(&self, subscription: &Subscription) -> Result<(), DomainError>;

    /// Finds a subscription by its ID.
    async fn find_by_id(&self, id: &SubscriptionId)
        -> Result<Option<Subscription>, DomainError>;

    /// Finds a subscription by the processor's subscription reference.
    ///
    /// Returns `None` when no local record matches - webhook callers
    /// treat that as a benign skip, not an error.
    async fn find_by_processor_reference(
        &self,
        reference: &str,
    ) -> Result<Option<Subscription>, DomainError>;

    /// Lists a user's subscriptions, newest first.
    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Subscription>, DomainError>;
}
