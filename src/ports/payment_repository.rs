//! Payment repository port (write side).
//!
//! `find_by_processor_reference` is the webhook path's lookup: it must
//! match either the in-flight intent id or the settled charge id, since
//! different event types carry different references for the same charge.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, PaymentId, UserId};
use crate::domain::payment::Payment;

/// Repository port for Payment aggregate persistence.
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    /// Saves a new payment.
    async fn save(&self, payment: &Payment) -> Result<(), DomainError>;

    /// Updates an existing payment.
    ///
    /// # Errors
    ///
    /// - `PaymentNotFound` if the payment doesn't exist
    /// - `DatabaseError` on persistence failure
    async fn update(&self, payment: &Payment) -> Result<(), DomainError>;

    /// Finds a payment by its ID.
    async fn find_by_id(&self, id: &PaymentId) -> Result<Option<Payment>, DomainError>;

    /// Finds a payment by the processor's charge or intent reference.
    ///
    /// Returns `None` when no local record matches - webhook callers
    /// treat that as a benign skip, not an error.
    async fn find_by_processor_reference(
        &self,
        reference: &str,
    ) -> Result<Option<Payment>, DomainError>;

    /// Lists a user's payments, newest first.
    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Payment>, DomainError>;
}
