//! PaymentMethod repository port (write side).
//!
//! The single-default-per-user invariant lives here:
//! `set_default_exclusive` replaces the racy "clear all defaults, then
//! set one" sequence with one conditional update, so concurrent calls
//! cannot leave two methods marked default.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, PaymentMethodId, UserId};
use crate::domain::payment_method::PaymentMethod;

/// Repository port for PaymentMethod aggregate persistence.
#[async_trait]
pub trait PaymentMethodRepository: Send + Sync {
    /// Saves a new payment method.
    async fn save(&self, method: &PaymentMethod) -> Result<(), DomainError>;

    /// Updates an existing payment method.
    async fn update(&self, method: &PaymentMethod) -> Result<(), DomainError>;

    /// Finds a method by its ID.
    async fn find_by_id(
        &self,
        id: &PaymentMethodId,
    ) -> Result<Option<PaymentMethod>, DomainError>;

    /// Lists a user's methods, default first.
    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<PaymentMethod>, DomainError>;

    /// Atomically makes `method_id` the user's only default.
    ///
    /// Implementations must perform this as a single conditional write
    /// (e.g. `SET is_default = (id = $2) WHERE user_id = $1`), never as
    /// a read-then-write sequence.
    ///
    /// # Errors
    ///
    /// - `PaymentMethodNotFound` if the method doesn't exist, is
    ///   inactive, or belongs to another user
    async fn set_default_exclusive(
        &self,
        user_id: &UserId,
        method_id: &PaymentMethodId,
    ) -> Result<(), DomainError>;
}
