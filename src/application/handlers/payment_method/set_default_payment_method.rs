//! SetDefaultPaymentMethodHandler - switches the user's default
//! instrument.
//!
//! The invariant (at most one active default per user) is enforced by
//! the repository's single conditional update, so concurrent calls for
//! the same user converge on exactly one default.

use std::sync::Arc;

use crate::domain::foundation::{DomainError, ErrorCode, PaymentMethodId, UserId};
use crate::domain::payment_method::PaymentMethod;
use crate::ports::PaymentMethodRepository;

/// Command to make a stored method the user's default.
#[derive(Debug, Clone)]
pub struct SetDefaultPaymentMethodCommand {
    pub user_id: UserId,
    pub method_id: PaymentMethodId,
}

/// Handler for switching the default payment method.
pub struct SetDefaultPaymentMethodHandler {
    methods: Arc<dyn PaymentMethodRepository>,
}

impl SetDefaultPaymentMethodHandler {
    pub fn new(methods: Arc<dyn PaymentMethodRepository>) -> Self {
        Self { methods }
    }

    pub async fn handle(
        &self,
        cmd: SetDefaultPaymentMethodCommand,
    ) -> Result<PaymentMethod, DomainError> {
        self.methods
            .set_default_exclusive(&cmd.user_id, &cmd.method_id)
            .await?;

        self.methods
            .find_by_id(&cmd.method_id)
            .await?
            .ok_or_else(|| {
                DomainError::new(
                    ErrorCode::PaymentMethodNotFound,
                    format!("Payment method {} not found", cmd.method_id),
                )
            })
    }
}
