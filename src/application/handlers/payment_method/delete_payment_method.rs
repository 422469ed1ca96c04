//! DeletePaymentMethodHandler - deactivates a stored instrument.
//!
//! Methods are never deleted from the ledger; they deactivate, and
//! deactivation always clears the default flag.

use std::sync::Arc;

use crate::domain::foundation::{DomainError, ErrorCode, PaymentMethodId, UserId};
use crate::domain::payment_method::PaymentMethod;
use crate::ports::PaymentMethodRepository;

/// Command to remove a stored method.
#[derive(Debug, Clone)]
pub struct DeletePaymentMethodCommand {
    pub user_id: UserId,
    pub method_id: PaymentMethodId,
}

/// Handler for removing payment methods.
pub struct DeletePaymentMethodHandler {
    methods: Arc<dyn PaymentMethodRepository>,
}

impl DeletePaymentMethodHandler {
    pub fn new(methods: Arc<dyn PaymentMethodRepository>) -> Self {
        Self { methods }
    }

    pub async fn handle(
        &self,
        cmd: DeletePaymentMethodCommand,
    ) -> Result<PaymentMethod, DomainError> {
        let mut method = self
            .methods
            .find_by_id(&cmd.method_id)
            .await?
            .ok_or_else(|| {
                DomainError::new(
                    ErrorCode::PaymentMethodNotFound,
                    format!("Payment method {} not found", cmd.method_id),
                )
            })?;

        if method.user_id != cmd.user_id {
            return Err(DomainError::new(
                ErrorCode::Forbidden,
                "Payment method belongs to another user",
            ));
        }

        method.deactivate();
        self.methods.update(&method).await?;

        Ok(method)
    }
}
