//! CancelPaymentHandler - local-only cancellation of a pending charge.

use std::sync::Arc;

use crate::domain::foundation::{DomainError, ErrorCode, PaymentId};
use crate::domain::payment::Payment;
use crate::ports::PaymentRepository;

/// Command to cancel a payment that has not reached the gateway.
#[derive(Debug, Clone)]
pub struct CancelPaymentCommand {
    pub payment_id: PaymentId,
}

/// Handler for cancelling pending payments. Local-only: nothing exists
/// at the processor to undo.
pub struct CancelPaymentHandler {
    payments: Arc<dyn PaymentRepository>,
}

impl CancelPaymentHandler {
    pub fn new(payments: Arc<dyn PaymentRepository>) -> Self {
        Self { payments }
    }

    pub async fn handle(&self, cmd: CancelPaymentCommand) -> Result<Payment, DomainError> {
        let mut payment = self
            .payments
            .find_by_id(&cmd.payment_id)
            .await?
            .ok_or_else(|| {
                DomainError::new(
                    ErrorCode::PaymentNotFound,
                    format!("Payment {} not found", cmd.payment_id),
                )
            })?;

        payment.cancel()?;
        self.payments.update(&payment).await?;

        Ok(payment)
    }
}
