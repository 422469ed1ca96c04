//! RefundPaymentHandler - command handler for full and partial refunds.

use std::sync::Arc;

use crate::domain::foundation::{DomainError, ErrorCode, Money, PaymentId};
use crate::domain::payment::Payment;
use crate::ports::{PaymentGateway, PaymentRepository, RefundRequest};

/// Command to refund a payment, fully when `amount` is `None`.
#[derive(Debug, Clone)]
pub struct RefundPaymentCommand {
    pub payment_id: PaymentId,
    pub amount: Option<Money>,
}

/// Handler for refunding settled payments.
///
/// Unlike payment creation, gateway errors here propagate to the
/// caller: nothing was refunded, so there is no local state to record.
pub struct RefundPaymentHandler {
    payments: Arc<dyn PaymentRepository>,
    gateway: Arc<dyn PaymentGateway>,
}

impl RefundPaymentHandler {
    pub fn new(payments: Arc<dyn PaymentRepository>, gateway: Arc<dyn PaymentGateway>) -> Self {
        Self { payments, gateway }
    }

    pub async fn handle(&self, cmd: RefundPaymentCommand) -> Result<Payment, DomainError> {
        // 1. Load the payment and its charge reference.
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

        let charge_ref = payment
            .processor_reference()
            .ok_or_else(|| {
                DomainError::new(
                    ErrorCode::MissingProcessorReference,
                    "Payment has no recorded charge reference to refund",
                )
            })?
            .to_string();

        // 2. Validate the refund against the remaining amount before
        //    touching the gateway.
        let remaining = payment.remaining_refundable()?;
        let refund_amount = match cmd.amount {
            Some(amount) => {
                remaining.checked_sub(&amount)?;
                amount
            }
            None => remaining,
        };
        if refund_amount.is_zero() {
            return Err(DomainError::new(
                ErrorCode::InvalidOperation,
                "Nothing left to refund",
            ));
        }

        // 3. Refund at the processor, then record locally.
        self.gateway
            .refund(RefundRequest {
                charge_ref,
                amount: Some(refund_amount.clone()),
            })
            .await
            .map_err(|e| DomainError::new(ErrorCode::GatewayError, e.to_string()))?;

        payment.apply_refund(&refund_amount)?;
        self.payments.update(&payment).await?;

        Ok(payment)
    }
}
