//! ProcessPaymentHandler - command handler for one-off charges.
//!
//! The gateway boundary is absorbing: a gateway failure becomes a
//! persisted Failed payment plus a failure event, never an error to the
//! caller. Only pre-gateway validation (unknown stored method) surfaces
//! as an error.

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::foundation::{
    DomainError, ErrorCode, Money, PaymentId, PaymentMethodId, UserId,
};
use crate::domain::payment::Payment;
use crate::domain::payment_method::PaymentMethodKind;
use crate::ports::{
    ChargeRequest, EventPublisher, GatewayChargeStatus, PaymentGateway, PaymentMethodRepository,
    PaymentRepository,
};

use super::super::publish_after_commit;

/// Command to process a one-off payment.
#[derive(Debug, Clone)]
pub struct ProcessPaymentCommand {
    pub user_id: UserId,
    pub amount: Money,
    pub method_kind: PaymentMethodKind,
    pub payment_method_id: Option<PaymentMethodId>,
    pub description: Option<String>,
}

/// Handler for processing one-off payments.
pub struct ProcessPaymentHandler {
    payments: Arc<dyn PaymentRepository>,
    methods: Arc<dyn PaymentMethodRepository>,
    gateway: Arc<dyn PaymentGateway>,
    publisher: Arc<dyn EventPublisher>,
}

impl ProcessPaymentHandler {
    pub fn new(
        payments: Arc<dyn PaymentRepository>,
        methods: Arc<dyn PaymentMethodRepository>,
        gateway: Arc<dyn PaymentGateway>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            payments,
            methods,
            gateway,
            publisher,
        }
    }

    pub async fn handle(&self, cmd: ProcessPaymentCommand) -> Result<Payment, DomainError> {
        // 1. Resolve the stored instrument, when one was named.
        let method_ref = match &cmd.payment_method_id {
            Some(method_id) => {
                let method = self.methods.find_by_id(method_id).await?.ok_or_else(|| {
                    DomainError::new(
                        ErrorCode::PaymentMethodNotFound,
                        format!("Payment method {} not found", method_id),
                    )
                })?;
                method.processor_method_id
            }
            None => None,
        };

        // 2. Create the local record before touching the gateway.
        let mut payment = Payment::new(
            PaymentId::new(),
            cmd.user_id.clone(),
            cmd.amount.clone(),
            cmd.method_kind,
            cmd.payment_method_id,
            cmd.description,
        );

        let mut metadata = HashMap::new();
        metadata.insert("payment_id".to_string(), payment.id.to_string());
        metadata.insert("user_id".to_string(), cmd.user_id.to_string());

        // 3. Call the gateway and branch on the immediate status. Gateway
        //    errors degrade to a Failed record; this command never throws
        //    past the gateway boundary.
        match self
            .gateway
            .create_charge(ChargeRequest {
                amount: cmd.amount,
                method_ref,
                metadata,
            })
            .await
        {
            Ok(charge) => {
                payment.process(charge.id.as_str())?;
                match charge.status {
                    GatewayChargeStatus::Succeeded => payment.succeed()?,
                    GatewayChargeStatus::RequiresAction => {
                        // The payer completes the charge out-of-band; the
                        // webhook finishes the transition.
                    }
                    GatewayChargeStatus::Other(status) => {
                        payment.fail(format!("Unexpected charge status: {}", status))?;
                    }
                }
            }
            Err(err) => {
                tracing::warn!(
                    payment_id = %payment.id,
                    error = %err,
                    "Gateway charge failed, recording failed payment"
                );
                payment.fail(err.to_string())?;
            }
        }

        // 4. Persist, then publish the queued events.
        self.payments.save(&payment).await?;
        let envelopes = payment
            .drain_events()
            .into_iter()
            .map(|e| e.to_envelope())
            .collect();
        publish_after_commit(self.publisher.as_ref(), envelopes).await;

        Ok(payment)
    }
}
