//! Mock payment gateway for testing.
//!
//! Configurable test double for `PaymentGateway`: pre-programmed
//! responses, error injection, and a call log for assertions.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::ports::{
    ChargeRequest, GatewayCharge, GatewayChargeStatus, GatewayError, GatewayRefund,
    GatewaySubscription, PaymentGateway, RefundRequest, SubscriptionRequest,
};

/// Mock gateway.
///
/// # Example
///
/// ```ignore
/// let gateway = MockGateway::new().charge_succeeds("pi_1");
/// let result = gateway.create_charge(request).await;
/// assert_eq!(gateway.charge_requests().len(), 1);
/// ```
pub struct MockGateway {
    state: Mutex<MockState>,
}

#[derive(Default)]
struct MockState {
    charge_response: Option<Result<GatewayCharge, GatewayError>>,
    subscription_response: Option<Result<GatewaySubscription, GatewayError>>,
    refund_response: Option<Result<GatewayRefund, GatewayError>>,
    cancel_error: Option<GatewayError>,

    charge_requests: Vec<ChargeRequest>,
    subscription_requests: Vec<SubscriptionRequest>,
    refund_requests: Vec<RefundRequest>,
    cancel_requests: Vec<String>,
}

impl MockGateway {
    /// Creates a mock with succeeding defaults.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState::default()),
        }
    }

    /// Next charge settles immediately with the given reference.
    pub fn charge_succeeds(self, id: &str) -> Self {
        self.state.lock().unwrap().charge_response = Some(Ok(GatewayCharge {
            id: id.to_string(),
            status: GatewayChargeStatus::Succeeded,
        }));
        self
    }

    /// Next charge requires an out-of-band action.
    pub fn charge_requires_action(self, id: &str) -> Self {
        self.state.lock().unwrap().charge_response = Some(Ok(GatewayCharge {
            id: id.to_string(),
            status: GatewayChargeStatus::RequiresAction,
        }));
        self
    }

    /// Next charge reports an arbitrary processor status.
    pub fn charge_status(self, id: &str, status: &str) -> Self {
        self.state.lock().unwrap().charge_response = Some(Ok(GatewayCharge {
            id: id.to_string(),
            status: GatewayChargeStatus::from_wire(status),
        }));
        self
    }

    /// Charges fail with the given error.
    pub fn charge_fails(self, error: GatewayError) -> Self {
        self.state.lock().unwrap().charge_response = Some(Err(error));
        self
    }

    /// Subscriptions succeed with the given reference and status.
    pub fn subscription_succeeds(self, id: &str, status: &str, period_end: i64) -> Self {
        self.state.lock().unwrap().subscription_response = Some(Ok(GatewaySubscription {
            id: id.to_string(),
            status: status.to_string(),
            current_period_end: period_end,
        }));
        self
    }

    /// Subscriptions fail with the given error.
    pub fn subscription_fails(self, error: GatewayError) -> Self {
        self.state.lock().unwrap().subscription_response = Some(Err(error));
        self
    }

    /// Refunds succeed with the given reference.
    pub fn refund_succeeds(self, id: &str) -> Self {
        self.state.lock().unwrap().refund_response = Some(Ok(GatewayRefund {
            id: id.to_string(),
        }));
        self
    }

    /// Refunds fail with the given error.
    pub fn refund_fails(self, error: GatewayError) -> Self {
        self.state.lock().unwrap().refund_response = Some(Err(error));
        self
    }

    /// Cancellations fail with the given error.
    pub fn cancel_fails(self, error: GatewayError) -> Self {
        self.state.lock().unwrap().cancel_error = Some(error);
        self
    }

    // === Call log accessors ===

    /// Charge requests received, in order.
    pub fn charge_requests(&self) -> Vec<ChargeRequest> {
        self.state.lock().unwrap().charge_requests.clone()
    }

    /// Subscription requests received, in order.
    pub fn subscription_requests(&self) -> Vec<SubscriptionRequest> {
        self.state.lock().unwrap().subscription_requests.clone()
    }

    /// Refund requests received, in order.
    pub fn refund_requests(&self) -> Vec<RefundRequest> {
        self.state.lock().unwrap().refund_requests.clone()
    }

    /// Subscription references cancelled, in order.
    pub fn cancel_requests(&self) -> Vec<String> {
        self.state.lock().unwrap().cancel_requests.clone()
    }
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn create_charge(&self, request: ChargeRequest) -> Result<GatewayCharge, GatewayError> {
        let mut state = self.state.lock().unwrap();
        state.charge_requests.push(request);
        state.charge_response.clone().unwrap_or(Ok(GatewayCharge {
            id: "pi_mock".to_string(),
            status: GatewayChargeStatus::Succeeded,
        }))
    }

    async fn create_subscription(
        &self,
        request: SubscriptionRequest,
    ) -> Result<GatewaySubscription, GatewayError> {
        let mut state = self.state.lock().unwrap();
        state.subscription_requests.push(request);
        state
            .subscription_response
            .clone()
            .unwrap_or(Ok(GatewaySubscription {
                id: "sub_mock".to_string(),
                status: "active".to_string(),
                current_period_end: 1_735_689_600,
            }))
    }

    async fn refund(&self, request: RefundRequest) -> Result<GatewayRefund, GatewayError> {
        let mut state = self.state.lock().unwrap();
        state.refund_requests.push(request);
        state.refund_response.clone().unwrap_or(Ok(GatewayRefund {
            id: "re_mock".to_string(),
        }))
    }

    async fn cancel_subscription(&self, subscription_ref: &str) -> Result<(), GatewayError> {
        let mut state = self.state.lock().unwrap();
        state.cancel_requests.push(subscription_ref.to_string());
        match &state.cancel_error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}
