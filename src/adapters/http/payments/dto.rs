//! Request and response DTOs for the payments API.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::foundation::{Money, Timestamp, ValidationError};
use crate::domain::payment::{Payment, PaymentStatus};
use crate::domain::payment_method::{PaymentMethod, PaymentMethodKind};
use crate::domain::subscription::{Subscription, SubscriptionStatus};

/// Monetary amount on the wire: decimal amount plus a 3-letter currency
/// code pair, never a single formatted string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoneyDto {
    pub amount: Decimal,
    pub currency: String,
}

impl MoneyDto {
    /// Converts into the domain value object, validating both parts.
    pub fn into_money(self) -> Result<Money, ValidationError> {
        let currency = crate::domain::foundation::Currency::new(&self.currency)?;
        Money::new(self.amount, currency)
    }
}

impl From<&Money> for MoneyDto {
    fn from(money: &Money) -> Self {
        Self {
            amount: money.amount(),
            currency: money.currency().as_str().to_string(),
        }
    }
}

// ════════════════════════════════════════════════════════════════════
// Requests
// ════════════════════════════════════════════════════════════════════

/// POST /payments
#[derive(Debug, Deserialize)]
pub struct ProcessPaymentRequest {
    pub amount: MoneyDto,
    pub method_kind: PaymentMethodKind,
    pub payment_method_id: Option<Uuid>,
    pub description: Option<String>,
}

/// POST /payments/:id/refund
#[derive(Debug, Deserialize)]
pub struct RefundPaymentRequest {
    /// Omit for a full refund.
    pub amount: Option<MoneyDto>,
}

/// POST /subscriptions
#[derive(Debug, Deserialize)]
pub struct CreateSubscriptionRequest {
    pub plan_id: String,
    pub amount: MoneyDto,
    pub payment_method_id: Option<Uuid>,
}

/// POST /payment-methods
#[derive(Debug, Deserialize)]
pub struct CreatePaymentMethodRequest {
    pub kind: PaymentMethodKind,
    pub processor_method_id: Option<String>,
    pub last_four: Option<String>,
    pub brand: Option<String>,
    pub bank_name: Option<String>,
    #[serde(default)]
    pub make_default: bool,
}

// ════════════════════════════════════════════════════════════════════
// Responses
// ════════════════════════════════════════════════════════════════════

/// Payment aggregate snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentResponse {
    pub id: String,
    pub user_id: String,
    pub amount: MoneyDto,
    pub status: PaymentStatus,
    pub method_kind: PaymentMethodKind,
    pub payment_method_id: Option<String>,
    pub subscription_id: Option<String>,
    pub processor_intent_id: Option<String>,
    pub processor_charge_id: Option<String>,
    pub description: Option<String>,
    pub failure_reason: Option<String>,
    pub refunded_amount: MoneyDto,
    pub processed_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

impl From<&Payment> for PaymentResponse {
    fn from(payment: &Payment) -> Self {
        Self {
            id: payment.id.to_string(),
            user_id: payment.user_id.to_string(),
            amount: MoneyDto::from(&payment.amount),
            status: payment.status,
            method_kind: payment.method_kind,
            payment_method_id: payment.payment_method_id.map(|id| id.to_string()),
            subscription_id: payment.subscription_id.map(|id| id.to_string()),
            processor_intent_id: payment.processor_intent_id.clone(),
            processor_charge_id: payment.processor_charge_id.clone(),
            description: payment.description.clone(),
            failure_reason: payment.failure_reason.clone(),
            refunded_amount: MoneyDto::from(&payment.refunded_amount),
            processed_at: payment.processed_at,
            created_at: payment.created_at,
        }
    }
}

/// Subscription aggregate snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionResponse {
    pub id: String,
    pub user_id: String,
    pub plan_id: String,
    pub amount: MoneyDto,
    pub status: SubscriptionStatus,
    pub processor_subscription_id: Option<String>,
    pub current_period_start: Option<Timestamp>,
    pub current_period_end: Option<Timestamp>,
    pub canceled_at: Option<Timestamp>,
    pub trial_start: Option<Timestamp>,
    pub trial_end: Option<Timestamp>,
    pub created_at: Timestamp,
}

impl From<&Subscription> for SubscriptionResponse {
    fn from(subscription: &Subscription) -> Self {
        Self {
            id: subscription.id.to_string(),
            user_id: subscription.user_id.to_string(),
            plan_id: subscription.plan_id.to_string(),
            amount: MoneyDto::from(&subscription.amount),
            status: subscription.status,
            processor_subscription_id: subscription.processor_subscription_id.clone(),
            current_period_start: subscription.current_period_start,
            current_period_end: subscription.current_period_end,
            canceled_at: subscription.canceled_at,
            trial_start: subscription.trial_start,
            trial_end: subscription.trial_end,
            created_at: subscription.created_at,
        }
    }
}

/// Subscription creation result: the subscription plus the synthesized
/// initial charge.
#[derive(Debug, Clone, Serialize)]
pub struct CreateSubscriptionResponse {
    pub subscription: SubscriptionResponse,
    pub payment: PaymentResponse,
}

/// PaymentMethod aggregate snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentMethodResponse {
    pub id: String,
    pub user_id: String,
    pub kind: PaymentMethodKind,
    pub last_four: Option<String>,
    pub brand: Option<String>,
    pub bank_name: Option<String>,
    pub is_default: bool,
    pub is_active: bool,
    pub created_at: Timestamp,
}

impl From<&PaymentMethod> for PaymentMethodResponse {
    fn from(method: &PaymentMethod) -> Self {
        Self {
            id: method.id.to_string(),
            user_id: method.user_id.to_string(),
            kind: method.kind,
            last_four: method.last_four.clone(),
            brand: method.brand.clone(),
            bank_name: method.bank_name.clone(),
            is_default: method.is_default,
            is_active: method.is_active,
            created_at: method.created_at,
        }
    }
}

/// Webhook acknowledgement body.
#[derive(Debug, Serialize)]
pub struct WebhookAckResponse {
    pub received: bool,
    pub outcome: &'static str,
}

/// Error body shared by all endpoints.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}
