//! HTTP handlers for the payments API.
//!
//! These handlers connect axum routes to the application layer command
//! handlers and the webhook processor.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;

use crate::application::handlers::payment::{
    CancelPaymentCommand, CancelPaymentHandler, ProcessPaymentCommand, ProcessPaymentHandler,
    RefundPaymentCommand, RefundPaymentHandler,
};
use crate::application::handlers::payment_method::{
    CreatePaymentMethodCommand, CreatePaymentMethodHandler, DeletePaymentMethodCommand,
    DeletePaymentMethodHandler, SetDefaultPaymentMethodCommand, SetDefaultPaymentMethodHandler,
};
use crate::application::handlers::subscription::{
    CancelSubscriptionCommand, CancelSubscriptionHandler, CreateSubscriptionCommand,
    CreateSubscriptionHandler,
};
use crate::application::reconcilers::{
    ChargeReconciler, InvoiceReconciler, PaymentMethodReconciler, SubscriptionReconciler,
};
use crate::domain::foundation::{
    DomainError, ErrorCode, PaymentId, PaymentMethodId, PlanId, SubscriptionId, UserId,
};
use crate::domain::webhook::{EventRouter, IdempotentWebhookProcessor, WebhookVerifier};
use crate::ports::{
    EventPublisher, PaymentGateway, PaymentMethodRepository, PaymentRepository,
    SubscriptionRepository, WebhookEventRepository, WebhookResult,
};

use super::dto::{
    CreatePaymentMethodRequest, CreateSubscriptionRequest, CreateSubscriptionResponse,
    ErrorResponse, PaymentMethodResponse, PaymentResponse, ProcessPaymentRequest,
    RefundPaymentRequest, SubscriptionResponse, WebhookAckResponse,
};

// ════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════

/// Shared application state containing all dependencies.
#[derive(Clone)]
pub struct PaymentsAppState {
    pub payments: Arc<dyn PaymentRepository>,
    pub subscriptions: Arc<dyn SubscriptionRepository>,
    pub methods: Arc<dyn PaymentMethodRepository>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub publisher: Arc<dyn EventPublisher>,
    pub webhook_verifier: Arc<WebhookVerifier>,
    pub webhook_processor: Arc<IdempotentWebhookProcessor>,
}

impl PaymentsAppState {
    /// Wires the full state, building and validating the webhook router
    /// over every reconciler.
    ///
    /// # Panics
    ///
    /// Panics when a reconciler is missing for an expected event type -
    /// that is a wiring bug caught at startup, not a runtime condition.
    pub fn new(
        payments: Arc<dyn PaymentRepository>,
        subscriptions: Arc<dyn SubscriptionRepository>,
        methods: Arc<dyn PaymentMethodRepository>,
        webhook_events: Arc<dyn WebhookEventRepository>,
        gateway: Arc<dyn PaymentGateway>,
        publisher: Arc<dyn EventPublisher>,
        webhook_secret: &str,
    ) -> Self {
        let router = EventRouter::new()
            .register(Arc::new(ChargeReconciler::new(
                payments.clone(),
                publisher.clone(),
            )))
            .register(Arc::new(InvoiceReconciler::new(
                subscriptions.clone(),
                payments.clone(),
                publisher.clone(),
            )))
            .register(Arc::new(SubscriptionReconciler::new(
                subscriptions.clone(),
                publisher.clone(),
            )))
            .register(Arc::new(PaymentMethodReconciler::new()));
        router
            .validate()
            .expect("webhook router must cover every expected event type");

        Self {
            payments,
            subscriptions,
            methods,
            gateway,
            publisher,
            webhook_verifier: Arc::new(WebhookVerifier::new(webhook_secret)),
            webhook_processor: Arc::new(IdempotentWebhookProcessor::new(webhook_events, router)),
        }
    }

    fn process_payment_handler(&self) -> ProcessPaymentHandler {
        ProcessPaymentHandler::new(
            self.payments.clone(),
            self.methods.clone(),
            self.gateway.clone(),
            self.publisher.clone(),
        )
    }

    fn refund_payment_handler(&self) -> RefundPaymentHandler {
        RefundPaymentHandler::new(self.payments.clone(), self.gateway.clone())
    }

    fn cancel_payment_handler(&self) -> CancelPaymentHandler {
        CancelPaymentHandler::new(self.payments.clone())
    }

    fn create_subscription_handler(&self) -> CreateSubscriptionHandler {
        CreateSubscriptionHandler::new(
            self.subscriptions.clone(),
            self.payments.clone(),
            self.methods.clone(),
            self.gateway.clone(),
            self.publisher.clone(),
        )
    }

    fn cancel_subscription_handler(&self) -> CancelSubscriptionHandler {
        CancelSubscriptionHandler::new(self.subscriptions.clone(), self.gateway.clone())
    }

    fn create_payment_method_handler(&self) -> CreatePaymentMethodHandler {
        CreatePaymentMethodHandler::new(self.methods.clone())
    }

    fn set_default_payment_method_handler(&self) -> SetDefaultPaymentMethodHandler {
        SetDefaultPaymentMethodHandler::new(self.methods.clone())
    }

    fn delete_payment_method_handler(&self) -> DeletePaymentMethodHandler {
        DeletePaymentMethodHandler::new(self.methods.clone())
    }
}

// ════════════════════════════════════════════════════════════════════
// User Context
// ════════════════════════════════════════════════════════════════════

/// Authenticated user context extracted from the request.
///
/// Authentication itself is an upstream collaborator; this service
/// trusts the identity header its API gateway injects.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
}

/// Rejection type for AuthenticatedUser extraction.
pub struct AuthenticationRequired;

impl IntoResponse for AuthenticationRequired {
    fn into_response(self) -> axum::response::Response {
        let error = ErrorResponse::new("AUTHENTICATION_REQUIRED", "Authentication is required");
        (StatusCode::UNAUTHORIZED, Json(error)).into_response()
    }
}

#[async_trait::async_trait]
impl<S> axum::extract::FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AuthenticationRequired;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get("X-User-Id")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| UserId::new(s).ok())
            .ok_or(AuthenticationRequired)?;

        Ok(AuthenticatedUser { user_id })
    }
}

// ════════════════════════════════════════════════════════════════════
// Error mapping
// ════════════════════════════════════════════════════════════════════

/// API error wrapper mapping domain error codes to HTTP statuses.
pub struct PaymentsApiError(DomainError);

impl From<DomainError> for PaymentsApiError {
    fn from(err: DomainError) -> Self {
        Self(err)
    }
}

impl IntoResponse for PaymentsApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.0.code {
            ErrorCode::ValidationFailed
            | ErrorCode::EmptyField
            | ErrorCode::InvalidFormat
            | ErrorCode::CurrencyMismatch
            | ErrorCode::InvalidOperation
            | ErrorCode::MissingProcessorReference => StatusCode::BAD_REQUEST,
            ErrorCode::PaymentNotFound
            | ErrorCode::SubscriptionNotFound
            | ErrorCode::PaymentMethodNotFound => StatusCode::NOT_FOUND,
            ErrorCode::InvalidStateTransition => StatusCode::CONFLICT,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ErrorCode::PaymentRequired => StatusCode::PAYMENT_REQUIRED,
            ErrorCode::GatewayError => StatusCode::BAD_GATEWAY,
            ErrorCode::DatabaseError | ErrorCode::InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = ErrorResponse::new(self.0.code.to_string(), self.0.message);
        (status, Json(body)).into_response()
    }
}

fn bad_request(err: impl std::fmt::Display) -> PaymentsApiError {
    PaymentsApiError(DomainError::new(
        ErrorCode::ValidationFailed,
        err.to_string(),
    ))
}

fn parse_payment_id(id: &str) -> Result<PaymentId, PaymentsApiError> {
    id.parse().map_err(bad_request)
}

// ════════════════════════════════════════════════════════════════════
// Payment endpoints
// ════════════════════════════════════════════════════════════════════

/// POST /payments - process a one-off payment.
pub async fn process_payment(
    State(state): State<PaymentsAppState>,
    user: AuthenticatedUser,
    Json(request): Json<ProcessPaymentRequest>,
) -> Result<impl IntoResponse, PaymentsApiError> {
    let amount = request.amount.into_money().map_err(bad_request)?;

    let payment = state
        .process_payment_handler()
        .handle(ProcessPaymentCommand {
            user_id: user.user_id,
            amount,
            method_kind: request.method_kind,
            payment_method_id: request.payment_method_id.map(PaymentMethodId::from_uuid),
            description: request.description,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(PaymentResponse::from(&payment))))
}

/// POST /payments/:id/refund - refund a settled payment.
pub async fn refund_payment(
    State(state): State<PaymentsAppState>,
    Path(id): Path<String>,
    Json(request): Json<RefundPaymentRequest>,
) -> Result<impl IntoResponse, PaymentsApiError> {
    let payment_id = parse_payment_id(&id)?;
    let amount = request
        .amount
        .map(|dto| dto.into_money())
        .transpose()
        .map_err(bad_request)?;

    let payment = state
        .refund_payment_handler()
        .handle(RefundPaymentCommand { payment_id, amount })
        .await?;

    Ok(Json(PaymentResponse::from(&payment)))
}

/// POST /payments/:id/cancel - cancel a pending payment.
pub async fn cancel_payment(
    State(state): State<PaymentsAppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, PaymentsApiError> {
    let payment_id = parse_payment_id(&id)?;

    let payment = state
        .cancel_payment_handler()
        .handle(CancelPaymentCommand { payment_id })
        .await?;

    Ok(Json(PaymentResponse::from(&payment)))
}

// ════════════════════════════════════════════════════════════════════
// Subscription endpoints
// ════════════════════════════════════════════════════════════════════

/// POST /subscriptions - start a subscription.
pub async fn create_subscription(
    State(state): State<PaymentsAppState>,
    user: AuthenticatedUser,
    Json(request): Json<CreateSubscriptionRequest>,
) -> Result<impl IntoResponse, PaymentsApiError> {
    let amount = request.amount.into_money().map_err(bad_request)?;
    let plan_id = PlanId::new(request.plan_id).map_err(bad_request)?;

    let result = state
        .create_subscription_handler()
        .handle(CreateSubscriptionCommand {
            user_id: user.user_id,
            plan_id,
            amount,
            payment_method_id: request.payment_method_id.map(PaymentMethodId::from_uuid),
        })
        .await?;

    let response = CreateSubscriptionResponse {
        subscription: SubscriptionResponse::from(&result.subscription),
        payment: PaymentResponse::from(&result.payment),
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /subscriptions/:id/cancel - cancel a subscription.
pub async fn cancel_subscription(
    State(state): State<PaymentsAppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, PaymentsApiError> {
    let subscription_id: SubscriptionId = id.parse().map_err(bad_request)?;

    let subscription = state
        .cancel_subscription_handler()
        .handle(CancelSubscriptionCommand { subscription_id })
        .await?;

    Ok(Json(SubscriptionResponse::from(&subscription)))
}

// ════════════════════════════════════════════════════════════════════
// Payment method endpoints
// ════════════════════════════════════════════════════════════════════

/// POST /payment-methods - store an instrument.
pub async fn create_payment_method(
    State(state): State<PaymentsAppState>,
    user: AuthenticatedUser,
    Json(request): Json<CreatePaymentMethodRequest>,
) -> Result<impl IntoResponse, PaymentsApiError> {
    let method = state
        .create_payment_method_handler()
        .handle(CreatePaymentMethodCommand {
            user_id: user.user_id,
            kind: request.kind,
            processor_method_id: request.processor_method_id,
            last_four: request.last_four,
            brand: request.brand,
            bank_name: request.bank_name,
            make_default: request.make_default,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(PaymentMethodResponse::from(&method)),
    ))
}

/// POST /payment-methods/:id/default - switch the default instrument.
pub async fn set_default_payment_method(
    State(state): State<PaymentsAppState>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, PaymentsApiError> {
    let method_id: PaymentMethodId = id.parse().map_err(bad_request)?;

    let method = state
        .set_default_payment_method_handler()
        .handle(SetDefaultPaymentMethodCommand {
            user_id: user.user_id,
            method_id,
        })
        .await?;

    Ok(Json(PaymentMethodResponse::from(&method)))
}

/// DELETE /payment-methods/:id - deactivate an instrument.
pub async fn delete_payment_method(
    State(state): State<PaymentsAppState>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, PaymentsApiError> {
    let method_id: PaymentMethodId = id.parse().map_err(bad_request)?;

    let method = state
        .delete_payment_method_handler()
        .handle(DeletePaymentMethodCommand {
            user_id: user.user_id,
            method_id,
        })
        .await?;

    Ok(Json(PaymentMethodResponse::from(&method)))
}

// ════════════════════════════════════════════════════════════════════
// Webhook endpoint
// ════════════════════════════════════════════════════════════════════

/// POST /payments/webhook - processor notification intake.
///
/// Responses drive the processor's retry behavior: 200 acknowledges
/// (including benign skips and duplicates), 400 rejects a bad
/// signature permanently, 500 requests redelivery.
pub async fn handle_webhook(
    State(state): State<PaymentsAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> axum::response::Response {
    let signature = match headers.get("X-Signature").and_then(|v| v.to_str().ok()) {
        Some(signature) => signature,
        None => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::new("INVALID_SIGNATURE", "Missing signature")),
            )
                .into_response();
        }
    };

    let event = match state.webhook_verifier.verify_and_parse(&body, signature) {
        Ok(event) => event,
        Err(err) => {
            tracing::warn!(error = %err, "Webhook rejected before processing");
            return (
                err.status_code(),
                Json(ErrorResponse::new("WEBHOOK_REJECTED", err.to_string())),
            )
                .into_response();
        }
    };

    match state.webhook_processor.process(event).await {
        Ok(result) => {
            let outcome = match result {
                WebhookResult::Processed => "processed",
                WebhookResult::Skipped => "skipped",
                WebhookResult::AlreadyProcessed => "already_processed",
            };
            (
                StatusCode::OK,
                Json(WebhookAckResponse {
                    received: true,
                    outcome,
                }),
            )
                .into_response()
        }
        Err(err) => {
            tracing::error!(error = %err, "Webhook processing failed");
            (
                err.status_code(),
                Json(ErrorResponse::new("WEBHOOK_PROCESSING_FAILED", err.to_string())),
            )
                .into_response()
        }
    }
}
