//! Axum router configuration for the payments API.

use axum::routing::{delete, post};
use axum::Router;

use super::handlers::{
    cancel_payment, cancel_subscription, create_payment_method, create_subscription,
    delete_payment_method, handle_webhook, process_payment, refund_payment,
    set_default_payment_method, PaymentsAppState,
};

/// Payment command routes plus the webhook intake.
///
/// The webhook route carries no user authentication; deliveries are
/// authenticated by signature instead.
pub fn payment_routes() -> Router<PaymentsAppState> {
    Router::new()
        .route("/", post(process_payment))
        .route("/:id/refund", post(refund_payment))
        .route("/:id/cancel", post(cancel_payment))
        .route("/webhook", post(handle_webhook))
}

/// Subscription command routes.
pub fn subscription_routes() -> Router<PaymentsAppState> {
    Router::new()
        .route("/", post(create_subscription))
        .route("/:id/cancel", post(cancel_subscription))
}

/// Payment method command routes.
pub fn payment_method_routes() -> Router<PaymentsAppState> {
    Router::new()
        .route("/", post(create_payment_method))
        .route("/:id/default", post(set_default_payment_method))
        .route("/:id", delete(delete_payment_method))
}

/// The complete payments module router.
///
/// # Example
///
/// ```ignore
/// let app = payments_router().with_state(state);
/// ```
pub fn payments_router() -> Router<PaymentsAppState> {
    Router::new()
        .nest("/payments", payment_routes())
        .nest("/subscriptions", subscription_routes())
        .nest("/payment-methods", payment_method_routes())
}
