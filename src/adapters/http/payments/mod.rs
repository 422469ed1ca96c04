//! Payments HTTP module.
//!
//! Command endpoints for payments, subscriptions and payment methods,
//! plus the processor webhook endpoint.

pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::PaymentsAppState;
pub use routes::payments_router;
