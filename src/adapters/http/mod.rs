//! HTTP adapters - axum routes and handlers.

pub mod payments;
