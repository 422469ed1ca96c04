//! Rentledger - payment and subscription reconciliation service.
//!
//! Keeps a local financial ledger (payments, subscriptions, payment
//! methods) consistent with an external card processor whose
//! authoritative state changes asynchronously via webhooks, while
//! command flows mutate the same records synchronously.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
