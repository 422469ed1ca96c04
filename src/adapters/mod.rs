//! Adapters - concrete implementations of the ports.

pub mod events;
pub mod gateway;
pub mod http;
pub mod postgres;
