//! Payment domain module.
//!
//! One `Payment` records one charge attempt against the external
//! processor and its lifecycle through settlement, failure or refund.

mod aggregate;
mod events;
mod status;

pub use aggregate::Payment;
pub use events::{PaymentEvent, PaymentFailed, PaymentProcessed};
pub use status::PaymentStatus;
