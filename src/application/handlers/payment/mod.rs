//! Payment command handlers.

mod cancel_payment;
mod process_payment;
mod refund_payment;

pub use cancel_payment::{CancelPaymentCommand, CancelPaymentHandler};
pub use process_payment::{ProcessPaymentCommand, ProcessPaymentHandler};
pub use refund_payment::{RefundPaymentCommand, RefundPaymentHandler};
