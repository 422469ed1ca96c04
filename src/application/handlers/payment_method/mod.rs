//! PaymentMethod command handlers.

mod create_payment_method;
mod delete_payment_method;
mod set_default_payment_method;

pub use create_payment_method::{CreatePaymentMethodCommand, CreatePaymentMethodHandler};
pub use delete_payment_method::{DeletePaymentMethodCommand, DeletePaymentMethodHandler};
pub use set_default_payment_method::{
    SetDefaultPaymentMethodCommand, SetDefaultPaymentMethodHandler,
};
