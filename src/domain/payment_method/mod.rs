//! PaymentMethod domain module.
//!
//! A stored payment instrument for a user. At most one active method per
//! user carries the default flag; the owning repository enforces that
//! invariant with a single conditional update.

mod aggregate;

pub use aggregate::{PaymentMethod, PaymentMethodKind};
