//! Domain error types.

use thiserror::Error;

use crate::order::{OrderStatus, PaymentStatus};

/// Errors raised by the order aggregate's transition rules.
///
/// These are business-rule violations, surfaced to callers with enough
/// detail to act (the allowed next states), never silently coerced.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OrderError {
    /// The requested state is not reachable from the current one.
    #[error("invalid transition {from} -> {to}; allowed from {from}: {allowed:?}")]
    InvalidTransition {
        from: OrderStatus,
        to: OrderStatus,
        allowed: &'static [OrderStatus],
    },

    /// The order is in a terminal state and accepts no transitions.
    #[error("order is {status} (terminal); no further transitions accepted")]
    Terminal { status: OrderStatus },

    /// The requested payment state is not reachable from the current one.
    #[error("invalid payment transition {from} -> {to}")]
    InvalidPaymentTransition {
        from: PaymentStatus,
        to: PaymentStatus,
    },

    /// Refunds are only reachable after cancellation of a paid order.
    #[error("refund requires a cancelled order; order is {status}")]
    RefundRequiresCancellation { status: OrderStatus },
}
