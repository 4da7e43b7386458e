//! Order manager error types.

use domain::{OrderError, OrderNumber};
use thiserror::Error;

/// Errors raised by order store and transition operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OrdersError {
    /// A transition rule was violated; carries the allowed next states.
    #[error(transparent)]
    Order(#[from] OrderError),

    /// No order with this number, or the guest email did not match;
    /// lookups never reveal which.
    #[error("order {0} not found")]
    NotFound(OrderNumber),
}
