//! Checkout error types.

use common::CheckoutSessionId;
use inventory::StockError;
use orders::OrdersError;
use thiserror::Error;

/// Errors raised by cart and checkout operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CheckoutError {
    /// Checkout cannot start from an empty cart.
    #[error("cart is empty")]
    CartEmpty,

    /// A ledger operation failed; `InsufficientStock` carries the
    /// quantity still available so the shopper can adjust.
    #[error(transparent)]
    Stock(#[from] StockError),

    /// No session with this id exists.
    #[error("unknown checkout session {0}")]
    UnknownSession(CheckoutSessionId),

    /// No session or processed order is associated with this payment
    /// reference.
    #[error("unknown payment reference {0}")]
    UnknownPaymentReference(String),

    /// The processor declined the payment. The session stays active so
    /// the shopper can retry until the reservation TTL runs out.
    #[error("payment {reference} was declined: {reason}")]
    PaymentDeclined { reference: String, reason: String },

    /// The processor itself failed (network, outage). Recovered locally
    /// where possible; reservations are rolled back on checkout start.
    #[error("payment processor error: {0}")]
    Processor(String),

    /// An order store error during confirmation.
    #[error(transparent)]
    Orders(#[from] OrdersError),
}
