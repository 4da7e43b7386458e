//! Ledger error types.

use common::{ReservationId, VariantId};
use thiserror::Error;

/// Errors raised by ledger operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StockError {
    /// The reservation was denied; `available` is what the shopper can
    /// still buy right now.
    #[error("insufficient stock for variant {variant_id}: requested {requested}, available {available}")]
    InsufficientStock {
        variant_id: VariantId,
        requested: u32,
        available: u32,
    },

    /// No variant with this id is registered.
    #[error("unknown variant {0}")]
    UnknownVariant(VariantId),

    /// No reservation with this id was ever created.
    #[error("unknown reservation {0}")]
    UnknownReservation(ReservationId),

    /// Commit was requested for a hold that has already been released
    /// (the session expired or was cancelled); callers re-reserve instead.
    #[error("reservation {0} was already released")]
    ReservationReleased(ReservationId),

    /// The adjustment would take the counter below zero or below the
    /// quantity currently held by active reservations.
    #[error(
        "adjustment of {delta} rejected for variant {variant_id}: on hand {on_hand}, held {held}"
    )]
    InvalidAdjustment {
        variant_id: VariantId,
        delta: i64,
        on_hand: u32,
        held: u32,
    },

    /// Reservations must hold at least one unit.
    #[error("reservation quantity must be positive")]
    ZeroQuantity,
}
