//! Domain layer for the storefront core.
//!
//! This crate provides the pure domain types shared by the orchestration
//! crates:
//! - [`Cart`] and [`Address`] value objects
//! - The [`Order`] aggregate with its lifecycle state machine
//! - [`OrderStatus`] / [`PaymentStatus`] transition rules
//!
//! Nothing here performs I/O; stores and side effects live in the
//! `inventory`, `orders`, `checkout`, and `notifications` crates.

pub mod address;
pub mod cart;
pub mod error;
pub mod order;

pub use address::Address;
pub use cart::Cart;
pub use error::OrderError;
pub use order::{
    Cancellation, CustomerIdentity, LineItem, NewOrder, Order, OrderNumber, OrderStatus,
    PaymentStatus, Shipment, Transition,
};
