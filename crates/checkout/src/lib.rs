//! Checkout orchestration for the storefront core.
//!
//! Turns a cart into a paid order: the [`CheckoutManager`] reserves
//! stock through the inventory ledger (all-or-nothing, rolling back on
//! any failure), opens a payment intent with the external processor,
//! and converts reservations into a durable order on idempotent payment
//! confirmation. Abandoned sessions self-expire through a periodic
//! sweep and hand their stock back.

pub mod calculators;
pub mod cart_store;
pub mod error;
pub mod manager;
pub mod payment;
pub mod session;

pub use calculators::{FixedRateTax, FlatRateShipping, ShippingCalculator, TaxCalculator};
pub use cart_store::{CartOwner, CartStore};
pub use error::CheckoutError;
pub use manager::{CheckoutConfig, CheckoutManager};
pub use payment::{
    InMemoryPaymentProcessor, PaymentConfirmation, PaymentIntent, PaymentOutcome,
    PaymentProcessor, ProcessorError,
};
pub use session::{CheckoutSession, SessionState};
