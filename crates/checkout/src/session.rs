//! Checkout session aggregate.

use chrono::{DateTime, Utc};
use common::{CheckoutSessionId, Money, ReservationId};
use domain::{Address, LineItem};
use serde::{Deserialize, Serialize};

use crate::cart_store::CartOwner;

/// Lifecycle of a checkout session.
///
/// A session is only ever mutated while `Active`; the three terminal
/// states are frozen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Active,
    Completed,
    Cancelled,
    Expired,
}

impl SessionState {
    pub fn is_active(&self) -> bool {
        matches!(self, SessionState::Active)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Active => "active",
            SessionState::Completed => "completed",
            SessionState::Cancelled => "cancelled",
            SessionState::Expired => "expired",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A time-boxed checkout in flight: cart snapshot, computed totals,
/// the payment handle, and the reservations holding its stock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub(crate) id: CheckoutSessionId,
    pub(crate) owner: CartOwner,
    pub(crate) email: String,
    pub(crate) customer_name: String,
    /// Lines snapshotted from the catalog at start time; prices here are
    /// what the order will carry.
    pub(crate) lines: Vec<LineItem>,
    pub(crate) shipping_address: Address,
    pub(crate) subtotal: Money,
    pub(crate) shipping_cost: Money,
    pub(crate) tax_amount: Money,
    pub(crate) total: Money,
    pub(crate) payment_reference: String,
    pub(crate) client_secret: String,
    pub(crate) reservations: Vec<ReservationId>,
    pub(crate) state: SessionState,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) expires_at: DateTime<Utc>,
}

impl CheckoutSession {
    pub fn id(&self) -> CheckoutSessionId {
        self.id
    }

    pub fn owner(&self) -> CartOwner {
        self.owner
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn customer_name(&self) -> &str {
        &self.customer_name
    }

    pub fn lines(&self) -> &[LineItem] {
        &self.lines
    }

    pub fn shipping_address(&self) -> &Address {
        &self.shipping_address
    }

    pub fn subtotal(&self) -> Money {
        self.subtotal
    }

    pub fn shipping_cost(&self) -> Money {
        self.shipping_cost
    }

    pub fn tax_amount(&self) -> Money {
        self.tax_amount
    }

    pub fn total(&self) -> Money {
        self.total
    }

    /// The processor's reference for this session's intent; the dedupe
    /// key for payment confirmation.
    pub fn payment_reference(&self) -> &str {
        &self.payment_reference
    }

    /// Client-facing handle for completing payment in the browser.
    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// True once the TTL has elapsed (regardless of state).
    pub fn is_past_expiry(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
