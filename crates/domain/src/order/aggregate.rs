//! Order aggregate implementation.

use chrono::{DateTime, Utc};
use common::{Money, OrderId};
use serde::{Deserialize, Serialize};

use crate::Address;
use crate::error::OrderError;

use super::{CustomerIdentity, LineItem, OrderNumber, OrderStatus, PaymentStatus};

/// Outcome of a requested state transition.
///
/// Requesting the current state again is accepted as a [`NoOp`]:
/// timestamps are not restamped and callers skip side effects.
///
/// [`NoOp`]: Transition::NoOp
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The state changed and the matching timestamp was stamped.
    Applied,
    /// The order was already in the requested state.
    NoOp,
}

impl Transition {
    /// Returns true if the transition changed state.
    pub fn is_applied(&self) -> bool {
        matches!(self, Transition::Applied)
    }
}

/// Carrier details attached when an order ships; stored verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shipment {
    pub carrier: Option<String>,
    pub tracking_number: Option<String>,
}

/// Outcome of a cancellation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancellation {
    /// Whether the cancellation changed state.
    pub transition: Transition,
    /// Whether committed stock should be returned to the shelf.
    ///
    /// True only when cancelling from pending/processing; cancelling a
    /// shipped order leaves restocking to a manual merchant decision.
    pub restock: bool,
}

/// Everything the lifecycle manager needs to mint an order.
///
/// Built by the checkout path from the session snapshot, so prices and
/// the address are frozen at checkout time.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub customer: CustomerIdentity,
    pub email: String,
    pub customer_name: String,
    pub items: Vec<LineItem>,
    pub shipping_address: Address,
    pub subtotal: Money,
    pub shipping_cost: Money,
    pub tax_amount: Money,
    pub total: Money,
    pub payment_reference: String,
    /// Set when payment was confirmed but stock could not be re-secured;
    /// the order still exists and is flagged for manual attention.
    pub reconciliation_required: bool,
}

/// Order aggregate root.
///
/// Created only on successful payment confirmation, mutated only through
/// the transition methods below, and never deleted; cancellation is a
/// terminal status, not a deletion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    order_number: OrderNumber,
    customer: CustomerIdentity,
    email: String,
    customer_name: String,
    items: Vec<LineItem>,
    shipping_address: Address,
    subtotal: Money,
    shipping_cost: Money,
    tax_amount: Money,
    total: Money,
    status: OrderStatus,
    payment_status: PaymentStatus,
    payment_reference: String,
    shipment: Shipment,
    created_at: DateTime<Utc>,
    processed_at: Option<DateTime<Utc>>,
    shipped_at: Option<DateTime<Utc>>,
    delivered_at: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,
    notes: String,
    reconciliation_required: bool,
}

// Query methods
impl Order {
    /// Returns the internal order id.
    pub fn id(&self) -> OrderId {
        self.id
    }

    /// Returns the externally visible order number.
    pub fn order_number(&self) -> &OrderNumber {
        &self.order_number
    }

    /// Returns who placed the order.
    pub fn customer(&self) -> CustomerIdentity {
        self.customer
    }

    /// Returns the checkout email.
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Returns the customer display name.
    pub fn customer_name(&self) -> &str {
        &self.customer_name
    }

    /// Returns the snapshotted line items.
    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    /// Returns the shipping address.
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

    /// Returns the current fulfillment status.
    pub fn status(&self) -> OrderStatus {
        self.status
    }

    /// Returns the current payment status.
    pub fn payment_status(&self) -> PaymentStatus {
        self.payment_status
    }

    /// Returns the external payment reference the order was created from.
    pub fn payment_reference(&self) -> &str {
        &self.payment_reference
    }

    /// Returns carrier/tracking details recorded at shipment.
    pub fn shipment(&self) -> &Shipment {
        &self.shipment
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn processed_at(&self) -> Option<DateTime<Utc>> {
        self.processed_at
    }

    pub fn shipped_at(&self) -> Option<DateTime<Utc>> {
        self.shipped_at
    }

    pub fn delivered_at(&self) -> Option<DateTime<Utc>> {
        self.delivered_at
    }

    pub fn cancelled_at(&self) -> Option<DateTime<Utc>> {
        self.cancelled_at
    }

    /// Returns the free-text notes.
    pub fn notes(&self) -> &str {
        &self.notes
    }

    /// Returns true if the order needs manual merchant reconciliation.
    pub fn reconciliation_required(&self) -> bool {
        self.reconciliation_required
    }

    /// Returns true if the order is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// (variant, quantity) pairs for restocking on cancellation.
    pub fn restock_lines(&self) -> impl Iterator<Item = (common::VariantId, u32)> + '_ {
        self.items.iter().map(|item| (item.variant_id, item.quantity))
    }
}

// Lifecycle methods
impl Order {
    /// Mints a new order in `pending`/`paid` from checkout data.
    pub fn create(id: OrderId, order_number: OrderNumber, new: NewOrder, now: DateTime<Utc>) -> Self {
        Self {
            id,
            order_number,
            customer: new.customer,
            email: new.email,
            customer_name: new.customer_name,
            items: new.items,
            shipping_address: new.shipping_address,
            subtotal: new.subtotal,
            shipping_cost: new.shipping_cost,
            tax_amount: new.tax_amount,
            total: new.total,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Paid,
            payment_reference: new.payment_reference,
            shipment: Shipment::default(),
            created_at: now,
            processed_at: None,
            shipped_at: None,
            delivered_at: None,
            cancelled_at: None,
            notes: String::new(),
            reconciliation_required: new.reconciliation_required,
        }
    }

    /// Validates a requested transition against the state table.
    ///
    /// Self-transitions are a no-op even from terminal states; any other
    /// request on a terminal order is the distinct [`OrderError::Terminal`].
    fn ensure_transition(&self, to: OrderStatus) -> Result<Transition, OrderError> {
        if to == self.status {
            return Ok(Transition::NoOp);
        }
        if self.status.is_terminal() {
            return Err(OrderError::Terminal {
                status: self.status,
            });
        }
        if !self.status.can_transition_to(to) {
            return Err(OrderError::InvalidTransition {
                from: self.status,
                to,
                allowed: self.status.allowed_next(),
            });
        }
        Ok(Transition::Applied)
    }

    /// `pending → processing`.
    pub fn mark_processing(&mut self, now: DateTime<Utc>) -> Result<Transition, OrderError> {
        let transition = self.ensure_transition(OrderStatus::Processing)?;
        if transition.is_applied() {
            self.status = OrderStatus::Processing;
            self.processed_at = Some(now);
        }
        Ok(transition)
    }

    /// `processing → shipped`, recording carrier details verbatim.
    pub fn mark_shipped(
        &mut self,
        shipment: Shipment,
        now: DateTime<Utc>,
    ) -> Result<Transition, OrderError> {
        let transition = self.ensure_transition(OrderStatus::Shipped)?;
        if transition.is_applied() {
            self.status = OrderStatus::Shipped;
            self.shipment = shipment;
            self.shipped_at = Some(now);
        }
        Ok(transition)
    }

    /// `shipped → delivered`.
    pub fn mark_delivered(&mut self, now: DateTime<Utc>) -> Result<Transition, OrderError> {
        let transition = self.ensure_transition(OrderStatus::Delivered)?;
        if transition.is_applied() {
            self.status = OrderStatus::Delivered;
            self.delivered_at = Some(now);
        }
        Ok(transition)
    }

    /// Cancels the order, reporting whether committed stock restocks.
    ///
    /// The restock branch is decided by the pre-cancellation status:
    /// pending/processing restock automatically, shipped does not.
    pub fn cancel(
        &mut self,
        reason: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Cancellation, OrderError> {
        let transition = self.ensure_transition(OrderStatus::Cancelled)?;
        if !transition.is_applied() {
            return Ok(Cancellation {
                transition,
                restock: false,
            });
        }

        let restock = self.status.restocks_on_cancel();
        self.status = OrderStatus::Cancelled;
        self.cancelled_at = Some(now);
        if let Some(reason) = reason {
            self.push_note(&format!("cancelled: {reason}"));
        }
        Ok(Cancellation { transition, restock })
    }

    /// `paid → refunded`; only reachable once the order is cancelled.
    pub fn mark_refunded(&mut self) -> Result<Transition, OrderError> {
        match self.payment_status {
            PaymentStatus::Refunded => Ok(Transition::NoOp),
            PaymentStatus::Paid => {
                if self.status != OrderStatus::Cancelled {
                    return Err(OrderError::RefundRequiresCancellation {
                        status: self.status,
                    });
                }
                self.payment_status = PaymentStatus::Refunded;
                Ok(Transition::Applied)
            }
            from => Err(OrderError::InvalidPaymentTransition {
                from,
                to: PaymentStatus::Refunded,
            }),
        }
    }

    /// Replaces the free-text notes.
    pub fn set_notes(&mut self, notes: impl Into<String>) {
        self.notes = notes.into();
    }

    /// Appends a line to the free-text notes.
    pub fn push_note(&mut self, line: &str) {
        if !self.notes.is_empty() {
            self.notes.push('\n');
        }
        self.notes.push_str(line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::VariantId;

    fn new_order() -> NewOrder {
        NewOrder {
            customer: CustomerIdentity::Guest,
            email: "shopper@example.com".to_string(),
            customer_name: "Alex Shopper".to_string(),
            items: vec![LineItem::new(
                VariantId::new(),
                "TEE-BLK-M",
                "Organic Tee",
                "Black / M",
                2,
                Money::from_cents(2500),
            )],
            shipping_address: Address {
                line1: "500 Harbor Blvd".to_string(),
                line2: None,
                city: "Belmont".to_string(),
                region: "CA".to_string(),
                postal_code: "94002".to_string(),
                country: "US".to_string(),
            },
            subtotal: Money::from_cents(5000),
            shipping_cost: Money::from_cents(500),
            tax_amount: Money::from_cents(413),
            total: Money::from_cents(5913),
            payment_reference: "pi_test_001".to_string(),
            reconciliation_required: false,
        }
    }

    fn order() -> Order {
        Order::create(
            OrderId::new(),
            OrderNumber::from_sequence(1),
            new_order(),
            Utc::now(),
        )
    }

    #[test]
    fn test_create_defaults() {
        let order = order();
        assert_eq!(order.status(), OrderStatus::Pending);
        assert_eq!(order.payment_status(), PaymentStatus::Paid);
        assert_eq!(order.order_number().as_str(), "ORD-000001");
        assert!(order.processed_at().is_none());
        assert!(!order.reconciliation_required());
        assert!(order.notes().is_empty());
    }

    #[test]
    fn test_full_lifecycle_stamps_timestamps() {
        let mut order = order();

        assert!(order.mark_processing(Utc::now()).unwrap().is_applied());
        assert_eq!(order.status(), OrderStatus::Processing);
        assert!(order.processed_at().is_some());

        let shipment = Shipment {
            carrier: Some("UPS".to_string()),
            tracking_number: Some("1Z999AA10123456784".to_string()),
        };
        assert!(order.mark_shipped(shipment, Utc::now()).unwrap().is_applied());
        assert_eq!(order.status(), OrderStatus::Shipped);
        assert!(order.shipped_at().is_some());
        assert_eq!(order.shipment().carrier.as_deref(), Some("UPS"));

        assert!(order.mark_delivered(Utc::now()).unwrap().is_applied());
        assert_eq!(order.status(), OrderStatus::Delivered);
        assert!(order.delivered_at().is_some());
        assert!(order.is_terminal());
    }

    #[test]
    fn test_self_transition_is_noop() {
        let mut order = order();
        order.mark_processing(Utc::now()).unwrap();
        let first = order.processed_at().unwrap();

        let transition = order.mark_processing(Utc::now()).unwrap();
        assert_eq!(transition, Transition::NoOp);
        assert_eq!(order.processed_at().unwrap(), first);
    }

    #[test]
    fn test_skip_ahead_is_invalid() {
        let mut order = order();
        let err = order.mark_delivered(Utc::now()).unwrap_err();
        assert_eq!(
            err,
            OrderError::InvalidTransition {
                from: OrderStatus::Pending,
                to: OrderStatus::Delivered,
                allowed: &[OrderStatus::Processing, OrderStatus::Cancelled],
            }
        );
    }

    #[test]
    fn test_terminal_rejects_with_distinct_error() {
        let mut order = order();
        order.mark_processing(Utc::now()).unwrap();
        order.cancel(None, Utc::now()).unwrap();

        let err = order.mark_processing(Utc::now()).unwrap_err();
        assert_eq!(
            err,
            OrderError::Terminal {
                status: OrderStatus::Cancelled
            }
        );
    }

    #[test]
    fn test_cancel_on_cancelled_is_noop() {
        let mut order = order();
        order.cancel(Some("changed my mind"), Utc::now()).unwrap();
        let outcome = order.cancel(Some("again"), Utc::now()).unwrap();
        assert_eq!(outcome.transition, Transition::NoOp);
        assert!(!outcome.restock);
        // First reason only; the no-op must not append.
        assert_eq!(order.notes(), "cancelled: changed my mind");
    }

    #[test]
    fn test_cancel_before_shipping_restocks() {
        let mut order = order();
        order.mark_processing(Utc::now()).unwrap();
        let outcome = order.cancel(Some("out of stock elsewhere"), Utc::now()).unwrap();
        assert!(outcome.restock);
        assert!(order.cancelled_at().is_some());
    }

    #[test]
    fn test_cancel_after_shipping_does_not_restock() {
        let mut order = order();
        order.mark_processing(Utc::now()).unwrap();
        order.mark_shipped(Shipment::default(), Utc::now()).unwrap();

        let outcome = order.cancel(Some("damaged in transit"), Utc::now()).unwrap();
        assert!(outcome.transition.is_applied());
        assert!(!outcome.restock);
        assert!(order.notes().contains("damaged in transit"));
    }

    #[test]
    fn test_refund_requires_cancellation() {
        let mut order = order();
        let err = order.mark_refunded().unwrap_err();
        assert_eq!(
            err,
            OrderError::RefundRequiresCancellation {
                status: OrderStatus::Pending
            }
        );

        order.cancel(None, Utc::now()).unwrap();
        assert!(order.mark_refunded().unwrap().is_applied());
        assert_eq!(order.payment_status(), PaymentStatus::Refunded);

        // Idempotent once refunded.
        assert_eq!(order.mark_refunded().unwrap(), Transition::NoOp);
    }

    #[test]
    fn test_notes_append() {
        let mut order = order();
        order.set_notes("gift wrap requested");
        order.push_note("leave at front desk");
        assert_eq!(order.notes(), "gift wrap requested\nleave at front desk");
    }

    #[test]
    fn test_serialization_roundtrip() {
        let order = order();
        let json = serde_json::to_string(&order).unwrap();
        let back: Order = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id(), order.id());
        assert_eq!(back.status(), OrderStatus::Pending);
        assert_eq!(back.total().cents(), 5913);
    }
}
