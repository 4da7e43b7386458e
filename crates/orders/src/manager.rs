//! The order lifecycle manager.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use common::{Money, OrderId};
use domain::{Cancellation, NewOrder, Order, OrderNumber, OrderStatus, Shipment};
use inventory::{AdjustmentReason, InventoryLedger};
use notifications::{NotificationDispatcher, NotificationType};
use serde_json::{Value, json};

use crate::error::OrdersError;

#[derive(Default)]
struct OrderStore {
    orders: HashMap<OrderId, Order>,
    by_number: HashMap<OrderNumber, OrderId>,
}

/// Merchant-facing roll-up for the daily summary notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyStats {
    pub orders_placed: usize,
    pub cancelled: usize,
    /// Total of non-cancelled orders placed in the window.
    pub revenue: Money,
}

/// Owns the order aggregates and their status state machine.
///
/// Transitions are applied in arrival order under the store's write
/// lock and rejected, never queued, when they violate the state table.
/// Side effects (restock, notifications) run after the lock is dropped.
pub struct OrderManager {
    store: RwLock<OrderStore>,
    sequence: AtomicU64,
    ledger: Arc<InventoryLedger>,
    dispatcher: Arc<NotificationDispatcher>,
}

impl OrderManager {
    /// Creates an empty manager.
    pub fn new(ledger: Arc<InventoryLedger>, dispatcher: Arc<NotificationDispatcher>) -> Self {
        Self {
            store: RwLock::new(OrderStore::default()),
            sequence: AtomicU64::new(0),
            ledger,
            dispatcher,
        }
    }

    /// Mints and persists a new order, then fires the confirmation and
    /// merchant notifications.
    ///
    /// Called only by the payment confirmation path, so the order is
    /// born `pending`/`paid`.
    #[tracing::instrument(skip(self, new), fields(email = %new.email))]
    pub fn create(&self, new: NewOrder) -> Order {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        let order_number = OrderNumber::from_sequence(sequence);
        let order = Order::create(OrderId::new(), order_number, new, Utc::now());

        {
            let mut store = self.store.write().unwrap();
            store
                .by_number
                .insert(order.order_number().clone(), order.id());
            store.orders.insert(order.id(), order.clone());
        }

        metrics::counter!("orders_created_total").increment(1);
        tracing::info!(
            order_number = %order.order_number(),
            total = %order.total(),
            reconciliation = order.reconciliation_required(),
            "order created"
        );

        let payload = order_payload(&order);
        self.dispatcher
            .notify_customer(NotificationType::OrderConfirmation, order.email(), &payload);
        self.dispatcher
            .notify_merchant(NotificationType::NewOrder, &payload);
        if order.reconciliation_required() {
            self.dispatcher
                .notify_merchant(NotificationType::ReconciliationRequired, &payload);
        }

        order
    }

    fn mutate<T>(
        &self,
        number: &OrderNumber,
        f: impl FnOnce(&mut Order) -> Result<T, domain::OrderError>,
    ) -> Result<(Order, T), OrdersError> {
        let mut store = self.store.write().unwrap();
        let id = *store
            .by_number
            .get(number)
            .ok_or_else(|| OrdersError::NotFound(number.clone()))?;
        let order = store
            .orders
            .get_mut(&id)
            .ok_or_else(|| OrdersError::NotFound(number.clone()))?;
        let outcome = f(order)?;
        Ok((order.clone(), outcome))
    }

    /// `pending → processing`.
    #[tracing::instrument(skip(self), fields(order = %number))]
    pub fn mark_processing(&self, number: &OrderNumber) -> Result<Order, OrdersError> {
        let (order, _) = self.mutate(number, |order| order.mark_processing(Utc::now()))?;
        Ok(order)
    }

    /// `processing → shipped`; fires the shipping notification.
    #[tracing::instrument(skip(self, shipment), fields(order = %number))]
    pub fn mark_shipped(
        &self,
        number: &OrderNumber,
        shipment: Shipment,
    ) -> Result<Order, OrdersError> {
        let (order, transition) =
            self.mutate(number, |order| order.mark_shipped(shipment, Utc::now()))?;

        if transition.is_applied() {
            let mut payload = order_payload(&order);
            if let Some(tracking) = &order.shipment().tracking_number {
                payload["tracking_number"] = json!(tracking);
            }
            if let Some(carrier) = &order.shipment().carrier {
                payload["carrier"] = json!(carrier);
            }
            self.dispatcher
                .notify_customer(NotificationType::OrderShipped, order.email(), &payload);
        }
        Ok(order)
    }

    /// `shipped → delivered`; fires the delivery notification.
    #[tracing::instrument(skip(self), fields(order = %number))]
    pub fn mark_delivered(&self, number: &OrderNumber) -> Result<Order, OrdersError> {
        let (order, transition) = self.mutate(number, |order| order.mark_delivered(Utc::now()))?;

        if transition.is_applied() {
            self.dispatcher.notify_customer(
                NotificationType::OrderDelivered,
                order.email(),
                &order_payload(&order),
            );
        }
        Ok(order)
    }

    /// Cancels an order.
    ///
    /// Stock committed to the order is returned to the shelf only when
    /// cancelling from pending/processing; a shipped order's stock stays
    /// gone until the merchant restocks manually. The outcome reports
    /// which branch applied.
    #[tracing::instrument(skip(self), fields(order = %number))]
    pub fn cancel(
        &self,
        number: &OrderNumber,
        reason: Option<&str>,
    ) -> Result<(Order, Cancellation), OrdersError> {
        let (order, cancellation) = self.mutate(number, |order| order.cancel(reason, Utc::now()))?;

        if cancellation.transition.is_applied() {
            if cancellation.restock {
                self.restock(&order);
            }
            metrics::counter!("orders_cancelled_total").increment(1);
            self.dispatcher.notify_customer(
                NotificationType::OrderCancelled,
                order.email(),
                &order_payload(&order),
            );
        }
        Ok((order, cancellation))
    }

    fn restock(&self, order: &Order) {
        for (variant_id, quantity) in order.restock_lines() {
            match self
                .ledger
                .adjust(variant_id, quantity as i64, AdjustmentReason::Restock)
            {
                Ok(level) => {
                    tracing::info!(%variant_id, quantity, level, "cancelled stock returned");
                }
                Err(e) => {
                    // The cancellation itself stands; the merchant fixes
                    // the counter manually.
                    tracing::warn!(%variant_id, error = %e, "restock failed");
                }
            }
        }
    }

    /// `paid → refunded`; only valid on cancelled orders.
    #[tracing::instrument(skip(self), fields(order = %number))]
    pub fn mark_refunded(&self, number: &OrderNumber) -> Result<Order, OrdersError> {
        let (order, _) = self.mutate(number, |order| order.mark_refunded())?;
        Ok(order)
    }

    /// Replaces the merchant notes on an order.
    pub fn set_notes(&self, number: &OrderNumber, notes: &str) -> Result<Order, OrdersError> {
        let (order, ()) = self.mutate(number, |order| {
            order.set_notes(notes);
            Ok(())
        })?;
        Ok(order)
    }

    /// Merchant lookup by number.
    pub fn get(&self, number: &OrderNumber) -> Result<Order, OrdersError> {
        let store = self.store.read().unwrap();
        store
            .by_number
            .get(number)
            .and_then(|id| store.orders.get(id))
            .cloned()
            .ok_or_else(|| OrdersError::NotFound(number.clone()))
    }

    /// Storefront lookup: the email captured at checkout must match.
    ///
    /// A mismatch reports not-found rather than revealing the order
    /// exists.
    pub fn get_for_customer(
        &self,
        number: &OrderNumber,
        email: &str,
    ) -> Result<Order, OrdersError> {
        let order = self.get(number)?;
        if !order.email().eq_ignore_ascii_case(email) {
            return Err(OrdersError::NotFound(number.clone()));
        }
        Ok(order)
    }

    /// Merchant list, newest first, optionally filtered by status.
    pub fn list(&self, status: Option<OrderStatus>) -> Vec<Order> {
        let store = self.store.read().unwrap();
        let mut orders: Vec<Order> = store
            .orders
            .values()
            .filter(|o| status.is_none_or(|s| o.status() == s))
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        orders
    }

    /// Roll-up of orders created since the given instant.
    pub fn stats_since(&self, since: DateTime<Utc>) -> DailyStats {
        let store = self.store.read().unwrap();
        let mut stats = DailyStats {
            orders_placed: 0,
            cancelled: 0,
            revenue: Money::zero(),
        };
        for order in store.orders.values() {
            if order.created_at() < since {
                continue;
            }
            stats.orders_placed += 1;
            if order.status() == OrderStatus::Cancelled {
                stats.cancelled += 1;
            } else {
                stats.revenue += order.total();
            }
        }
        stats
    }

    /// Builds and enqueues the merchant's daily summary (preference
    /// gated like every merchant-facing type).
    #[tracing::instrument(skip(self))]
    pub fn publish_daily_summary(&self, since: DateTime<Utc>) -> Option<notifications::Notification> {
        let stats = self.stats_since(since);
        let payload = json!({
            "date": since.date_naive().to_string(),
            "orders_placed": stats.orders_placed,
            "cancelled": stats.cancelled,
            "revenue": stats.revenue.to_string(),
        });
        self.dispatcher
            .notify_merchant(NotificationType::DailySummary, &payload)
    }
}

/// Payload handed to the message renderer for order notifications.
fn order_payload(order: &Order) -> Value {
    json!({
        "order_number": order.order_number().as_str(),
        "customer_name": order.customer_name(),
        "email": order.email(),
        "status": order.status().as_str(),
        "total": order.total().to_string(),
        "item_count": order.items().len(),
        "reconciliation_required": order.reconciliation_required(),
    })
}

