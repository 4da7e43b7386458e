//! Shared application state.

use std::sync::Arc;

use checkout::{CartStore, CheckoutManager};
use inventory::InventoryLedger;
use notifications::NotificationDispatcher;
use orders::OrderManager;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub carts: Arc<CartStore>,
    pub ledger: Arc<InventoryLedger>,
    pub orders: Arc<OrderManager>,
    pub checkout: Arc<CheckoutManager>,
    pub dispatcher: Arc<NotificationDispatcher>,
}
