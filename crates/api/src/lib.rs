//! HTTP API server for the storefront checkout and order core.
//!
//! Thin axum layer over the cart store, checkout manager, order
//! lifecycle manager, inventory ledger, and notification dispatcher,
//! with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use checkout::{
    CartStore, CheckoutConfig, CheckoutManager, FixedRateTax, FlatRateShipping,
    InMemoryPaymentProcessor,
};
use common::MerchantId;
use inventory::{InventoryLedger, LowStockAlert};
use metrics_exporter_prometheus::PrometheusHandle;
use notifications::{
    DeliveryWorker, InMemoryEmailTransport, NotificationDispatcher, PlainTextRenderer,
};
use orders::OrderManager;
use tokio::sync::mpsc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use config::Config;
pub use state::AppState;

/// Creates the axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        // Carts
        .route(
            "/carts/{owner}",
            get(routes::carts::get).delete(routes::carts::clear),
        )
        .route("/carts/{owner}/items", post(routes::carts::add_item))
        .route(
            "/carts/{owner}/items/{variant_id}",
            put(routes::carts::update_item).delete(routes::carts::remove_item),
        )
        .route("/carts/{owner}/merge", post(routes::carts::merge))
        // Checkout
        .route("/checkout", post(routes::checkout::start))
        .route("/checkout/confirm", post(routes::checkout::confirm))
        .route("/checkout/{id}", get(routes::checkout::get))
        .route("/checkout/{id}/cancel", post(routes::checkout::cancel))
        .route("/webhooks/payment", post(routes::checkout::payment_webhook))
        // Orders
        .route("/orders", get(routes::orders::list))
        .route("/orders/{number}", get(routes::orders::get))
        .route("/orders/{number}/process", post(routes::orders::process))
        .route("/orders/{number}/ship", post(routes::orders::ship))
        .route("/orders/{number}/deliver", post(routes::orders::deliver))
        .route("/orders/{number}/cancel", post(routes::orders::cancel))
        .route("/orders/{number}/refund", post(routes::orders::refund))
        .route("/orders/{number}/notes", put(routes::orders::notes))
        // Notifications
        .route("/notifications", get(routes::notifications::list))
        .route("/notifications/{id}", get(routes::notifications::get))
        .route(
            "/notifications/{id}/read",
            post(routes::notifications::mark_read),
        )
        .route(
            "/notifications/{id}/retry",
            post(routes::notifications::retry),
        )
        .route(
            "/notification-preferences",
            get(routes::notifications::get_preferences).put(routes::notifications::put_preferences),
        )
        // Variants
        .route("/variants", post(routes::variants::register))
        .route("/variants/{id}", get(routes::variants::get))
        .route("/variants/{id}/adjust", post(routes::variants::adjust))
        // Push
        .route("/merchants/{id}/events", get(routes::events::subscribe))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the default application state with in-memory collaborators.
///
/// Returns the state plus the two background inputs the binary must
/// drive: the notification delivery worker and the ledger's low-stock
/// alert receiver.
pub fn create_default_state(
    config: &Config,
) -> (
    Arc<AppState>,
    DeliveryWorker,
    mpsc::UnboundedReceiver<LowStockAlert>,
) {
    let (ledger, low_stock_rx) = InventoryLedger::new();
    let ledger = Arc::new(ledger);
    let carts = Arc::new(CartStore::new(ledger.clone()));

    let (dispatcher, delivery_worker) = NotificationDispatcher::new(
        Arc::new(InMemoryEmailTransport::new()),
        Arc::new(PlainTextRenderer),
        MerchantId::new(),
    );
    let orders = Arc::new(OrderManager::new(ledger.clone(), dispatcher.clone()));

    let checkout = Arc::new(CheckoutManager::new(
        carts.clone(),
        ledger.clone(),
        orders.clone(),
        Arc::new(InMemoryPaymentProcessor::new()),
        Arc::new(FlatRateShipping {
            rate: common::Money::from_cents(500),
            free_over: Some(common::Money::from_cents(7_500)),
        }),
        Arc::new(FixedRateTax { basis_points: 825 }),
        CheckoutConfig {
            session_ttl: chrono::Duration::minutes(config.checkout_ttl_minutes),
            currency: config.currency.clone(),
        },
    ));

    let state = Arc::new(AppState {
        carts,
        ledger,
        orders,
        checkout,
        dispatcher,
    });

    (state, delivery_worker, low_stock_rx)
}
