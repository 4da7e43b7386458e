//! API server entry point.

use std::time::Duration;

use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

#[tokio::main]
async fn main() {
    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Install Prometheus metrics recorder
    let prometheus_builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    let metrics_handle = prometheus_builder
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Build application state
    let config = api::Config::from_env();
    let (state, delivery_worker, low_stock_rx) = api::create_default_state(&config);

    // 4. Background tasks: email delivery, low-stock alerts, session
    //    expiry sweep, daily summary
    tokio::spawn(delivery_worker.run());
    tokio::spawn(state.dispatcher.clone().consume_low_stock(low_stock_rx));

    let sweeper = state.checkout.clone();
    let sweep_interval = Duration::from_secs(config.sweep_interval_secs);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(sweep_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let expired = sweeper.expire_stale().await;
            if expired > 0 {
                tracing::info!(expired, "expiry sweep released stale sessions");
            }
        }
    });

    let summary_orders = state.orders.clone();
    let summary_period = Duration::from_secs(config.summary_interval_hours * 3600);
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(summary_period).await;
            let since = chrono::Utc::now()
                - chrono::Duration::seconds(summary_period.as_secs() as i64);
            summary_orders.publish_daily_summary(since);
        }
    });

    // 5. Build and serve the application
    let app = api::create_app(state, metrics_handle);
    let addr = config.addr();
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("server shut down gracefully");
}
