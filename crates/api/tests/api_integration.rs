//! Integration tests for the API server.

use std::sync::{Arc, OnceLock};

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            metrics_exporter_prometheus::PrometheusBuilder::new()
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

fn setup() -> (Router, Arc<api::AppState>) {
    let config = api::Config::default();
    let (state, _delivery_worker, _low_stock_rx) = api::create_default_state(&config);
    let app = api::create_app(state.clone(), get_metrics_handle());
    (app, state)
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn seed_variant(app: &Router, sku: &str, on_hand: u32) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/variants",
        Some(json!({
            "sku": sku,
            "product_name": "Organic Tee",
            "variant_name": "Black / M",
            "unit_price_cents": 2500,
            "on_hand": on_hand,
            "low_stock_threshold": 1,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["variant_id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_check() {
    let (app, _state) = setup();
    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_cart_to_delivered_order_flow() {
    let (app, _state) = setup();
    let variant_id = seed_variant(&app, "TEE-BLK-M", 5).await;
    let owner = Uuid::new_v4();

    // Add to cart.
    let (status, cart) = send(
        &app,
        "POST",
        &format!("/carts/{owner}/items"),
        Some(json!({"variant_id": variant_id, "quantity": 2})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["total_units"], 2);
    assert_eq!(cart["subtotal_cents"], 5000);

    // Start checkout.
    let (status, session) = send(
        &app,
        "POST",
        "/checkout",
        Some(json!({
            "owner_id": owner,
            "email": "shopper@example.com",
            "customer_name": "Alex Shopper",
            "shipping_address": {
                "line1": "500 Harbor Blvd",
                "city": "Belmont",
                "region": "CA",
                "postal_code": "94002",
                "country": "US",
            },
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(session["state"], "active");
    assert_eq!(session["subtotal_cents"], 5000);
    let reference = session["payment_reference"].as_str().unwrap().to_string();
    assert!(!session["client_secret"].as_str().unwrap().is_empty());

    // Reservation holds the stock.
    let (_, variant) = send(&app, "GET", &format!("/variants/{variant_id}"), None).await;
    assert_eq!(variant["available"], 3);
    assert_eq!(variant["on_hand"], 5);

    // Processor webhook confirms payment.
    let (status, ack) = send(
        &app,
        "POST",
        "/webhooks/payment",
        Some(json!({"payment_reference": reference, "outcome": "succeeded"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["received"], true);

    // Stock committed, cart cleared.
    let (_, variant) = send(&app, "GET", &format!("/variants/{variant_id}"), None).await;
    assert_eq!(variant["on_hand"], 3);
    let (_, cart) = send(&app, "GET", &format!("/carts/{owner}"), None).await;
    assert_eq!(cart["total_units"], 0);

    // Merchant sees the order; guest can fetch it with the right email.
    let (_, orders) = send(&app, "GET", "/orders", None).await;
    assert_eq!(orders.as_array().unwrap().len(), 1);
    let number = orders[0]["order_number"].as_str().unwrap().to_string();
    assert_eq!(orders[0]["status"], "pending");
    assert_eq!(orders[0]["payment_status"], "paid");

    let (status, _) = send(
        &app,
        "GET",
        &format!("/orders/{number}?email=shopper@example.com"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Drive the lifecycle to delivered.
    let (status, order) = send(&app, "POST", &format!("/orders/{number}/process"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["status"], "processing");

    let (status, order) = send(
        &app,
        "POST",
        &format!("/orders/{number}/ship"),
        Some(json!({"carrier": "UPS", "tracking_number": "1Z999AA10123456784"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["status"], "shipped");
    assert_eq!(order["tracking_number"], "1Z999AA10123456784");

    let (status, order) = send(&app, "POST", &format!("/orders/{number}/deliver"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["status"], "delivered");
    assert!(order["delivered_at"].is_string());

    // Merchant inbox carries the new-order record.
    let (_, inbox) = send(&app, "GET", "/notifications", None).await;
    let kinds: Vec<&str> = inbox["notifications"]
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["kind"].as_str().unwrap())
        .collect();
    assert!(kinds.contains(&"new_order"));
}

#[tokio::test]
async fn test_add_to_cart_beyond_stock_conflicts() {
    let (app, _state) = setup();
    let variant_id = seed_variant(&app, "POSTER-A2", 2).await;
    let owner = Uuid::new_v4();

    let (status, body) = send(
        &app,
        "POST",
        &format!("/carts/{owner}/items"),
        Some(json!({"variant_id": variant_id, "quantity": 3})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    let message = body["error"].as_str().unwrap();
    assert!(message.contains("available 2"), "got: {message}");
}

#[tokio::test]
async fn test_checkout_empty_cart_is_bad_request() {
    let (app, _state) = setup();
    let (status, body) = send(
        &app,
        "POST",
        "/checkout",
        Some(json!({
            "owner_id": Uuid::new_v4(),
            "email": "x@example.com",
            "customer_name": "Nobody",
            "shipping_address": {
                "line1": "1 Main St",
                "city": "Portland",
                "region": "OR",
                "postal_code": "97201",
                "country": "US",
            },
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "cart is empty");
}

#[tokio::test]
async fn test_duplicate_webhook_creates_one_order() {
    let (app, _state) = setup();
    let variant_id = seed_variant(&app, "MUG-WHT", 5).await;
    let owner = Uuid::new_v4();
    send(
        &app,
        "POST",
        &format!("/carts/{owner}/items"),
        Some(json!({"variant_id": variant_id, "quantity": 1})),
    )
    .await;
    let (_, session) = send(
        &app,
        "POST",
        "/checkout",
        Some(json!({
            "owner_id": owner,
            "email": "s@example.com",
            "customer_name": "S",
            "shipping_address": {
                "line1": "1 Main St",
                "city": "Portland",
                "region": "OR",
                "postal_code": "97201",
                "country": "US",
            },
        })),
    )
    .await;
    let reference = session["payment_reference"].as_str().unwrap();

    // Webhook and client callback race on the same reference.
    for _ in 0..2 {
        let (status, _) = send(
            &app,
            "POST",
            "/webhooks/payment",
            Some(json!({"payment_reference": reference, "outcome": "succeeded"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, _) = send(
        &app,
        "POST",
        "/checkout/confirm",
        Some(json!({"payment_reference": reference})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, orders) = send(&app, "GET", "/orders", None).await;
    assert_eq!(orders.as_array().unwrap().len(), 1);
    let (_, variant) = send(&app, "GET", &format!("/variants/{variant_id}"), None).await;
    assert_eq!(variant["on_hand"], 4);
}

#[tokio::test]
async fn test_cancel_checkout_releases_stock() {
    let (app, _state) = setup();
    let variant_id = seed_variant(&app, "CAP-NVY", 1).await;
    let owner = Uuid::new_v4();
    send(
        &app,
        "POST",
        &format!("/carts/{owner}/items"),
        Some(json!({"variant_id": variant_id, "quantity": 1})),
    )
    .await;
    let (_, session) = send(
        &app,
        "POST",
        "/checkout",
        Some(json!({
            "owner_id": owner,
            "email": "s@example.com",
            "customer_name": "S",
            "shipping_address": {
                "line1": "1 Main St",
                "city": "Portland",
                "region": "OR",
                "postal_code": "97201",
                "country": "US",
            },
        })),
    )
    .await;
    let session_id = session["session_id"].as_str().unwrap();

    let (_, variant) = send(&app, "GET", &format!("/variants/{variant_id}"), None).await;
    assert_eq!(variant["available"], 0);

    let (status, body) = send(
        &app,
        "POST",
        &format!("/checkout/{session_id}/cancel"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "cancelled");

    let (_, variant) = send(&app, "GET", &format!("/variants/{variant_id}"), None).await;
    assert_eq!(variant["available"], 1);
}

#[tokio::test]
async fn test_invalid_transition_conflicts_with_allowed_states() {
    let (app, state) = setup();
    let variant_id = seed_variant(&app, "TEE-BLK-M", 2).await;
    let owner = Uuid::new_v4();
    send(
        &app,
        "POST",
        &format!("/carts/{owner}/items"),
        Some(json!({"variant_id": variant_id, "quantity": 1})),
    )
    .await;
    let (_, session) = send(
        &app,
        "POST",
        "/checkout",
        Some(json!({
            "owner_id": owner,
            "email": "s@example.com",
            "customer_name": "S",
            "shipping_address": {
                "line1": "1 Main St",
                "city": "Portland",
                "region": "OR",
                "postal_code": "97201",
                "country": "US",
            },
        })),
    )
    .await;
    let reference = session["payment_reference"].as_str().unwrap();
    send(
        &app,
        "POST",
        "/webhooks/payment",
        Some(json!({"payment_reference": reference, "outcome": "succeeded"})),
    )
    .await;
    let number = state.orders.list(None)[0].order_number().to_string();

    // pending -> delivered skips the table.
    let (status, body) = send(&app, "POST", &format!("/orders/{number}/deliver"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let message = body["error"].as_str().unwrap();
    assert!(message.contains("allowed"), "got: {message}");
}

#[tokio::test]
async fn test_guest_lookup_with_wrong_email_is_not_found() {
    let (app, state) = setup();
    let variant_id = seed_variant(&app, "TEE-BLK-M", 2).await;
    let owner = Uuid::new_v4();
    send(
        &app,
        "POST",
        &format!("/carts/{owner}/items"),
        Some(json!({"variant_id": variant_id, "quantity": 1})),
    )
    .await;
    let (_, session) = send(
        &app,
        "POST",
        "/checkout",
        Some(json!({
            "owner_id": owner,
            "email": "real@example.com",
            "customer_name": "R",
            "shipping_address": {
                "line1": "1 Main St",
                "city": "Portland",
                "region": "OR",
                "postal_code": "97201",
                "country": "US",
            },
        })),
    )
    .await;
    let reference = session["payment_reference"].as_str().unwrap();
    send(
        &app,
        "POST",
        "/webhooks/payment",
        Some(json!({"payment_reference": reference, "outcome": "succeeded"})),
    )
    .await;
    let number = state.orders.list(None)[0].order_number().to_string();

    let (status, _) = send(
        &app,
        "GET",
        &format!("/orders/{number}?email=wrong@example.com"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_order_is_not_found() {
    let (app, _state) = setup();
    let (status, _) = send(&app, "GET", "/orders/ORD-999999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_failed_payment_webhook_is_acknowledged() {
    let (app, _state) = setup();
    let (status, ack) = send(
        &app,
        "POST",
        "/webhooks/payment",
        Some(json!({"payment_reference": "PI-0001", "outcome": "failed"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["received"], true);
}

#[tokio::test]
async fn test_preferences_roundtrip() {
    let (app, _state) = setup();

    let (status, prefs) = send(&app, "GET", "/notification-preferences", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(prefs["enabled"], true);

    let (status, prefs) = send(
        &app,
        "PUT",
        "/notification-preferences",
        Some(json!({
            "enabled": true,
            "new_orders": false,
            "low_stock": true,
            "daily_summary": false,
            "default_low_stock_threshold": 3,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(prefs["new_orders"], false);
    assert_eq!(prefs["default_low_stock_threshold"], 3);
}

#[tokio::test]
async fn test_notification_read_and_retry_surfaces() {
    let (app, state) = setup();

    // Merchant record via the dispatcher, as the order path would.
    let n = state
        .dispatcher
        .notify_merchant(
            notifications::NotificationType::NewOrder,
            &json!({"order_number": "ORD-000042"}),
        )
        .unwrap();
    state.dispatcher.deliver(n.id).await.unwrap();

    let (status, body) = send(&app, "GET", &format!("/notifications/{}", n.id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["kind"], "new_order");
    assert_eq!(body["status"], "sent");

    let (status, body) = send(
        &app,
        "POST",
        &format!("/notifications/{}/read", n.id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["read_at"].is_string());

    // Retry of a sent record is a conflict.
    let (status, _) = send(
        &app,
        "POST",
        &format!("/notifications/{}/retry", n.id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_metrics_endpoint_renders() {
    let (app, _state) = setup();
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
