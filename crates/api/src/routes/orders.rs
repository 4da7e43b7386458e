//! Order lookup and transition endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use domain::{Order, OrderNumber, OrderStatus, Shipment};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::AppState;

// -- Request types --

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub status: Option<OrderStatus>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LookupQuery {
    /// When present, the storefront path: the email must match the one
    /// captured at checkout.
    pub email: Option<String>,
}

#[derive(Deserialize)]
pub struct ShipRequest {
    pub carrier: Option<String>,
    pub tracking_number: Option<String>,
}

#[derive(Deserialize)]
pub struct CancelRequest {
    pub reason: Option<String>,
}

#[derive(Deserialize)]
pub struct NotesRequest {
    pub notes: String,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderResponse {
    pub order_number: String,
    pub email: String,
    pub customer_name: String,
    pub status: String,
    pub payment_status: String,
    pub items: Vec<OrderItemResponse>,
    pub subtotal_cents: i64,
    pub shipping_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
    pub carrier: Option<String>,
    pub tracking_number: Option<String>,
    pub created_at: String,
    pub processed_at: Option<String>,
    pub shipped_at: Option<String>,
    pub delivered_at: Option<String>,
    pub cancelled_at: Option<String>,
    pub notes: String,
    pub reconciliation_required: bool,
}

#[derive(Serialize)]
pub struct OrderItemResponse {
    pub sku: String,
    pub product_name: String,
    pub variant_name: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
}

#[derive(Serialize)]
pub struct CancelResponse {
    #[serde(flatten)]
    pub order: OrderResponse,
    /// Which cancellation branch applied: before shipping restocks,
    /// after shipping leaves stock to a manual merchant decision.
    pub restocked: bool,
}

impl OrderResponse {
    pub fn from_order(order: &Order) -> Self {
        let items = order
            .items()
            .iter()
            .map(|item| OrderItemResponse {
                sku: item.sku.clone(),
                product_name: item.product_name.clone(),
                variant_name: item.variant_name.clone(),
                quantity: item.quantity,
                unit_price_cents: item.unit_price.cents(),
            })
            .collect();

        Self {
            order_number: order.order_number().to_string(),
            email: order.email().to_string(),
            customer_name: order.customer_name().to_string(),
            status: order.status().to_string(),
            payment_status: order.payment_status().to_string(),
            items,
            subtotal_cents: order.subtotal().cents(),
            shipping_cents: order.shipping_cost().cents(),
            tax_cents: order.tax_amount().cents(),
            total_cents: order.total().cents(),
            carrier: order.shipment().carrier.clone(),
            tracking_number: order.shipment().tracking_number.clone(),
            created_at: order.created_at().to_rfc3339(),
            processed_at: order.processed_at().map(|t| t.to_rfc3339()),
            shipped_at: order.shipped_at().map(|t| t.to_rfc3339()),
            delivered_at: order.delivered_at().map(|t| t.to_rfc3339()),
            cancelled_at: order.cancelled_at().map(|t| t.to_rfc3339()),
            notes: order.notes().to_string(),
            reconciliation_required: order.reconciliation_required(),
        }
    }
}

// -- Handlers --

/// GET /orders — merchant list, newest first, optional status filter.
pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let orders = state.orders.list(query.status);
    Ok(Json(orders.iter().map(OrderResponse::from_order).collect()))
}

/// GET /orders/{number} — order detail. With `?email=` this is the
/// storefront/guest path and the email must match.
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(number): Path<String>,
    Query(query): Query<LookupQuery>,
) -> Result<Json<OrderResponse>, ApiError> {
    let number = OrderNumber::from(number);
    let order = match &query.email {
        Some(email) => state.orders.get_for_customer(&number, email)?,
        None => state.orders.get(&number)?,
    };
    Ok(Json(OrderResponse::from_order(&order)))
}

/// POST /orders/{number}/process — pending → processing.
#[tracing::instrument(skip(state))]
pub async fn process(
    State(state): State<Arc<AppState>>,
    Path(number): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state.orders.mark_processing(&OrderNumber::from(number))?;
    Ok(Json(OrderResponse::from_order(&order)))
}

/// POST /orders/{number}/ship — processing → shipped, with optional
/// carrier details stored verbatim.
#[tracing::instrument(skip(state, req))]
pub async fn ship(
    State(state): State<Arc<AppState>>,
    Path(number): Path<String>,
    Json(req): Json<ShipRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let shipment = Shipment {
        carrier: req.carrier,
        tracking_number: req.tracking_number,
    };
    let order = state
        .orders
        .mark_shipped(&OrderNumber::from(number), shipment)?;
    Ok(Json(OrderResponse::from_order(&order)))
}

/// POST /orders/{number}/deliver — shipped → delivered.
#[tracing::instrument(skip(state))]
pub async fn deliver(
    State(state): State<Arc<AppState>>,
    Path(number): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state.orders.mark_delivered(&OrderNumber::from(number))?;
    Ok(Json(OrderResponse::from_order(&order)))
}

/// POST /orders/{number}/cancel — cancel with an optional reason.
#[tracing::instrument(skip(state, req))]
pub async fn cancel(
    State(state): State<Arc<AppState>>,
    Path(number): Path<String>,
    Json(req): Json<CancelRequest>,
) -> Result<Json<CancelResponse>, ApiError> {
    let (order, cancellation) = state
        .orders
        .cancel(&OrderNumber::from(number), req.reason.as_deref())?;
    Ok(Json(CancelResponse {
        order: OrderResponse::from_order(&order),
        restocked: cancellation.restock,
    }))
}

/// POST /orders/{number}/refund — paid → refunded (cancelled orders only).
#[tracing::instrument(skip(state))]
pub async fn refund(
    State(state): State<Arc<AppState>>,
    Path(number): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state.orders.mark_refunded(&OrderNumber::from(number))?;
    Ok(Json(OrderResponse::from_order(&order)))
}

/// PUT /orders/{number}/notes — replace merchant notes.
pub async fn notes(
    State(state): State<Arc<AppState>>,
    Path(number): Path<String>,
    Json(req): Json<NotesRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state.orders.set_notes(&OrderNumber::from(number), &req.notes)?;
    Ok(Json(OrderResponse::from_order(&order)))
}
