//! Cart mutation and read endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use checkout::CartOwner;
use common::{CustomerId, Money, VariantId};
use domain::Cart;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

/// Whether the path id names a guest token or a customer id.
#[derive(Debug, Default, Deserialize)]
pub struct OwnerQuery {
    #[serde(default)]
    pub kind: OwnerKind,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnerKind {
    #[default]
    Guest,
    Customer,
}

fn parse_owner(id: &str, kind: OwnerKind) -> Result<CartOwner, ApiError> {
    let uuid = Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("invalid owner id: {e}")))?;
    Ok(match kind {
        OwnerKind::Guest => CartOwner::Guest { token: uuid },
        OwnerKind::Customer => CartOwner::Customer {
            customer_id: CustomerId::from_uuid(uuid),
        },
    })
}

// -- Request types --

#[derive(Deserialize)]
pub struct AddItemRequest {
    pub variant_id: VariantId,
    pub quantity: u32,
}

#[derive(Deserialize)]
pub struct UpdateQuantityRequest {
    pub quantity: u32,
}

#[derive(Deserialize)]
pub struct MergeRequest {
    pub customer_id: CustomerId,
}

// -- Response types --

#[derive(Serialize)]
pub struct CartResponse {
    pub lines: Vec<CartLineResponse>,
    pub total_units: u32,
    pub subtotal_cents: i64,
}

#[derive(Serialize)]
pub struct CartLineResponse {
    pub variant_id: VariantId,
    pub sku: String,
    pub product_name: String,
    pub variant_name: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
    pub available: u32,
}

fn cart_response(state: &AppState, cart: &Cart) -> CartResponse {
    let mut lines = Vec::with_capacity(cart.line_count());
    let mut subtotal = Money::zero();
    for (variant_id, quantity) in cart.lines() {
        // Variants can only vanish through merchant catalog edits, which
        // this subsystem does not perform; skip rather than fail a read.
        let Ok(snapshot) = state.ledger.snapshot(variant_id) else {
            continue;
        };
        subtotal += snapshot.unit_price.multiply(quantity);
        lines.push(CartLineResponse {
            variant_id,
            sku: snapshot.sku,
            product_name: snapshot.product_name,
            variant_name: snapshot.variant_name,
            quantity,
            unit_price_cents: snapshot.unit_price.cents(),
            available: snapshot.available,
        });
    }
    CartResponse {
        total_units: cart.total_units(),
        subtotal_cents: subtotal.cents(),
        lines,
    }
}

// -- Handlers --

/// GET /carts/{owner} — read the owner's cart.
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(owner_id): Path<String>,
    Query(query): Query<OwnerQuery>,
) -> Result<Json<CartResponse>, ApiError> {
    let owner = parse_owner(&owner_id, query.kind)?;
    let cart = state.carts.get(owner);
    Ok(Json(cart_response(&state, &cart)))
}

/// POST /carts/{owner}/items — add units of a variant.
#[tracing::instrument(skip(state, req))]
pub async fn add_item(
    State(state): State<Arc<AppState>>,
    Path(owner_id): Path<String>,
    Query(query): Query<OwnerQuery>,
    Json(req): Json<AddItemRequest>,
) -> Result<Json<CartResponse>, ApiError> {
    let owner = parse_owner(&owner_id, query.kind)?;
    let cart = state.carts.add_item(owner, req.variant_id, req.quantity)?;
    Ok(Json(cart_response(&state, &cart)))
}

/// PUT /carts/{owner}/items/{variant_id} — set a line's quantity.
#[tracing::instrument(skip(state, req))]
pub async fn update_item(
    State(state): State<Arc<AppState>>,
    Path((owner_id, variant_id)): Path<(String, VariantId)>,
    Query(query): Query<OwnerQuery>,
    Json(req): Json<UpdateQuantityRequest>,
) -> Result<Json<CartResponse>, ApiError> {
    let owner = parse_owner(&owner_id, query.kind)?;
    let cart = state
        .carts
        .update_quantity(owner, variant_id, req.quantity)?;
    Ok(Json(cart_response(&state, &cart)))
}

/// DELETE /carts/{owner}/items/{variant_id} — remove a line.
pub async fn remove_item(
    State(state): State<Arc<AppState>>,
    Path((owner_id, variant_id)): Path<(String, VariantId)>,
    Query(query): Query<OwnerQuery>,
) -> Result<Json<CartResponse>, ApiError> {
    let owner = parse_owner(&owner_id, query.kind)?;
    let cart = state.carts.remove_item(owner, variant_id);
    Ok(Json(cart_response(&state, &cart)))
}

/// DELETE /carts/{owner} — clear the cart.
pub async fn clear(
    State(state): State<Arc<AppState>>,
    Path(owner_id): Path<String>,
    Query(query): Query<OwnerQuery>,
) -> Result<Json<CartResponse>, ApiError> {
    let owner = parse_owner(&owner_id, query.kind)?;
    state.carts.clear(owner);
    Ok(Json(cart_response(&state, &Cart::new())))
}

/// POST /carts/{owner}/merge — fold a guest cart into a customer cart
/// on login. The path id is the guest token.
#[tracing::instrument(skip(state, req))]
pub async fn merge(
    State(state): State<Arc<AppState>>,
    Path(owner_id): Path<String>,
    Json(req): Json<MergeRequest>,
) -> Result<Json<CartResponse>, ApiError> {
    let token = Uuid::parse_str(&owner_id)
        .map_err(|e| ApiError::BadRequest(format!("invalid guest token: {e}")))?;
    let cart = state.carts.merge_on_login(token, req.customer_id);
    Ok(Json(cart_response(&state, &cart)))
}
