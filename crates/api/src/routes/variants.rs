//! Merchant-facing variant registration and stock adjustment endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{Money, VariantId};
use inventory::{AdjustmentReason, NewVariant, VariantSnapshot};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::AppState;

// -- Request types --

#[derive(Deserialize)]
pub struct RegisterVariantRequest {
    pub sku: String,
    pub product_name: String,
    pub variant_name: String,
    pub unit_price_cents: i64,
    pub on_hand: u32,
    /// Defaults to the merchant's preferred threshold when omitted.
    pub low_stock_threshold: Option<u32>,
}

#[derive(Deserialize)]
pub struct AdjustRequest {
    pub delta: i64,
    pub reason: AdjustReason,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustReason {
    Received,
    Recount,
    Damage,
}

impl From<AdjustReason> for AdjustmentReason {
    fn from(reason: AdjustReason) -> Self {
        match reason {
            AdjustReason::Received => AdjustmentReason::Received,
            AdjustReason::Recount => AdjustmentReason::Recount,
            AdjustReason::Damage => AdjustmentReason::Damage,
        }
    }
}

// -- Response types --

#[derive(Serialize)]
pub struct VariantResponse {
    pub variant_id: VariantId,
    pub sku: String,
    pub product_name: String,
    pub variant_name: String,
    pub unit_price_cents: i64,
    pub on_hand: u32,
    pub available: u32,
    pub low_stock_threshold: u32,
}

impl VariantResponse {
    fn from_snapshot(snapshot: &VariantSnapshot) -> Self {
        Self {
            variant_id: snapshot.variant_id,
            sku: snapshot.sku.clone(),
            product_name: snapshot.product_name.clone(),
            variant_name: snapshot.variant_name.clone(),
            unit_price_cents: snapshot.unit_price.cents(),
            on_hand: snapshot.on_hand,
            available: snapshot.available,
            low_stock_threshold: snapshot.low_stock_threshold,
        }
    }
}

// -- Handlers --

/// POST /variants — register a sellable variant.
#[tracing::instrument(skip(state, req))]
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterVariantRequest>,
) -> Result<(StatusCode, Json<VariantResponse>), ApiError> {
    let threshold = req.low_stock_threshold.unwrap_or_else(|| {
        state.dispatcher.preferences().default_low_stock_threshold
    });
    let snapshot = state.ledger.register_variant(NewVariant {
        sku: req.sku,
        product_name: req.product_name,
        variant_name: req.variant_name,
        unit_price: Money::from_cents(req.unit_price_cents),
        on_hand: req.on_hand,
        low_stock_threshold: threshold,
    });
    Ok((
        StatusCode::CREATED,
        Json(VariantResponse::from_snapshot(&snapshot)),
    ))
}

/// GET /variants/{id} — live availability snapshot.
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(variant_id): Path<VariantId>,
) -> Result<Json<VariantResponse>, ApiError> {
    let snapshot = state.ledger.snapshot(variant_id)?;
    Ok(Json(VariantResponse::from_snapshot(&snapshot)))
}

/// POST /variants/{id}/adjust — manual merchant stock correction.
#[tracing::instrument(skip(state, req))]
pub async fn adjust(
    State(state): State<Arc<AppState>>,
    Path(variant_id): Path<VariantId>,
    Json(req): Json<AdjustRequest>,
) -> Result<Json<VariantResponse>, ApiError> {
    state.ledger.adjust(variant_id, req.delta, req.reason.into())?;
    let snapshot = state.ledger.snapshot(variant_id)?;
    Ok(Json(VariantResponse::from_snapshot(&snapshot)))
}
