//! Checkout session and payment confirmation endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use checkout::{CartOwner, CheckoutSession};
use common::{CheckoutSessionId, CustomerId};
use domain::Address;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;
use crate::routes::orders::OrderResponse;
use crate::state::AppState;

// -- Request types --

#[derive(Deserialize)]
pub struct StartCheckoutRequest {
    pub owner_id: Uuid,
    /// "guest" (default) or "customer".
    #[serde(default)]
    pub kind: super::carts::OwnerKind,
    pub email: String,
    pub customer_name: String,
    pub shipping_address: AddressRequest,
}

#[derive(Deserialize)]
pub struct AddressRequest {
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub region: String,
    pub postal_code: String,
    pub country: String,
}

impl From<AddressRequest> for Address {
    fn from(req: AddressRequest) -> Self {
        Address {
            line1: req.line1,
            line2: req.line2,
            city: req.city,
            region: req.region,
            postal_code: req.postal_code,
            country: req.country,
        }
    }
}

#[derive(Deserialize)]
pub struct ConfirmRequest {
    pub payment_reference: String,
}

/// Inbound webhook body from the payment processor.
#[derive(Deserialize)]
pub struct PaymentWebhookRequest {
    pub payment_reference: String,
    pub outcome: WebhookOutcome,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookOutcome {
    Succeeded,
    Failed,
}

// -- Response types --

#[derive(Serialize)]
pub struct SessionResponse {
    pub session_id: CheckoutSessionId,
    pub state: String,
    pub subtotal_cents: i64,
    pub shipping_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
    pub payment_reference: String,
    pub client_secret: String,
    pub expires_at: String,
}

impl SessionResponse {
    fn from_session(session: &CheckoutSession) -> Self {
        Self {
            session_id: session.id(),
            state: session.state().to_string(),
            subtotal_cents: session.subtotal().cents(),
            shipping_cents: session.shipping_cost().cents(),
            tax_cents: session.tax_amount().cents(),
            total_cents: session.total().cents(),
            payment_reference: session.payment_reference().to_string(),
            client_secret: session.client_secret().to_string(),
            expires_at: session.expires_at().to_rfc3339(),
        }
    }
}

#[derive(Serialize)]
pub struct WebhookAck {
    pub received: bool,
}

// -- Handlers --

/// POST /checkout — start a checkout from the owner's cart.
#[tracing::instrument(skip(state, req))]
pub async fn start(
    State(state): State<Arc<AppState>>,
    Json(req): Json<StartCheckoutRequest>,
) -> Result<(StatusCode, Json<SessionResponse>), ApiError> {
    let owner = match req.kind {
        super::carts::OwnerKind::Guest => CartOwner::Guest { token: req.owner_id },
        super::carts::OwnerKind::Customer => CartOwner::Customer {
            customer_id: CustomerId::from_uuid(req.owner_id),
        },
    };

    let session = state
        .checkout
        .start(
            owner,
            req.shipping_address.into(),
            &req.email,
            &req.customer_name,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(SessionResponse::from_session(&session)),
    ))
}

/// GET /checkout/{id} — read a session's state and totals.
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<CheckoutSessionId>,
) -> Result<Json<SessionResponse>, ApiError> {
    let session = state.checkout.get(session_id).await?;
    Ok(Json(SessionResponse::from_session(&session)))
}

/// POST /checkout/{id}/cancel — fire-and-forget cancel; idempotent.
#[tracing::instrument(skip(state))]
pub async fn cancel(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<CheckoutSessionId>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let session_state = state.checkout.cancel(session_id).await?;
    Ok(Json(serde_json::json!({ "state": session_state.as_str() })))
}

/// POST /checkout/confirm — client-reported payment success; converges
/// on the same idempotent entry point as the webhook.
#[tracing::instrument(skip(state, req))]
pub async fn confirm(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ConfirmRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state.checkout.confirm_payment(&req.payment_reference).await?;
    Ok(Json(OrderResponse::from_order(&order)))
}

/// POST /webhooks/payment — processor webhook, at-least-once delivery.
///
/// A failed outcome is acknowledged without touching the session: it
/// stays active so the shopper can retry until the TTL.
#[tracing::instrument(skip(state, req))]
pub async fn payment_webhook(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PaymentWebhookRequest>,
) -> Result<Json<WebhookAck>, ApiError> {
    match req.outcome {
        WebhookOutcome::Succeeded => {
            state.checkout.confirm_payment(&req.payment_reference).await?;
        }
        WebhookOutcome::Failed => {
            tracing::info!(
                payment_reference = %req.payment_reference,
                "payment failure webhook received; session left active for retry"
            );
        }
    }
    Ok(Json(WebhookAck { received: true }))
}
