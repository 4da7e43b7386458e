//! Notification list, read-state, retry, and preference endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use common::NotificationId;
use notifications::{Notification, NotificationPreferences};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct InboxQuery {
    #[serde(default)]
    pub unread: bool,
}

#[derive(Serialize)]
pub struct NotificationResponse {
    pub id: NotificationId,
    pub kind: String,
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub channel: String,
    pub status: String,
    pub retry_count: u32,
    pub read_at: Option<String>,
    pub error: Option<String>,
    pub created_at: String,
    pub sent_at: Option<String>,
}

impl NotificationResponse {
    fn from_notification(n: &Notification) -> Self {
        Self {
            id: n.id,
            kind: n.kind.to_string(),
            recipient: n.recipient.clone(),
            subject: n.subject.clone(),
            body: n.body.clone(),
            channel: format!("{:?}", n.channel).to_lowercase(),
            status: format!("{:?}", n.status).to_lowercase(),
            retry_count: n.retry_count,
            read_at: n.read_at.map(|t| t.to_rfc3339()),
            error: n.error.clone(),
            created_at: n.created_at.to_rfc3339(),
            sent_at: n.sent_at.map(|t| t.to_rfc3339()),
        }
    }
}

#[derive(Serialize)]
pub struct InboxResponse {
    pub unread: usize,
    pub notifications: Vec<NotificationResponse>,
}

// -- Handlers --

/// GET /notifications — merchant inbox, newest first.
pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(query): Query<InboxQuery>,
) -> Result<Json<InboxResponse>, ApiError> {
    let notifications = state
        .dispatcher
        .merchant_inbox(query.unread)
        .iter()
        .map(NotificationResponse::from_notification)
        .collect();
    Ok(Json(InboxResponse {
        unread: state.dispatcher.unread_count(),
        notifications,
    }))
}

/// GET /notifications/{id} — one record.
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<NotificationId>,
) -> Result<Json<NotificationResponse>, ApiError> {
    let notification = state.dispatcher.get(id)?;
    Ok(Json(NotificationResponse::from_notification(&notification)))
}

/// POST /notifications/{id}/read — stamp the merchant read time.
#[tracing::instrument(skip(state))]
pub async fn mark_read(
    State(state): State<Arc<AppState>>,
    Path(id): Path<NotificationId>,
) -> Result<Json<NotificationResponse>, ApiError> {
    let notification = state.dispatcher.mark_read(id)?;
    Ok(Json(NotificationResponse::from_notification(&notification)))
}

/// POST /notifications/{id}/retry — merchant-triggered redelivery,
/// refused at the retry ceiling.
#[tracing::instrument(skip(state))]
pub async fn retry(
    State(state): State<Arc<AppState>>,
    Path(id): Path<NotificationId>,
) -> Result<Json<NotificationResponse>, ApiError> {
    let notification = state.dispatcher.retry(id).await?;
    Ok(Json(NotificationResponse::from_notification(&notification)))
}

/// GET /notification-preferences — current toggles.
pub async fn get_preferences(
    State(state): State<Arc<AppState>>,
) -> Json<NotificationPreferences> {
    Json(state.dispatcher.preferences())
}

/// PUT /notification-preferences — replace toggles.
#[tracing::instrument(skip(state, prefs))]
pub async fn put_preferences(
    State(state): State<Arc<AppState>>,
    Json(prefs): Json<NotificationPreferences>,
) -> Json<NotificationPreferences> {
    state.dispatcher.update_preferences(prefs);
    Json(state.dispatcher.preferences())
}
