//! Server-sent events stream for the merchant dashboard.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use common::MerchantId;
use futures_util::Stream;
use notifications::PushEvent;
use tokio::sync::broadcast;

use crate::state::AppState;

fn event_name(event: &PushEvent) -> &'static str {
    match event {
        PushEvent::NewNotification { .. } => "new-notification",
        PushEvent::UnreadCountChanged { .. } => "unread-count-changed",
    }
}

/// GET /merchants/{id}/events — live push stream.
///
/// Best-effort hint only: a lagged subscriber just skips ahead, and
/// clients reconcile against the durable notification list on
/// reconnect.
#[tracing::instrument(skip(state))]
pub async fn subscribe(
    State(state): State<Arc<AppState>>,
    Path(merchant_id): Path<MerchantId>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.dispatcher.push_hub().subscribe(merchant_id);
    tracing::info!(%merchant_id, "dashboard session subscribed");

    let stream = futures_util::stream::unfold(rx, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    let name = event_name(&event);
                    let data = match serde_json::to_string(&event) {
                        Ok(data) => data,
                        Err(_) => continue,
                    };
                    return Some((Ok(Event::default().event(name).data(data)), rx));
                }
                // Skip ahead; the durable list is the source of truth.
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "push subscriber lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
