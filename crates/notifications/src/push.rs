//! Live push fan-out to connected dashboard sessions.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use common::{MerchantId, NotificationId};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::message::NotificationType;

const TOPIC_CAPACITY: usize = 64;

/// Events mirrored to dashboard sessions.
///
/// A best-effort real-time hint: the durable notification list is the
/// source of truth and clients reconcile against it on reconnect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PushEvent {
    NewNotification {
        id: NotificationId,
        kind: NotificationType,
        subject: String,
        created_at: DateTime<Utc>,
    },
    UnreadCountChanged {
        unread: usize,
    },
}

/// Broadcast topic per merchant; each connected dashboard session holds
/// a receiver.
#[derive(Debug, Default)]
pub struct PushHub {
    topics: RwLock<HashMap<MerchantId, broadcast::Sender<PushEvent>>>,
}

impl PushHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes a dashboard session to a merchant's topic.
    pub fn subscribe(&self, merchant_id: MerchantId) -> broadcast::Receiver<PushEvent> {
        let mut topics = self.topics.write().unwrap();
        topics
            .entry(merchant_id)
            .or_insert_with(|| broadcast::channel(TOPIC_CAPACITY).0)
            .subscribe()
    }

    /// Publishes to a merchant's topic. Absent or lagging subscribers
    /// never fail the caller; the durable write has already happened.
    pub fn publish(&self, merchant_id: MerchantId, event: PushEvent) {
        let topics = self.topics.read().unwrap();
        if let Some(sender) = topics.get(&merchant_id) {
            let _ = sender.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscriber_receives_events() {
        let hub = PushHub::new();
        let merchant = MerchantId::new();
        let mut rx = hub.subscribe(merchant);

        hub.publish(merchant, PushEvent::UnreadCountChanged { unread: 3 });

        assert_eq!(
            rx.recv().await.unwrap(),
            PushEvent::UnreadCountChanged { unread: 3 }
        );
    }

    #[test]
    fn test_publish_without_subscribers_is_fine() {
        let hub = PushHub::new();
        hub.publish(MerchantId::new(), PushEvent::UnreadCountChanged { unread: 0 });
    }

    #[tokio::test]
    async fn test_topics_are_isolated_per_merchant() {
        let hub = PushHub::new();
        let a = MerchantId::new();
        let b = MerchantId::new();
        let mut rx_b = hub.subscribe(b);

        hub.publish(a, PushEvent::UnreadCountChanged { unread: 1 });
        hub.publish(b, PushEvent::UnreadCountChanged { unread: 2 });

        assert_eq!(
            rx_b.recv().await.unwrap(),
            PushEvent::UnreadCountChanged { unread: 2 }
        );
        assert!(rx_b.try_recv().is_err());
    }
}
