//! The notification dispatcher and its delivery worker.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::Utc;
use common::{MerchantId, NotificationId};
use inventory::LowStockAlert;
use serde_json::{Value, json};
use tokio::sync::mpsc;

use crate::error::NotificationError;
use crate::message::{Channel, DeliveryStatus, Notification, NotificationType};
use crate::preferences::NotificationPreferences;
use crate::push::{PushEvent, PushHub};
use crate::render::MessageRenderer;
use crate::transport::EmailTransport;

/// Retry ceiling; once reached, the failure is permanent in the UI.
pub const MAX_RETRIES: u32 = 3;

#[derive(Default)]
struct RecordStore {
    records: HashMap<NotificationId, Notification>,
    /// Insertion order, newest appended last.
    order: Vec<NotificationId>,
}

/// Emits and tracks delivery of transactional messages.
///
/// `enqueue` writes the durable record and hands the id to the delivery
/// worker. Delivery failures are recorded, never escalated; retries are
/// merchant-triggered to avoid message storms against a failing
/// provider.
pub struct NotificationDispatcher {
    store: RwLock<RecordStore>,
    email: Arc<dyn EmailTransport>,
    renderer: Arc<dyn MessageRenderer>,
    push: PushHub,
    prefs: RwLock<NotificationPreferences>,
    merchant_id: MerchantId,
    queue: mpsc::UnboundedSender<NotificationId>,
}

/// Background consumer of the delivery queue (one per dispatcher).
pub struct DeliveryWorker {
    dispatcher: Arc<NotificationDispatcher>,
    rx: mpsc::UnboundedReceiver<NotificationId>,
}

impl DeliveryWorker {
    /// Runs until the dispatcher side of the queue is dropped.
    pub async fn run(mut self) {
        tracing::info!("notification delivery worker started");
        while let Some(id) = self.rx.recv().await {
            if let Err(e) = self.dispatcher.deliver(id).await {
                tracing::error!(notification_id = %id, error = %e, "delivery attempt dropped");
            }
        }
        tracing::info!("notification queue closed, delivery worker stopping");
    }
}

impl NotificationDispatcher {
    /// Creates a dispatcher and its paired delivery worker.
    pub fn new(
        email: Arc<dyn EmailTransport>,
        renderer: Arc<dyn MessageRenderer>,
        merchant_id: MerchantId,
    ) -> (Arc<Self>, DeliveryWorker) {
        let (queue, rx) = mpsc::unbounded_channel();
        let dispatcher = Arc::new(Self {
            store: RwLock::new(RecordStore::default()),
            email,
            renderer,
            push: PushHub::new(),
            prefs: RwLock::new(NotificationPreferences::default()),
            merchant_id,
            queue,
        });
        let worker = DeliveryWorker {
            dispatcher: dispatcher.clone(),
            rx,
        };
        (dispatcher, worker)
    }

    /// The push hub for dashboard subscriptions.
    pub fn push_hub(&self) -> &PushHub {
        &self.push
    }

    /// The merchant this store's dashboard notifications belong to.
    pub fn merchant_id(&self) -> MerchantId {
        self.merchant_id
    }

    /// Creates the durable record and queues an asynchronous delivery
    /// attempt. Preference gating for merchant-facing types happens in
    /// [`notify_merchant`] before this is ever called.
    ///
    /// [`notify_merchant`]: NotificationDispatcher::notify_merchant
    #[tracing::instrument(skip(self, payload), fields(kind = %kind))]
    pub fn enqueue(
        &self,
        kind: NotificationType,
        recipient: &str,
        payload: &Value,
    ) -> Notification {
        let rendered = self.renderer.render(kind, payload);
        let notification = Notification {
            id: NotificationId::new(),
            kind,
            recipient: recipient.to_string(),
            subject: rendered.subject,
            body: rendered.body,
            channel: kind.channel(),
            status: DeliveryStatus::Pending,
            retry_count: 0,
            read_at: None,
            error: None,
            created_at: Utc::now(),
            sent_at: None,
        };

        {
            let mut store = self.store.write().unwrap();
            store.records.insert(notification.id, notification.clone());
            store.order.push(notification.id);
        }
        metrics::counter!("notifications_enqueued_total").increment(1);

        // Worker gone means we are shutting down; the durable record
        // stays pending and is retryable later.
        let _ = self.queue.send(notification.id);
        notification
    }

    /// Enqueues a customer-facing transactional message. Never subject
    /// to merchant suppression.
    pub fn notify_customer(
        &self,
        kind: NotificationType,
        email: &str,
        payload: &Value,
    ) -> Notification {
        self.enqueue(kind, email, payload)
    }

    /// Enqueues a merchant-facing message if preferences allow it.
    pub fn notify_merchant(&self, kind: NotificationType, payload: &Value) -> Option<Notification> {
        if !self.prefs.read().unwrap().allows(kind) {
            tracing::debug!(kind = %kind, "merchant notification suppressed by preferences");
            return None;
        }
        let recipient = self.merchant_id.to_string();
        Some(self.enqueue(kind, &recipient, payload))
    }

    /// Attempts delivery of one record.
    ///
    /// Transport failures are captured on the record (`Failed` + error,
    /// `retry_count` untouched) and reported as success here; the
    /// record is the escalation surface.
    #[tracing::instrument(skip(self))]
    pub async fn deliver(&self, id: NotificationId) -> Result<Notification, NotificationError> {
        let (channel, recipient, subject, body) = {
            let store = self.store.read().unwrap();
            let record = store.records.get(&id).ok_or(NotificationError::Unknown(id))?;
            (
                record.channel,
                record.recipient.clone(),
                record.subject.clone(),
                record.body.clone(),
            )
        };

        let outcome = match channel {
            // The email send happens with no store lock held.
            Channel::Email => self.email.send(&recipient, &subject, &body).await,
            Channel::Dashboard => Ok(()),
        };

        let record = {
            let mut store = self.store.write().unwrap();
            let record = store
                .records
                .get_mut(&id)
                .ok_or(NotificationError::Unknown(id))?;
            match outcome {
                Ok(()) => {
                    record.status = DeliveryStatus::Sent;
                    record.sent_at = Some(Utc::now());
                    record.error = None;
                    metrics::counter!("notifications_sent_total").increment(1);
                }
                Err(e) => {
                    record.status = DeliveryStatus::Failed;
                    record.error = Some(e.to_string());
                    metrics::counter!("notifications_failed_total").increment(1);
                    tracing::warn!(notification_id = %id, error = %e, "delivery failed");
                }
            }
            record.clone()
        };

        if record.channel == Channel::Dashboard {
            self.mirror_to_dashboard(&record);
        }
        Ok(record)
    }

    /// Merchant-triggered re-attempt; refused at the retry ceiling.
    #[tracing::instrument(skip(self))]
    pub async fn retry(&self, id: NotificationId) -> Result<Notification, NotificationError> {
        {
            let mut store = self.store.write().unwrap();
            let record = store
                .records
                .get_mut(&id)
                .ok_or(NotificationError::Unknown(id))?;
            if record.status != DeliveryStatus::Failed {
                return Err(NotificationError::NotFailed(id));
            }
            if record.retry_count >= MAX_RETRIES {
                return Err(NotificationError::RetryLimitReached {
                    id,
                    retry_count: record.retry_count,
                });
            }
            record.retry_count += 1;
            record.status = DeliveryStatus::Pending;
        }
        metrics::counter!("notifications_retried_total").increment(1);
        self.deliver(id).await
    }

    /// Stamps the merchant read time (first read wins) and pushes the
    /// new unread count.
    pub fn mark_read(&self, id: NotificationId) -> Result<Notification, NotificationError> {
        let record = {
            let mut store = self.store.write().unwrap();
            let record = store
                .records
                .get_mut(&id)
                .ok_or(NotificationError::Unknown(id))?;
            if record.channel != Channel::Dashboard {
                return Err(NotificationError::NotMerchantFacing(id));
            }
            if record.read_at.is_none() {
                record.read_at = Some(Utc::now());
            }
            record.clone()
        };

        self.push.publish(
            self.merchant_id,
            PushEvent::UnreadCountChanged {
                unread: self.unread_count(),
            },
        );
        Ok(record)
    }

    /// Fetches one record.
    pub fn get(&self, id: NotificationId) -> Result<Notification, NotificationError> {
        self.store
            .read()
            .unwrap()
            .records
            .get(&id)
            .cloned()
            .ok_or(NotificationError::Unknown(id))
    }

    /// Merchant dashboard inbox, newest first.
    pub fn merchant_inbox(&self, unread_only: bool) -> Vec<Notification> {
        let store = self.store.read().unwrap();
        store
            .order
            .iter()
            .rev()
            .filter_map(|id| store.records.get(id))
            .filter(|n| n.channel == Channel::Dashboard)
            .filter(|n| !unread_only || n.is_unread())
            .cloned()
            .collect()
    }

    /// All records addressed to one recipient, newest first.
    pub fn list_for_recipient(&self, recipient: &str) -> Vec<Notification> {
        let store = self.store.read().unwrap();
        store
            .order
            .iter()
            .rev()
            .filter_map(|id| store.records.get(id))
            .filter(|n| n.recipient == recipient)
            .cloned()
            .collect()
    }

    /// Count of unread merchant-facing records.
    pub fn unread_count(&self) -> usize {
        self.store
            .read()
            .unwrap()
            .records
            .values()
            .filter(|n| n.is_unread())
            .count()
    }

    /// Current preference snapshot.
    pub fn preferences(&self) -> NotificationPreferences {
        self.prefs.read().unwrap().clone()
    }

    /// Replaces the merchant's preferences.
    pub fn update_preferences(&self, prefs: NotificationPreferences) {
        *self.prefs.write().unwrap() = prefs;
    }

    fn mirror_to_dashboard(&self, record: &Notification) {
        self.push.publish(
            self.merchant_id,
            PushEvent::NewNotification {
                id: record.id,
                kind: record.kind,
                subject: record.subject.clone(),
                created_at: record.created_at,
            },
        );
        self.push.publish(
            self.merchant_id,
            PushEvent::UnreadCountChanged {
                unread: self.unread_count(),
            },
        );
    }

    /// Consumes low-stock alerts from the inventory ledger.
    ///
    /// Runs until the ledger is dropped. Preference gating happens here,
    /// before enqueue, like every merchant-facing type.
    pub async fn consume_low_stock(
        self: Arc<Self>,
        mut alerts: mpsc::UnboundedReceiver<LowStockAlert>,
    ) {
        tracing::info!("low-stock listener started");
        while let Some(alert) = alerts.recv().await {
            let payload = json!({
                "variant_id": alert.variant_id,
                "sku": alert.sku,
                "product_name": alert.product_name,
                "variant_name": alert.variant_name,
                "remaining": alert.remaining,
                "threshold": alert.threshold,
            });
            self.notify_merchant(NotificationType::LowStock, &payload);
        }
        tracing::info!("low-stock channel closed, listener stopping");
    }
}
