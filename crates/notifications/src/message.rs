//! Notification record types.

use chrono::{DateTime, Utc};
use common::NotificationId;
use serde::{Deserialize, Serialize};

/// What kind of message a notification carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    /// Customer: order received and paid.
    OrderConfirmation,
    /// Customer: order handed to a carrier.
    OrderShipped,
    /// Customer: carrier confirmed delivery.
    OrderDelivered,
    /// Customer: order was cancelled.
    OrderCancelled,
    /// Merchant: a new order arrived.
    NewOrder,
    /// Merchant: a variant crossed its low-stock threshold.
    LowStock,
    /// Merchant: end-of-day order summary.
    DailySummary,
    /// Merchant: a paid order needs manual inventory reconciliation.
    ReconciliationRequired,
}

impl NotificationType {
    /// Merchant-facing types land on the dashboard channel and are
    /// mirrored over push; customer-facing types go out as email.
    pub fn is_merchant_facing(&self) -> bool {
        matches!(
            self,
            NotificationType::NewOrder
                | NotificationType::LowStock
                | NotificationType::DailySummary
                | NotificationType::ReconciliationRequired
        )
    }

    /// Default channel for this type.
    pub fn channel(&self) -> Channel {
        if self.is_merchant_facing() {
            Channel::Dashboard
        } else {
            Channel::Email
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::OrderConfirmation => "order_confirmation",
            NotificationType::OrderShipped => "order_shipped",
            NotificationType::OrderDelivered => "order_delivered",
            NotificationType::OrderCancelled => "order_cancelled",
            NotificationType::NewOrder => "new_order",
            NotificationType::LowStock => "low_stock",
            NotificationType::DailySummary => "daily_summary",
            NotificationType::ReconciliationRequired => "reconciliation_required",
        }
    }
}

impl std::fmt::Display for NotificationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which transport carries the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// Asynchronous email queue (customer-facing).
    Email,
    /// Durable dashboard record (merchant-facing), mirrored over push.
    Dashboard,
}

/// Delivery state of one notification record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Pending,
    Sent,
    Failed,
}

/// Durable record of one outbound message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub kind: NotificationType,
    /// Customer email, or the merchant id for dashboard records.
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub channel: Channel,
    pub status: DeliveryStatus,
    pub retry_count: u32,
    /// Merchant-facing only; first read wins.
    pub read_at: Option<DateTime<Utc>>,
    /// Last delivery failure reason.
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
}

impl Notification {
    /// Returns true if the record has not been read by the merchant.
    pub fn is_unread(&self) -> bool {
        self.channel == Channel::Dashboard && self.read_at.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merchant_facing_split() {
        assert!(NotificationType::NewOrder.is_merchant_facing());
        assert!(NotificationType::LowStock.is_merchant_facing());
        assert!(NotificationType::DailySummary.is_merchant_facing());
        assert!(NotificationType::ReconciliationRequired.is_merchant_facing());
        assert!(!NotificationType::OrderConfirmation.is_merchant_facing());
        assert!(!NotificationType::OrderShipped.is_merchant_facing());
        assert!(!NotificationType::OrderDelivered.is_merchant_facing());
        assert!(!NotificationType::OrderCancelled.is_merchant_facing());
    }

    #[test]
    fn test_channel_follows_audience() {
        assert_eq!(NotificationType::NewOrder.channel(), Channel::Dashboard);
        assert_eq!(NotificationType::OrderShipped.channel(), Channel::Email);
    }
}
