//! Message rendering port.
//!
//! Subject/body construction belongs to the presentation layer; the
//! dispatcher treats the renderer as an opaque formatter.

use serde_json::Value;

use crate::message::NotificationType;

/// A rendered subject and body, ready for a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub subject: String,
    pub body: String,
}

/// Turns a notification type plus payload into a subject and body.
pub trait MessageRenderer: Send + Sync {
    fn render(&self, kind: NotificationType, payload: &Value) -> RenderedMessage;
}

/// Minimal renderer used in wiring and tests; real templates live with
/// the presentation layer.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextRenderer;

impl PlainTextRenderer {
    fn field<'a>(payload: &'a Value, key: &str) -> &'a str {
        payload.get(key).and_then(Value::as_str).unwrap_or("")
    }
}

impl MessageRenderer for PlainTextRenderer {
    fn render(&self, kind: NotificationType, payload: &Value) -> RenderedMessage {
        let order = Self::field(payload, "order_number");
        let subject = match kind {
            NotificationType::OrderConfirmation => format!("Order {order} confirmed"),
            NotificationType::OrderShipped => format!("Order {order} has shipped"),
            NotificationType::OrderDelivered => format!("Order {order} was delivered"),
            NotificationType::OrderCancelled => format!("Order {order} was cancelled"),
            NotificationType::NewOrder => format!("New order {order}"),
            NotificationType::LowStock => {
                format!("Low stock: {}", Self::field(payload, "sku"))
            }
            NotificationType::DailySummary => {
                format!("Daily summary for {}", Self::field(payload, "date"))
            }
            NotificationType::ReconciliationRequired => {
                format!("Order {order} needs inventory reconciliation")
            }
        };
        RenderedMessage {
            subject,
            body: payload.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_subjects_carry_identifying_fields() {
        let renderer = PlainTextRenderer;

        let msg = renderer.render(
            NotificationType::OrderConfirmation,
            &json!({"order_number": "ORD-000009"}),
        );
        assert_eq!(msg.subject, "Order ORD-000009 confirmed");

        let msg = renderer.render(NotificationType::LowStock, &json!({"sku": "TEE-BLK-M"}));
        assert_eq!(msg.subject, "Low stock: TEE-BLK-M");
    }

    #[test]
    fn test_body_is_payload() {
        let payload = json!({"order_number": "ORD-000001", "total": "$12.00"});
        let msg = PlainTextRenderer.render(NotificationType::NewOrder, &payload);
        assert_eq!(msg.body, payload.to_string());
    }
}
