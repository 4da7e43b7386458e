//! Merchant notification preferences.

use serde::{Deserialize, Serialize};

use crate::message::NotificationType;

/// Per-merchant notification toggles.
///
/// An explicit struct rather than an open map, so a typo in a category
/// name is a compile error. Checked before `enqueue` is ever called for
/// merchant-facing types; customer transactional messages are never
/// suppressible, and neither are reconciliation notices: a paid order
/// needing manual attention must always surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPreferences {
    /// Master switch for merchant-facing notifications.
    pub enabled: bool,
    pub new_orders: bool,
    pub low_stock: bool,
    pub daily_summary: bool,
    /// Threshold applied to variants registered without an explicit one.
    pub default_low_stock_threshold: u32,
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        Self {
            enabled: true,
            new_orders: true,
            low_stock: true,
            daily_summary: true,
            default_low_stock_threshold: 5,
        }
    }
}

impl NotificationPreferences {
    /// Returns true if the given type may be enqueued.
    pub fn allows(&self, kind: NotificationType) -> bool {
        if !kind.is_merchant_facing() {
            return true;
        }
        match kind {
            NotificationType::ReconciliationRequired => true,
            NotificationType::NewOrder => self.enabled && self.new_orders,
            NotificationType::LowStock => self.enabled && self.low_stock,
            NotificationType::DailySummary => self.enabled && self.daily_summary,
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_allow_everything() {
        let prefs = NotificationPreferences::default();
        assert!(prefs.allows(NotificationType::NewOrder));
        assert!(prefs.allows(NotificationType::LowStock));
        assert!(prefs.allows(NotificationType::DailySummary));
    }

    #[test]
    fn test_master_switch_silences_merchant_types() {
        let prefs = NotificationPreferences {
            enabled: false,
            ..Default::default()
        };
        assert!(!prefs.allows(NotificationType::NewOrder));
        assert!(!prefs.allows(NotificationType::LowStock));
        // Customer-facing messages are not subject to merchant toggles.
        assert!(prefs.allows(NotificationType::OrderConfirmation));
        assert!(prefs.allows(NotificationType::OrderCancelled));
        // Reconciliation notices must always surface.
        assert!(prefs.allows(NotificationType::ReconciliationRequired));
    }

    #[test]
    fn test_per_category_switch() {
        let prefs = NotificationPreferences {
            low_stock: false,
            ..Default::default()
        };
        assert!(!prefs.allows(NotificationType::LowStock));
        assert!(prefs.allows(NotificationType::NewOrder));
    }
}
