//! Low-stock signal emitted by the ledger.

use common::VariantId;
use serde::{Deserialize, Serialize};

/// Raised when a commit or adjustment takes a variant's on-hand count
/// down across its low-stock threshold.
///
/// Consumed by the notification dispatcher; the ledger itself knows
/// nothing about merchant preferences or message channels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LowStockAlert {
    pub variant_id: VariantId,
    pub sku: String,
    pub product_name: String,
    pub variant_name: String,
    /// Units left on hand after the triggering operation.
    pub remaining: u32,
    pub threshold: u32,
}
