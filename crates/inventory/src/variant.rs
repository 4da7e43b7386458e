//! Variant registration and read-side snapshot types.

use common::{Money, VariantId};
use serde::{Deserialize, Serialize};

/// Input for registering a sellable variant with the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewVariant {
    pub sku: String,
    pub product_name: String,
    pub variant_name: String,
    pub unit_price: Money,
    pub on_hand: u32,
    pub low_stock_threshold: u32,
}

/// Point-in-time read of a variant row.
///
/// `available` is `on_hand` minus active holds, i.e. what a new
/// reservation could still take. Checkout snapshots price and names from here so
/// orders are immune to later catalog changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantSnapshot {
    pub variant_id: VariantId,
    pub sku: String,
    pub product_name: String,
    pub variant_name: String,
    pub unit_price: Money,
    pub on_hand: u32,
    pub available: u32,
    pub low_stock_threshold: u32,
}
