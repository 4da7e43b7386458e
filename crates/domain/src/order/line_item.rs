//! Order line items and identity value objects.

use common::{CustomerId, Money, VariantId};
use serde::{Deserialize, Serialize};

/// A priced line on an order.
///
/// Prices are snapshotted at checkout time; later catalog price changes
/// never alter an existing order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// The variant this line sells.
    pub variant_id: VariantId,

    /// Stock-keeping unit, denormalized for merchant displays.
    pub sku: String,

    /// Human-readable product name.
    pub product_name: String,

    /// Variant display name (size/color/etc.).
    pub variant_name: String,

    /// Units ordered.
    pub quantity: u32,

    /// Price per unit at checkout time.
    pub unit_price: Money,
}

impl LineItem {
    /// Creates a new line item.
    pub fn new(
        variant_id: VariantId,
        sku: impl Into<String>,
        product_name: impl Into<String>,
        variant_name: impl Into<String>,
        quantity: u32,
        unit_price: Money,
    ) -> Self {
        Self {
            variant_id,
            sku: sku.into(),
            product_name: product_name.into(),
            variant_name: variant_name.into(),
            quantity,
            unit_price,
        }
    }

    /// Returns the total price for this line (quantity * unit_price).
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

/// Externally visible order handle, e.g. `ORD-000042`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    /// Formats an order number from a monotonic sequence value.
    pub fn from_sequence(sequence: u64) -> Self {
        Self(format!("ORD-{sequence:06}"))
    }

    /// Returns the order number as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for OrderNumber {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OrderNumber {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Who placed the order.
///
/// Guest orders carry no account id; they are looked up by order number
/// plus the email captured at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CustomerIdentity {
    /// A signed-in customer.
    Registered { customer_id: CustomerId },
    /// A guest checkout.
    Guest,
}

impl CustomerIdentity {
    /// Returns true for guest checkouts.
    pub fn is_guest(&self) -> bool {
        matches!(self, CustomerIdentity::Guest)
    }

    /// Returns the customer id for registered customers.
    pub fn customer_id(&self) -> Option<CustomerId> {
        match self {
            CustomerIdentity::Registered { customer_id } => Some(*customer_id),
            CustomerIdentity::Guest => None,
        }
    }
}
