//! Cart value object.

use std::collections::HashMap;

use common::VariantId;
use serde::{Deserialize, Serialize};

/// A shopping cart: variant → quantity, owned by exactly one session
/// identity.
///
/// The cart itself is a pure value; availability checks against live
/// stock happen in the cart store, and the cart is cleared when its
/// items are converted into an order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    items: HashMap<VariantId, u32>,
}

impl Cart {
    /// Creates an empty cart.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the cart has no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of distinct variants in the cart.
    pub fn line_count(&self) -> usize {
        self.items.len()
    }

    /// Total units across all lines.
    pub fn total_units(&self) -> u32 {
        self.items.values().sum()
    }

    /// Quantity of a variant currently in the cart (0 if absent).
    pub fn quantity_of(&self, variant_id: VariantId) -> u32 {
        self.items.get(&variant_id).copied().unwrap_or(0)
    }

    /// Iterates over (variant, quantity) lines.
    pub fn lines(&self) -> impl Iterator<Item = (VariantId, u32)> + '_ {
        self.items.iter().map(|(id, qty)| (*id, *qty))
    }

    /// Adds quantity to a variant line, creating it if absent.
    pub fn add(&mut self, variant_id: VariantId, quantity: u32) {
        if quantity == 0 {
            return;
        }
        *self.items.entry(variant_id).or_insert(0) += quantity;
    }

    /// Sets the quantity of a variant line; zero removes the line.
    pub fn set_quantity(&mut self, variant_id: VariantId, quantity: u32) {
        if quantity == 0 {
            self.items.remove(&variant_id);
        } else {
            self.items.insert(variant_id, quantity);
        }
    }

    /// Removes a variant line entirely. Returns true if it was present.
    pub fn remove(&mut self, variant_id: VariantId) -> bool {
        self.items.remove(&variant_id).is_some()
    }

    /// Empties the cart.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Merges another cart into this one, summing quantities per variant.
    ///
    /// Used when a guest signs in and their guest cart folds into the
    /// customer cart.
    pub fn merge(&mut self, other: &Cart) {
        for (variant_id, qty) in other.lines() {
            self.add(variant_id, qty);
        }
    }
}
