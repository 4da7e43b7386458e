//! Cart store keyed by session identity.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use common::{CustomerId, VariantId};
use domain::Cart;
use inventory::{InventoryLedger, StockError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CheckoutError;

/// Who a cart belongs to: a guest browser session or a signed-in
/// customer. A cart is never contended across owners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CartOwner {
    Guest { token: Uuid },
    Customer { customer_id: CustomerId },
}

impl std::fmt::Display for CartOwner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CartOwner::Guest { token } => write!(f, "guest:{token}"),
            CartOwner::Customer { customer_id } => write!(f, "customer:{customer_id}"),
        }
    }
}

/// Mutable cart storage with availability checks at mutation time.
///
/// Stock errors surface here, at add-to-cart time, with the quantity
/// actually still addable. The reservation itself only happens at
/// checkout start.
pub struct CartStore {
    carts: RwLock<HashMap<CartOwner, Cart>>,
    ledger: Arc<InventoryLedger>,
}

impl CartStore {
    pub fn new(ledger: Arc<InventoryLedger>) -> Self {
        Self {
            carts: RwLock::new(HashMap::new()),
            ledger,
        }
    }

    /// Returns a copy of the owner's cart (empty if none exists yet).
    pub fn get(&self, owner: CartOwner) -> Cart {
        self.carts
            .read()
            .unwrap()
            .get(&owner)
            .cloned()
            .unwrap_or_default()
    }

    /// Adds units of a variant, refusing when live availability minus
    /// what the cart already holds cannot cover the request.
    #[tracing::instrument(skip(self), fields(owner = %owner))]
    pub fn add_item(
        &self,
        owner: CartOwner,
        variant_id: VariantId,
        quantity: u32,
    ) -> Result<Cart, CheckoutError> {
        let available = self.ledger.available(variant_id)?;

        let mut carts = self.carts.write().unwrap();
        let cart = carts.entry(owner).or_default();
        let in_cart = cart.quantity_of(variant_id);
        let addable = available.saturating_sub(in_cart);
        if quantity > addable {
            return Err(StockError::InsufficientStock {
                variant_id,
                requested: quantity,
                available: addable,
            }
            .into());
        }
        cart.add(variant_id, quantity);
        Ok(cart.clone())
    }

    /// Sets the absolute quantity of a line; zero removes it.
    #[tracing::instrument(skip(self), fields(owner = %owner))]
    pub fn update_quantity(
        &self,
        owner: CartOwner,
        variant_id: VariantId,
        quantity: u32,
    ) -> Result<Cart, CheckoutError> {
        if quantity > 0 {
            let available = self.ledger.available(variant_id)?;
            if quantity > available {
                return Err(StockError::InsufficientStock {
                    variant_id,
                    requested: quantity,
                    available,
                }
                .into());
            }
        }

        let mut carts = self.carts.write().unwrap();
        let cart = carts.entry(owner).or_default();
        cart.set_quantity(variant_id, quantity);
        Ok(cart.clone())
    }

    /// Removes a line entirely.
    pub fn remove_item(&self, owner: CartOwner, variant_id: VariantId) -> Cart {
        let mut carts = self.carts.write().unwrap();
        let cart = carts.entry(owner).or_default();
        cart.remove(variant_id);
        cart.clone()
    }

    /// Empties the owner's cart.
    pub fn clear(&self, owner: CartOwner) {
        self.carts.write().unwrap().remove(&owner);
    }

    /// Folds a guest cart into the customer's cart on login, summing
    /// quantities; the guest cart is destroyed.
    #[tracing::instrument(skip(self))]
    pub fn merge_on_login(&self, guest_token: Uuid, customer_id: CustomerId) -> Cart {
        let guest = CartOwner::Guest { token: guest_token };
        let customer = CartOwner::Customer { customer_id };

        let mut carts = self.carts.write().unwrap();
        if let Some(guest_cart) = carts.remove(&guest) {
            let cart = carts.entry(customer).or_default();
            cart.merge(&guest_cart);
            cart.clone()
        } else {
            carts.get(&customer).cloned().unwrap_or_default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::Money;
    use inventory::NewVariant;

    fn store_with_variant(on_hand: u32) -> (CartStore, VariantId) {
        let (ledger, _rx) = InventoryLedger::new();
        let ledger = Arc::new(ledger);
        let variant = ledger
            .register_variant(NewVariant {
                sku: "CAP-NVY".to_string(),
                product_name: "Wool Cap".to_string(),
                variant_name: "Navy".to_string(),
                unit_price: Money::from_cents(1900),
                on_hand,
                low_stock_threshold: 0,
            })
            .variant_id;
        (CartStore::new(ledger), variant)
    }

    fn guest() -> CartOwner {
        CartOwner::Guest {
            token: Uuid::new_v4(),
        }
    }

    #[test]
    fn test_add_within_stock() {
        let (store, variant) = store_with_variant(5);
        let owner = guest();
        let cart = store.add_item(owner, variant, 3).unwrap();
        assert_eq!(cart.quantity_of(variant), 3);
    }

    #[test]
    fn test_add_beyond_stock_reports_addable_quantity() {
        let (store, variant) = store_with_variant(5);
        let owner = guest();
        store.add_item(owner, variant, 4).unwrap();

        let err = store.add_item(owner, variant, 2).unwrap_err();
        assert_eq!(
            err,
            CheckoutError::Stock(StockError::InsufficientStock {
                variant_id: variant,
                requested: 2,
                available: 1,
            })
        );
    }

    #[test]
    fn test_update_quantity_is_absolute() {
        let (store, variant) = store_with_variant(5);
        let owner = guest();
        store.add_item(owner, variant, 2).unwrap();

        let cart = store.update_quantity(owner, variant, 5).unwrap();
        assert_eq!(cart.quantity_of(variant), 5);

        let err = store.update_quantity(owner, variant, 6).unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::Stock(StockError::InsufficientStock { available: 5, .. })
        ));

        let cart = store.update_quantity(owner, variant, 0).unwrap();
        assert!(cart.is_empty());
    }

    #[test]
    fn test_unknown_variant_rejected() {
        let (store, _variant) = store_with_variant(5);
        let missing = VariantId::new();
        let err = store.add_item(guest(), missing, 1).unwrap_err();
        assert_eq!(
            err,
            CheckoutError::Stock(StockError::UnknownVariant(missing))
        );
    }

    #[test]
    fn test_merge_on_login_sums_and_destroys_guest_cart() {
        let (store, variant) = store_with_variant(10);
        let token = Uuid::new_v4();
        let customer_id = CustomerId::new();

        store
            .add_item(CartOwner::Guest { token }, variant, 2)
            .unwrap();
        store
            .add_item(CartOwner::Customer { customer_id }, variant, 3)
            .unwrap();

        let merged = store.merge_on_login(token, customer_id);
        assert_eq!(merged.quantity_of(variant), 5);
        assert!(store.get(CartOwner::Guest { token }).is_empty());
        assert_eq!(
            store
                .get(CartOwner::Customer { customer_id })
                .quantity_of(variant),
            5
        );
    }

    #[test]
    fn test_clear() {
        let (store, variant) = store_with_variant(5);
        let owner = guest();
        store.add_item(owner, variant, 1).unwrap();
        store.clear(owner);
        assert!(store.get(owner).is_empty());
    }
}
