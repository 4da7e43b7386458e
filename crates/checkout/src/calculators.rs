//! Pricing calculator ports.
//!
//! Shipping and tax computation are external collaborators: pure quote
//! functions with no side effects. The built-in implementations cover
//! wiring and tests; real rate tables plug in behind the same traits.

use common::Money;
use domain::{Address, LineItem};

/// Quotes a shipping cost for a priced set of lines and a destination.
pub trait ShippingCalculator: Send + Sync {
    fn quote(&self, lines: &[LineItem], address: &Address) -> Money;
}

/// Quotes a tax amount for a subtotal and a destination.
pub trait TaxCalculator: Send + Sync {
    fn quote(&self, subtotal: Money, address: &Address) -> Money;
}

/// Flat shipping rate with an optional free-shipping floor.
#[derive(Debug, Clone)]
pub struct FlatRateShipping {
    pub rate: Money,
    pub free_over: Option<Money>,
}

impl ShippingCalculator for FlatRateShipping {
    fn quote(&self, lines: &[LineItem], _address: &Address) -> Money {
        let subtotal: Money = lines.iter().map(LineItem::line_total).sum();
        match self.free_over {
            Some(floor) if subtotal >= floor => Money::zero(),
            _ => self.rate,
        }
    }
}

/// Single-rate tax in basis points (825 = 8.25%), rounded down.
#[derive(Debug, Clone)]
pub struct FixedRateTax {
    pub basis_points: u32,
}

impl TaxCalculator for FixedRateTax {
    fn quote(&self, subtotal: Money, _address: &Address) -> Money {
        Money::from_cents(subtotal.cents() * self.basis_points as i64 / 10_000)
    }
}
