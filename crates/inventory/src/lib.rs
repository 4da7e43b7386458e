//! Inventory ledger for the storefront core.
//!
//! The ledger is the authoritative per-variant stock counter plus its
//! outstanding reservations. Each variant row carries its own lock, so
//! two shoppers reserving different variants never contend and two
//! reserving the same variant are serialized: the check-and-hold is
//! atomic per variant, never read-then-write without exclusion.
//!
//! Crossing the low-stock threshold on commit or adjust emits a
//! [`LowStockAlert`] on an mpsc channel consumed by the notification
//! dispatcher; the send happens outside the row lock.

pub mod alert;
pub mod error;
pub mod ledger;
pub mod variant;

pub use alert::LowStockAlert;
pub use error::StockError;
pub use ledger::{AdjustmentReason, InventoryLedger};
pub use variant::{NewVariant, VariantSnapshot};
