//! The inventory ledger: per-variant serialized stock accounting.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use common::{CheckoutSessionId, Money, ReservationId, VariantId};
use tokio::sync::mpsc;

use crate::alert::LowStockAlert;
use crate::error::StockError;
use crate::variant::{NewVariant, VariantSnapshot};

/// Why a manual stock adjustment happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdjustmentReason {
    /// Stock returned by a pre-shipment cancellation.
    Restock,
    /// New stock received from a supplier.
    Received,
    /// Merchant recount correction.
    Recount,
    /// Units written off as damaged.
    Damage,
}

impl AdjustmentReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdjustmentReason::Restock => "restock",
            AdjustmentReason::Received => "received",
            AdjustmentReason::Recount => "recount",
            AdjustmentReason::Damage => "damage",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HoldStatus {
    Active,
    Committed,
    Released,
}

/// One reservation's accounting entry. Records are kept after
/// termination so commit/release stay idempotent under duplicate
/// webhook delivery.
#[derive(Debug)]
struct Hold {
    session_id: CheckoutSessionId,
    quantity: u32,
    status: HoldStatus,
}

/// Mutable per-variant state; only ever touched under the row mutex.
#[derive(Debug)]
struct VariantState {
    unit_price: Money,
    low_stock_threshold: u32,
    on_hand: u32,
    holds: HashMap<ReservationId, Hold>,
}

impl VariantState {
    fn active_held(&self) -> u32 {
        self.holds
            .values()
            .filter(|h| h.status == HoldStatus::Active)
            .map(|h| h.quantity)
            .sum()
    }

    fn available(&self) -> u32 {
        self.on_hand - self.active_held()
    }
}

/// A variant row: immutable identity plus its own serialization point.
struct VariantRow {
    id: VariantId,
    sku: String,
    product_name: String,
    variant_name: String,
    state: Mutex<VariantState>,
}

/// Authoritative stock counter plus outstanding reservations.
///
/// The outer maps are plain `RwLock`s taken only for row lookup and
/// reservation indexing; all stock arithmetic happens under the row's
/// own mutex, and no lock is ever held across an `.await`.
pub struct InventoryLedger {
    variants: RwLock<HashMap<VariantId, Arc<VariantRow>>>,
    /// reservation id → owning variant, written once per reservation.
    reservations: RwLock<HashMap<ReservationId, VariantId>>,
    alerts: mpsc::UnboundedSender<LowStockAlert>,
}

impl InventoryLedger {
    /// Creates an empty ledger and the receiving half of its low-stock
    /// channel.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<LowStockAlert>) {
        let (alerts, rx) = mpsc::unbounded_channel();
        (
            Self {
                variants: RwLock::new(HashMap::new()),
                reservations: RwLock::new(HashMap::new()),
                alerts,
            },
            rx,
        )
    }

    /// Registers a new sellable variant and returns its snapshot.
    #[tracing::instrument(skip(self, new), fields(sku = %new.sku))]
    pub fn register_variant(&self, new: NewVariant) -> VariantSnapshot {
        let id = VariantId::new();
        let row = Arc::new(VariantRow {
            id,
            sku: new.sku,
            product_name: new.product_name,
            variant_name: new.variant_name,
            state: Mutex::new(VariantState {
                unit_price: new.unit_price,
                low_stock_threshold: new.low_stock_threshold,
                on_hand: new.on_hand,
                holds: HashMap::new(),
            }),
        });
        let snapshot = Self::snapshot_row(&row);
        self.variants.write().unwrap().insert(id, row);
        tracing::info!(variant_id = %id, on_hand = snapshot.on_hand, "variant registered");
        snapshot
    }

    fn row(&self, variant_id: VariantId) -> Result<Arc<VariantRow>, StockError> {
        self.variants
            .read()
            .unwrap()
            .get(&variant_id)
            .cloned()
            .ok_or(StockError::UnknownVariant(variant_id))
    }

    fn row_for_reservation(
        &self,
        reservation_id: ReservationId,
    ) -> Result<Arc<VariantRow>, StockError> {
        let variant_id = self
            .reservations
            .read()
            .unwrap()
            .get(&reservation_id)
            .copied()
            .ok_or(StockError::UnknownReservation(reservation_id))?;
        self.row(variant_id)
    }

    fn snapshot_row(row: &VariantRow) -> VariantSnapshot {
        let state = row.state.lock().unwrap();
        VariantSnapshot {
            variant_id: row.id,
            sku: row.sku.clone(),
            product_name: row.product_name.clone(),
            variant_name: row.variant_name.clone(),
            unit_price: state.unit_price,
            on_hand: state.on_hand,
            available: state.available(),
            low_stock_threshold: state.low_stock_threshold,
        }
    }

    /// Point-in-time read of a variant row.
    pub fn snapshot(&self, variant_id: VariantId) -> Result<VariantSnapshot, StockError> {
        Ok(Self::snapshot_row(&*self.row(variant_id)?))
    }

    /// Units a new reservation could still take right now.
    pub fn available(&self, variant_id: VariantId) -> Result<u32, StockError> {
        let row = self.row(variant_id)?;
        let state = row.state.lock().unwrap();
        Ok(state.available())
    }

    /// Places a hold of `quantity` units for a checkout session.
    ///
    /// The availability check and the hold insertion happen under the
    /// variant's row mutex, so concurrent reserves against the same
    /// variant can never jointly exceed the on-hand count.
    #[tracing::instrument(skip(self))]
    pub fn reserve(
        &self,
        variant_id: VariantId,
        quantity: u32,
        session_id: CheckoutSessionId,
    ) -> Result<ReservationId, StockError> {
        if quantity == 0 {
            return Err(StockError::ZeroQuantity);
        }
        let row = self.row(variant_id)?;

        let reservation_id = {
            let mut state = row.state.lock().unwrap();
            let available = state.available();
            if quantity > available {
                metrics::counter!("inventory_reservations_denied_total").increment(1);
                tracing::debug!(%variant_id, requested = quantity, available, "reservation denied");
                return Err(StockError::InsufficientStock {
                    variant_id,
                    requested: quantity,
                    available,
                });
            }

            let reservation_id = ReservationId::new();
            state.holds.insert(
                reservation_id,
                Hold {
                    session_id,
                    quantity,
                    status: HoldStatus::Active,
                },
            );
            reservation_id
        };

        // The id is unknown to any caller until we return, so indexing
        // after the row lock is released cannot race a release/commit.
        self.reservations
            .write()
            .unwrap()
            .insert(reservation_id, variant_id);

        metrics::counter!("inventory_reservations_total").increment(1);
        tracing::debug!(%variant_id, %reservation_id, quantity, "reservation placed");
        Ok(reservation_id)
    }

    /// Converts a hold into a permanent on-hand decrement.
    ///
    /// Idempotent: committing an already-committed reservation is a
    /// no-op (duplicate payment webhooks). Committing a released hold is
    /// an error so the caller can take the re-reservation path.
    #[tracing::instrument(skip(self))]
    pub fn commit(&self, reservation_id: ReservationId) -> Result<(), StockError> {
        let row = self.row_for_reservation(reservation_id)?;

        let alert = {
            let mut state = row.state.lock().unwrap();
            let hold = state
                .holds
                .get_mut(&reservation_id)
                .ok_or(StockError::UnknownReservation(reservation_id))?;
            match hold.status {
                HoldStatus::Committed => return Ok(()),
                HoldStatus::Released => {
                    return Err(StockError::ReservationReleased(reservation_id));
                }
                HoldStatus::Active => {}
            }

            let quantity = hold.quantity;
            hold.status = HoldStatus::Committed;

            let before = state.on_hand;
            state.on_hand -= quantity;
            Self::crossing_alert(&row, &state, before)
        };

        self.send_alert(alert);
        metrics::counter!("inventory_commits_total").increment(1);
        tracing::debug!(%reservation_id, "reservation committed");
        Ok(())
    }

    /// Releases a hold back to the shelf.
    ///
    /// Idempotent, and a no-op on committed holds: a cancel racing a
    /// confirmed payment must never restock sold units.
    #[tracing::instrument(skip(self))]
    pub fn release(&self, reservation_id: ReservationId) -> Result<(), StockError> {
        let row = self.row_for_reservation(reservation_id)?;

        let mut state = row.state.lock().unwrap();
        let hold = state
            .holds
            .get_mut(&reservation_id)
            .ok_or(StockError::UnknownReservation(reservation_id))?;
        if hold.status == HoldStatus::Active {
            hold.status = HoldStatus::Released;
            metrics::counter!("inventory_releases_total").increment(1);
            tracing::debug!(%reservation_id, "reservation released");
        }
        Ok(())
    }

    /// Manual merchant correction (or restock from a cancellation).
    ///
    /// Rejected when the result would drop below zero or below the
    /// quantity currently held by active reservations. Returns the new
    /// on-hand count.
    #[tracing::instrument(skip(self), fields(reason = reason.as_str()))]
    pub fn adjust(
        &self,
        variant_id: VariantId,
        delta: i64,
        reason: AdjustmentReason,
    ) -> Result<u32, StockError> {
        let row = self.row(variant_id)?;

        let (new_level, alert) = {
            let mut state = row.state.lock().unwrap();
            let before = state.on_hand;
            let held = state.active_held();
            let target = before as i64 + delta;
            if target < held as i64 {
                return Err(StockError::InvalidAdjustment {
                    variant_id,
                    delta,
                    on_hand: before,
                    held,
                });
            }
            state.on_hand = target as u32;
            (state.on_hand, Self::crossing_alert(&row, &state, before))
        };

        self.send_alert(alert);
        metrics::counter!("inventory_adjustments_total").increment(1);
        tracing::info!(%variant_id, delta, new_level, "stock adjusted");
        Ok(new_level)
    }

    /// Builds an alert when `on_hand` crossed the threshold downward.
    fn crossing_alert(
        row: &VariantRow,
        state: &VariantState,
        before: u32,
    ) -> Option<LowStockAlert> {
        let threshold = state.low_stock_threshold;
        if before > threshold && state.on_hand <= threshold {
            Some(LowStockAlert {
                variant_id: row.id,
                sku: row.sku.clone(),
                product_name: row.product_name.clone(),
                variant_name: row.variant_name.clone(),
                remaining: state.on_hand,
                threshold,
            })
        } else {
            None
        }
    }

    fn send_alert(&self, alert: Option<LowStockAlert>) {
        if let Some(alert) = alert {
            tracing::warn!(
                variant = %alert.sku,
                remaining = alert.remaining,
                threshold = alert.threshold,
                "low stock"
            );
            metrics::counter!("inventory_low_stock_alerts_total").increment(1);
            // Receiver dropped means the listener is shutting down;
            // stock accounting is already durable at this point.
            let _ = self.alerts.send(alert);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger_with_variant(
        on_hand: u32,
        threshold: u32,
    ) -> (
        InventoryLedger,
        mpsc::UnboundedReceiver<LowStockAlert>,
        VariantId,
    ) {
        let (ledger, rx) = InventoryLedger::new();
        let snapshot = ledger.register_variant(NewVariant {
            sku: "TEE-BLK-M".to_string(),
            product_name: "Organic Tee".to_string(),
            variant_name: "Black / M".to_string(),
            unit_price: Money::from_cents(2500),
            on_hand,
            low_stock_threshold: threshold,
        });
        (ledger, rx, snapshot.variant_id)
    }

    #[test]
    fn test_reserve_reduces_available_not_on_hand() {
        let (ledger, _rx, variant) = ledger_with_variant(5, 0);
        let session = CheckoutSessionId::new();

        ledger.reserve(variant, 2, session).unwrap();

        let snapshot = ledger.snapshot(variant).unwrap();
        assert_eq!(snapshot.on_hand, 5);
        assert_eq!(snapshot.available, 3);
    }

    #[test]
    fn test_reserve_beyond_available_is_denied_with_remaining() {
        let (ledger, _rx, variant) = ledger_with_variant(3, 0);
        let session = CheckoutSessionId::new();
        ledger.reserve(variant, 2, session).unwrap();

        let err = ledger.reserve(variant, 2, session).unwrap_err();
        assert_eq!(
            err,
            StockError::InsufficientStock {
                variant_id: variant,
                requested: 2,
                available: 1,
            }
        );
    }

    #[test]
    fn test_commit_decrements_on_hand_once() {
        let (ledger, _rx, variant) = ledger_with_variant(5, 0);
        let rid = ledger.reserve(variant, 2, CheckoutSessionId::new()).unwrap();

        ledger.commit(rid).unwrap();
        ledger.commit(rid).unwrap(); // duplicate webhook

        let snapshot = ledger.snapshot(variant).unwrap();
        assert_eq!(snapshot.on_hand, 3);
        assert_eq!(snapshot.available, 3);
    }

    #[test]
    fn test_release_is_idempotent_and_restores_availability() {
        let (ledger, _rx, variant) = ledger_with_variant(5, 0);
        let rid = ledger.reserve(variant, 2, CheckoutSessionId::new()).unwrap();

        ledger.release(rid).unwrap();
        ledger.release(rid).unwrap();

        assert_eq!(ledger.available(variant).unwrap(), 5);
    }

    #[test]
    fn test_release_after_commit_never_restocks() {
        let (ledger, _rx, variant) = ledger_with_variant(5, 0);
        let rid = ledger.reserve(variant, 2, CheckoutSessionId::new()).unwrap();

        ledger.commit(rid).unwrap();
        ledger.release(rid).unwrap();

        let snapshot = ledger.snapshot(variant).unwrap();
        assert_eq!(snapshot.on_hand, 3);
        assert_eq!(snapshot.available, 3);
    }

    #[test]
    fn test_commit_after_release_is_an_error() {
        let (ledger, _rx, variant) = ledger_with_variant(5, 0);
        let rid = ledger.reserve(variant, 2, CheckoutSessionId::new()).unwrap();

        ledger.release(rid).unwrap();
        assert_eq!(
            ledger.commit(rid).unwrap_err(),
            StockError::ReservationReleased(rid)
        );
        assert_eq!(ledger.available(variant).unwrap(), 5);
    }

    #[test]
    fn test_adjust_rejects_below_active_holds() {
        let (ledger, _rx, variant) = ledger_with_variant(5, 0);
        ledger.reserve(variant, 4, CheckoutSessionId::new()).unwrap();

        let err = ledger
            .adjust(variant, -2, AdjustmentReason::Recount)
            .unwrap_err();
        assert!(matches!(err, StockError::InvalidAdjustment { held: 4, .. }));

        // Reducing within the unheld remainder is fine.
        assert_eq!(
            ledger.adjust(variant, -1, AdjustmentReason::Recount).unwrap(),
            4
        );
    }

    #[test]
    fn test_commit_crossing_threshold_emits_alert() {
        let (ledger, mut rx, variant) = ledger_with_variant(5, 3);
        let rid = ledger.reserve(variant, 3, CheckoutSessionId::new()).unwrap();

        ledger.commit(rid).unwrap();

        let alert = rx.try_recv().unwrap();
        assert_eq!(alert.variant_id, variant);
        assert_eq!(alert.remaining, 2);
        assert_eq!(alert.threshold, 3);
    }

    #[test]
    fn test_no_repeat_alert_below_threshold() {
        let (ledger, mut rx, variant) = ledger_with_variant(5, 3);
        let r1 = ledger.reserve(variant, 3, CheckoutSessionId::new()).unwrap();
        ledger.commit(r1).unwrap();
        rx.try_recv().unwrap();

        // Already below threshold; a further commit must not re-alert.
        let r2 = ledger.reserve(variant, 1, CheckoutSessionId::new()).unwrap();
        ledger.commit(r2).unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_adjust_crossing_threshold_emits_alert() {
        let (ledger, mut rx, variant) = ledger_with_variant(10, 3);
        ledger.adjust(variant, -8, AdjustmentReason::Damage).unwrap();

        let alert = rx.try_recv().unwrap();
        assert_eq!(alert.remaining, 2);
    }

    #[test]
    fn test_unknown_ids() {
        let (ledger, _rx, _variant) = ledger_with_variant(1, 0);
        let missing_variant = VariantId::new();
        let missing_reservation = ReservationId::new();

        assert_eq!(
            ledger.available(missing_variant).unwrap_err(),
            StockError::UnknownVariant(missing_variant)
        );
        assert_eq!(
            ledger.release(missing_reservation).unwrap_err(),
            StockError::UnknownReservation(missing_reservation)
        );
    }

    #[test]
    fn test_zero_quantity_rejected() {
        let (ledger, _rx, variant) = ledger_with_variant(1, 0);
        assert_eq!(
            ledger
                .reserve(variant, 0, CheckoutSessionId::new())
                .unwrap_err(),
            StockError::ZeroQuantity
        );
    }
}
