//! The checkout session manager.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{Duration, Utc};
use common::{CheckoutSessionId, Money, ReservationId};
use domain::{Address, CustomerIdentity, LineItem, NewOrder, Order, OrderNumber};
use inventory::InventoryLedger;
use orders::OrderManager;
use tokio::sync::Mutex;

use crate::calculators::{ShippingCalculator, TaxCalculator};
use crate::cart_store::{CartOwner, CartStore};
use crate::error::CheckoutError;
use crate::payment::{PaymentOutcome, PaymentProcessor};
use crate::session::{CheckoutSession, SessionState};

/// Checkout tuning knobs.
#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    /// How long an abandoned session may hold stock.
    pub session_ttl: Duration,
    /// ISO currency code passed to the payment processor.
    pub currency: String,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            session_ttl: Duration::minutes(30),
            currency: "usd".to_string(),
        }
    }
}

/// Owns the active→terminal lifecycle of checkout sessions.
///
/// Sessions live behind per-session async mutexes: `cancel`,
/// `confirm_payment`, and the expiry sweep all lock the session first,
/// so races resolve by lock order and the loser observes a terminal
/// state and no-ops. The inventory ledger is never locked across the
/// processor calls.
pub struct CheckoutManager {
    sessions: RwLock<HashMap<CheckoutSessionId, Arc<Mutex<CheckoutSession>>>>,
    by_payment_ref: RwLock<HashMap<String, CheckoutSessionId>>,
    /// Payment reference → order number, written once on first
    /// confirmation. The persistent dedupe marker for at-least-once
    /// webhook delivery across both transports.
    processed: RwLock<HashMap<String, OrderNumber>>,
    carts: Arc<CartStore>,
    ledger: Arc<InventoryLedger>,
    orders: Arc<OrderManager>,
    processor: Arc<dyn PaymentProcessor>,
    shipping: Arc<dyn ShippingCalculator>,
    tax: Arc<dyn TaxCalculator>,
    config: CheckoutConfig,
}

impl CheckoutManager {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        carts: Arc<CartStore>,
        ledger: Arc<InventoryLedger>,
        orders: Arc<OrderManager>,
        processor: Arc<dyn PaymentProcessor>,
        shipping: Arc<dyn ShippingCalculator>,
        tax: Arc<dyn TaxCalculator>,
        config: CheckoutConfig,
    ) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            by_payment_ref: RwLock::new(HashMap::new()),
            processed: RwLock::new(HashMap::new()),
            carts,
            ledger,
            orders,
            processor,
            shipping,
            tax,
            config,
        }
    }

    /// Starts a checkout: snapshots the cart, computes totals, reserves
    /// every line, and opens a payment intent.
    ///
    /// All-or-nothing: failure at any step releases every hold taken in
    /// this call, so the ledger is never left partially reserved.
    #[tracing::instrument(
        skip(self, shipping_address, email, customer_name),
        fields(owner = %owner)
    )]
    pub async fn start(
        &self,
        owner: CartOwner,
        shipping_address: Address,
        email: &str,
        customer_name: &str,
    ) -> Result<CheckoutSession, CheckoutError> {
        let cart = self.carts.get(owner);
        if cart.is_empty() {
            return Err(CheckoutError::CartEmpty);
        }

        // Price snapshot first; no holds exist yet, so an unknown
        // variant needs no cleanup.
        let mut lines = Vec::with_capacity(cart.line_count());
        for (variant_id, quantity) in cart.lines() {
            let snapshot = self.ledger.snapshot(variant_id)?;
            lines.push(LineItem::new(
                variant_id,
                snapshot.sku,
                snapshot.product_name,
                snapshot.variant_name,
                quantity,
                snapshot.unit_price,
            ));
        }

        let subtotal: Money = lines.iter().map(LineItem::line_total).sum();
        let shipping_cost = self.shipping.quote(&lines, &shipping_address);
        let tax_amount = self.tax.quote(subtotal, &shipping_address);
        let total = subtotal + shipping_cost + tax_amount;

        let session_id = CheckoutSessionId::new();
        let reservations = self.reserve_all(&lines, session_id)?;

        // External processor call only after the ledger work is done;
        // a slow processor never blocks other shoppers' reservations.
        let intent = match self
            .processor
            .create_intent(total, &self.config.currency)
            .await
        {
            Ok(intent) => intent,
            Err(e) => {
                self.release_all(&reservations);
                return Err(CheckoutError::Processor(e.to_string()));
            }
        };

        let now = Utc::now();
        let session = CheckoutSession {
            id: session_id,
            owner,
            email: email.to_string(),
            customer_name: customer_name.to_string(),
            lines,
            shipping_address,
            subtotal,
            shipping_cost,
            tax_amount,
            total,
            payment_reference: intent.reference.clone(),
            client_secret: intent.client_secret,
            reservations,
            state: SessionState::Active,
            created_at: now,
            expires_at: now + self.config.session_ttl,
        };

        self.by_payment_ref
            .write()
            .unwrap()
            .insert(intent.reference, session_id);
        self.sessions
            .write()
            .unwrap()
            .insert(session_id, Arc::new(Mutex::new(session.clone())));

        metrics::counter!("checkout_started_total").increment(1);
        tracing::info!(
            session_id = %session_id,
            total = %session.total,
            lines = session.lines.len(),
            "checkout session started"
        );
        Ok(session)
    }

    /// Reserves every line or rolls back the holds already taken.
    fn reserve_all(
        &self,
        lines: &[LineItem],
        session_id: CheckoutSessionId,
    ) -> Result<Vec<ReservationId>, CheckoutError> {
        let mut taken = Vec::with_capacity(lines.len());
        for line in lines {
            match self
                .ledger
                .reserve(line.variant_id, line.quantity, session_id)
            {
                Ok(reservation_id) => taken.push(reservation_id),
                Err(e) => {
                    self.release_all(&taken);
                    return Err(e.into());
                }
            }
        }
        Ok(taken)
    }

    fn release_all(&self, reservations: &[ReservationId]) {
        for reservation_id in reservations {
            if let Err(e) = self.ledger.release(*reservation_id) {
                tracing::warn!(%reservation_id, error = %e, "release failed");
            }
        }
    }

    /// Returns a snapshot of a session.
    pub async fn get(&self, session_id: CheckoutSessionId) -> Result<CheckoutSession, CheckoutError> {
        let arc = self.session_arc(session_id)?;
        let session = arc.lock().await;
        Ok(session.clone())
    }

    fn session_arc(
        &self,
        session_id: CheckoutSessionId,
    ) -> Result<Arc<Mutex<CheckoutSession>>, CheckoutError> {
        self.sessions
            .read()
            .unwrap()
            .get(&session_id)
            .cloned()
            .ok_or(CheckoutError::UnknownSession(session_id))
    }

    /// Cancels an active session and releases its holds.
    ///
    /// Idempotent, and a no-op against any terminal state: if payment
    /// confirmation won the race, the committed stock stays committed.
    #[tracing::instrument(skip(self))]
    pub async fn cancel(&self, session_id: CheckoutSessionId) -> Result<SessionState, CheckoutError> {
        let arc = self.session_arc(session_id)?;
        let mut session = arc.lock().await;

        if session.state.is_active() {
            self.release_all(&session.reservations);
            session.state = SessionState::Cancelled;
            metrics::counter!("checkout_cancelled_total").increment(1);
            tracing::info!(%session_id, "checkout session cancelled");
        }
        Ok(session.state)
    }

    /// Sweeps active sessions past their TTL into `expired`, releasing
    /// their holds. Returns how many sessions expired.
    ///
    /// Also the backstop for cancels that failed transiently: any
    /// active-but-stale session is picked up on the next pass.
    #[tracing::instrument(skip(self))]
    pub async fn expire_stale(&self) -> usize {
        let candidates: Vec<Arc<Mutex<CheckoutSession>>> =
            self.sessions.read().unwrap().values().cloned().collect();

        let now = Utc::now();
        let mut expired = 0;
        for arc in candidates {
            let mut session = arc.lock().await;
            if session.state.is_active() && session.is_past_expiry(now) {
                self.release_all(&session.reservations);
                session.state = SessionState::Expired;
                expired += 1;
                tracing::info!(session_id = %session.id, "checkout session expired");
            }
        }

        if expired > 0 {
            metrics::counter!("checkout_sessions_expired_total").increment(expired as u64);
        }
        expired
    }

    /// Converts a confirmed payment into an order.
    ///
    /// Idempotent on the payment reference: webhook and client callback
    /// both land here, and a duplicate returns the same order without a
    /// second inventory commit. A decline leaves the session active so
    /// the shopper can retry until the TTL.
    #[tracing::instrument(skip(self))]
    pub async fn confirm_payment(&self, payment_reference: &str) -> Result<Order, CheckoutError> {
        // Fast path for duplicates that arrive after completion.
        if let Some(order) = self.processed_order(payment_reference)? {
            return Ok(order);
        }

        let session_id = self
            .by_payment_ref
            .read()
            .unwrap()
            .get(payment_reference)
            .copied()
            .ok_or_else(|| CheckoutError::UnknownPaymentReference(payment_reference.to_string()))?;
        let arc = self.session_arc(session_id)?;
        let mut session = arc.lock().await;

        // Decisive dedupe check under the session lock: a concurrent
        // duplicate waits here and then sees the marker.
        if let Some(order) = self.processed_order(payment_reference)? {
            return Ok(order);
        }

        let confirmation = self
            .processor
            .confirm(payment_reference)
            .await
            .map_err(|e| CheckoutError::Processor(e.to_string()))?;
        if let PaymentOutcome::Declined { reason } = confirmation.outcome {
            metrics::counter!("checkout_payment_declined_total").increment(1);
            tracing::warn!(%session_id, reason = %reason, "payment declined");
            return Err(CheckoutError::PaymentDeclined {
                reference: payment_reference.to_string(),
                reason,
            });
        }

        let reconciliation_required = match session.state {
            SessionState::Active => {
                for reservation_id in &session.reservations {
                    self.ledger.commit(*reservation_id)?;
                }
                session.state = SessionState::Completed;
                false
            }
            SessionState::Cancelled | SessionState::Expired => {
                // The holds are gone; try to take the stock back. The
                // terminal session itself stays frozen.
                !self.try_re_reserve_and_commit(&session)
            }
            SessionState::Completed => {
                // State and marker are written under the same lock, so
                // this cannot be reached without a marker.
                return self
                    .processed_order(payment_reference)?
                    .ok_or_else(|| {
                        CheckoutError::UnknownPaymentReference(payment_reference.to_string())
                    });
            }
        };

        let order = self.orders.create(NewOrder {
            customer: match session.owner {
                CartOwner::Customer { customer_id } => CustomerIdentity::Registered { customer_id },
                CartOwner::Guest { .. } => CustomerIdentity::Guest,
            },
            email: session.email.clone(),
            customer_name: session.customer_name.clone(),
            items: session.lines.clone(),
            shipping_address: session.shipping_address.clone(),
            subtotal: session.subtotal,
            shipping_cost: session.shipping_cost,
            tax_amount: session.tax_amount,
            total: session.total,
            payment_reference: payment_reference.to_string(),
            reconciliation_required,
        });

        self.carts.clear(session.owner);
        self.processed
            .write()
            .unwrap()
            .insert(payment_reference.to_string(), order.order_number().clone());

        metrics::counter!("checkout_confirmed_total").increment(1);
        if reconciliation_required {
            metrics::counter!("checkout_reconciliations_total").increment(1);
            tracing::warn!(
                %session_id,
                order_number = %order.order_number(),
                "payment confirmed after expiry and stock was gone; order flagged for reconciliation"
            );
        } else {
            tracing::info!(
                %session_id,
                order_number = %order.order_number(),
                "payment confirmed, order created"
            );
        }
        Ok(order)
    }

    /// Late-confirmation path: the session's holds were released, so
    /// attempt a fresh all-or-nothing reservation and commit it.
    /// Returns false when stock was taken by someone else in the
    /// meantime; the paying customer still gets their order, flagged
    /// for manual reconciliation.
    fn try_re_reserve_and_commit(&self, session: &CheckoutSession) -> bool {
        match self.reserve_all(&session.lines, session.id) {
            Ok(reservations) => {
                for reservation_id in &reservations {
                    if let Err(e) = self.ledger.commit(*reservation_id) {
                        tracing::error!(%reservation_id, error = %e, "commit of re-reservation failed");
                        return false;
                    }
                }
                true
            }
            Err(e) => {
                tracing::warn!(session_id = %session.id, error = %e, "re-reservation failed");
                false
            }
        }
    }

    fn processed_order(&self, payment_reference: &str) -> Result<Option<Order>, CheckoutError> {
        let number = self
            .processed
            .read()
            .unwrap()
            .get(payment_reference)
            .cloned();
        match number {
            Some(number) => Ok(Some(self.orders.get(&number)?)),
            None => Ok(None),
        }
    }
}
