//! Payment processor port and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::Money;
use thiserror::Error;

/// A processor-level failure (network, outage) as opposed to a decline.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct ProcessorError(pub String);

/// Handle returned when an intent is opened; the client secret goes to
/// the shopper's browser to complete payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntent {
    pub reference: String,
    pub client_secret: String,
}

/// Outcome reported by the processor for a confirmed reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOutcome {
    Succeeded,
    Declined { reason: String },
}

/// Confirmation detail for a payment reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentConfirmation {
    pub outcome: PaymentOutcome,
    pub amount: Money,
}

/// Trait for the external payment processor.
///
/// Both the inbound webhook and the client success callback converge on
/// `confirm` via the checkout manager; neither call ever happens under
/// an inventory lock.
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    /// Opens an intent for the given amount.
    async fn create_intent(
        &self,
        amount: Money,
        currency: &str,
    ) -> Result<PaymentIntent, ProcessorError>;

    /// Reports the outcome for a previously opened intent.
    async fn confirm(&self, reference: &str) -> Result<PaymentConfirmation, ProcessorError>;
}

#[derive(Debug, Default)]
struct InMemoryProcessorState {
    intents: HashMap<String, Money>,
    next_id: u32,
    fail_on_create: bool,
    decline_with: Option<String>,
}

/// In-memory payment processor for wiring and tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentProcessor {
    state: Arc<RwLock<InMemoryProcessorState>>,
}

impl InMemoryPaymentProcessor {
    /// Creates a new in-memory processor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the processor to fail intent creation.
    pub fn set_fail_on_create(&self, fail: bool) {
        self.state.write().unwrap().fail_on_create = fail;
    }

    /// Configures every subsequent confirm to report a decline.
    pub fn set_decline_with(&self, reason: Option<&str>) {
        self.state.write().unwrap().decline_with = reason.map(String::from);
    }

    /// Returns the number of open intents.
    pub fn intent_count(&self) -> usize {
        self.state.read().unwrap().intents.len()
    }
}

#[async_trait]
impl PaymentProcessor for InMemoryPaymentProcessor {
    async fn create_intent(
        &self,
        amount: Money,
        _currency: &str,
    ) -> Result<PaymentIntent, ProcessorError> {
        let mut state = self.state.write().unwrap();
        if state.fail_on_create {
            return Err(ProcessorError("processor unavailable".to_string()));
        }

        state.next_id += 1;
        let reference = format!("PI-{:04}", state.next_id);
        state.intents.insert(reference.clone(), amount);

        Ok(PaymentIntent {
            client_secret: format!("{reference}_secret"),
            reference,
        })
    }

    async fn confirm(&self, reference: &str) -> Result<PaymentConfirmation, ProcessorError> {
        let state = self.state.read().unwrap();
        let amount = state
            .intents
            .get(reference)
            .copied()
            .ok_or_else(|| ProcessorError(format!("no such intent {reference}")))?;

        let outcome = match &state.decline_with {
            Some(reason) => PaymentOutcome::Declined {
                reason: reason.clone(),
            },
            None => PaymentOutcome::Succeeded,
        };
        Ok(PaymentConfirmation { outcome, amount })
    }
}
