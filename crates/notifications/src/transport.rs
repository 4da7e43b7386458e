//! Email transport port and in-memory implementation.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use thiserror::Error;

/// A transport-level delivery failure, recorded on the notification.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct TransportError(pub String);

/// Trait for the outbound email provider.
#[async_trait]
pub trait EmailTransport: Send + Sync {
    /// Sends one message; the dispatcher records failures rather than
    /// propagating them to customers.
    async fn send(&self, recipient: &str, subject: &str, body: &str)
    -> Result<(), TransportError>;
}

/// One message accepted by the in-memory transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentEmail {
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Default)]
struct InMemoryTransportState {
    sent: Vec<SentEmail>,
    fail_with: Option<String>,
}

/// In-memory email transport for wiring and tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEmailTransport {
    state: Arc<RwLock<InMemoryTransportState>>,
}

impl InMemoryEmailTransport {
    /// Creates a new in-memory transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures every subsequent send to fail with the given reason;
    /// `None` restores normal delivery.
    pub fn set_fail_with(&self, reason: Option<&str>) {
        self.state.write().unwrap().fail_with = reason.map(String::from);
    }

    /// Returns the number of accepted messages.
    pub fn sent_count(&self) -> usize {
        self.state.read().unwrap().sent.len()
    }

    /// Returns a copy of all accepted messages.
    pub fn sent(&self) -> Vec<SentEmail> {
        self.state.read().unwrap().sent.clone()
    }
}

#[async_trait]
impl EmailTransport for InMemoryEmailTransport {
    async fn send(
        &self,
        recipient: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), TransportError> {
        let mut state = self.state.write().unwrap();
        if let Some(reason) = &state.fail_with {
            return Err(TransportError(reason.clone()));
        }
        state.sent.push(SentEmail {
            recipient: recipient.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}
