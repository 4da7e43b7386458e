//! Notification dispatcher for the storefront core.
//!
//! Emits and tracks delivery of transactional messages across two
//! channels: an asynchronous email queue for customer-facing types and
//! durable dashboard records for merchant-facing types, mirrored in
//! real time over a broadcast push hub. The durable record is always
//! the source of truth; the push is a best-effort hint.

pub mod dispatcher;
pub mod error;
pub mod message;
pub mod preferences;
pub mod push;
pub mod render;
pub mod transport;

pub use dispatcher::{DeliveryWorker, NotificationDispatcher, MAX_RETRIES};
pub use error::NotificationError;
pub use message::{Channel, DeliveryStatus, Notification, NotificationType};
pub use preferences::NotificationPreferences;
pub use push::{PushEvent, PushHub};
pub use render::{MessageRenderer, PlainTextRenderer, RenderedMessage};
pub use transport::{EmailTransport, InMemoryEmailTransport, SentEmail, TransportError};
