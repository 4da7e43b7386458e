//! Order aggregate and supporting value objects.

pub mod aggregate;
pub mod line_item;
pub mod status;

pub use aggregate::{Cancellation, NewOrder, Order, Shipment, Transition};
pub use line_item::{CustomerIdentity, LineItem, OrderNumber};
pub use status::{OrderStatus, PaymentStatus};
