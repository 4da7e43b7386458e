//! Dispatcher error types.

use common::NotificationId;
use thiserror::Error;

/// Errors raised by dispatcher operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NotificationError {
    /// No record with this id exists.
    #[error("unknown notification {0}")]
    Unknown(NotificationId),

    /// The retry ceiling was reached; the failure is permanent until an
    /// operator intervenes out of band.
    #[error("notification {id} has exhausted its retries ({retry_count})")]
    RetryLimitReached {
        id: NotificationId,
        retry_count: u32,
    },

    /// Retry only applies to failed records.
    #[error("notification {0} is not in a failed state")]
    NotFailed(NotificationId),

    /// Read state only exists for merchant-facing records.
    #[error("notification {0} is not merchant-facing")]
    NotMerchantFacing(NotificationId),
}
