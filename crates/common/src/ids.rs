//! UUID-backed identifier newtypes.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Declares a transparent UUID newtype with the standard conversions.
macro_rules! uuid_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates an identifier from an existing UUID.
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the underlying UUID.
            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

uuid_id! {
    /// Unique identifier for a sellable variant.
    VariantId
}

uuid_id! {
    /// Unique identifier for a registered customer.
    CustomerId
}

uuid_id! {
    /// Unique identifier for a checkout session.
    CheckoutSessionId
}

uuid_id! {
    /// Unique identifier for an inventory reservation.
    ReservationId
}

uuid_id! {
    /// Internal identifier for an order aggregate.
    ///
    /// The externally visible handle is the order number; this id is
    /// what the stores key on.
    OrderId
}

uuid_id! {
    /// Unique identifier for a notification record.
    NotificationId
}

uuid_id! {
    /// Identifier for a merchant (dashboard identity).
    MerchantId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_creates_unique_ids() {
        assert_ne!(VariantId::new(), VariantId::new());
        assert_ne!(OrderId::new(), OrderId::new());
    }

    #[test]
    fn test_from_uuid_preserves_value() {
        let uuid = Uuid::new_v4();
        let id = ReservationId::from_uuid(uuid);
        assert_eq!(id.as_uuid(), uuid);
    }

    #[test]
    fn test_serialization_roundtrip() {
        let id = CheckoutSessionId::new();
        let json = serde_json::to_string(&id).unwrap();
        let deserialized: CheckoutSessionId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, deserialized);
    }

    #[test]
    fn test_display_matches_uuid() {
        let uuid = Uuid::new_v4();
        let id = CustomerId::from_uuid(uuid);
        assert_eq!(id.to_string(), uuid.to_string());
    }
}
