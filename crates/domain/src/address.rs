//! Shipping address value object.

use serde::{Deserialize, Serialize};

/// A shipping address, stored verbatim on sessions and orders.
///
/// Orders snapshot the address at checkout time; later edits to a
/// customer's address book never touch existing orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub region: String,
    pub postal_code: String,
    pub country: String,
}

impl Address {
    /// Single-line rendering for logs and message payloads.
    pub fn summary(&self) -> String {
        match &self.line2 {
            Some(line2) => format!(
                "{}, {}, {}, {} {}, {}",
                self.line1, line2, self.city, self.region, self.postal_code, self.country
            ),
            None => format!(
                "{}, {}, {} {}, {}",
                self.line1, self.city, self.region, self.postal_code, self.country
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address() -> Address {
        Address {
            line1: "500 Harbor Blvd".to_string(),
            line2: None,
            city: "Belmont".to_string(),
            region: "CA".to_string(),
            postal_code: "94002".to_string(),
            country: "US".to_string(),
        }
    }

    #[test]
    fn test_summary_without_line2() {
        assert_eq!(address().summary(), "500 Harbor Blvd, Belmont, CA 94002, US");
    }

    #[test]
    fn test_summary_with_line2() {
        let mut a = address();
        a.line2 = Some("Suite 12".to_string());
        assert_eq!(
            a.summary(),
            "500 Harbor Blvd, Suite 12, Belmont, CA 94002, US"
        );
    }

    #[test]
    fn test_serialization_roundtrip() {
        let a = address();
        let json = serde_json::to_string(&a).unwrap();
        let deserialized: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(a, deserialized);
    }
}
