//! Status enums for various entities.

use serde::{Deserialize, Serialize};

/// Fulfillment status of an ordered line item.
///
/// Stored verbatim in the order documents, so the wire form matches the
/// capitalized strings the storefront has always written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
pub enum OrderStatus {
    #[default]
    Ordered,
    Processing,
    Shipped,
    Delivered,
    Canceled,
}

impl OrderStatus {
    /// Whether the item has reached the customer.
    #[must_use]
    pub const fn is_delivered(self) -> bool {
        matches!(self, Self::Delivered)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ordered => write!(f, "Ordered"),
            Self::Processing => write!(f, "Processing"),
            Self::Shipped => write!(f, "Shipped"),
            Self::Delivered => write!(f, "Delivered"),
            Self::Canceled => write!(f, "Canceled"),
        }
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Ordered" => Ok(Self::Ordered),
            "Processing" => Ok(Self::Processing),
            "Shipped" => Ok(Self::Shipped),
            "Delivered" => Ok(Self::Delivered),
            "Canceled" => Ok(Self::Canceled),
            _ => Err(format!("invalid order status: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_format_is_capitalized() {
        let json = serde_json::to_string(&OrderStatus::Delivered).unwrap();
        assert_eq!(json, "\"Delivered\"");

        let parsed: OrderStatus = serde_json::from_str("\"Canceled\"").unwrap();
        assert_eq!(parsed, OrderStatus::Canceled);
    }

    #[test]
    fn test_display_matches_from_str() {
        for status in [
            OrderStatus::Ordered,
            OrderStatus::Processing,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
            OrderStatus::Canceled,
        ] {
            assert_eq!(status.to_string().parse::<OrderStatus>().unwrap(), status);
        }
    }

    #[test]
    fn test_is_delivered() {
        assert!(OrderStatus::Delivered.is_delivered());
        assert!(!OrderStatus::Ordered.is_delivered());
    }
}
