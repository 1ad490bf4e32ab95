//! Order status state machine.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// The status of an order in its lifecycle.
///
/// Status transitions:
/// ```text
/// Pending ──► Processing ──► Shipped ──► Delivered
///    │            │
///    └────────────┴──► Cancelled
/// ```
///
/// Cancellation is the only transition that also mutates inventory; it
/// is legal from `Pending` and `Processing` only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    /// Order has been placed and stock reserved, awaiting fulfillment.
    #[default]
    Pending,

    /// Order is being prepared for shipment.
    Processing,

    /// Order has left the warehouse.
    Shipped,

    /// Order reached the customer (terminal state).
    Delivered,

    /// Order was cancelled and its stock restored (terminal state).
    Cancelled,
}

impl OrderStatus {
    /// Returns true if fulfillment can start in this status.
    pub fn can_start_processing(&self) -> bool {
        matches!(self, OrderStatus::Pending)
    }

    /// Returns true if the order can be shipped in this status.
    pub fn can_ship(&self) -> bool {
        matches!(self, OrderStatus::Processing)
    }

    /// Returns true if the order can be marked delivered in this status.
    pub fn can_deliver(&self) -> bool {
        matches!(self, OrderStatus::Shipped)
    }

    /// Returns true if the order can be cancelled in this status.
    pub fn can_cancel(&self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Processing)
    }

    /// Returns true if this is a terminal status (no further transitions possible).
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Processing => "Processing",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(OrderStatus::Pending),
            "Processing" => Ok(OrderStatus::Processing),
            "Shipped" => Ok(OrderStatus::Shipped),
            "Delivered" => Ok(OrderStatus::Delivered),
            "Cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(DomainError::UnknownStatus {
                value: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_status_is_pending() {
        assert_eq!(OrderStatus::default(), OrderStatus::Pending);
    }

    #[test]
    fn test_pending_can_start_processing() {
        assert!(OrderStatus::Pending.can_start_processing());
        assert!(!OrderStatus::Processing.can_start_processing());
        assert!(!OrderStatus::Shipped.can_start_processing());
        assert!(!OrderStatus::Delivered.can_start_processing());
        assert!(!OrderStatus::Cancelled.can_start_processing());
    }

    #[test]
    fn test_processing_can_ship() {
        assert!(!OrderStatus::Pending.can_ship());
        assert!(OrderStatus::Processing.can_ship());
        assert!(!OrderStatus::Shipped.can_ship());
        assert!(!OrderStatus::Delivered.can_ship());
        assert!(!OrderStatus::Cancelled.can_ship());
    }

    #[test]
    fn test_shipped_can_deliver() {
        assert!(!OrderStatus::Pending.can_deliver());
        assert!(!OrderStatus::Processing.can_deliver());
        assert!(OrderStatus::Shipped.can_deliver());
        assert!(!OrderStatus::Delivered.can_deliver());
        assert!(!OrderStatus::Cancelled.can_deliver());
    }

    #[test]
    fn test_can_cancel_only_before_shipping() {
        assert!(OrderStatus::Pending.can_cancel());
        assert!(OrderStatus::Processing.can_cancel());
        assert!(!OrderStatus::Shipped.can_cancel());
        assert!(!OrderStatus::Delivered.can_cancel());
        assert!(!OrderStatus::Cancelled.can_cancel());
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!OrderStatus::Pending.is_terminal());
        assert!(!OrderStatus::Processing.is_terminal());
        assert!(!OrderStatus::Shipped.is_terminal());
        assert!(OrderStatus::Delivered.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_display() {
        assert_eq!(OrderStatus::Pending.to_string(), "Pending");
        assert_eq!(OrderStatus::Processing.to_string(), "Processing");
        assert_eq!(OrderStatus::Shipped.to_string(), "Shipped");
        assert_eq!(OrderStatus::Delivered.to_string(), "Delivered");
        assert_eq!(OrderStatus::Cancelled.to_string(), "Cancelled");
    }

    #[test]
    fn test_parse_roundtrip() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Processing,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
        ] {
            let parsed: OrderStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
        }
        assert!("Unknown".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_serialization() {
        let status = OrderStatus::Processing;
        let json = serde_json::to_string(&status).unwrap();
        assert_eq!(json, "\"Processing\"");
        let deserialized: OrderStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(status, deserialized);
    }
}
