//! Domain error types.

use thiserror::Error;

use crate::money::Money;
use crate::order::OrderStatus;

/// Errors raised by record construction, validation, and the order
/// state machine.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Order has no items.
    #[error("Order must contain at least one item")]
    EmptyOrder,

    /// Invalid line item quantity.
    #[error("Invalid quantity: {quantity} (must be at least 1)")]
    InvalidQuantity { quantity: u32 },

    /// A required shipping address field is blank.
    #[error("Shipping address is missing required field: {field}")]
    MissingShippingField { field: &'static str },

    /// Book price must not be negative.
    #[error("Invalid price: {price} (must not be negative)")]
    NegativePrice { price: Money },

    /// Discount must be a percentage.
    #[error("Invalid discount: {discount_percent} (must be 0-100)")]
    InvalidDiscount { discount_percent: u8 },

    /// Order is not in a state that allows the attempted action.
    #[error("Invalid state transition: cannot {action} from {current_status} status")]
    InvalidStateTransition {
        current_status: OrderStatus,
        action: &'static str,
    },

    /// Unrecognized order status string.
    #[error("Unknown order status: {value}")]
    UnknownStatus { value: String },

    /// Unrecognized payment method string.
    #[error("Unknown payment method: {value}")]
    UnknownPaymentMethod { value: String },
}
