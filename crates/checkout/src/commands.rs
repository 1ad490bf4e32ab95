//! Checkout commands.

use common::{BookId, OrderId, UserId};
use domain::{DomainError, PaymentMethod, ShippingAddress};

/// One requested item in a placement command.
#[derive(Debug, Clone)]
pub struct RequestedItem {
    /// The book to order.
    pub book_id: BookId,

    /// Number of copies, at least 1.
    pub quantity: u32,
}

impl RequestedItem {
    /// Creates a new requested item.
    pub fn new(book_id: BookId, quantity: u32) -> Self {
        Self { book_id, quantity }
    }
}

/// Command to place a new order.
#[derive(Debug, Clone)]
pub struct PlaceOrder {
    /// The customer placing the order.
    pub user_id: UserId,

    /// The requested items, processed in this order.
    pub items: Vec<RequestedItem>,

    /// Where the order ships to.
    pub shipping_address: ShippingAddress,

    /// How the customer pays.
    pub payment_method: PaymentMethod,
}

impl PlaceOrder {
    /// Creates a new PlaceOrder command.
    pub fn new(
        user_id: UserId,
        items: Vec<RequestedItem>,
        shipping_address: ShippingAddress,
        payment_method: PaymentMethod,
    ) -> Self {
        Self {
            user_id,
            items,
            shipping_address,
            payment_method,
        }
    }

    /// Validates the command shape before any store work happens.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.items.is_empty() {
            return Err(DomainError::EmptyOrder);
        }
        for item in &self.items {
            if item.quantity == 0 {
                return Err(DomainError::InvalidQuantity {
                    quantity: item.quantity,
                });
            }
        }
        self.shipping_address.validate()
    }
}

/// Command to cancel an order and restore its stock.
#[derive(Debug, Clone)]
pub struct CancelOrder {
    /// The order to cancel.
    pub order_id: OrderId,

    /// The user asking for the cancellation; must be the owner or an
    /// administrator.
    pub requested_by: UserId,
}

impl CancelOrder {
    /// Creates a new CancelOrder command.
    pub fn new(order_id: OrderId, requested_by: UserId) -> Self {
        Self {
            order_id,
            requested_by,
        }
    }
}
