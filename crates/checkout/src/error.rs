//! Checkout error types.

use common::{BookId, OrderId, UserId};
use domain::DomainError;
use store::{StoreError, TransientError};
use thiserror::Error;

/// Errors that can occur during checkout workflows.
///
/// Validation and state-machine rules arrive wrapped as [`DomainError`];
/// the variants here are the conditions only a workflow can detect.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// No user exists with the given ID.
    #[error("User not found: {0}")]
    UserNotFound(UserId),

    /// No book exists with the given ID.
    #[error("Book not found: {0}")]
    BookNotFound(BookId),

    /// The catalog has fewer copies than the order asked for.
    #[error(
        "Insufficient inventory for book {book_id}: requested {requested}, available {available}"
    )]
    InsufficientInventory {
        book_id: BookId,
        requested: u32,
        available: u32,
    },

    /// No order exists with the given ID.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// The requester is neither the order's owner nor an administrator.
    #[error("User {user_id} may not act on order {order_id}")]
    NotAuthorized { user_id: UserId, order_id: OrderId },

    /// Payment was already recorded for this order.
    #[error("Order {0} is already paid")]
    AlreadyPaid(OrderId),

    /// Domain rule violation.
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    /// Store error.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl TransientError for CheckoutError {
    fn is_transient(&self) -> bool {
        match self {
            CheckoutError::Store(err) => err.is_transient(),
            _ => false,
        }
    }
}

/// Convenience type alias for checkout results.
pub type Result<T> = std::result::Result<T, CheckoutError>;
