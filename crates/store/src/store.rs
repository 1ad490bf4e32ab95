//! Store traits for the bookstore's transactional document model.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{BookId, OrderId, UserId};
use domain::{Book, Money, Order, OrderStatus, User};

use crate::error::Result;

/// A transactional document store holding users, books, and orders.
///
/// `begin` opens a session; mutations made through a session become
/// visible to other sessions only once `commit` succeeds. The `get_*`
/// methods are single-document point reads outside any transaction,
/// for paths that need no atomicity.
#[async_trait]
pub trait BookstoreStore: Send + Sync {
    /// The transaction session type for this store.
    type Session: StoreSession;

    /// Opens a new transaction session.
    async fn begin(&self) -> Result<Self::Session>;

    /// Reads a book outside any transaction.
    async fn get_book(&self, id: BookId) -> Result<Option<Book>>;

    /// Looks up a book by ISBN outside any transaction.
    async fn get_book_by_isbn(&self, isbn: &str) -> Result<Option<Book>>;

    /// Reads a user outside any transaction.
    async fn get_user(&self, id: UserId) -> Result<Option<User>>;

    /// Reads an order outside any transaction.
    async fn get_order(&self, id: OrderId) -> Result<Option<Order>>;
}

/// One transaction against the store.
///
/// Every operation here belongs to the session's atomic unit; a session
/// sees its own uncommitted writes. `commit` and `abort` consume the
/// session, and dropping an uncommitted session discards its writes.
#[async_trait]
pub trait StoreSession: Send {
    /// Reads a user inside the transaction.
    async fn find_user(&mut self, id: UserId) -> Result<Option<User>>;

    /// Reads a book inside the transaction.
    async fn find_book(&mut self, id: BookId) -> Result<Option<Book>>;

    /// Reads an order inside the transaction.
    async fn find_order(&mut self, id: OrderId) -> Result<Option<Order>>;

    /// Inserts a user. Fails with `DuplicateDocument` if the id (or a
    /// unique key) already exists.
    async fn insert_user(&mut self, user: &User) -> Result<()>;

    /// Inserts a book. Fails with `DuplicateDocument` on id/ISBN reuse.
    async fn insert_book(&mut self, book: &Book) -> Result<()>;

    /// Inserts an order.
    async fn insert_order(&mut self, order: &Order) -> Result<()>;

    /// The conditional compare-and-decrement at the heart of placement.
    ///
    /// Decrements the book's quantity by `amount` only if the book
    /// exists and `quantity >= amount`, as a single conditional update
    /// rather than a read followed by a write. Returns the updated
    /// document on a match; `None` means the book is absent or stock is
    /// insufficient, which callers distinguish with a follow-up
    /// `find_book`.
    async fn reserve_stock(&mut self, id: BookId, amount: u32) -> Result<Option<Book>>;

    /// Unconditionally increments a book's quantity. A book that no
    /// longer exists matches nothing and the call still succeeds.
    async fn restore_stock(&mut self, id: BookId, amount: u32) -> Result<()>;

    /// Catalog-side price/discount update. Quantity is never written
    /// here; all stock changes go through reserve_stock/restore_stock.
    /// A negative price or a discount above 100 is refused with
    /// `StoreError::Domain` before anything is written.
    async fn update_book_pricing(
        &mut self,
        id: BookId,
        price: Money,
        discount_percent: u8,
    ) -> Result<()>;

    /// Conditional status compare-and-set.
    ///
    /// Applies `to` only while the order's current status is one of
    /// `allowed_from`, returning the updated order. Transitioning to
    /// `Delivered` also records the delivery flag and timestamp. `None`
    /// means the order is absent or its status no longer matches.
    async fn transition_order_status(
        &mut self,
        id: OrderId,
        allowed_from: &[OrderStatus],
        to: OrderStatus,
    ) -> Result<Option<Order>>;

    /// Records the carrier tracking number on an order.
    async fn set_order_tracking(&mut self, id: OrderId, tracking_number: &str) -> Result<()>;

    /// Records payment receipt on an order.
    async fn set_order_paid(&mut self, id: OrderId, paid_at: DateTime<Utc>) -> Result<()>;

    /// Commits the transaction, making all staged writes visible.
    async fn commit(self) -> Result<()>;

    /// Abandons the transaction, discarding all staged writes.
    async fn abort(self) -> Result<()>;
}
