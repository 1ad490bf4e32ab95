//! In-memory store implementation for tests and development.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{BookId, OrderId, UserId};
use domain::{Book, DomainError, Money, Order, OrderStatus, User};
use tokio::sync::RwLock;

use crate::error::{Result, StoreError};
use crate::store::{BookstoreStore, StoreSession};

#[derive(Debug, Clone)]
struct Versioned<T> {
    doc: T,
    version: u64,
}

#[derive(Debug, Default)]
struct Collections {
    users: HashMap<UserId, Versioned<User>>,
    books: HashMap<BookId, Versioned<Book>>,
    orders: HashMap<OrderId, Versioned<Order>>,
}

/// A session-local pending write. `base_version` is the shared version
/// the session read before modifying; `None` marks a fresh insert.
#[derive(Debug)]
struct Staged<T> {
    doc: T,
    base_version: Option<u64>,
}

/// In-memory implementation of the document store.
///
/// Documents carry a version counter. A session stages its writes
/// locally, remembering the version each modified document had when
/// first read; commit re-validates those versions under a write lock
/// and applies everything only if they all still match. Two sessions
/// racing on the same book therefore surface a `WriteConflict` (first
/// committer wins) instead of a lost update, which exercises the same
/// retry path a production store triggers on conflict.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    collections: Arc<RwLock<Collections>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of committed users, for test assertions.
    pub async fn user_count(&self) -> usize {
        self.collections.read().await.users.len()
    }

    /// Number of committed books, for test assertions.
    pub async fn book_count(&self) -> usize {
        self.collections.read().await.books.len()
    }

    /// Number of committed orders, for test assertions.
    pub async fn order_count(&self) -> usize {
        self.collections.read().await.orders.len()
    }
}

#[async_trait]
impl BookstoreStore for InMemoryStore {
    type Session = InMemorySession;

    async fn begin(&self) -> Result<InMemorySession> {
        Ok(InMemorySession {
            collections: Arc::clone(&self.collections),
            users: HashMap::new(),
            books: HashMap::new(),
            orders: HashMap::new(),
        })
    }

    async fn get_book(&self, id: BookId) -> Result<Option<Book>> {
        let shared = self.collections.read().await;
        Ok(shared.books.get(&id).map(|v| v.doc.clone()))
    }

    async fn get_book_by_isbn(&self, isbn: &str) -> Result<Option<Book>> {
        let shared = self.collections.read().await;
        Ok(shared
            .books
            .values()
            .find(|v| v.doc.isbn == isbn)
            .map(|v| v.doc.clone()))
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        let shared = self.collections.read().await;
        Ok(shared.users.get(&id).map(|v| v.doc.clone()))
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        let shared = self.collections.read().await;
        Ok(shared.orders.get(&id).map(|v| v.doc.clone()))
    }
}

/// One in-memory transaction: staged writes plus the base versions
/// needed to validate them at commit.
pub struct InMemorySession {
    collections: Arc<RwLock<Collections>>,
    users: HashMap<UserId, Staged<User>>,
    books: HashMap<BookId, Staged<Book>>,
    orders: HashMap<OrderId, Staged<Order>>,
}

impl InMemorySession {
    /// Pulls a book into the stage for modification, remembering the
    /// shared version it was based on. Returns None if the book is
    /// neither staged nor committed.
    async fn stage_book_for_update(&mut self, id: BookId) -> Option<&mut Staged<Book>> {
        if !self.books.contains_key(&id) {
            let shared = self.collections.read().await;
            let current = shared.books.get(&id)?;
            let staged = Staged {
                doc: current.doc.clone(),
                base_version: Some(current.version),
            };
            drop(shared);
            self.books.insert(id, staged);
        }
        self.books.get_mut(&id)
    }

    async fn stage_order_for_update(&mut self, id: OrderId) -> Option<&mut Staged<Order>> {
        if !self.orders.contains_key(&id) {
            let shared = self.collections.read().await;
            let current = shared.orders.get(&id)?;
            let staged = Staged {
                doc: current.doc.clone(),
                base_version: Some(current.version),
            };
            drop(shared);
            self.orders.insert(id, staged);
        }
        self.orders.get_mut(&id)
    }
}

fn validate_staged<K, T>(
    shared: &HashMap<K, Versioned<T>>,
    id: &K,
    staged: &Staged<T>,
    collection: &'static str,
) -> Result<()>
where
    K: Eq + Hash + std::fmt::Display,
{
    match (staged.base_version, shared.get(id)) {
        (Some(base), Some(current)) if current.version == base => Ok(()),
        (Some(_), _) => Err(StoreError::WriteConflict {
            collection,
            id: id.to_string(),
        }),
        (None, None) => Ok(()),
        (None, Some(_)) => Err(StoreError::DuplicateDocument {
            collection,
            id: id.to_string(),
        }),
    }
}

fn apply_staged<K, T>(shared: &mut HashMap<K, Versioned<T>>, id: K, staged: Staged<T>)
where
    K: Eq + Hash,
{
    let version = staged.base_version.map_or(1, |base| base + 1);
    shared.insert(
        id,
        Versioned {
            doc: staged.doc,
            version,
        },
    );
}

#[async_trait]
impl StoreSession for InMemorySession {
    async fn find_user(&mut self, id: UserId) -> Result<Option<User>> {
        if let Some(staged) = self.users.get(&id) {
            return Ok(Some(staged.doc.clone()));
        }
        let shared = self.collections.read().await;
        Ok(shared.users.get(&id).map(|v| v.doc.clone()))
    }

    async fn find_book(&mut self, id: BookId) -> Result<Option<Book>> {
        if let Some(staged) = self.books.get(&id) {
            return Ok(Some(staged.doc.clone()));
        }
        let shared = self.collections.read().await;
        Ok(shared.books.get(&id).map(|v| v.doc.clone()))
    }

    async fn find_order(&mut self, id: OrderId) -> Result<Option<Order>> {
        if let Some(staged) = self.orders.get(&id) {
            return Ok(Some(staged.doc.clone()));
        }
        let shared = self.collections.read().await;
        Ok(shared.orders.get(&id).map(|v| v.doc.clone()))
    }

    async fn insert_user(&mut self, user: &User) -> Result<()> {
        let shared_duplicate = {
            let shared = self.collections.read().await;
            shared.users.contains_key(&user.id)
                || shared.users.values().any(|v| v.doc.email == user.email)
        };
        let staged_duplicate = self.users.contains_key(&user.id)
            || self.users.values().any(|s| s.doc.email == user.email);
        if shared_duplicate || staged_duplicate {
            return Err(StoreError::DuplicateDocument {
                collection: "users",
                id: user.id.to_string(),
            });
        }
        self.users.insert(
            user.id,
            Staged {
                doc: user.clone(),
                base_version: None,
            },
        );
        Ok(())
    }

    async fn insert_book(&mut self, book: &Book) -> Result<()> {
        let shared_duplicate = {
            let shared = self.collections.read().await;
            shared.books.contains_key(&book.id)
                || shared.books.values().any(|v| v.doc.isbn == book.isbn)
        };
        let staged_duplicate = self.books.contains_key(&book.id)
            || self.books.values().any(|s| s.doc.isbn == book.isbn);
        if shared_duplicate || staged_duplicate {
            return Err(StoreError::DuplicateDocument {
                collection: "books",
                id: book.id.to_string(),
            });
        }
        self.books.insert(
            book.id,
            Staged {
                doc: book.clone(),
                base_version: None,
            },
        );
        Ok(())
    }

    async fn insert_order(&mut self, order: &Order) -> Result<()> {
        let exists_shared = self.collections.read().await.orders.contains_key(&order.id);
        if exists_shared || self.orders.contains_key(&order.id) {
            return Err(StoreError::DuplicateDocument {
                collection: "orders",
                id: order.id.to_string(),
            });
        }
        self.orders.insert(
            order.id,
            Staged {
                doc: order.clone(),
                base_version: None,
            },
        );
        Ok(())
    }

    async fn reserve_stock(&mut self, id: BookId, amount: u32) -> Result<Option<Book>> {
        let Some(staged) = self.stage_book_for_update(id).await else {
            return Ok(None);
        };
        if staged.doc.quantity < amount {
            return Ok(None);
        }
        staged.doc.quantity -= amount;
        staged.doc.updated_at = Utc::now();
        Ok(Some(staged.doc.clone()))
    }

    async fn restore_stock(&mut self, id: BookId, amount: u32) -> Result<()> {
        if let Some(staged) = self.stage_book_for_update(id).await {
            staged.doc.quantity += amount;
            staged.doc.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn update_book_pricing(
        &mut self,
        id: BookId,
        price: Money,
        discount_percent: u8,
    ) -> Result<()> {
        if price.is_negative() {
            return Err(StoreError::Domain(DomainError::NegativePrice { price }));
        }
        if discount_percent > 100 {
            return Err(StoreError::Domain(DomainError::InvalidDiscount {
                discount_percent,
            }));
        }
        if let Some(staged) = self.stage_book_for_update(id).await {
            staged.doc.price = price;
            staged.doc.discount_percent = discount_percent;
            staged.doc.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn transition_order_status(
        &mut self,
        id: OrderId,
        allowed_from: &[OrderStatus],
        to: OrderStatus,
    ) -> Result<Option<Order>> {
        let Some(staged) = self.stage_order_for_update(id).await else {
            return Ok(None);
        };
        if !allowed_from.contains(&staged.doc.status) {
            return Ok(None);
        }
        staged.doc.status = to;
        if to == OrderStatus::Delivered {
            staged.doc.is_delivered = true;
            staged.doc.delivered_at = Some(Utc::now());
        }
        staged.doc.updated_at = Utc::now();
        Ok(Some(staged.doc.clone()))
    }

    async fn set_order_tracking(&mut self, id: OrderId, tracking_number: &str) -> Result<()> {
        if let Some(staged) = self.stage_order_for_update(id).await {
            staged.doc.tracking_number = Some(tracking_number.to_string());
            staged.doc.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn set_order_paid(&mut self, id: OrderId, paid_at: DateTime<Utc>) -> Result<()> {
        if let Some(staged) = self.stage_order_for_update(id).await {
            staged.doc.is_paid = true;
            staged.doc.paid_at = Some(paid_at);
            staged.doc.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn commit(self) -> Result<()> {
        let mut shared = self.collections.write().await;

        // Validate every staged document before applying anything, so a
        // conflicted commit leaves the shared state untouched. Fresh
        // inserts also re-check their unique keys (email, ISBN) against
        // documents another session committed since they were staged.
        for (id, staged) in &self.users {
            validate_staged(&shared.users, id, staged, "users")?;
            if staged.base_version.is_none()
                && shared
                    .users
                    .values()
                    .any(|v| v.doc.email == staged.doc.email)
            {
                return Err(StoreError::DuplicateDocument {
                    collection: "users",
                    id: id.to_string(),
                });
            }
        }
        for (id, staged) in &self.books {
            validate_staged(&shared.books, id, staged, "books")?;
            if staged.base_version.is_none()
                && shared.books.values().any(|v| v.doc.isbn == staged.doc.isbn)
            {
                return Err(StoreError::DuplicateDocument {
                    collection: "books",
                    id: id.to_string(),
                });
            }
        }
        for (id, staged) in &self.orders {
            validate_staged(&shared.orders, id, staged, "orders")?;
        }

        for (id, staged) in self.users {
            apply_staged(&mut shared.users, id, staged);
        }
        for (id, staged) in self.books {
            apply_staged(&mut shared.books, id, staged);
        }
        for (id, staged) in self.orders {
            apply_staged(&mut shared.orders, id, staged);
        }

        Ok(())
    }

    async fn abort(self) -> Result<()> {
        Ok(())
    }
}
