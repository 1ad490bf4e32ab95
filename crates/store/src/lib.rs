//! Transactional document store for the bookstore order system.
//!
//! Two backends implement the same session-oriented store traits: a
//! Postgres store mapping documents onto relational tables, and an
//! in-memory store with commit-time conflict detection for tests and
//! local runs. The coordinator wraps units of work in
//! begin/commit-or-abort cycles and retries transient conflicts.

pub mod coordinator;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use coordinator::{RetryPolicy, TransactionCoordinator, TransactionalWork, TransientError};
pub use error::{Result, StoreError};
pub use memory::{InMemorySession, InMemoryStore};
pub use postgres::{PostgresSession, PostgresStore};
pub use store::{BookstoreStore, StoreSession};
