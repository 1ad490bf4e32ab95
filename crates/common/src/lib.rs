//! Shared identifier types used across the bookstore order system.

pub mod types;

pub use types::{BookId, OrderId, UserId};
