//! Domain layer for the bookstore order system.
//!
//! This crate provides the core domain model including:
//! - Money in integer cents with the rounding rules used for totals
//! - Book and User records
//! - Order record with line item snapshots and the status state machine
//! - PricingEngine, the single source of truth for order totals

pub mod book;
pub mod error;
pub mod money;
pub mod order;
pub mod pricing;
pub mod user;

pub use book::Book;
pub use error::DomainError;
pub use money::Money;
pub use order::{Order, OrderLine, OrderStatus, PaymentMethod, ShippingAddress};
pub use pricing::{
    DEFAULT_SHIPPING_FLAT_CENTS, DEFAULT_TAX_RATE_BASIS_POINTS, OrderTotals, PricingEngine,
};
pub use user::User;
