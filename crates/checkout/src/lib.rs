//! Checkout workflows for the bookstore order system.
//!
//! Placement reserves stock with a conditional compare-and-decrement
//! per item and snapshots catalog prices into the order; cancellation
//! compensates by restoring stock and conditionally flipping the order
//! status. Both run as single transactions through the store's
//! coordinator, with transient conflicts retried.

pub mod commands;
pub mod error;
pub mod service;

mod cancellation;
mod fulfillment;
mod placement;

pub use commands::{CancelOrder, PlaceOrder, RequestedItem};
pub use error::{CheckoutError, Result};
pub use service::CheckoutService;
