//! Order record and related types.

mod record;
mod status;
mod value_objects;

pub use record::Order;
pub use status::OrderStatus;
pub use value_objects::{OrderLine, PaymentMethod, ShippingAddress};
