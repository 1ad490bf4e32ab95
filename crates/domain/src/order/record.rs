//! The persisted order record.

use chrono::{DateTime, Utc};
use common::{OrderId, UserId};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::money::Money;
use crate::pricing::OrderTotals;

use super::status::OrderStatus;
use super::value_objects::{OrderLine, PaymentMethod, ShippingAddress};

/// A customer order.
///
/// Line items carry price and discount snapshots taken inside the
/// placement transaction; totals come from the pricing engine and are
/// never recomputed against the live catalog or accepted from a caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub items: Vec<OrderLine>,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub status: OrderStatus,
    pub shipping_price: Money,
    pub tax_price: Money,
    pub total_price: Money,
    pub is_paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub is_delivered: bool,
    pub delivered_at: Option<DateTime<Utc>>,
    pub tracking_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Creates a new order in `Pending` status with a fresh ID.
    ///
    /// `totals` must come from the pricing engine run over `items`.
    pub fn new(
        user_id: UserId,
        items: Vec<OrderLine>,
        shipping_address: ShippingAddress,
        payment_method: PaymentMethod,
        totals: &OrderTotals,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: OrderId::new(),
            user_id,
            items,
            shipping_address,
            payment_method,
            status: OrderStatus::Pending,
            shipping_price: totals.shipping_price,
            tax_price: totals.tax_price,
            total_price: totals.total_price,
            is_paid: false,
            paid_at: None,
            is_delivered: false,
            delivered_at: None,
            tracking_number: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Sum of line totals, derived from the stored snapshots.
    pub fn subtotal(&self) -> Money {
        self.items
            .iter()
            .fold(Money::zero(), |acc, line| acc + line.line_total())
    }

    /// Total number of copies across all lines.
    pub fn total_quantity(&self) -> u32 {
        self.items.iter().map(|line| line.quantity).sum()
    }

    /// Fails with `InvalidStateTransition` unless the order can be cancelled.
    pub fn ensure_can_cancel(&self) -> Result<(), DomainError> {
        if self.status.can_cancel() {
            Ok(())
        } else {
            Err(DomainError::InvalidStateTransition {
                current_status: self.status,
                action: "cancel",
            })
        }
    }

    /// Fails with `InvalidStateTransition` unless fulfillment can start.
    pub fn ensure_can_start_processing(&self) -> Result<(), DomainError> {
        if self.status.can_start_processing() {
            Ok(())
        } else {
            Err(DomainError::InvalidStateTransition {
                current_status: self.status,
                action: "start processing",
            })
        }
    }

    /// Fails with `InvalidStateTransition` unless the order can be shipped.
    pub fn ensure_can_ship(&self) -> Result<(), DomainError> {
        if self.status.can_ship() {
            Ok(())
        } else {
            Err(DomainError::InvalidStateTransition {
                current_status: self.status,
                action: "ship",
            })
        }
    }

    /// Fails with `InvalidStateTransition` unless the order can be delivered.
    pub fn ensure_can_deliver(&self) -> Result<(), DomainError> {
        if self.status.can_deliver() {
            Ok(())
        } else {
            Err(DomainError::InvalidStateTransition {
                current_status: self.status,
                action: "deliver",
            })
        }
    }

    /// Payment can be recorded any time before cancellation.
    pub fn ensure_can_record_payment(&self) -> Result<(), DomainError> {
        if self.status == OrderStatus::Cancelled {
            Err(DomainError::InvalidStateTransition {
                current_status: self.status,
                action: "record payment",
            })
        } else {
            Ok(())
        }
    }
}
