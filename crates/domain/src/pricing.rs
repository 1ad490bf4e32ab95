//! Order pricing.
//!
//! The pricing engine is the single source of truth for order totals.
//! It is a pure computation over line item snapshots; there is no
//! parameter through which a caller could supply its own total.

use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::order::OrderLine;

/// Default flat shipping charge, applied once per non-empty order.
pub const DEFAULT_SHIPPING_FLAT_CENTS: i64 = 500;

/// Default tax rate in basis points (800 = 8%).
pub const DEFAULT_TAX_RATE_BASIS_POINTS: u32 = 800;

/// Computed totals for one order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTotals {
    /// Sum of discounted line totals.
    pub subtotal: Money,

    /// Flat shipping charge (zero for an empty line list).
    pub shipping_price: Money,

    /// Tax on the subtotal.
    pub tax_price: Money,

    /// subtotal + shipping_price + tax_price.
    pub total_price: Money,
}

/// Prices an order from its line item snapshots.
///
/// All arithmetic is in integer cents; fractional cents are rounded
/// half up where they arise (per line, and once for tax), so the
/// stored total is always the exact sum of its stored components.
#[derive(Debug, Clone, Copy)]
pub struct PricingEngine {
    shipping_flat: Money,
    tax_rate_bps: u32,
}

impl PricingEngine {
    /// Creates a pricing engine with the given shipping flat rate and
    /// tax rate in basis points.
    pub fn new(shipping_flat: Money, tax_rate_bps: u32) -> Self {
        Self {
            shipping_flat,
            tax_rate_bps,
        }
    }

    /// Computes subtotal, shipping, tax, and grand total for `lines`.
    pub fn price(&self, lines: &[OrderLine]) -> OrderTotals {
        let subtotal = lines
            .iter()
            .fold(Money::zero(), |acc, line| acc + line.line_total());

        let shipping_price = if lines.is_empty() {
            Money::zero()
        } else {
            self.shipping_flat
        };

        let tax_price = subtotal.scaled_by_bps(self.tax_rate_bps);

        OrderTotals {
            subtotal,
            shipping_price,
            tax_price,
            total_price: subtotal + shipping_price + tax_price,
        }
    }
}

impl Default for PricingEngine {
    fn default() -> Self {
        Self::new(
            Money::from_cents(DEFAULT_SHIPPING_FLAT_CENTS),
            DEFAULT_TAX_RATE_BASIS_POINTS,
        )
    }
}
