//! Catalog book records.

use chrono::{DateTime, Utc};
use common::BookId;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::money::Money;

/// A book in the catalog together with its live inventory count.
///
/// `quantity` is the only field mutated concurrently; placement
/// decrements it through a conditional update and cancellation
/// increments it back. Price and discount change only through catalog
/// updates and are snapshotted into order lines at placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: BookId,
    pub isbn: String,
    pub title: String,
    pub author: String,
    pub price: Money,
    pub discount_percent: u8,
    pub quantity: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Book {
    /// Creates a new catalog record with a fresh ID.
    pub fn new(
        isbn: impl Into<String>,
        title: impl Into<String>,
        author: impl Into<String>,
        price: Money,
        discount_percent: u8,
        quantity: u32,
    ) -> Result<Self, DomainError> {
        if price.is_negative() {
            return Err(DomainError::NegativePrice { price });
        }
        if discount_percent > 100 {
            return Err(DomainError::InvalidDiscount { discount_percent });
        }
        let now = Utc::now();
        Ok(Self {
            id: BookId::new(),
            isbn: isbn.into(),
            title: title.into(),
            author: author.into(),
            price,
            discount_percent,
            quantity,
            created_at: now,
            updated_at: now,
        })
    }

    /// Returns true if at least `requested` copies are in stock.
    pub fn has_stock(&self, requested: u32) -> bool {
        self.quantity >= requested
    }
}
