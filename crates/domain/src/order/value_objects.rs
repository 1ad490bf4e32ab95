//! Value objects for the order domain.

use common::BookId;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::money::Money;

/// A line item in an order.
///
/// `unit_price` and `discount_percent` are snapshots taken from the
/// catalog at placement time; later catalog changes never affect them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    /// The book being ordered.
    pub book_id: BookId,

    /// Book title at placement time, for order display.
    pub title: String,

    /// Quantity ordered.
    pub quantity: u32,

    /// Catalog price per copy at placement time.
    pub unit_price: Money,

    /// Catalog discount at placement time.
    pub discount_percent: u8,
}

impl OrderLine {
    /// Creates a new order line.
    pub fn new(
        book_id: BookId,
        title: impl Into<String>,
        quantity: u32,
        unit_price: Money,
        discount_percent: u8,
    ) -> Self {
        Self {
            book_id,
            title: title.into(),
            quantity,
            unit_price,
            discount_percent,
        }
    }

    /// Returns the discounted total for this line
    /// (unit_price * quantity, less the discount, rounded half up).
    pub fn line_total(&self) -> Money {
        self.unit_price
            .multiply(self.quantity)
            .apply_discount_percent(self.discount_percent)
    }
}

/// Where an order ships to. Every field must be non-blank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
}

impl ShippingAddress {
    /// Creates a new shipping address.
    pub fn new(
        address: impl Into<String>,
        city: impl Into<String>,
        postal_code: impl Into<String>,
        country: impl Into<String>,
    ) -> Self {
        Self {
            address: address.into(),
            city: city.into(),
            postal_code: postal_code.into(),
            country: country.into(),
        }
    }

    /// Checks that no field is blank.
    pub fn validate(&self) -> Result<(), DomainError> {
        for (field, value) in [
            ("address", &self.address),
            ("city", &self.city),
            ("postal_code", &self.postal_code),
            ("country", &self.country),
        ] {
            if value.trim().is_empty() {
                return Err(DomainError::MissingShippingField { field });
            }
        }
        Ok(())
    }
}

/// How the customer pays for an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    CreditCard,
    Paypal,
    Wallet,
    CashOnDelivery,
}

impl PaymentMethod {
    /// Returns the payment method as its wire string.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::CreditCard => "credit_card",
            PaymentMethod::Paypal => "paypal",
            PaymentMethod::Wallet => "wallet",
            PaymentMethod::CashOnDelivery => "cash_on_delivery",
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "credit_card" => Ok(PaymentMethod::CreditCard),
            "paypal" => Ok(PaymentMethod::Paypal),
            "wallet" => Ok(PaymentMethod::Wallet),
            "cash_on_delivery" => Ok(PaymentMethod::CashOnDelivery),
            other => Err(DomainError::UnknownPaymentMethod {
                value: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_total_without_discount() {
        let line = OrderLine::new(BookId::new(), "Dune", 3, Money::from_cents(1000), 0);
        assert_eq!(line.line_total().cents(), 3000);
    }

    #[test]
    fn test_line_total_applies_discount_after_quantity() {
        // 2 copies at $9.99 with 15% off: 1998 * 0.85 = 1698.3 -> 1698
        let line = OrderLine::new(BookId::new(), "Dune", 2, Money::from_cents(999), 15);
        assert_eq!(line.line_total().cents(), 1698);
    }

    #[test]
    fn test_order_line_serialization() {
        let line = OrderLine::new(BookId::new(), "Dune", 2, Money::from_cents(999), 10);
        let json = serde_json::to_string(&line).unwrap();
        let deserialized: OrderLine = serde_json::from_str(&json).unwrap();
        assert_eq!(line, deserialized);
    }

    #[test]
    fn test_shipping_address_validation() {
        let valid = ShippingAddress::new("12 Shelf Lane", "Omaha", "68102", "USA");
        assert!(valid.validate().is_ok());

        let blank_city = ShippingAddress::new("12 Shelf Lane", "  ", "68102", "USA");
        match blank_city.validate() {
            Err(DomainError::MissingShippingField { field }) => assert_eq!(field, "city"),
            other => panic!("expected missing city, got {other:?}"),
        }
    }

    #[test]
    fn test_payment_method_wire_format() {
        let json = serde_json::to_string(&PaymentMethod::CreditCard).unwrap();
        assert_eq!(json, "\"credit_card\"");

        let parsed: PaymentMethod = "cash_on_delivery".parse().unwrap();
        assert_eq!(parsed, PaymentMethod::CashOnDelivery);
        assert!("barter".parse::<PaymentMethod>().is_err());
    }
}
