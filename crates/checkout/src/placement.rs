//! Order placement transaction body.

use async_trait::async_trait;
use domain::{Order, OrderLine, PricingEngine};
use store::{StoreSession, TransactionalWork};

use crate::commands::PlaceOrder;
use crate::error::CheckoutError;

/// The placement transaction: reserve stock, snapshot prices, price the
/// order, and insert it. Safe to re-run on retry; every attempt starts
/// from fresh reads and builds a fresh order ID.
pub(crate) struct PlaceOrderWork<'a> {
    pub(crate) cmd: &'a PlaceOrder,
    pub(crate) pricing: &'a PricingEngine,
}

#[async_trait]
impl<S: StoreSession> TransactionalWork<S> for PlaceOrderWork<'_> {
    type Output = Order;
    type Error = CheckoutError;

    async fn run(&self, session: &mut S) -> Result<Order, CheckoutError> {
        if session.find_user(self.cmd.user_id).await?.is_none() {
            return Err(CheckoutError::UserNotFound(self.cmd.user_id));
        }

        // Items are reserved one at a time, in request order. Any
        // failure aborts the transaction and releases every decrement
        // made so far.
        let mut lines = Vec::with_capacity(self.cmd.items.len());
        for item in &self.cmd.items {
            let Some(book) = session.reserve_stock(item.book_id, item.quantity).await? else {
                return Err(match session.find_book(item.book_id).await? {
                    Some(book) => CheckoutError::InsufficientInventory {
                        book_id: item.book_id,
                        requested: item.quantity,
                        available: book.quantity,
                    },
                    None => CheckoutError::BookNotFound(item.book_id),
                });
            };

            lines.push(OrderLine::new(
                book.id,
                book.title,
                item.quantity,
                book.price,
                book.discount_percent,
            ));
        }

        let totals = self.pricing.price(&lines);
        let order = Order::new(
            self.cmd.user_id,
            lines,
            self.cmd.shipping_address.clone(),
            self.cmd.payment_method,
            &totals,
        );
        session.insert_order(&order).await?;

        Ok(order)
    }
}
