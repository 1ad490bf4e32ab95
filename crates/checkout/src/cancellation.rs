//! Order cancellation transaction body.

use async_trait::async_trait;
use domain::{DomainError, Order, OrderStatus};
use store::{StoreSession, TransactionalWork};

use crate::commands::CancelOrder;
use crate::error::CheckoutError;

/// The cancellation transaction: authorize, restore stock per line, and
/// conditionally flip the status to Cancelled.
///
/// Stock is restored before the status transition; if the conditional
/// transition matches nothing (a concurrent cancel or shipment won the
/// race), the whole transaction aborts and the restorations roll back
/// with it. A book deleted from the catalog since placement restores
/// nothing and is skipped silently.
pub(crate) struct CancelOrderWork<'a> {
    pub(crate) cmd: &'a CancelOrder,
}

#[async_trait]
impl<S: StoreSession> TransactionalWork<S> for CancelOrderWork<'_> {
    type Output = Order;
    type Error = CheckoutError;

    async fn run(&self, session: &mut S) -> Result<Order, CheckoutError> {
        let order = session
            .find_order(self.cmd.order_id)
            .await?
            .ok_or(CheckoutError::OrderNotFound(self.cmd.order_id))?;

        let requester = session
            .find_user(self.cmd.requested_by)
            .await?
            .ok_or(CheckoutError::UserNotFound(self.cmd.requested_by))?;
        if !requester.can_act_for(order.user_id) {
            return Err(CheckoutError::NotAuthorized {
                user_id: self.cmd.requested_by,
                order_id: self.cmd.order_id,
            });
        }

        order.ensure_can_cancel()?;

        for line in &order.items {
            session.restore_stock(line.book_id, line.quantity).await?;
        }

        let cancelled = session
            .transition_order_status(
                self.cmd.order_id,
                &[OrderStatus::Pending, OrderStatus::Processing],
                OrderStatus::Cancelled,
            )
            .await?;

        match cancelled {
            Some(order) => Ok(order),
            None => {
                // The status moved underneath us; report what it is now.
                let current_status = session
                    .find_order(self.cmd.order_id)
                    .await?
                    .map_or(order.status, |o| o.status);
                Err(DomainError::InvalidStateTransition {
                    current_status,
                    action: "cancel",
                }
                .into())
            }
        }
    }
}
