//! Fulfillment status advancement transaction bodies.
//!
//! These move an order along `Pending -> Processing -> Shipped ->
//! Delivered` and record payment receipt. None of them touch inventory;
//! each one re-checks the state machine inside its transaction and
//! fails with `InvalidStateTransition` when the order is not where the
//! caller thought it was.

use async_trait::async_trait;
use chrono::Utc;
use common::OrderId;
use domain::{DomainError, Order, OrderStatus};
use store::{StoreSession, TransactionalWork};

use crate::error::CheckoutError;

async fn load_order<S: StoreSession>(
    session: &mut S,
    order_id: OrderId,
) -> Result<Order, CheckoutError> {
    session
        .find_order(order_id)
        .await?
        .ok_or(CheckoutError::OrderNotFound(order_id))
}

fn transition_missed(current_status: OrderStatus, action: &'static str) -> CheckoutError {
    DomainError::InvalidStateTransition {
        current_status,
        action,
    }
    .into()
}

pub(crate) struct StartProcessingWork {
    pub(crate) order_id: OrderId,
}

#[async_trait]
impl<S: StoreSession> TransactionalWork<S> for StartProcessingWork {
    type Output = Order;
    type Error = CheckoutError;

    async fn run(&self, session: &mut S) -> Result<Order, CheckoutError> {
        let order = load_order(session, self.order_id).await?;
        order.ensure_can_start_processing()?;

        session
            .transition_order_status(
                self.order_id,
                &[OrderStatus::Pending],
                OrderStatus::Processing,
            )
            .await?
            .ok_or_else(|| transition_missed(order.status, "start processing"))
    }
}

pub(crate) struct ShipOrderWork<'a> {
    pub(crate) order_id: OrderId,
    pub(crate) tracking_number: &'a str,
}

#[async_trait]
impl<S: StoreSession> TransactionalWork<S> for ShipOrderWork<'_> {
    type Output = Order;
    type Error = CheckoutError;

    async fn run(&self, session: &mut S) -> Result<Order, CheckoutError> {
        let order = load_order(session, self.order_id).await?;
        order.ensure_can_ship()?;

        // Tracking goes in first so the transitioned document already
        // carries it.
        session
            .set_order_tracking(self.order_id, self.tracking_number)
            .await?;
        session
            .transition_order_status(
                self.order_id,
                &[OrderStatus::Processing],
                OrderStatus::Shipped,
            )
            .await?
            .ok_or_else(|| transition_missed(order.status, "ship"))
    }
}

pub(crate) struct DeliverOrderWork {
    pub(crate) order_id: OrderId,
}

#[async_trait]
impl<S: StoreSession> TransactionalWork<S> for DeliverOrderWork {
    type Output = Order;
    type Error = CheckoutError;

    async fn run(&self, session: &mut S) -> Result<Order, CheckoutError> {
        let order = load_order(session, self.order_id).await?;
        order.ensure_can_deliver()?;

        session
            .transition_order_status(self.order_id, &[OrderStatus::Shipped], OrderStatus::Delivered)
            .await?
            .ok_or_else(|| transition_missed(order.status, "deliver"))
    }
}

pub(crate) struct RecordPaymentWork {
    pub(crate) order_id: OrderId,
}

#[async_trait]
impl<S: StoreSession> TransactionalWork<S> for RecordPaymentWork {
    type Output = Order;
    type Error = CheckoutError;

    async fn run(&self, session: &mut S) -> Result<Order, CheckoutError> {
        let order = load_order(session, self.order_id).await?;
        if order.is_paid {
            return Err(CheckoutError::AlreadyPaid(self.order_id));
        }
        order.ensure_can_record_payment()?;

        session.set_order_paid(self.order_id, Utc::now()).await?;
        load_order(session, self.order_id).await
    }
}
