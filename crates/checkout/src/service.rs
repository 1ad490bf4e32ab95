//! The checkout service facade.

use common::OrderId;
use domain::{Order, PricingEngine};
use store::{BookstoreStore, RetryPolicy, TransactionCoordinator};

use crate::cancellation::CancelOrderWork;
use crate::commands::{CancelOrder, PlaceOrder};
use crate::error::Result;
use crate::fulfillment::{DeliverOrderWork, RecordPaymentWork, ShipOrderWork, StartProcessingWork};
use crate::placement::PlaceOrderWork;

/// Runs checkout workflows against one store backend.
///
/// Every mutating entry point executes as a single transaction through
/// the coordinator, with transient conflicts retried under the
/// configured policy. Pricing is owned here; callers never supply
/// totals.
pub struct CheckoutService<S: BookstoreStore> {
    coordinator: TransactionCoordinator<S>,
    pricing: PricingEngine,
    retry_policy: RetryPolicy,
}

impl<S: BookstoreStore> CheckoutService<S> {
    /// Creates a checkout service with default pricing and retry policy.
    pub fn new(store: S) -> Self {
        Self {
            coordinator: TransactionCoordinator::new(store),
            pricing: PricingEngine::default(),
            retry_policy: RetryPolicy::default(),
        }
    }

    /// Replaces the pricing engine.
    pub fn with_pricing(mut self, pricing: PricingEngine) -> Self {
        self.pricing = pricing;
        self
    }

    /// Replaces the retry policy.
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &S {
        self.coordinator.store()
    }

    /// Places an order: validates the command, reserves stock for every
    /// item, snapshots catalog prices into the lines, prices the order,
    /// and persists it in `Pending` status. All of it commits or none
    /// of it does.
    #[tracing::instrument(skip(self, cmd), fields(user_id = %cmd.user_id))]
    pub async fn place_order(&self, cmd: PlaceOrder) -> Result<Order> {
        let start = std::time::Instant::now();
        cmd.validate()?;

        let work = PlaceOrderWork {
            cmd: &cmd,
            pricing: &self.pricing,
        };
        let order = self
            .coordinator
            .run_in_transaction_with_retry(&work, &self.retry_policy)
            .await?;

        metrics::counter!("orders_placed_total").increment(1);
        metrics::histogram!("order_placement_duration_seconds")
            .record(start.elapsed().as_secs_f64());
        tracing::info!(
            order_id = %order.id,
            total_cents = order.total_price.cents(),
            items = order.items.len(),
            "order placed"
        );
        Ok(order)
    }

    /// Cancels an order on behalf of its owner or an administrator,
    /// restoring the reserved stock of every line item.
    #[tracing::instrument(
        skip(self, cmd),
        fields(order_id = %cmd.order_id, requested_by = %cmd.requested_by)
    )]
    pub async fn cancel_order(&self, cmd: CancelOrder) -> Result<Order> {
        let work = CancelOrderWork { cmd: &cmd };
        let order = self
            .coordinator
            .run_in_transaction_with_retry(&work, &self.retry_policy)
            .await?;

        metrics::counter!("orders_cancelled_total").increment(1);
        tracing::info!(order_id = %order.id, "order cancelled");
        Ok(order)
    }

    /// Moves a pending order into fulfillment.
    #[tracing::instrument(skip(self))]
    pub async fn mark_processing(&self, order_id: OrderId) -> Result<Order> {
        let work = StartProcessingWork { order_id };
        let order = self
            .coordinator
            .run_in_transaction_with_retry(&work, &self.retry_policy)
            .await?;

        tracing::info!(order_id = %order.id, "order processing started");
        Ok(order)
    }

    /// Marks a processing order as shipped with its tracking number.
    #[tracing::instrument(skip(self, tracking_number))]
    pub async fn mark_shipped(&self, order_id: OrderId, tracking_number: &str) -> Result<Order> {
        let work = ShipOrderWork {
            order_id,
            tracking_number,
        };
        let order = self
            .coordinator
            .run_in_transaction_with_retry(&work, &self.retry_policy)
            .await?;

        tracing::info!(order_id = %order.id, "order shipped");
        Ok(order)
    }

    /// Marks a shipped order as delivered.
    #[tracing::instrument(skip(self))]
    pub async fn mark_delivered(&self, order_id: OrderId) -> Result<Order> {
        let work = DeliverOrderWork { order_id };
        let order = self
            .coordinator
            .run_in_transaction_with_retry(&work, &self.retry_policy)
            .await?;

        tracing::info!(order_id = %order.id, "order delivered");
        Ok(order)
    }

    /// Records payment receipt on an order.
    #[tracing::instrument(skip(self))]
    pub async fn mark_paid(&self, order_id: OrderId) -> Result<Order> {
        let work = RecordPaymentWork { order_id };
        let order = self
            .coordinator
            .run_in_transaction_with_retry(&work, &self.retry_policy)
            .await?;

        tracing::info!(order_id = %order.id, "order payment recorded");
        Ok(order)
    }

    /// Reads an order outside any transaction.
    pub async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>> {
        Ok(self.store().get_order(order_id).await?)
    }
}
