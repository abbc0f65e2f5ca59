//! Order lookups and status transitions.

use common::OrderId;
use domain::{Order, PaymentResult, Requester};
use store::{OrderQuery, Store};

use crate::accounts::require_admin;
use crate::error::{Result, ServiceError};

/// Service for reading orders and moving them through paid/delivered.
pub struct OrderService<S: Store> {
    store: S,
}

impl<S: Store> OrderService<S> {
    /// Creates a new order service.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Loads an order visible to the requester (its owner or an admin).
    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, requester: &Requester, order_id: OrderId) -> Result<Order> {
        let order = self.load(order_id).await?;
        order.ensure_visible_to(requester)?;
        Ok(order)
    }

    /// Lists the requester's own orders.
    #[tracing::instrument(skip(self))]
    pub async fn list_my_orders(&self, requester: &Requester) -> Result<Vec<Order>> {
        Ok(self
            .store
            .find_orders(&OrderQuery::for_user(requester.user_id))
            .await?)
    }

    /// Lists every order. Administrators only.
    #[tracing::instrument(skip(self))]
    pub async fn list_all_orders(&self, requester: &Requester) -> Result<Vec<Order>> {
        require_admin(requester)?;
        Ok(self.store.find_orders(&OrderQuery::all()).await?)
    }

    /// Marks an order as paid, recording the caller-supplied payment result.
    #[tracing::instrument(skip(self, payment_result))]
    pub async fn mark_paid(
        &self,
        requester: &Requester,
        order_id: OrderId,
        payment_result: PaymentResult,
    ) -> Result<Order> {
        let mut order = self.load(order_id).await?;
        order.mark_paid(requester, payment_result)?;

        let order = self.store.save_order_status(&order).await?;
        metrics::counter!("order_status_transitions_total", "status" => "paid").increment(1);
        tracing::info!(%order_id, "order marked paid");
        Ok(order)
    }

    /// Marks an order as delivered. Administrators only.
    #[tracing::instrument(skip(self))]
    pub async fn mark_delivered(&self, requester: &Requester, order_id: OrderId) -> Result<Order> {
        let mut order = self.load(order_id).await?;
        order.mark_delivered(requester)?;

        let order = self.store.save_order_status(&order).await?;
        metrics::counter!("order_status_transitions_total", "status" => "delivered").increment(1);
        tracing::info!(%order_id, "order marked delivered");
        Ok(order)
    }

    async fn load(&self, order_id: OrderId) -> Result<Order> {
        self.store
            .get_order(order_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Order", order_id))
    }
}
