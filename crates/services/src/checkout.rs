//! Checkout: turning a submitted cart into an order.

use std::time::Instant;

use domain::{Order, OrderDraft, User};
use store::Store;

use crate::error::Result;

/// Places orders.
///
/// Validation happens in two stages. The draft itself is checked first
/// (non-empty, quantities, prices, address, payment method). Then the
/// store commits the order atomically: all stock is checked, then all
/// stock is decremented, the customer's cart deleted and the order
/// written. A failure at any point leaves stock, cart and orders as they
/// were.
pub struct CheckoutService<S: Store> {
    store: S,
}

impl<S: Store> CheckoutService<S> {
    /// Creates a new checkout service.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Places an order for `customer`.
    #[tracing::instrument(
        skip(self, customer, draft),
        fields(user_id = %customer.id, items = draft.items.len())
    )]
    pub async fn place_order(&self, customer: &User, draft: OrderDraft) -> Result<Order> {
        let start = Instant::now();

        let result = self.commit(customer, draft).await;

        metrics::histogram!("checkout_duration_seconds").record(start.elapsed().as_secs_f64());
        match &result {
            Ok(order) => {
                metrics::counter!("checkout_orders_total").increment(1);
                tracing::info!(
                    order_id = %order.id(),
                    total = %order.total_price(),
                    "order placed"
                );
            }
            Err(e) => {
                let reason = e.kind().as_str();
                metrics::counter!("checkout_rejections_total", "reason" => reason).increment(1);
                tracing::warn!(reason, error = %e, "checkout rejected");
            }
        }

        result
    }

    async fn commit(&self, customer: &User, draft: OrderDraft) -> Result<Order> {
        let order = Order::place(customer, draft)?;
        self.store.place_order(&order).await?;
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use common::{ProductId, UserId};
    use domain::{Money, OrderItem, Product, ShippingAddress};
    use store::InMemoryStore;

    use super::*;
    use crate::ErrorKind;

    fn address() -> ShippingAddress {
        ShippingAddress {
            address: "1 Main St".to_string(),
            city: "Springfield".to_string(),
            postal_code: "12345".to_string(),
            country: "US".to_string(),
            mobile_number: "555-0100".to_string(),
        }
    }

    fn draft(items: Vec<OrderItem>) -> OrderDraft {
        let total = items.iter().map(OrderItem::line_total).sum();
        OrderDraft {
            items,
            shipping_address: address(),
            payment_method: "PayPal".to_string(),
            tax_price: Money::zero(),
            shipping_price: Money::zero(),
            total_price: total,
            delivery_type: None,
        }
    }

    fn line(product: &Product, qty: u32) -> OrderItem {
        OrderItem {
            product_id: product.id,
            name: product.name.clone(),
            image: product.image.clone(),
            price: product.price,
            qty,
        }
    }

    #[tokio::test]
    async fn empty_draft_is_rejected() {
        let service = CheckoutService::new(InMemoryStore::new());
        let customer = User::new("Jane", "jane@example.com", "hash".to_string());

        let err = service
            .place_order(&customer, draft(vec![]))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::EmptyOrder);
    }

    #[tokio::test]
    async fn unknown_product_is_not_found() {
        let store = InMemoryStore::new();
        let service = CheckoutService::new(store.clone());
        let customer = User::new("Jane", "jane@example.com", "hash".to_string());
        let mut ghost = Product::sample(UserId::new());
        ghost.id = ProductId::new();

        let err = service
            .place_order(&customer, draft(vec![line(&ghost, 1)]))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(store.order_count().await, 0);
    }
}
