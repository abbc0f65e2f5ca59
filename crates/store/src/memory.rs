use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::{OrderId, ProductId, UserId, Version};
use domain::{Cart, Order, Product, User};
use tokio::sync::RwLock;

use crate::{OrderQuery, ProductQuery, Result, Store, StoreError};

#[derive(Default)]
struct Collections {
    products: HashMap<ProductId, Product>,
    carts: HashMap<UserId, Cart>,
    orders: HashMap<OrderId, Order>,
    users: HashMap<UserId, User>,
}

/// In-memory store implementation for testing and database-less runs.
///
/// All collections sit behind one lock so that `place_order` can check and
/// update products, carts and orders as a single step.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<Collections>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored products.
    pub async fn product_count(&self) -> usize {
        self.state.read().await.products.len()
    }

    /// Returns the number of stored orders.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }

    /// Clears all collections.
    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        *state = Collections::default();
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn insert_product(&self, product: &Product) -> Result<()> {
        self.state
            .write()
            .await
            .products
            .insert(product.id, product.clone());
        Ok(())
    }

    async fn update_product(&self, product: &Product) -> Result<()> {
        let mut state = self.state.write().await;
        let existing = state
            .products
            .get_mut(&product.id)
            .ok_or(StoreError::ProductNotFound(product.id))?;
        *existing = product.clone();
        Ok(())
    }

    async fn delete_product(&self, product_id: ProductId) -> Result<bool> {
        Ok(self
            .state
            .write()
            .await
            .products
            .remove(&product_id)
            .is_some())
    }

    async fn get_product(&self, product_id: ProductId) -> Result<Option<Product>> {
        Ok(self.state.read().await.products.get(&product_id).cloned())
    }

    async fn find_products(&self, query: &ProductQuery) -> Result<Vec<Product>> {
        let state = self.state.read().await;
        let mut products: Vec<Product> = state
            .products
            .values()
            .filter(|product| query.matches(product))
            .cloned()
            .collect();
        products.sort_by_key(|product| (product.created_at, product.id));
        Ok(products)
    }

    async fn get_cart(&self, user_id: UserId) -> Result<Option<Cart>> {
        Ok(self.state.read().await.carts.get(&user_id).cloned())
    }

    async fn save_cart(&self, cart: &Cart) -> Result<Version> {
        let mut state = self.state.write().await;
        let user_id = cart.user_id();

        let current = state
            .carts
            .get(&user_id)
            .map(Cart::version)
            .unwrap_or_else(Version::initial);

        if current != cart.version() {
            return Err(StoreError::ConcurrencyConflict {
                user_id,
                expected: cart.version(),
                actual: current,
            });
        }

        let next = current.next();
        let mut stored = cart.clone();
        stored.set_version(next);
        state.carts.insert(user_id, stored);
        Ok(next)
    }

    async fn delete_cart(&self, user_id: UserId) -> Result<bool> {
        Ok(self.state.write().await.carts.remove(&user_id).is_some())
    }

    async fn place_order(&self, order: &Order) -> Result<()> {
        let mut state = self.state.write().await;
        let quantities = order.quantities_by_product()?;

        // Check every line before touching anything.
        for &(product_id, requested) in &quantities {
            let product = state
                .products
                .get(&product_id)
                .ok_or(StoreError::ProductNotFound(product_id))?;
            if product.count_in_stock < requested {
                return Err(StoreError::InsufficientStock {
                    product_id,
                    product_name: product.name.clone(),
                    requested,
                    available: product.count_in_stock,
                });
            }
        }

        let now = Utc::now();
        for (product_id, requested) in quantities {
            if let Some(product) = state.products.get_mut(&product_id) {
                product.count_in_stock -= requested;
                product.updated_at = now;
            }
        }

        state.carts.remove(&order.user_id());
        state.orders.insert(order.id(), order.clone());
        Ok(())
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>> {
        Ok(self.state.read().await.orders.get(&order_id).cloned())
    }

    async fn find_orders(&self, query: &OrderQuery) -> Result<Vec<Order>> {
        let state = self.state.read().await;
        let mut orders: Vec<Order> = state
            .orders
            .values()
            .filter(|order| query.matches(order))
            .cloned()
            .collect();
        orders.sort_by_key(|order| (order.created_at(), order.id()));
        Ok(orders)
    }

    async fn save_order_status(&self, order: &Order) -> Result<Order> {
        let mut state = self.state.write().await;
        let existing = state
            .orders
            .get_mut(&order.id())
            .ok_or(StoreError::OrderNotFound(order.id()))?;
        existing.merge_status(order);
        Ok(existing.clone())
    }

    async fn insert_user(&self, user: &User) -> Result<()> {
        let mut state = self.state.write().await;
        if state.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::DuplicateEmail(user.email.clone()));
        }
        state.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn update_user(&self, user: &User) -> Result<()> {
        let mut state = self.state.write().await;
        if state
            .users
            .values()
            .any(|u| u.id != user.id && u.email == user.email)
        {
            return Err(StoreError::DuplicateEmail(user.email.clone()));
        }
        let existing = state
            .users
            .get_mut(&user.id)
            .ok_or(StoreError::UserNotFound(user.id))?;
        *existing = user.clone();
        Ok(())
    }

    async fn delete_user(&self, user_id: UserId) -> Result<bool> {
        Ok(self.state.write().await.users.remove(&user_id).is_some())
    }

    async fn get_user(&self, user_id: UserId) -> Result<Option<User>> {
        Ok(self.state.read().await.users.get(&user_id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self
            .state
            .read()
            .await
            .users
            .values()
            .find(|user| user.email == email)
            .cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let mut users: Vec<User> = self.state.read().await.users.values().cloned().collect();
        users.sort_by_key(|user| (user.created_at, user.id));
        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use domain::{Money, OrderDraft, OrderError, OrderItem, ShippingAddress};

    use super::*;
    use crate::StoreExt;

    fn product(name: &str, price_cents: i64, stock: u32) -> Product {
        let mut product = Product::sample(UserId::new());
        product.name = name.to_string();
        product.price = Money::from_cents(price_cents);
        product.count_in_stock = stock;
        product
    }

    fn address() -> ShippingAddress {
        ShippingAddress {
            address: "1 Main St".to_string(),
            city: "Springfield".to_string(),
            postal_code: "12345".to_string(),
            country: "US".to_string(),
            mobile_number: "555-0100".to_string(),
        }
    }

    fn order_for(user: &User, lines: &[(&Product, u32)]) -> Order {
        let items: Vec<OrderItem> = lines
            .iter()
            .map(|(product, qty)| OrderItem {
                product_id: product.id,
                name: product.name.clone(),
                image: product.image.clone(),
                price: product.price,
                qty: *qty,
            })
            .collect();
        let total = items.iter().map(OrderItem::line_total).sum();
        Order::place(
            user,
            OrderDraft {
                items,
                shipping_address: address(),
                payment_method: "PayPal".to_string(),
                tax_price: Money::zero(),
                shipping_price: Money::zero(),
                total_price: total,
                delivery_type: None,
            },
        )
        .unwrap()
    }

    fn user(email: &str) -> User {
        User::new("Jane", email, "hash".to_string())
    }

    #[tokio::test]
    async fn insert_and_get_product() {
        let store = InMemoryStore::new();
        let widget = product("Widget", 1000, 5);

        store.insert_product(&widget).await.unwrap();

        let loaded = store.get_product(widget.id).await.unwrap().unwrap();
        assert_eq!(loaded, widget);
        assert!(store.product_exists(widget.id).await.unwrap());
    }

    #[tokio::test]
    async fn update_missing_product_fails() {
        let store = InMemoryStore::new();
        let result = store.update_product(&product("Ghost", 100, 1)).await;
        assert!(matches!(result, Err(StoreError::ProductNotFound(_))));
    }

    #[tokio::test]
    async fn find_products_filters_by_query() {
        let store = InMemoryStore::new();
        store.insert_product(&product("Red Phone", 5000, 1)).await.unwrap();
        store.insert_product(&product("Blue Phone", 15000, 1)).await.unwrap();
        store.insert_product(&product("Laptop", 9000, 1)).await.unwrap();

        let query = ProductQuery::new()
            .keyword("PHONE")
            .max_price(Money::from_cents(10000));
        let found = store.find_products(&query).await.unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Red Phone");
    }

    #[tokio::test]
    async fn save_cart_bumps_version() {
        let store = InMemoryStore::new();
        let user_id = UserId::new();

        let cart = store.get_cart_or_empty(user_id).await.unwrap();
        let v1 = store.save_cart(&cart).await.unwrap();
        assert_eq!(v1, Version::first());

        let cart = store.get_cart(user_id).await.unwrap().unwrap();
        assert_eq!(cart.version(), v1);
        let v2 = store.save_cart(&cart).await.unwrap();
        assert_eq!(v2, Version::new(2));
    }

    #[tokio::test]
    async fn save_cart_detects_stale_version() {
        let store = InMemoryStore::new();
        let user_id = UserId::new();

        let first = Cart::empty(user_id);
        let stale = Cart::empty(user_id);
        store.save_cart(&first).await.unwrap();

        let result = store.save_cart(&stale).await;

        assert!(matches!(
            result,
            Err(StoreError::ConcurrencyConflict { actual, .. }) if actual == Version::first()
        ));
    }

    #[tokio::test]
    async fn place_order_decrements_stock_and_clears_cart() {
        let store = InMemoryStore::new();
        let buyer = user("buyer@example.com");
        let widget = product("Widget", 1000, 5);
        store.insert_product(&widget).await.unwrap();

        let mut cart = Cart::empty(buyer.id);
        cart.upsert_item(&widget, 2).unwrap();
        store.save_cart(&cart).await.unwrap();

        let order = order_for(&buyer, &[(&widget, 2)]);
        store.place_order(&order).await.unwrap();

        let widget = store.get_product(widget.id).await.unwrap().unwrap();
        assert_eq!(widget.count_in_stock, 3);
        assert!(store.get_cart(buyer.id).await.unwrap().is_none());
        assert_eq!(store.get_order(order.id()).await.unwrap(), Some(order));
    }

    #[tokio::test]
    async fn place_order_is_all_or_nothing() {
        let store = InMemoryStore::new();
        let buyer = user("buyer@example.com");
        let plenty = product("Plenty", 100, 10);
        let scarce = product("Scarce", 100, 1);
        store.insert_product(&plenty).await.unwrap();
        store.insert_product(&scarce).await.unwrap();

        let order = order_for(&buyer, &[(&plenty, 3), (&scarce, 2)]);
        let result = store.place_order(&order).await;

        assert!(matches!(
            result,
            Err(StoreError::InsufficientStock {
                requested: 2,
                available: 1,
                ..
            })
        ));
        let plenty = store.get_product(plenty.id).await.unwrap().unwrap();
        assert_eq!(plenty.count_in_stock, 10);
        assert_eq!(store.order_count().await, 0);
    }

    #[tokio::test]
    async fn place_order_sums_duplicate_lines() {
        let store = InMemoryStore::new();
        let buyer = user("buyer@example.com");
        let widget = product("Widget", 100, 3);
        store.insert_product(&widget).await.unwrap();

        let order = order_for(&buyer, &[(&widget, 2), (&widget, 2)]);
        let result = store.place_order(&order).await;

        assert!(matches!(
            result,
            Err(StoreError::InsufficientStock { requested: 4, .. })
        ));
    }

    #[tokio::test]
    async fn place_order_rejects_quantities_past_u32_without_touching_stock() {
        let store = InMemoryStore::new();
        let buyer = user("buyer@example.com");
        let widget = product("Widget", 100, 1);
        store.insert_product(&widget).await.unwrap();

        // A stored order document bypasses Order::place validation.
        let mut document = serde_json::to_value(order_for(&buyer, &[(&widget, 1)])).unwrap();
        let line = document["items"][0].clone();
        document["items"][0]["qty"] = serde_json::json!(u32::MAX);
        document["items"].as_array_mut().unwrap().push(line);
        let order: Order = serde_json::from_value(document).unwrap();

        let result = store.place_order(&order).await;

        assert!(matches!(
            result,
            Err(StoreError::InvalidOrder(OrderError::QuantityTooLarge { product_id }))
                if product_id == widget.id
        ));
        let widget = store.get_product(widget.id).await.unwrap().unwrap();
        assert_eq!(widget.count_in_stock, 1);
        assert_eq!(store.order_count().await, 0);
    }

    #[tokio::test]
    async fn place_order_with_missing_product_fails() {
        let store = InMemoryStore::new();
        let buyer = user("buyer@example.com");
        let ghost = product("Ghost", 100, 3);

        let order = order_for(&buyer, &[(&ghost, 1)]);
        let result = store.place_order(&order).await;

        assert!(matches!(result, Err(StoreError::ProductNotFound(id)) if id == ghost.id));
    }

    #[tokio::test]
    async fn find_orders_by_user() {
        let store = InMemoryStore::new();
        let alice = user("alice@example.com");
        let bob = user("bob@example.com");
        let widget = product("Widget", 100, 10);
        store.insert_product(&widget).await.unwrap();

        store.place_order(&order_for(&alice, &[(&widget, 1)])).await.unwrap();
        store.place_order(&order_for(&bob, &[(&widget, 1)])).await.unwrap();
        store.place_order(&order_for(&alice, &[(&widget, 1)])).await.unwrap();

        let mine = store.find_orders(&OrderQuery::for_user(alice.id)).await.unwrap();
        assert_eq!(mine.len(), 2);
        assert!(mine.iter().all(|o| o.user_id() == alice.id));

        let all = store.find_orders(&OrderQuery::all()).await.unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn insert_user_rejects_duplicate_email() {
        let store = InMemoryStore::new();
        store.insert_user(&user("jane@example.com")).await.unwrap();

        let result = store.insert_user(&user("jane@example.com")).await;

        assert!(matches!(result, Err(StoreError::DuplicateEmail(_))));
        assert!(store.email_taken("jane@example.com").await.unwrap());
    }

    #[tokio::test]
    async fn clear_empties_store() {
        let store = InMemoryStore::new();
        store.insert_product(&product("Widget", 100, 1)).await.unwrap();
        assert_eq!(store.product_count().await, 1);

        store.clear().await;

        assert_eq!(store.product_count().await, 0);
    }
}
