//! Cart mutations.

use common::{ProductId, UserId};
use domain::Cart;
use store::{Store, StoreExt};

use crate::error::{Result, ServiceError};

/// Service for reading and editing a user's cart.
///
/// Every call re-reads the cart and product from the store. Writes are
/// guarded by the cart's version; a concurrent edit surfaces as a
/// conflict and is not retried.
pub struct CartService<S: Store> {
    store: S,
}

impl<S: Store> CartService<S> {
    /// Creates a new cart service.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns the user's cart, or an empty unsaved cart.
    #[tracing::instrument(skip(self))]
    pub async fn get_cart(&self, user_id: UserId) -> Result<Cart> {
        Ok(self.store.get_cart_or_empty(user_id).await?)
    }

    /// Sets the quantity of a product in the user's cart.
    ///
    /// The quantity replaces any existing one and must not exceed the
    /// product's live stock. The cart is created on first use.
    #[tracing::instrument(skip(self))]
    pub async fn upsert_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        qty: u32,
    ) -> Result<Cart> {
        let product = self
            .store
            .get_product(product_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Product", product_id))?;

        let mut cart = self.store.get_cart_or_empty(user_id).await?;
        if let Err(e) = cart.upsert_item(&product, qty) {
            tracing::warn!(%product_id, qty, error = %e, "cart update rejected");
            return Err(e.into());
        }

        let version = self.store.save_cart(&cart).await?;
        cart.set_version(version);

        metrics::counter!("cart_mutations_total", "op" => "upsert").increment(1);
        Ok(cart)
    }

    /// Removes a product from the user's cart.
    ///
    /// Removing a product that is not in the cart leaves the items as they
    /// were. Fails if the user has no cart at all.
    #[tracing::instrument(skip(self))]
    pub async fn remove_item(&self, user_id: UserId, product_id: ProductId) -> Result<Cart> {
        let mut cart = self
            .store
            .get_cart(user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Cart", user_id))?;

        cart.remove_item(product_id);

        let version = self.store.save_cart(&cart).await?;
        cart.set_version(version);

        metrics::counter!("cart_mutations_total", "op" => "remove").increment(1);
        Ok(cart)
    }
}

#[cfg(test)]
mod tests {
    use domain::{Money, Product};
    use store::InMemoryStore;

    use super::*;
    use crate::ErrorKind;

    async fn setup(stock: u32) -> (CartService<InMemoryStore>, InMemoryStore, Product) {
        let store = InMemoryStore::new();
        let mut product = Product::sample(UserId::new());
        product.name = "Widget".to_string();
        product.price = Money::from_cents(1000);
        product.count_in_stock = stock;
        store.insert_product(&product).await.unwrap();
        (CartService::new(store.clone()), store, product)
    }

    #[tokio::test]
    async fn get_cart_without_record_is_empty() {
        let (service, _, _) = setup(1).await;

        let cart = service.get_cart(UserId::new()).await.unwrap();

        assert!(cart.is_empty());
        assert!(cart.total_price().is_zero());
        assert!(!cart.is_persisted());
    }

    #[tokio::test]
    async fn upsert_creates_and_persists_cart() {
        let (service, store, product) = setup(5).await;
        let user = UserId::new();

        let cart = service.upsert_item(user, product.id, 2).await.unwrap();

        assert_eq!(cart.total_price(), Money::from_cents(2000));
        assert!(cart.is_persisted());
        let stored = store.get_cart(user).await.unwrap().unwrap();
        assert_eq!(stored, cart);
    }

    #[tokio::test]
    async fn upsert_unknown_product_is_not_found() {
        let (service, _, _) = setup(5).await;

        let err = service
            .upsert_item(UserId::new(), ProductId::new(), 1)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn upsert_over_stock_leaves_cart_unchanged() {
        let (service, store, product) = setup(2).await;
        let user = UserId::new();
        let before = service.upsert_item(user, product.id, 1).await.unwrap();

        let err = service.upsert_item(user, product.id, 3).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InsufficientStock);
        assert_eq!(store.get_cart(user).await.unwrap().unwrap(), before);
    }

    #[tokio::test]
    async fn remove_without_cart_is_not_found() {
        let (service, _, product) = setup(2).await;

        let err = service
            .remove_item(UserId::new(), product.id)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn remove_absent_product_keeps_items() {
        let (service, _, product) = setup(2).await;
        let user = UserId::new();
        let before = service.upsert_item(user, product.id, 2).await.unwrap();

        let after = service.remove_item(user, ProductId::new()).await.unwrap();

        assert_eq!(after.items(), before.items());
        assert_eq!(after.total_price(), before.total_price());
    }
}
