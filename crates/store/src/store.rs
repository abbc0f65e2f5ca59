use async_trait::async_trait;
use common::{OrderId, ProductId, UserId, Version};
use domain::{Cart, Order, Product, User};

use crate::{OrderQuery, ProductQuery, Result};

/// Core trait for store implementations.
///
/// Every method is a single atomic operation against the backing store.
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait Store: Send + Sync {
    /// Inserts a new product.
    async fn insert_product(&self, product: &Product) -> Result<()>;

    /// Replaces an existing product.
    ///
    /// Fails with `ProductNotFound` if no product has this ID.
    async fn update_product(&self, product: &Product) -> Result<()>;

    /// Deletes a product. Returns false if it did not exist.
    async fn delete_product(&self, product_id: ProductId) -> Result<bool>;

    /// Retrieves a product by ID.
    async fn get_product(&self, product_id: ProductId) -> Result<Option<Product>>;

    /// Retrieves all products matching a query, oldest first.
    async fn find_products(&self, query: &ProductQuery) -> Result<Vec<Product>>;

    /// Retrieves a user's cart, if one was ever saved.
    async fn get_cart(&self, user_id: UserId) -> Result<Option<Cart>>;

    /// Writes a cart, creating it on first save.
    ///
    /// `cart.version()` is the version the caller read. The write fails with
    /// `ConcurrencyConflict` if the stored version differs (a cart that was
    /// never saved is at `Version::initial()`).
    ///
    /// Returns the new version.
    async fn save_cart(&self, cart: &Cart) -> Result<Version>;

    /// Deletes a user's cart. Returns false if there was none.
    async fn delete_cart(&self, user_id: UserId) -> Result<bool>;

    /// Commits a checkout as one all-or-nothing operation.
    ///
    /// Every referenced product must exist and have at least the requested
    /// quantity (summed across duplicate lines) in stock. Only when all
    /// lines pass is stock decremented, the owner's cart deleted and the
    /// order inserted. On error nothing is changed.
    async fn place_order(&self, order: &Order) -> Result<()>;

    /// Retrieves an order by ID.
    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>>;

    /// Retrieves all orders matching a query, oldest first.
    async fn find_orders(&self, query: &OrderQuery) -> Result<Vec<Order>>;

    /// Merges the paid/delivered status of `order` into the stored order
    /// and returns the stored result.
    ///
    /// Only status fields are written, and a flag that is already set is
    /// never cleared, so concurrent transitions do not overwrite each other.
    /// Fails with `OrderNotFound` if the order was never placed.
    async fn save_order_status(&self, order: &Order) -> Result<Order>;

    /// Inserts a new account.
    ///
    /// Fails with `DuplicateEmail` if the email is already registered.
    async fn insert_user(&self, user: &User) -> Result<()>;

    /// Replaces an existing account.
    async fn update_user(&self, user: &User) -> Result<()>;

    /// Deletes an account. Returns false if it did not exist.
    async fn delete_user(&self, user_id: UserId) -> Result<bool>;

    /// Retrieves an account by ID.
    async fn get_user(&self, user_id: UserId) -> Result<Option<User>>;

    /// Retrieves an account by its normalized email.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Retrieves all accounts, oldest first.
    async fn list_users(&self) -> Result<Vec<User>>;
}

/// Extension trait providing convenience methods for stores.
#[async_trait]
pub trait StoreExt: Store {
    /// Returns the user's cart, or an empty unsaved cart if none exists.
    async fn get_cart_or_empty(&self, user_id: UserId) -> Result<Cart> {
        Ok(self
            .get_cart(user_id)
            .await?
            .unwrap_or_else(|| Cart::empty(user_id)))
    }

    /// Checks if a product exists.
    async fn product_exists(&self, product_id: ProductId) -> Result<bool> {
        Ok(self.get_product(product_id).await?.is_some())
    }

    /// Checks if an email is already registered.
    async fn email_taken(&self, email: &str) -> Result<bool> {
        Ok(self.find_user_by_email(email).await?.is_some())
    }
}

// Blanket implementation for all Store implementations
impl<T: Store + ?Sized> StoreExt for T {}
