use async_trait::async_trait;
use chrono::Utc;
use common::{OrderId, ProductId, UserId, Version};
use domain::{Cart, Money, Order, Product, ShippingAddress, User};
use sqlx::{
    PgPool, Row,
    postgres::{PgPoolOptions, PgRow},
};
use uuid::Uuid;

use crate::{OrderQuery, ProductQuery, Result, Store, StoreError};

const PRODUCT_COLUMNS: &str = "id, created_by, name, image, brand, category, description, \
     rating, num_reviews, price_cents, count_in_stock, created_at, updated_at";

const USER_COLUMNS: &str =
    "id, name, email, password_hash, is_admin, shipping_address, created_at, updated_at";

/// PostgreSQL-backed store implementation.
///
/// Products and users are stored relationally. Carts and orders are stored
/// as JSONB documents next to the columns needed to query them.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a connection pool to `database_url`.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_product(row: PgRow) -> Result<Product> {
        Ok(Product {
            id: ProductId::from_uuid(row.try_get::<Uuid, _>("id")?),
            created_by: row
                .try_get::<Option<Uuid>, _>("created_by")?
                .map(UserId::from_uuid),
            name: row.try_get("name")?,
            image: row.try_get("image")?,
            brand: row.try_get("brand")?,
            category: row.try_get("category")?,
            description: row.try_get("description")?,
            rating: row.try_get("rating")?,
            num_reviews: to_u32(row.try_get("num_reviews")?, "num_reviews")?,
            price: Money::from_cents(row.try_get("price_cents")?),
            count_in_stock: to_u32(row.try_get("count_in_stock")?, "count_in_stock")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_user(row: PgRow) -> Result<User> {
        let shipping_address = row
            .try_get::<Option<serde_json::Value>, _>("shipping_address")?
            .map(serde_json::from_value::<ShippingAddress>)
            .transpose()?;

        Ok(User {
            id: UserId::from_uuid(row.try_get::<Uuid, _>("id")?),
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            password_hash: row.try_get("password_hash")?,
            is_admin: row.try_get("is_admin")?,
            shipping_address,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_cart(row: PgRow) -> Result<Cart> {
        let document: serde_json::Value = row.try_get("document")?;
        let mut cart: Cart = serde_json::from_value(document)?;
        cart.set_version(Version::new(row.try_get("version")?));
        Ok(cart)
    }

    fn row_to_order(row: PgRow) -> Result<Order> {
        let document: serde_json::Value = row.try_get("document")?;
        Ok(serde_json::from_value(document)?)
    }

    async fn current_cart_version(&self, user_id: UserId) -> Result<Version> {
        let version: Option<i64> =
            sqlx::query_scalar("SELECT version FROM carts WHERE user_id = $1")
                .bind(user_id.as_uuid())
                .fetch_optional(&self.pool)
                .await?;
        Ok(version.map(Version::new).unwrap_or_else(Version::initial))
    }
}

fn to_u32(value: i64, column: &str) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| StoreError::InvalidData(format!("{column} out of range: {value}")))
}

/// Escapes LIKE wildcards so the keyword matches literally.
fn like_pattern(keyword: &str) -> String {
    let mut escaped = String::with_capacity(keyword.len() + 2);
    escaped.push('%');
    for c in keyword.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

fn map_email_conflict(e: sqlx::Error, email: &str) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.constraint() == Some("users_email_key")
    {
        return StoreError::DuplicateEmail(email.to_string());
    }
    StoreError::Database(e)
}

#[async_trait]
impl Store for PostgresStore {
    async fn insert_product(&self, product: &Product) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO products (id, created_by, name, image, brand, category, description,
                                  rating, num_reviews, price_cents, count_in_stock, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(product.created_by.map(|id| id.as_uuid()))
        .bind(&product.name)
        .bind(&product.image)
        .bind(&product.brand)
        .bind(&product.category)
        .bind(&product.description)
        .bind(product.rating)
        .bind(i64::from(product.num_reviews))
        .bind(product.price.cents())
        .bind(i64::from(product.count_in_stock))
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_product(&self, product: &Product) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET name = $2, image = $3, brand = $4, category = $5, description = $6,
                rating = $7, num_reviews = $8, price_cents = $9, count_in_stock = $10,
                updated_at = $11
            WHERE id = $1
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(&product.name)
        .bind(&product.image)
        .bind(&product.brand)
        .bind(&product.category)
        .bind(&product.description)
        .bind(product.rating)
        .bind(i64::from(product.num_reviews))
        .bind(product.price.cents())
        .bind(i64::from(product.count_in_stock))
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::ProductNotFound(product.id));
        }
        Ok(())
    }

    async fn delete_product(&self, product_id: ProductId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(product_id.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_product(&self, product_id: ProductId) -> Result<Option<Product>> {
        let row = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(product_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_product).transpose()
    }

    async fn find_products(&self, query: &ProductQuery) -> Result<Vec<Product>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {PRODUCT_COLUMNS}
            FROM products
            WHERE price_cents >= $1
              AND ($2::BIGINT IS NULL OR price_cents <= $2)
              AND ($3::TEXT IS NULL OR name ILIKE $3 ESCAPE '\')
            ORDER BY created_at ASC, id ASC
            "#
        ))
        .bind(query.lower_bound().cents())
        .bind(query.max_price.map(|price| price.cents()))
        .bind(query.keyword.as_deref().map(like_pattern))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_product).collect()
    }

    async fn get_cart(&self, user_id: UserId) -> Result<Option<Cart>> {
        let row = sqlx::query("SELECT document, version FROM carts WHERE user_id = $1")
            .bind(user_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_cart).transpose()
    }

    async fn save_cart(&self, cart: &Cart) -> Result<Version> {
        let user_id = cart.user_id();
        let expected = cart.version();
        let next = expected.next();
        let document = serde_json::to_value(cart)?;

        // A new cart inserts only if nobody else created one meanwhile; an
        // existing cart updates only if its version is unchanged.
        let result = if expected == Version::initial() {
            sqlx::query(
                r#"
                INSERT INTO carts (user_id, document, total_price_cents, version, updated_at)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (user_id) DO NOTHING
                "#,
            )
            .bind(user_id.as_uuid())
            .bind(&document)
            .bind(cart.total_price().cents())
            .bind(next.as_i64())
            .bind(cart.updated_at())
            .execute(&self.pool)
            .await?
        } else {
            sqlx::query(
                r#"
                UPDATE carts
                SET document = $2, total_price_cents = $3, version = $4, updated_at = $5
                WHERE user_id = $1 AND version = $6
                "#,
            )
            .bind(user_id.as_uuid())
            .bind(&document)
            .bind(cart.total_price().cents())
            .bind(next.as_i64())
            .bind(cart.updated_at())
            .bind(expected.as_i64())
            .execute(&self.pool)
            .await?
        };

        if result.rows_affected() == 0 {
            let actual = self.current_cart_version(user_id).await?;
            return Err(StoreError::ConcurrencyConflict {
                user_id,
                expected,
                actual,
            });
        }

        Ok(next)
    }

    async fn delete_cart(&self, user_id: UserId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM carts WHERE user_id = $1")
            .bind(user_id.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn place_order(&self, order: &Order) -> Result<()> {
        let mut quantities = order.quantities_by_product()?;
        // Row locks are taken in id order so concurrent checkouts cannot deadlock.
        quantities.sort_by_key(|(product_id, _)| *product_id);

        let mut tx = self.pool.begin().await?;
        let now = Utc::now();

        for (product_id, requested) in quantities {
            let remaining: Option<i64> = sqlx::query_scalar(
                r#"
                UPDATE products
                SET count_in_stock = count_in_stock - $2, updated_at = $3
                WHERE id = $1 AND count_in_stock >= $2
                RETURNING count_in_stock
                "#,
            )
            .bind(product_id.as_uuid())
            .bind(i64::from(requested))
            .bind(now)
            .fetch_optional(&mut *tx)
            .await?;

            if remaining.is_some() {
                continue;
            }

            // Dropping the transaction rolls back earlier decrements.
            tracing::debug!(%product_id, requested, "Stock decrement rejected");
            let row = sqlx::query("SELECT name, count_in_stock FROM products WHERE id = $1")
                .bind(product_id.as_uuid())
                .fetch_optional(&mut *tx)
                .await?;

            return Err(match row {
                None => StoreError::ProductNotFound(product_id),
                Some(row) => StoreError::InsufficientStock {
                    product_id,
                    product_name: row.try_get("name")?,
                    requested,
                    available: to_u32(row.try_get("count_in_stock")?, "count_in_stock")?,
                },
            });
        }

        sqlx::query("DELETE FROM carts WHERE user_id = $1")
            .bind(order.user_id().as_uuid())
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO orders (id, user_id, document, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(order.id().as_uuid())
        .bind(order.user_id().as_uuid())
        .bind(serde_json::to_value(order)?)
        .bind(order.created_at())
        .bind(order.updated_at())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::debug!(order_id = %order.id(), user_id = %order.user_id(), "Order committed");
        Ok(())
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query("SELECT document FROM orders WHERE id = $1")
            .bind(order_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_order).transpose()
    }

    async fn find_orders(&self, query: &OrderQuery) -> Result<Vec<Order>> {
        let rows = sqlx::query(
            r#"
            SELECT document
            FROM orders
            WHERE ($1::UUID IS NULL OR user_id = $1)
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(query.user_id.map(|id| id.as_uuid()))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_order).collect()
    }

    async fn save_order_status(&self, order: &Order) -> Result<Order> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT document FROM orders WHERE id = $1 FOR UPDATE")
            .bind(order.id().as_uuid())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(StoreError::OrderNotFound(order.id()))?;

        let mut stored = Self::row_to_order(row)?;
        stored.merge_status(order);

        sqlx::query("UPDATE orders SET document = $2, updated_at = $3 WHERE id = $1")
            .bind(stored.id().as_uuid())
            .bind(serde_json::to_value(&stored)?)
            .bind(stored.updated_at())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(stored)
    }

    async fn insert_user(&self, user: &User) -> Result<()> {
        let shipping_address = user
            .shipping_address
            .as_ref()
            .map(serde_json::to_value)
            .transpose()?;

        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, password_hash, is_admin, shipping_address, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.is_admin)
        .bind(shipping_address)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_email_conflict(e, &user.email))?;

        Ok(())
    }

    async fn update_user(&self, user: &User) -> Result<()> {
        let shipping_address = user
            .shipping_address
            .as_ref()
            .map(serde_json::to_value)
            .transpose()?;

        let result = sqlx::query(
            r#"
            UPDATE users
            SET name = $2, email = $3, password_hash = $4, is_admin = $5,
                shipping_address = $6, updated_at = $7
            WHERE id = $1
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.is_admin)
        .bind(shipping_address)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_email_conflict(e, &user.email))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::UserNotFound(user.id));
        }
        Ok(())
    }

    async fn delete_user(&self, user_id: UserId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_user(&self, user_id: UserId) -> Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(user_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_user).transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_user).transpose()
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let rows = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at ASC, id ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_user).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("phone"), "%phone%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
    }

    #[test]
    fn to_u32_rejects_negative() {
        assert_eq!(to_u32(5, "count").unwrap(), 5);
        assert!(matches!(
            to_u32(-1, "count"),
            Err(StoreError::InvalidData(_))
        ));
    }
}
