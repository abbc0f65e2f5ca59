use common::{OrderId, ProductId, UserId, Version};
use domain::OrderError;
use thiserror::Error;

/// Errors that can occur when interacting with the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A referenced product does not exist.
    #[error("Product with ID {0} not found")]
    ProductNotFound(ProductId),

    /// The order to update does not exist.
    #[error("Order {0} not found")]
    OrderNotFound(OrderId),

    /// The account to update does not exist.
    #[error("User {0} not found")]
    UserNotFound(UserId),

    /// A conditional stock decrement found fewer units than requested.
    #[error("Not enough stock for {product_name}. Available: {available}, requested: {requested}")]
    InsufficientStock {
        product_id: ProductId,
        product_name: String,
        requested: u32,
        available: u32,
    },

    /// The order's lines cannot be turned into stock decrements.
    #[error(transparent)]
    InvalidOrder(#[from] OrderError),

    /// The cart changed since it was read.
    #[error(
        "Concurrency conflict for cart of user {user_id}: expected version {expected}, found {actual}"
    )]
    ConcurrencyConflict {
        user_id: UserId,
        expected: Version,
        actual: Version,
    },

    /// Another account already uses this email.
    #[error("User already exists: {0}")]
    DuplicateEmail(String),

    /// A stored value could not be mapped back to a document.
    #[error("Invalid stored data: {0}")]
    InvalidData(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
