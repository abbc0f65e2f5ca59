//! Cart aggregate and related types.

mod aggregate;

pub use aggregate::{Cart, CartItem};

use common::ProductId;
use thiserror::Error;

/// Errors that can occur during cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// Quantity must be at least one.
    #[error("Invalid quantity: {quantity} (must be greater than 0)")]
    InvalidQuantity { quantity: u32 },

    /// Requested quantity exceeds the product's live stock.
    #[error("Not enough stock for {product_name}. Available: {available}, requested: {requested}")]
    InsufficientStock {
        product_id: ProductId,
        product_name: String,
        requested: u32,
        available: u32,
    },

    /// The cart total would not fit in cents.
    #[error("Cart total is too large")]
    TotalTooLarge,
}
