//! Order aggregate and related types.

mod aggregate;

pub use aggregate::{Order, OrderDraft, OrderItem, PaymentResult};

use common::ProductId;
use thiserror::Error;

/// Errors that can occur during order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// Order has no items.
    #[error("No order items")]
    NoItems,

    /// Invalid quantity.
    #[error("Invalid quantity for {product_id}: {quantity} (must be greater than 0)")]
    InvalidQuantity { product_id: ProductId, quantity: u32 },

    /// Duplicate lines for one product add up to more units than can be counted.
    #[error("Total quantity for {product_id} is too large")]
    QuantityTooLarge { product_id: ProductId },

    /// A price field is negative.
    #[error("Invalid {field}: {price} (must not be negative)")]
    InvalidPrice { field: &'static str, price: i64 },

    /// A price, or the sum of the line totals, is too large to represent.
    #[error("Invalid {field}: amount is too large")]
    AmountTooLarge { field: &'static str },

    /// Shipping address has an empty field.
    #[error("Shipping address field '{field}' must not be blank")]
    IncompleteAddress { field: &'static str },

    /// No payment method tag given.
    #[error("Payment method is required")]
    PaymentMethodRequired,

    /// The requester may not perform this action on the order.
    #[error("Not authorized to {action} this order")]
    NotPermitted { action: &'static str },
}
