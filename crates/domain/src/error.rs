//! Domain error types.

use thiserror::Error;

use crate::account::AccountError;
use crate::cart::CartError;
use crate::catalog::CatalogError;
use crate::order::OrderError;

/// Errors raised by domain rules.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A catalog rule was violated.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// A cart rule was violated.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// An order rule was violated.
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// An account rule was violated.
    #[error("Account error: {0}")]
    Account(#[from] AccountError),
}
