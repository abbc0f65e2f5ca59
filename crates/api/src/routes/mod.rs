//! HTTP route handlers and the shared application state.

pub mod accounts;
pub mod cart;
pub mod catalog;
pub mod health;
pub mod metrics;
pub mod orders;

use services::{AccountService, CartService, CatalogService, CheckoutService, OrderService};
use store::Store;

/// Shared application state accessible from all handlers.
pub struct AppState<S: Store> {
    pub catalog: CatalogService<S>,
    pub carts: CartService<S>,
    pub checkout: CheckoutService<S>,
    pub orders: OrderService<S>,
    pub accounts: AccountService<S>,
    /// Hide internal error detail from clients.
    pub redact_internal_errors: bool,
}

/// Parses an identifier from a path segment.
pub(crate) fn parse_id<T, E: std::fmt::Display>(
    raw: &str,
    parse: impl FnOnce(&str) -> Result<T, E>,
) -> Result<T, crate::error::ApiError> {
    parse(raw).map_err(|e| crate::error::ApiError::BadRequest(format!("Invalid ID format: {e}")))
}
