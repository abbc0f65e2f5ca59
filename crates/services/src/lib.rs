//! Storefront application services.
//!
//! Each service wraps a [`store::Store`] and exposes one area of the shop:
//!
//! - [`CatalogService`]: product search and administrative edits
//! - [`CartService`]: per-user cart mutations with stock checks
//! - [`CheckoutService`]: atomic cart-to-order conversion
//! - [`OrderService`]: order lookups and paid/delivered transitions
//! - [`AccountService`]: registration, login and account administration

pub mod accounts;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod error;
pub mod orders;

pub use accounts::{AccountService, AuthSession, ProfileUpdate, require_admin};
pub use auth::{Claims, TokenSigner};
pub use cart::CartService;
pub use catalog::CatalogService;
pub use checkout::CheckoutService;
pub use error::{ErrorKind, Result, ServiceError};
pub use orders::OrderService;
