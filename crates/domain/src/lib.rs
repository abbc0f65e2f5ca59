//! Domain layer for the storefront.
//!
//! This crate holds the documents the store persists and the rules that
//! keep them consistent:
//! - `Product` catalog records with live stock counts
//! - the per-user `Cart` aggregate with its derived total
//! - the `Order` snapshot and its two one-way status flags
//! - `User` accounts and the `Requester` used for access checks
//!
//! Nothing here performs I/O; the `store` and `services` crates drive it.

pub mod account;
pub mod cart;
pub mod catalog;
pub mod error;
pub mod order;
pub mod value_objects;

pub use account::{AccountError, Requester, User, normalize_email, validate_name};
pub use cart::{Cart, CartError, CartItem};
pub use catalog::{CatalogError, Product, ProductUpdate};
pub use common::{OrderId, ProductId, UserId, Version};
pub use error::DomainError;
pub use order::{Order, OrderDraft, OrderError, OrderItem, PaymentResult};
pub use value_objects::{Money, ShippingAddress};
