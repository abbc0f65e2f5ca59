//! Shared types for the storefront workspace.
//!
//! Every document kind gets its own identifier newtype so a product ID can
//! never be passed where an order ID is expected.

mod types;

pub use types::{OrderId, ProductId, UserId, Version};
