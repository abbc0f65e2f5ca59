//! Persistence for the storefront documents.
//!
//! The [`Store`] trait is the only way the services touch data. Two
//! implementations are provided: [`InMemoryStore`] for tests and
//! database-less runs, and [`PostgresStore`] backed by sqlx.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod store;

pub use common::Version;
pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use query::{OrderQuery, ProductQuery};
pub use store::{Store, StoreExt};
