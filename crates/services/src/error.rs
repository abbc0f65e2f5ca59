//! Service error types.

use std::fmt;

use domain::{AccountError, CartError, CatalogError, DomainError, OrderError};
use store::StoreError;
use thiserror::Error;

/// Errors that can occur in service operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// A referenced document does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The caller is authenticated but not allowed to do this.
    #[error("Not authorized: {0}")]
    Unauthorized(String),

    /// The caller could not be identified.
    #[error("{0}")]
    Unauthenticated(String),

    /// The request itself is malformed.
    #[error("{0}")]
    Validation(String),

    /// Domain rule violation.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Store error.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Password hashing failed.
    #[error("Password hashing failed: {0}")]
    PasswordHash(String),

    /// Any other unexpected failure.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Creates a `NotFound` error for the given entity name and ID.
    pub fn not_found(entity: &'static str, id: impl fmt::Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Classifies this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Unauthorized(_) => ErrorKind::Unauthorized,
            Self::Unauthenticated(_) => ErrorKind::Unauthenticated,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Domain(e) => match e {
                DomainError::Cart(CartError::InsufficientStock { .. }) => {
                    ErrorKind::InsufficientStock
                }
                DomainError::Order(OrderError::NoItems) => ErrorKind::EmptyOrder,
                DomainError::Order(OrderError::NotPermitted { .. }) => ErrorKind::Unauthorized,
                _ => ErrorKind::Validation,
            },
            Self::Store(e) => match e {
                StoreError::ProductNotFound(_)
                | StoreError::OrderNotFound(_)
                | StoreError::UserNotFound(_) => ErrorKind::NotFound,
                StoreError::InsufficientStock { .. } => ErrorKind::InsufficientStock,
                StoreError::InvalidOrder(_) => ErrorKind::Validation,
                StoreError::ConcurrencyConflict { .. } | StoreError::DuplicateEmail(_) => {
                    ErrorKind::Conflict
                }
                StoreError::InvalidData(_)
                | StoreError::Database(_)
                | StoreError::Migration(_)
                | StoreError::Serialization(_) => ErrorKind::Internal,
            },
            Self::PasswordHash(_) | Self::Internal(_) => ErrorKind::Internal,
        }
    }
}

impl From<CatalogError> for ServiceError {
    fn from(e: CatalogError) -> Self {
        Self::Domain(e.into())
    }
}

impl From<CartError> for ServiceError {
    fn from(e: CartError) -> Self {
        Self::Domain(e.into())
    }
}

impl From<OrderError> for ServiceError {
    fn from(e: OrderError) -> Self {
        Self::Domain(e.into())
    }
}

impl From<AccountError> for ServiceError {
    fn from(e: AccountError) -> Self {
        Self::Domain(e.into())
    }
}

/// Coarse classification of a [`ServiceError`], used for status codes and
/// metric labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    InsufficientStock,
    EmptyOrder,
    Unauthorized,
    Unauthenticated,
    Validation,
    Conflict,
    Internal,
}

impl ErrorKind {
    /// Returns a stable snake_case label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::InsufficientStock => "insufficient_stock",
            Self::EmptyOrder => "empty_order",
            Self::Unauthorized => "unauthorized",
            Self::Unauthenticated => "unauthenticated",
            Self::Validation => "validation",
            Self::Conflict => "conflict",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Convenience type alias for service results.
pub type Result<T> = std::result::Result<T, ServiceError>;
