//! User accounts.

use chrono::{DateTime, Utc};
use common::UserId;
use thiserror::Error;

use crate::value_objects::ShippingAddress;

/// Errors that can occur when validating account data.
#[derive(Debug, Error)]
pub enum AccountError {
    #[error("Name must not be blank")]
    BlankName,

    #[error("Please enter a valid email address")]
    InvalidEmail,

    #[error("Password must not be empty")]
    EmptyPassword,

    /// Shipping address has an empty field.
    #[error("Shipping address field '{field}' must not be blank")]
    IncompleteAddress { field: &'static str },

    /// An admin tried to delete their own account.
    #[error("Cannot delete yourself as an admin")]
    SelfDeletion,
}

/// A registered account.
///
/// `password_hash` is a PHC-format hash string; the plaintext is never kept.
#[derive(Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub name: String,

    /// Trimmed, lower-cased and unique across accounts.
    pub email: String,

    pub password_hash: String,
    pub is_admin: bool,
    pub shipping_address: Option<ShippingAddress>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("email", &self.email)
            .field("is_admin", &self.is_admin)
            .finish_non_exhaustive()
    }
}

impl User {
    /// Creates a new account from already-validated fields.
    pub fn new(name: impl Into<String>, email: impl Into<String>, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: UserId::new(),
            name: name.into(),
            email: email.into(),
            password_hash,
            is_admin: false,
            shipping_address: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns the identity used for access checks.
    pub fn requester(&self) -> Requester {
        Requester {
            user_id: self.id,
            is_admin: self.is_admin,
        }
    }

    /// Updates the editable profile fields.
    pub fn update_profile(
        &mut self,
        name: Option<String>,
        shipping_address: Option<ShippingAddress>,
    ) -> Result<(), AccountError> {
        if let Some(name) = &name {
            validate_name(name)?;
        }
        if let Some(address) = &shipping_address
            && let Some(field) = address.first_blank_field()
        {
            return Err(AccountError::IncompleteAddress { field });
        }

        if let Some(name) = name {
            self.name = name.trim().to_string();
        }
        if shipping_address.is_some() {
            self.shipping_address = shipping_address;
        }
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// The authenticated caller of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Requester {
    pub user_id: UserId,
    pub is_admin: bool,
}

impl Requester {
    /// Returns true if the requester is `owner` or an administrator.
    pub fn is_owner_or_admin(&self, owner: UserId) -> bool {
        self.is_admin || self.user_id == owner
    }
}

/// Rejects blank display names.
pub fn validate_name(name: &str) -> Result<(), AccountError> {
    if name.trim().is_empty() {
        return Err(AccountError::BlankName);
    }
    Ok(())
}

/// Trims and lower-cases an email, rejecting anything not shaped like
/// `local@domain.tld`.
pub fn normalize_email(email: &str) -> Result<String, AccountError> {
    let email = email.trim().to_lowercase();

    let (local, domain) = email.split_once('@').ok_or(AccountError::InvalidEmail)?;
    let has_dot_inside = domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len());

    if local.is_empty() || !has_dot_inside || email.chars().any(char::is_whitespace) {
        return Err(AccountError::InvalidEmail);
    }

    Ok(email)
}
