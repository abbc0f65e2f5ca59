//! Account registration, login and administration.

use common::UserId;
use domain::{AccountError, Requester, ShippingAddress, User, normalize_email, validate_name};
use store::Store;

use crate::auth::{TokenSigner, hash_password, verify_password};
use crate::error::{Result, ServiceError};

const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// An account together with a freshly issued bearer token.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user: User,
    pub token: String,
}

/// Editable profile fields. `None` leaves a field unchanged.
#[derive(Default, Clone)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub shipping_address: Option<ShippingAddress>,
}

/// Fails unless the requester is an administrator.
pub fn require_admin(requester: &Requester) -> Result<()> {
    if !requester.is_admin {
        return Err(ServiceError::Unauthorized(
            "administrator access required".to_string(),
        ));
    }
    Ok(())
}

/// Service for accounts and credentials.
pub struct AccountService<S: Store> {
    store: S,
    tokens: TokenSigner,
}

impl<S: Store> AccountService<S> {
    /// Creates a new account service.
    pub fn new(store: S, tokens: TokenSigner) -> Self {
        Self { store, tokens }
    }

    /// Returns the token signer.
    pub fn tokens(&self) -> &TokenSigner {
        &self.tokens
    }

    /// Registers a customer account and signs it in.
    #[tracing::instrument(skip(self, password))]
    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<AuthSession> {
        let user = self.new_user(name, email, password)?;
        self.store.insert_user(&user).await?;

        metrics::counter!("accounts_registered_total").increment(1);
        tracing::info!(user_id = %user.id, "account registered");

        self.session(user)
    }

    /// Checks credentials and issues a token.
    ///
    /// Unknown emails and wrong passwords fail the same way.
    #[tracing::instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession> {
        let invalid = || ServiceError::Unauthenticated(INVALID_CREDENTIALS.to_string());

        let email = normalize_email(email).map_err(|_| invalid())?;
        let user = self
            .store
            .find_user_by_email(&email)
            .await?
            .ok_or_else(invalid)?;

        if !verify_password(password, &user.password_hash) {
            tracing::warn!(user_id = %user.id, "login failed");
            return Err(invalid());
        }

        self.session(user)
    }

    /// Resolves a bearer token to the account it was issued for.
    ///
    /// A valid token for an account that no longer exists is rejected.
    #[tracing::instrument(skip_all)]
    pub async fn authenticate(&self, token: &str) -> Result<User> {
        let user_id = self.tokens.verify(token)?;
        self.store
            .get_user(user_id)
            .await?
            .ok_or_else(|| ServiceError::Unauthenticated("Not authorized, user not found".into()))
    }

    /// Returns the requester's own account.
    #[tracing::instrument(skip(self))]
    pub async fn get_profile(&self, requester: &Requester) -> Result<User> {
        self.load(requester.user_id).await
    }

    /// Updates the requester's own account.
    #[tracing::instrument(skip(self, update))]
    pub async fn update_profile(
        &self,
        requester: &Requester,
        update: ProfileUpdate,
    ) -> Result<User> {
        let mut user = self.load(requester.user_id).await?;

        let email = update.email.as_deref().map(normalize_email).transpose()?;
        let password_hash = match update.password.as_deref() {
            Some("") => return Err(AccountError::EmptyPassword.into()),
            Some(password) => Some(hash_password(password)?),
            None => None,
        };

        user.update_profile(update.name, update.shipping_address)?;
        if let Some(email) = email {
            user.email = email;
        }
        if let Some(hash) = password_hash {
            user.password_hash = hash;
        }

        self.store.update_user(&user).await?;
        Ok(user)
    }

    /// Lists every account. Administrators only.
    #[tracing::instrument(skip(self))]
    pub async fn list_accounts(&self, requester: &Requester) -> Result<Vec<User>> {
        require_admin(requester)?;
        Ok(self.store.list_users().await?)
    }

    /// Deletes an account. Administrators only, and not their own.
    #[tracing::instrument(skip(self))]
    pub async fn delete_account(&self, requester: &Requester, user_id: UserId) -> Result<()> {
        require_admin(requester)?;
        if requester.user_id == user_id {
            return Err(AccountError::SelfDeletion.into());
        }

        if !self.store.delete_user(user_id).await? {
            return Err(ServiceError::not_found("User", user_id));
        }

        tracing::info!(%user_id, deleted_by = %requester.user_id, "account deleted");
        Ok(())
    }

    /// Makes sure an administrator with this email exists.
    ///
    /// An existing account with the email is promoted; its password is left
    /// alone. Otherwise a new admin account is created.
    #[tracing::instrument(skip(self, password))]
    pub async fn ensure_admin(&self, name: &str, email: &str, password: &str) -> Result<User> {
        let normalized = normalize_email(email)?;

        if let Some(mut user) = self.store.find_user_by_email(&normalized).await? {
            if !user.is_admin {
                user.is_admin = true;
                self.store.update_user(&user).await?;
                tracing::info!(user_id = %user.id, "existing account promoted to admin");
            }
            return Ok(user);
        }

        let mut user = self.new_user(name, email, password)?;
        user.is_admin = true;
        self.store.insert_user(&user).await?;
        tracing::info!(user_id = %user.id, "admin account created");
        Ok(user)
    }

    fn new_user(&self, name: &str, email: &str, password: &str) -> Result<User> {
        validate_name(name)?;
        let email = normalize_email(email)?;
        if password.is_empty() {
            return Err(AccountError::EmptyPassword.into());
        }

        Ok(User::new(name.trim(), email, hash_password(password)?))
    }

    fn session(&self, user: User) -> Result<AuthSession> {
        let token = self.tokens.issue(user.id)?;
        Ok(AuthSession { user, token })
    }

    async fn load(&self, user_id: UserId) -> Result<User> {
        self.store
            .get_user(user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("User", user_id))
    }
}
