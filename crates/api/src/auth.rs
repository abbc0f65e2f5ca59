//! Bearer-token extractors.
//!
//! ```rust,ignore
//! async fn handler(CurrentUser(user): CurrentUser) -> impl IntoResponse {
//!     format!("Hello, {}!", user.name)
//! }
//! ```

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use domain::{Requester, User};
use services::require_admin;
use store::Store;

use crate::error::ApiError;
use crate::routes::AppState;

/// Extractor that requires a valid bearer token.
pub struct CurrentUser(pub User);

impl CurrentUser {
    pub fn requester(&self) -> Requester {
        self.0.requester()
    }
}

/// Extractor that requires a valid bearer token for an administrator.
pub struct AdminUser(pub User);

impl AdminUser {
    pub fn requester(&self) -> Requester {
        self.0.requester()
    }
}

fn bearer_token(parts: &Parts) -> Result<&str, ApiError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ApiError::Unauthenticated("Not authorized, no token".to_string()))?;

    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ApiError::Unauthenticated("Not authorized, no token".to_string()))
}

impl<S> FromRequestParts<Arc<AppState<S>>> for CurrentUser
where
    S: Store + 'static,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState<S>>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let user = state.accounts.authenticate(token).await?;
        Ok(Self(user))
    }
}

impl<S> FromRequestParts<Arc<AppState<S>>> for AdminUser
where
    S: Store + 'static,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState<S>>,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        require_admin(&user.requester())?;
        Ok(Self(user))
    }
}
