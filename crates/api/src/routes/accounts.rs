//! Registration, login, profile and account administration endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::UserId;
use domain::{ShippingAddress, User};
use serde::{Deserialize, Serialize};
use services::{AuthSession, ProfileUpdate};
use store::Store;

use super::{AppState, parse_id};
use crate::auth::{AdminUser, CurrentUser};
use crate::error::ApiError;

// -- Request types --

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Default, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub shipping_address: Option<ShippingAddress>,
}

impl From<UpdateProfileRequest> for ProfileUpdate {
    fn from(req: UpdateProfileRequest) -> Self {
        ProfileUpdate {
            name: req.name,
            email: req.email,
            password: req.password,
            shipping_address: req.shipping_address,
        }
    }
}

// -- Response types --

#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub is_admin: bool,
    pub shipping_address: Option<ShippingAddress>,
}

impl From<User> for AccountResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id.to_string(),
            name: user.name,
            email: user.email,
            is_admin: user.is_admin,
            shipping_address: user.shipping_address,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    #[serde(flatten)]
    pub account: AccountResponse,
    pub token: String,
}

impl From<AuthSession> for SessionResponse {
    fn from(session: AuthSession) -> Self {
        Self {
            account: session.user.into(),
            token: session.token,
        }
    }
}

// -- Handlers --

/// POST /accounts: register and sign in.
#[tracing::instrument(skip_all)]
pub async fn register<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SessionResponse>), ApiError> {
    let Json(req) = body?;
    let session = state
        .accounts
        .register(&req.name, &req.email, &req.password)
        .await?;
    Ok((StatusCode::CREATED, Json(session.into())))
}

/// POST /accounts/login: exchange credentials for a token.
#[tracing::instrument(skip_all)]
pub async fn login<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<SessionResponse>, ApiError> {
    let Json(req) = body?;
    let session = state.accounts.login(&req.email, &req.password).await?;
    Ok(Json(session.into()))
}

/// GET /accounts/profile: the caller's own account.
#[tracing::instrument(skip_all)]
pub async fn profile<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
) -> Result<Json<AccountResponse>, ApiError> {
    let user = state.accounts.get_profile(&user.requester()).await?;
    Ok(Json(user.into()))
}

/// PUT /accounts/profile: edit the caller's own account.
#[tracing::instrument(skip_all)]
pub async fn update_profile<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
    body: Result<Json<UpdateProfileRequest>, JsonRejection>,
) -> Result<Json<AccountResponse>, ApiError> {
    let Json(req) = body?;
    let user = state
        .accounts
        .update_profile(&user.requester(), req.into())
        .await?;
    Ok(Json(user.into()))
}

/// GET /accounts: every account. Admin only.
#[tracing::instrument(skip_all)]
pub async fn list<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    admin: AdminUser,
) -> Result<Json<Vec<AccountResponse>>, ApiError> {
    let users = state.accounts.list_accounts(&admin.requester()).await?;
    Ok(Json(users.into_iter().map(AccountResponse::from).collect()))
}

/// DELETE /accounts/{id}: remove an account. Admin only.
#[tracing::instrument(skip(state, admin))]
pub async fn delete<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    admin: AdminUser,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user_id = parse_id(&id, UserId::parse)?;
    state
        .accounts
        .delete_account(&admin.requester(), user_id)
        .await?;
    Ok(Json(serde_json::json!({ "message": "User removed" })))
}
