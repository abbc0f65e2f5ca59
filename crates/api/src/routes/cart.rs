//! Cart endpoints. Every route acts on the caller's own cart.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use common::ProductId;
use domain::{Cart, CartItem};
use serde::{Deserialize, Serialize};
use store::Store;

use super::{AppState, parse_id};
use crate::auth::CurrentUser;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct UpsertItemRequest {
    pub product_id: String,
    pub qty: u32,
}

#[derive(Debug, Serialize)]
pub struct CartItemResponse {
    pub product_id: String,
    pub name: String,
    pub image: String,
    pub price_cents: i64,
    pub qty: u32,
}

impl From<&CartItem> for CartItemResponse {
    fn from(item: &CartItem) -> Self {
        Self {
            product_id: item.product_id.to_string(),
            name: item.name.clone(),
            image: item.image.clone(),
            price_cents: item.price.cents(),
            qty: item.qty,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CartResponse {
    pub user_id: String,
    pub items: Vec<CartItemResponse>,
    pub total_price_cents: i64,
}

impl From<Cart> for CartResponse {
    fn from(cart: Cart) -> Self {
        Self {
            user_id: cart.user_id().to_string(),
            items: cart.items().iter().map(CartItemResponse::from).collect(),
            total_price_cents: cart.total_price().cents(),
        }
    }
}

/// GET /cart: the caller's cart, empty if they have none.
#[tracing::instrument(skip(state, user))]
pub async fn get<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
) -> Result<Json<CartResponse>, ApiError> {
    let cart = state.carts.get_cart(user.0.id).await?;
    Ok(Json(cart.into()))
}

/// POST /cart: set the quantity of a product in the cart.
#[tracing::instrument(skip(state, user, body))]
pub async fn upsert<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
    body: Result<Json<UpsertItemRequest>, JsonRejection>,
) -> Result<Json<CartResponse>, ApiError> {
    let Json(req) = body?;
    let product_id = parse_id(&req.product_id, ProductId::parse)?;
    let cart = state
        .carts
        .upsert_item(user.0.id, product_id, req.qty)
        .await?;
    Ok(Json(cart.into()))
}

/// DELETE /cart/{product_id}: drop a product from the cart.
#[tracing::instrument(skip(state, user))]
pub async fn remove<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
    Path(product_id): Path<String>,
) -> Result<Json<CartResponse>, ApiError> {
    let product_id = parse_id(&product_id, ProductId::parse)?;
    let cart = state.carts.remove_item(user.0.id, product_id).await?;
    Ok(Json(cart.into()))
}
