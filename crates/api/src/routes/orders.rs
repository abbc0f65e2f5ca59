//! Order placement, lookup and status endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::{OrderId, ProductId};
use domain::{Money, Order, OrderDraft, OrderItem, PaymentResult, ShippingAddress};
use serde::{Deserialize, Serialize};
use store::Store;

use super::{AppState, parse_id};
use crate::auth::{AdminUser, CurrentUser};
use crate::error::ApiError;

// -- Request types --

#[derive(Debug, Deserialize)]
pub struct PlaceOrderRequest {
    #[serde(default)]
    pub order_items: Vec<OrderItemRequest>,
    pub shipping_address: ShippingAddress,
    pub payment_method: String,
    #[serde(default)]
    pub tax_price_cents: i64,
    #[serde(default)]
    pub shipping_price_cents: i64,
    pub total_price_cents: i64,
    pub delivery_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OrderItemRequest {
    pub product_id: String,
    pub name: String,
    #[serde(default)]
    pub image: String,
    pub price_cents: i64,
    pub qty: u32,
}

impl PlaceOrderRequest {
    fn into_draft(self) -> Result<OrderDraft, ApiError> {
        let items = self
            .order_items
            .into_iter()
            .map(|item| {
                Ok(OrderItem {
                    product_id: parse_id(&item.product_id, ProductId::parse)?,
                    name: item.name,
                    image: item.image,
                    price: Money::from_cents(item.price_cents),
                    qty: item.qty,
                })
            })
            .collect::<Result<Vec<_>, ApiError>>()?;

        Ok(OrderDraft {
            items,
            shipping_address: self.shipping_address,
            payment_method: self.payment_method,
            tax_price: Money::from_cents(self.tax_price_cents),
            shipping_price: Money::from_cents(self.shipping_price_cents),
            total_price: Money::from_cents(self.total_price_cents),
            delivery_type: self.delivery_type,
        })
    }
}

// -- Response types --

#[derive(Debug, Serialize)]
pub struct OrderUserResponse {
    pub id: String,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct OrderItemResponse {
    pub product_id: String,
    pub name: String,
    pub image: String,
    pub price_cents: i64,
    pub qty: u32,
}

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub user: OrderUserResponse,
    pub order_items: Vec<OrderItemResponse>,
    pub shipping_address: ShippingAddress,
    pub payment_method: String,
    pub payment_result: Option<PaymentResult>,
    pub items_price_cents: i64,
    pub tax_price_cents: i64,
    pub shipping_price_cents: i64,
    pub total_price_cents: i64,
    pub delivery_type: Option<String>,
    pub is_paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub is_delivered: bool,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            id: order.id().to_string(),
            user: OrderUserResponse {
                id: order.user_id().to_string(),
                name: order.user_name().to_string(),
                email: order.user_email().to_string(),
            },
            order_items: order
                .items()
                .iter()
                .map(|item| OrderItemResponse {
                    product_id: item.product_id.to_string(),
                    name: item.name.clone(),
                    image: item.image.clone(),
                    price_cents: item.price.cents(),
                    qty: item.qty,
                })
                .collect(),
            shipping_address: order.shipping_address().clone(),
            payment_method: order.payment_method().to_string(),
            payment_result: order.payment_result().cloned(),
            items_price_cents: order.items_price().cents(),
            tax_price_cents: order.tax_price().cents(),
            shipping_price_cents: order.shipping_price().cents(),
            total_price_cents: order.total_price().cents(),
            delivery_type: order.delivery_type().map(String::from),
            is_paid: order.is_paid(),
            paid_at: order.paid_at(),
            is_delivered: order.is_delivered(),
            delivered_at: order.delivered_at(),
            created_at: order.created_at(),
            updated_at: order.updated_at(),
        }
    }
}

fn to_responses(orders: Vec<Order>) -> Vec<OrderResponse> {
    orders.into_iter().map(OrderResponse::from).collect()
}

// -- Handlers --

/// POST /orders: check out the submitted items.
#[tracing::instrument(skip(state, user, body))]
pub async fn create<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
    body: Result<Json<PlaceOrderRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let Json(req) = body?;
    let order = state
        .checkout
        .place_order(&user.0, req.into_draft()?)
        .await?;
    Ok((StatusCode::CREATED, Json(order.into())))
}

/// GET /orders/{id}: load an order owned by the caller, or any order for admins.
#[tracing::instrument(skip(state, user))]
pub async fn get<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_id(&id, OrderId::parse)?;
    let order = state.orders.get_order(&user.requester(), order_id).await?;
    Ok(Json(order.into()))
}

/// GET /orders/myorders: the caller's orders.
#[tracing::instrument(skip(state, user))]
pub async fn mine<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let orders = state.orders.list_my_orders(&user.requester()).await?;
    Ok(Json(to_responses(orders)))
}

/// GET /orders: every order. Admin only.
#[tracing::instrument(skip(state, admin))]
pub async fn list<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    admin: AdminUser,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let orders = state.orders.list_all_orders(&admin.requester()).await?;
    Ok(Json(to_responses(orders)))
}

/// PUT /orders/{id}/pay: record payment. Owner or admin.
#[tracing::instrument(skip(state, user, body))]
pub async fn pay<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
    Path(id): Path<String>,
    body: Result<Json<PaymentResult>, JsonRejection>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_id(&id, OrderId::parse)?;
    let Json(payment_result) = body?;
    let order = state
        .orders
        .mark_paid(&user.requester(), order_id, payment_result)
        .await?;
    Ok(Json(order.into()))
}

/// PUT /orders/{id}/deliver: mark delivered. Admin only.
#[tracing::instrument(skip(state, admin))]
pub async fn deliver<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    admin: AdminUser,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_id(&id, OrderId::parse)?;
    let order = state
        .orders
        .mark_delivered(&admin.requester(), order_id)
        .await?;
    Ok(Json(order.into()))
}
