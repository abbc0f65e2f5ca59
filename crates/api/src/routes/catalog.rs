//! Catalog endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::ProductId;
use domain::{Money, Product, ProductUpdate};
use serde::{Deserialize, Serialize};
use store::{ProductQuery, Store};

use super::{AppState, parse_id};
use crate::auth::AdminUser;
use crate::error::ApiError;

// -- Request types --

#[derive(Debug, Deserialize)]
pub struct ListProductsParams {
    pub keyword: Option<String>,
    pub min_price_cents: Option<i64>,
    pub max_price_cents: Option<i64>,
}

impl ListProductsParams {
    fn into_query(self) -> Result<ProductQuery, ApiError> {
        let mut query = ProductQuery::new();
        if let Some(keyword) = self.keyword {
            query = query.keyword(keyword);
        }
        if let Some(min) = self.min_price_cents {
            query = query.min_price(price_bound("min_price_cents", min)?);
        }
        if let Some(max) = self.max_price_cents {
            query = query.max_price(price_bound("max_price_cents", max)?);
        }
        Ok(query)
    }
}

fn price_bound(name: &str, cents: i64) -> Result<Money, ApiError> {
    if cents < 0 {
        return Err(ApiError::BadRequest(format!("{name} must not be negative")));
    }
    Ok(Money::from_cents(cents))
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub price_cents: Option<i64>,
    pub image: Option<String>,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub count_in_stock: Option<u32>,
}

impl From<UpdateProductRequest> for ProductUpdate {
    fn from(req: UpdateProductRequest) -> Self {
        ProductUpdate {
            name: req.name,
            price: req.price_cents.map(Money::from_cents),
            image: req.image,
            brand: req.brand,
            category: req.category,
            description: req.description,
            count_in_stock: req.count_in_stock,
        }
    }
}

// -- Response types --

#[derive(Debug, Serialize)]
pub struct ProductResponse {
    pub id: String,
    pub created_by: Option<String>,
    pub name: String,
    pub image: String,
    pub brand: String,
    pub category: String,
    pub description: String,
    pub rating: f64,
    pub num_reviews: u32,
    pub price_cents: i64,
    pub count_in_stock: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Product> for ProductResponse {
    fn from(product: Product) -> Self {
        Self {
            id: product.id.to_string(),
            created_by: product.created_by.map(|id| id.to_string()),
            name: product.name,
            image: product.image,
            brand: product.brand,
            category: product.category,
            description: product.description,
            rating: product.rating,
            num_reviews: product.num_reviews,
            price_cents: product.price.cents(),
            count_in_stock: product.count_in_stock,
            created_at: product.created_at,
            updated_at: product.updated_at,
        }
    }
}

// -- Handlers --

/// GET /catalog: search products by keyword and price range.
#[tracing::instrument(skip(state, params))]
pub async fn list<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    params: Result<Query<ListProductsParams>, QueryRejection>,
) -> Result<Json<Vec<ProductResponse>>, ApiError> {
    let Query(params) = params?;
    let products = state.catalog.list_products(&params.into_query()?).await?;
    Ok(Json(products.into_iter().map(ProductResponse::from).collect()))
}

/// GET /catalog/{id}: load a single product.
#[tracing::instrument(skip(state))]
pub async fn get<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<ProductResponse>, ApiError> {
    let product_id = parse_id(&id, ProductId::parse)?;
    let product = state.catalog.get_product(product_id).await?;
    Ok(Json(product.into()))
}

/// POST /catalog: create a placeholder product. Admin only.
#[tracing::instrument(skip(state, admin))]
pub async fn create<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    admin: AdminUser,
) -> Result<(StatusCode, Json<ProductResponse>), ApiError> {
    let product = state
        .catalog
        .create_sample_product(&admin.requester())
        .await?;
    Ok((StatusCode::CREATED, Json(product.into())))
}

/// PUT /catalog/{id}: edit a product. Admin only.
#[tracing::instrument(skip(state, admin, body))]
pub async fn update<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    admin: AdminUser,
    Path(id): Path<String>,
    body: Result<Json<UpdateProductRequest>, JsonRejection>,
) -> Result<Json<ProductResponse>, ApiError> {
    let product_id = parse_id(&id, ProductId::parse)?;
    let Json(req) = body?;
    let product = state
        .catalog
        .update_product(&admin.requester(), product_id, req.into())
        .await?;
    Ok(Json(product.into()))
}

/// DELETE /catalog/{id}: remove a product. Admin only.
#[tracing::instrument(skip(state, admin))]
pub async fn delete<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    admin: AdminUser,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let product_id = parse_id(&id, ProductId::parse)?;
    state
        .catalog
        .delete_product(&admin.requester(), product_id)
        .await?;
    Ok(Json(serde_json::json!({ "message": "Product removed" })))
}
