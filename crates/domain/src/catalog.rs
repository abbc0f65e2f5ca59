//! Catalog products.

use chrono::{DateTime, Utc};
use common::{ProductId, UserId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::value_objects::Money;

/// Errors that can occur when editing catalog products.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Product name is blank.
    #[error("Product name must not be blank")]
    BlankName,

    /// Price is negative.
    #[error("Invalid price: {price} (must not be negative)")]
    InvalidPrice { price: i64 },

    /// Price is above the largest unit price a cart or order can total.
    #[error("Invalid price: {price} (must not exceed {max})")]
    PriceTooLarge { price: i64, max: i64 },
}

/// A product in the catalog.
///
/// Stock is only ever changed by checkout or by an administrative edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,

    /// Admin account that created the product.
    pub created_by: Option<UserId>,

    pub name: String,
    pub image: String,
    pub brand: String,
    pub category: String,
    pub description: String,

    /// Average review rating.
    pub rating: f64,
    pub num_reviews: u32,

    pub price: Money,

    /// Units still available for purchase.
    pub count_in_stock: u32,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Creates the placeholder product an admin starts from before editing.
    pub fn sample(created_by: UserId) -> Self {
        let now = Utc::now();
        Self {
            id: ProductId::new(),
            created_by: Some(created_by),
            name: "Sample Name".to_string(),
            image: "/images/sample.jpg".to_string(),
            brand: "Sample Brand".to_string(),
            category: "Sample Category".to_string(),
            description: "Sample description".to_string(),
            rating: 0.0,
            num_reviews: 0,
            price: Money::zero(),
            count_in_stock: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns true if `qty` units can be taken from stock.
    pub fn has_stock_for(&self, qty: u32) -> bool {
        qty <= self.count_in_stock
    }

    /// Returns true if the name contains `keyword`, ignoring case.
    pub fn name_matches(&self, keyword: &str) -> bool {
        self.name.to_lowercase().contains(&keyword.to_lowercase())
    }

    /// Applies an administrative edit.
    ///
    /// The product is left untouched if the edit is rejected.
    pub fn apply_update(&mut self, update: ProductUpdate) -> Result<(), CatalogError> {
        if let Some(name) = &update.name
            && name.trim().is_empty()
        {
            return Err(CatalogError::BlankName);
        }
        if let Some(price) = update.price
            && price.is_negative()
        {
            return Err(CatalogError::InvalidPrice {
                price: price.cents(),
            });
        }
        if let Some(price) = update.price
            && price > Money::MAX_UNIT_PRICE
        {
            return Err(CatalogError::PriceTooLarge {
                price: price.cents(),
                max: Money::MAX_UNIT_PRICE.cents(),
            });
        }

        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(price) = update.price {
            self.price = price;
        }
        if let Some(image) = update.image {
            self.image = image;
        }
        if let Some(brand) = update.brand {
            self.brand = brand;
        }
        if let Some(category) = update.category {
            self.category = category;
        }
        if let Some(description) = update.description {
            self.description = description;
        }
        if let Some(count) = update.count_in_stock {
            self.count_in_stock = count;
        }
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// Partial edit of a product; `None` fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub price: Option<Money>,
    pub image: Option<String>,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub count_in_stock: Option<u32>,
}
