//! Cart aggregate implementation.

use chrono::{DateTime, Utc};
use common::{ProductId, UserId, Version};
use serde::{Deserialize, Serialize};

use super::CartError;
use crate::catalog::Product;
use crate::value_objects::Money;

/// A line in a cart.
///
/// Name, image and price are copied from the product when the line is set,
/// so the cart keeps price-at-add-time semantics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: ProductId,
    pub name: String,
    pub image: String,
    pub price: Money,
    pub qty: u32,
}

impl CartItem {
    /// Creates a line snapshotting the product's current details.
    pub fn from_product(product: &Product, qty: u32) -> Self {
        Self {
            product_id: product.id,
            name: product.name.clone(),
            image: product.image.clone(),
            price: product.price,
            qty,
        }
    }

    /// Returns the total price for this line (qty * price).
    pub fn line_total(&self) -> Money {
        self.price.multiply(self.qty)
    }
}

/// Shopping cart aggregate root.
///
/// One cart per user, at most one line per product. `total_price` is
/// recomputed after every mutation and always equals the sum of the line
/// totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    user_id: UserId,

    items: Vec<CartItem>,

    total_price: Money,

    /// Stored revision; kept outside the persisted document.
    #[serde(skip)]
    version: Version,

    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

// Query methods
impl Cart {
    /// Creates an empty, never-persisted cart for a user.
    pub fn empty(user_id: UserId) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            items: Vec::new(),
            total_price: Money::zero(),
            version: Version::initial(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns the owning user.
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Returns the lines in insertion order.
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// Returns the line for a product.
    pub fn get_item(&self, product_id: ProductId) -> Option<&CartItem> {
        self.items.iter().find(|item| item.product_id == product_id)
    }

    /// Returns the derived total.
    pub fn total_price(&self) -> Money {
        self.total_price
    }

    /// Returns true if the cart has no lines.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the stored revision, `Version::initial()` if never saved.
    pub fn version(&self) -> Version {
        self.version
    }

    /// Returns true if this cart has been written to the store.
    pub fn is_persisted(&self) -> bool {
        self.version != Version::initial()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

// Mutations
impl Cart {
    /// Sets the quantity of a product's line, adding the line if missing.
    ///
    /// `qty` replaces any existing quantity; it does not add to it. The
    /// line's name, image and price are refreshed from `product`. On error
    /// the cart is unchanged.
    pub fn upsert_item(&mut self, product: &Product, qty: u32) -> Result<(), CartError> {
        if qty == 0 {
            return Err(CartError::InvalidQuantity { quantity: qty });
        }

        if !product.has_stock_for(qty) {
            return Err(CartError::InsufficientStock {
                product_id: product.id,
                product_name: product.name.clone(),
                requested: qty,
                available: product.count_in_stock,
            });
        }

        let line = CartItem::from_product(product, qty);
        let mut items = self.items.clone();
        match items.iter_mut().find(|item| item.product_id == product.id) {
            Some(existing) => *existing = line,
            None => items.push(line),
        }

        let checked_totals = items
            .iter()
            .map(|item| item.price.checked_multiply(item.qty))
            .collect::<Option<Vec<_>>>();
        if checked_totals.and_then(Money::checked_sum).is_none() {
            return Err(CartError::TotalTooLarge);
        }

        self.items = items;
        self.touch();
        Ok(())
    }

    /// Removes a product's line. Returns false if the product was not in
    /// the cart, in which case only the timestamp changes.
    pub fn remove_item(&mut self, product_id: ProductId) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.product_id != product_id);
        self.touch();
        self.items.len() != before
    }

    /// Records the revision assigned by the store.
    pub fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn touch(&mut self) {
        self.total_price = self.items.iter().map(CartItem::line_total).sum();
        self.updated_at = Utc::now();
    }
}
