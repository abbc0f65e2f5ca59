//! Catalog queries and administrative product edits.

use common::ProductId;
use domain::{Product, ProductUpdate, Requester};
use store::{ProductQuery, Store};

use crate::accounts::require_admin;
use crate::error::{Result, ServiceError};

/// Service for reading and editing the product catalog.
pub struct CatalogService<S: Store> {
    store: S,
}

impl<S: Store> CatalogService<S> {
    /// Creates a new catalog service.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Lists every product matching the query. No pagination.
    #[tracing::instrument(skip(self))]
    pub async fn list_products(&self, query: &ProductQuery) -> Result<Vec<Product>> {
        Ok(self.store.find_products(query).await?)
    }

    /// Loads a product by ID.
    #[tracing::instrument(skip(self))]
    pub async fn get_product(&self, product_id: ProductId) -> Result<Product> {
        self.store
            .get_product(product_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Product", product_id))
    }

    /// Creates a placeholder product for an administrator to fill in.
    #[tracing::instrument(skip(self))]
    pub async fn create_sample_product(&self, requester: &Requester) -> Result<Product> {
        require_admin(requester)?;

        let product = Product::sample(requester.user_id);
        self.store.insert_product(&product).await?;

        tracing::info!(product_id = %product.id, "sample product created");
        Ok(product)
    }

    /// Applies an administrative edit to a product.
    #[tracing::instrument(skip(self, update))]
    pub async fn update_product(
        &self,
        requester: &Requester,
        product_id: ProductId,
        update: ProductUpdate,
    ) -> Result<Product> {
        require_admin(requester)?;

        let mut product = self.get_product(product_id).await?;
        product.apply_update(update)?;
        self.store.update_product(&product).await?;

        Ok(product)
    }

    /// Removes a product from the catalog.
    #[tracing::instrument(skip(self))]
    pub async fn delete_product(&self, requester: &Requester, product_id: ProductId) -> Result<()> {
        require_admin(requester)?;

        if !self.store.delete_product(product_id).await? {
            return Err(ServiceError::not_found("Product", product_id));
        }

        tracing::info!(%product_id, "product deleted");
        Ok(())
    }
}
