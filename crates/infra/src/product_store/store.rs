//! Product storage trait and in-memory backend.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use kardex_core::{ExpectedVersion, ProductId};
use kardex_products::Product;

/// Errors that can occur during product store operations.
#[derive(Debug, Error)]
pub enum ProductStoreError {
    /// The product does not exist.
    #[error("product not found")]
    NotFound,

    /// A concurrent writer got there first, or a uniqueness rule was hit.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The backing storage failed.
    #[error("storage error: {0}")]
    Storage(String),
}

/// Filter criteria for listing products.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductFilter {
    /// Keep only products with this active flag.
    pub active: Option<bool>,
    /// Keep only products at or below their minimum stock level.
    pub low_stock: bool,
    /// Case-insensitive match over code, name, barcode, category and location.
    pub search: Option<String>,
}

/// Persistence for the product catalog.
///
/// ## Versioning
///
/// Every product carries a version that bumps once per persisted change.
/// `update` only applies when the stored version matches `expected`, which
/// turns lost updates into explicit `Conflict` errors even when a backend
/// cannot serialize writers any other way.
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Insert a new product. Fails with `Conflict` when the id is taken.
    async fn insert(&self, product: Product) -> Result<(), ProductStoreError>;

    /// Fetch one product.
    async fn get(&self, id: ProductId) -> Result<Option<Product>, ProductStoreError>;

    /// Replace a stored product after checking its version.
    async fn update(
        &self,
        product: Product,
        expected: ExpectedVersion,
    ) -> Result<(), ProductStoreError>;

    /// Remove a product outright. Fails with `NotFound` when absent.
    async fn delete(&self, id: ProductId) -> Result<(), ProductStoreError>;

    /// Find an active product by exact code, skipping `exclude`.
    async fn find_active_by_code(
        &self,
        code: &str,
        exclude: Option<ProductId>,
    ) -> Result<Option<Product>, ProductStoreError>;

    /// Find an active product by exact barcode, skipping `exclude`.
    async fn find_active_by_barcode(
        &self,
        barcode: &str,
        exclude: Option<ProductId>,
    ) -> Result<Option<Product>, ProductStoreError>;

    /// List products matching the filter, ordered by code.
    async fn list(&self, filter: &ProductFilter) -> Result<Vec<Product>, ProductStoreError>;
}

#[async_trait]
impl<S> ProductStore for Arc<S>
where
    S: ProductStore + ?Sized,
{
    async fn insert(&self, product: Product) -> Result<(), ProductStoreError> {
        (**self).insert(product).await
    }

    async fn get(&self, id: ProductId) -> Result<Option<Product>, ProductStoreError> {
        (**self).get(id).await
    }

    async fn update(
        &self,
        product: Product,
        expected: ExpectedVersion,
    ) -> Result<(), ProductStoreError> {
        (**self).update(product, expected).await
    }

    async fn delete(&self, id: ProductId) -> Result<(), ProductStoreError> {
        (**self).delete(id).await
    }

    async fn find_active_by_code(
        &self,
        code: &str,
        exclude: Option<ProductId>,
    ) -> Result<Option<Product>, ProductStoreError> {
        (**self).find_active_by_code(code, exclude).await
    }

    async fn find_active_by_barcode(
        &self,
        barcode: &str,
        exclude: Option<ProductId>,
    ) -> Result<Option<Product>, ProductStoreError> {
        (**self).find_active_by_barcode(barcode, exclude).await
    }

    async fn list(&self, filter: &ProductFilter) -> Result<Vec<Product>, ProductStoreError> {
        (**self).list(filter).await
    }
}

fn matches_product(product: &Product, filter: &ProductFilter) -> bool {
    if let Some(active) = filter.active {
        if product.active != active {
            return false;
        }
    }
    if filter.low_stock && !product.is_low_stock() {
        return false;
    }
    if let Some(term) = &filter.search {
        if !product.matches_search(term) {
            return false;
        }
    }
    true
}

/// In-memory product store for tests and single-process deployments.
#[derive(Debug, Default)]
pub struct InMemoryProductStore {
    products: RwLock<HashMap<ProductId, Product>>,
}

impl InMemoryProductStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProductStore for InMemoryProductStore {
    async fn insert(&self, product: Product) -> Result<(), ProductStoreError> {
        let mut products = self
            .products
            .write()
            .map_err(|_| ProductStoreError::Storage("lock poisoned".to_string()))?;
        if products.contains_key(&product.id) {
            return Err(ProductStoreError::Conflict(format!(
                "product {} already exists",
                product.id
            )));
        }
        products.insert(product.id, product);
        Ok(())
    }

    async fn get(&self, id: ProductId) -> Result<Option<Product>, ProductStoreError> {
        let products = self
            .products
            .read()
            .map_err(|_| ProductStoreError::Storage("lock poisoned".to_string()))?;
        Ok(products.get(&id).cloned())
    }

    async fn update(
        &self,
        product: Product,
        expected: ExpectedVersion,
    ) -> Result<(), ProductStoreError> {
        let mut products = self
            .products
            .write()
            .map_err(|_| ProductStoreError::Storage("lock poisoned".to_string()))?;
        let current = products.get(&product.id).ok_or(ProductStoreError::NotFound)?;
        if let Err(e) = expected.check(current.version) {
            return Err(ProductStoreError::Conflict(e.to_string()));
        }
        products.insert(product.id, product);
        Ok(())
    }

    async fn delete(&self, id: ProductId) -> Result<(), ProductStoreError> {
        let mut products = self
            .products
            .write()
            .map_err(|_| ProductStoreError::Storage("lock poisoned".to_string()))?;
        products.remove(&id).ok_or(ProductStoreError::NotFound)?;
        Ok(())
    }

    async fn find_active_by_code(
        &self,
        code: &str,
        exclude: Option<ProductId>,
    ) -> Result<Option<Product>, ProductStoreError> {
        let products = self
            .products
            .read()
            .map_err(|_| ProductStoreError::Storage("lock poisoned".to_string()))?;
        Ok(products
            .values()
            .find(|p| p.active && p.code == code && Some(p.id) != exclude)
            .cloned())
    }

    async fn find_active_by_barcode(
        &self,
        barcode: &str,
        exclude: Option<ProductId>,
    ) -> Result<Option<Product>, ProductStoreError> {
        let products = self
            .products
            .read()
            .map_err(|_| ProductStoreError::Storage("lock poisoned".to_string()))?;
        Ok(products
            .values()
            .find(|p| {
                p.active && p.barcode.as_deref() == Some(barcode) && Some(p.id) != exclude
            })
            .cloned())
    }

    async fn list(&self, filter: &ProductFilter) -> Result<Vec<Product>, ProductStoreError> {
        let products = self
            .products
            .read()
            .map_err(|_| ProductStoreError::Storage("lock poisoned".to_string()))?;
        let mut matches: Vec<Product> = products
            .values()
            .filter(|p| matches_product(p, filter))
            .cloned()
            .collect();
        matches.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(matches)
    }
}
