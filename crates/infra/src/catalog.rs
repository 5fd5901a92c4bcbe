//! Product catalog service.
//!
//! Owns the lifecycle of products: create, edit, activate, deactivate,
//! delete. Stock changes made here (directly editing `stock_current`, or
//! seeding a new product with stock) are audited through the adjustment
//! recorder rather than the explicit movement path.

use std::sync::Arc;

use chrono::Utc;
use tracing::instrument;

use kardex_core::{DomainError, ExpectedVersion, ProductId};
use kardex_products::{Product, ProductDraft, ProductPatch};

use crate::ledger::LedgerError;
use crate::locks::ProductLocks;
use crate::movement_store::MovementStore;
use crate::product_store::{ProductFilter, ProductStore};
use crate::recorder::{ProductChange, RecorderHandle};

pub struct ProductCatalog<M, P> {
    movements: M,
    products: P,
    locks: Arc<ProductLocks>,
    recorder: RecorderHandle,
}

impl<M, P> ProductCatalog<M, P>
where
    M: MovementStore,
    P: ProductStore,
{
    /// `locks` must be the same registry the ledger uses, so direct stock
    /// edits serialize with explicit movements.
    pub fn new(movements: M, products: P, locks: Arc<ProductLocks>, recorder: RecorderHandle) -> Self {
        Self {
            movements,
            products,
            locks,
            recorder,
        }
    }

    /// Uniqueness of `code` and `barcode` among active products. The product
    /// itself never conflicts with its own stored row.
    async fn ensure_unique(&self, product: &Product) -> Result<(), LedgerError> {
        if !product.active {
            // Inactive products do not occupy a code or barcode.
            return Ok(());
        }
        if self
            .products
            .find_active_by_code(&product.code, Some(product.id))
            .await?
            .is_some()
        {
            return Err(DomainError::validation(format!(
                "code '{}' is already in use",
                product.code
            ))
            .into());
        }
        if let Some(barcode) = &product.barcode {
            if self
                .products
                .find_active_by_barcode(barcode, Some(product.id))
                .await?
                .is_some()
            {
                return Err(DomainError::validation(format!(
                    "barcode '{barcode}' is already in use"
                ))
                .into());
            }
        }
        Ok(())
    }

    #[instrument(skip(self, draft), fields(code = %draft.code), err)]
    pub async fn create(&self, draft: ProductDraft) -> Result<Product, LedgerError> {
        let product = Product::create(ProductId::new(), draft, Utc::now())?;
        self.ensure_unique(&product).await?;
        self.products.insert(product.clone()).await?;
        self.recorder.notify(ProductChange {
            before: None,
            after: product.clone(),
        });
        Ok(product)
    }

    pub async fn find(&self, id: ProductId) -> Result<Product, LedgerError> {
        self.products
            .get(id)
            .await?
            .ok_or_else(|| DomainError::not_found("product", id).into())
    }

    pub async fn list(&self, filter: &ProductFilter) -> Result<Vec<Product>, LedgerError> {
        Ok(self.products.list(filter).await?)
    }

    /// Apply a partial update. Fields absent from the patch keep their
    /// value; explicit nulls clear.
    #[instrument(skip(self, patch), fields(product_id = %id), err)]
    pub async fn update(&self, id: ProductId, patch: &ProductPatch) -> Result<Product, LedgerError> {
        let _guard = self.locks.acquire(id).await;

        let before = self
            .products
            .get(id)
            .await?
            .ok_or_else(|| DomainError::not_found("product", id))?;
        let mut after = before.clone();
        after.apply_patch(patch);
        after.validate()?;
        self.ensure_unique(&after).await?;

        let expected = ExpectedVersion::Exact(before.version);
        after.touch(Utc::now());
        self.products.update(after.clone(), expected).await?;

        self.recorder.notify(ProductChange {
            before: Some(before),
            after: after.clone(),
        });
        Ok(after)
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    pub async fn activate(&self, id: ProductId) -> Result<Product, LedgerError> {
        let _guard = self.locks.acquire(id).await;

        let before = self
            .products
            .get(id)
            .await?
            .ok_or_else(|| DomainError::not_found("product", id))?;
        let mut after = before.clone();
        after.activate()?;
        // Reactivation can collide with a code issued while this product
        // was inactive.
        self.ensure_unique(&after).await?;

        let expected = ExpectedVersion::Exact(before.version);
        after.touch(Utc::now());
        self.products.update(after.clone(), expected).await?;

        self.recorder.notify(ProductChange {
            before: Some(before),
            after: after.clone(),
        });
        Ok(after)
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    pub async fn deactivate(&self, id: ProductId) -> Result<Product, LedgerError> {
        let _guard = self.locks.acquire(id).await;

        let before = self
            .products
            .get(id)
            .await?
            .ok_or_else(|| DomainError::not_found("product", id))?;
        let mut after = before.clone();
        after.deactivate()?;

        let expected = ExpectedVersion::Exact(before.version);
        after.touch(Utc::now());
        self.products.update(after.clone(), expected).await?;

        self.recorder.notify(ProductChange {
            before: Some(before),
            after: after.clone(),
        });
        Ok(after)
    }

    /// Remove a product outright. Refused once it has movement history;
    /// deactivation is the supported way to retire such a product.
    #[instrument(skip(self), fields(product_id = %id), err)]
    pub async fn delete(&self, id: ProductId) -> Result<(), LedgerError> {
        let _guard = self.locks.acquire(id).await;

        if self.products.get(id).await?.is_none() {
            return Err(DomainError::not_found("product", id).into());
        }
        if self.movements.has_movements(id).await? {
            return Err(DomainError::conflict(
                "product has movement history; deactivate it instead",
            )
            .into());
        }
        self.products.delete(id).await?;
        Ok(())
    }
}
