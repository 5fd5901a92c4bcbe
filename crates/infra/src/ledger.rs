//! Stock ledger engine.
//!
//! `StockLedger` is the single write path for stock levels. Every accepted
//! movement appends an immutable record and updates the product's
//! materialized `stock_current` to the snapshot the record carries, so the
//! level equals the replay of the history at all times.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::instrument;

use kardex_core::{DomainError, ExpectedVersion, ProductId};
use kardex_movements::{InventoryMovement, MovementRequest, replay_stock};

use crate::locks::ProductLocks;
use crate::movement_store::{
    LedgerStats, MovementFilter, MovementPage, MovementQuery, MovementStore, MovementStoreError,
    Pagination,
};
use crate::product_store::{ProductStore, ProductStoreError};

/// Errors surfaced by the ledger engine and the catalog service.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("movement store failure: {0}")]
    Movements(#[from] MovementStoreError),

    #[error("product store failure: {0}")]
    Products(#[from] ProductStoreError),
}

/// Reject inverted time windows before they reach a store.
fn check_window(from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Result<(), LedgerError> {
    if let (Some(from), Some(to)) = (from, to) {
        if from > to {
            return Err(DomainError::invalid_argument(format!(
                "date range is inverted: {from} is after {to}"
            ))
            .into());
        }
    }
    Ok(())
}

/// Movement recording and ledger reads over a pair of stores.
pub struct StockLedger<M, P> {
    movements: M,
    products: P,
    locks: Arc<ProductLocks>,
}

impl<M, P> StockLedger<M, P>
where
    M: MovementStore + MovementQuery,
    P: ProductStore,
{
    pub fn new(movements: M, products: P, locks: Arc<ProductLocks>) -> Self {
        Self {
            movements,
            products,
            locks,
        }
    }

    /// Record one movement and move the product's stock level with it.
    ///
    /// Validation happens before any state is touched; an error leaves both
    /// stores exactly as they were. The one exception is a `Conflict` from a
    /// writer outside this process's lock registry (another process on the
    /// same database): the movement is already appended when the stock write
    /// loses the version check, and [`Self::rebuild_stock`] reconciles the
    /// level from the ledger.
    #[instrument(
        skip(self, request),
        fields(
            product_id = %request.product_id,
            movement_type = %request.movement_type,
            quantity = request.quantity,
        ),
        err
    )]
    pub async fn record(&self, request: MovementRequest) -> Result<InventoryMovement, LedgerError> {
        request.validate()?;
        let effect = request.effect()?;

        // Single-writer section for this product.
        let _guard = self.locks.acquire(request.product_id).await;

        let mut product = self
            .products
            .get(request.product_id)
            .await?
            .ok_or_else(|| DomainError::not_found("product", request.product_id))?;
        if !product.active {
            return Err(DomainError::validation("product is inactive").into());
        }

        let stock_before = product.stock_current;
        let stock_after = effect.apply(stock_before)?;
        let movement = InventoryMovement::record(&request, stock_before, stock_after, Utc::now());

        // Ledger first: the stock level is a view of the movement history and
        // can be rebuilt from it. The reverse is not true.
        self.movements.append(movement.clone()).await?;

        let expected = ExpectedVersion::Exact(product.version);
        product.set_stock_level(stock_after)?;
        product.touch(Utc::now());
        if let Err(e) = self.products.update(product, expected).await {
            tracing::error!(
                movement_id = %movement.id,
                error = %e,
                "movement appended but stock level update failed; rebuild will reconcile"
            );
            return Err(e.into());
        }

        Ok(movement)
    }

    /// List movements, newest first. `filter` and `pagination` are applied
    /// in the store; `total` counts all matches regardless of page size.
    #[instrument(skip(self, filter, pagination), err)]
    pub async fn list(
        &self,
        filter: MovementFilter,
        pagination: Pagination,
    ) -> Result<MovementPage, LedgerError> {
        check_window(filter.occurred_after, filter.occurred_before)?;
        Ok(self.movements.query_movements(&filter, pagination).await?)
    }

    /// Aggregate ledger activity inside an optional time window.
    #[instrument(skip(self), err)]
    pub async fn stats(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<LedgerStats, LedgerError> {
        check_window(from, to)?;
        Ok(self.movements.stats(from, to).await?)
    }

    /// The most recent movements of one product.
    pub async fn recent_for_product(
        &self,
        product_id: ProductId,
        limit: u32,
    ) -> Result<MovementPage, LedgerError> {
        Ok(self.movements.recent_for_product(product_id, limit).await?)
    }

    /// Recompute a product's stock level from its full movement history.
    ///
    /// The replayed level wins over whatever the product record currently
    /// holds. Intended for reconciliation after manual data surgery or a
    /// suspected divergence between the ledger and the materialized level.
    #[instrument(skip(self), fields(product_id = %product_id), err)]
    pub async fn rebuild_stock(&self, product_id: ProductId) -> Result<i64, LedgerError> {
        let _guard = self.locks.acquire(product_id).await;

        let mut product = self
            .products
            .get(product_id)
            .await?
            .ok_or_else(|| DomainError::not_found("product", product_id))?;
        let history = self.movements.load_for_product(product_id).await?;
        let level = replay_stock(&history);
        if level == product.stock_current {
            return Ok(level);
        }

        tracing::warn!(
            product_id = %product_id,
            stored = product.stock_current,
            replayed = level,
            "stock level diverged from ledger; rebuilding"
        );
        let expected = ExpectedVersion::Exact(product.version);
        product.set_stock_level(level)?;
        product.touch(Utc::now());
        self.products.update(product, expected).await?;
        Ok(level)
    }
}
