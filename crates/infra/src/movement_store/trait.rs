//! Movement store trait definition.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use kardex_core::ProductId;
use kardex_movements::InventoryMovement;

/// Errors that can occur during movement store operations.
#[derive(Debug, Error)]
pub enum MovementStoreError {
    /// The movement could not be appended (duplicate id, constraint breach).
    #[error("invalid append: {0}")]
    InvalidAppend(String),

    /// The backing storage failed.
    #[error("storage error: {0}")]
    Storage(String),
}

/// Append-only persistence for inventory movements.
///
/// The ledger is the system of record for stock history. Products carry a
/// materialized `stock_current`, but every change to it flows through an
/// appended movement, so the store behaves like a ledger, not a table of
/// mutable rows.
///
/// ## Append Semantics
///
/// - Movements are immutable once appended. There is no update and no delete.
/// - Appends for a single product arrive pre-serialized by the caller, which
///   holds that product's write lock while computing the stock snapshots.
/// - `load_for_product` returns the complete history in replay order
///   (ascending `occurred_at`, ties broken by id), so summing each record's
///   delta reproduces the product's stock level.
///
/// ## Implementation Requirements
///
/// - Appends must be atomic: a movement is either fully visible to readers
///   or not visible at all.
/// - Implementations must be safe for concurrent use across products.
#[async_trait]
pub trait MovementStore: Send + Sync {
    /// Append one movement to the ledger.
    async fn append(&self, movement: InventoryMovement) -> Result<(), MovementStoreError>;

    /// Load the full movement history of one product, oldest first.
    async fn load_for_product(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<InventoryMovement>, MovementStoreError>;

    /// Whether any movement has ever been recorded for the product.
    async fn has_movements(&self, product_id: ProductId) -> Result<bool, MovementStoreError>;
}

#[async_trait]
impl<S> MovementStore for Arc<S>
where
    S: MovementStore + ?Sized,
{
    async fn append(&self, movement: InventoryMovement) -> Result<(), MovementStoreError> {
        (**self).append(movement).await
    }

    async fn load_for_product(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<InventoryMovement>, MovementStoreError> {
        (**self).load_for_product(product_id).await
    }

    async fn has_movements(&self, product_id: ProductId) -> Result<bool, MovementStoreError> {
        (**self).has_movements(product_id).await
    }
}
