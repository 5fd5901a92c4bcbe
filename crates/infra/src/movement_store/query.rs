//! Query interface for reading the movement ledger.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use kardex_core::ProductId;
use kardex_movements::{InventoryMovement, MovementType, ReasonCategory};

use super::r#trait::MovementStoreError;

/// Pagination parameters for queries.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Pagination {
    /// Maximum number of results to return.
    pub limit: u32,
    /// Number of results to skip.
    pub offset: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: 50, // Safe default
            offset: 0,
        }
    }
}

impl Pagination {
    pub fn new(limit: Option<u32>, offset: Option<u32>) -> Self {
        Self {
            limit: limit.unwrap_or(50).min(1000), // Cap at 1000 for safety
            offset: offset.unwrap_or(0),
        }
    }
}

/// Filter criteria for listing movements.
///
/// All fields are optional; a default filter matches everything.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MovementFilter {
    pub product_id: Option<ProductId>,
    pub movement_type: Option<MovementType>,
    /// Keep only movements at or after this instant.
    pub occurred_after: Option<DateTime<Utc>>,
    /// Keep only movements at or before this instant.
    pub occurred_before: Option<DateTime<Utc>>,
}

/// One page of movements, newest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovementPage {
    pub data: Vec<InventoryMovement>,
    /// Total matches for the filter, independent of the page size.
    pub total: u64,
    pub pagination: Pagination,
    pub has_more: bool,
}

/// Aggregated ledger activity inside a time window.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerStats {
    /// Summed quantity of `IN` movements.
    pub total_in: i64,
    /// Summed quantity of `OUT` movements (transfers are counted, not summed).
    pub total_out: i64,
    pub adjustment_count: u64,
    pub transfer_count: u64,
    /// Summed quantity per reason category. Uncategorized movements are skipped.
    pub by_reason: BTreeMap<ReasonCategory, i64>,
}

/// Read access over the whole ledger.
#[async_trait]
pub trait MovementQuery: Send + Sync {
    /// List movements matching the filter, newest first.
    async fn query_movements(
        &self,
        filter: &MovementFilter,
        pagination: Pagination,
    ) -> Result<MovementPage, MovementStoreError>;

    /// Aggregate ledger activity between `from` and `to` (both inclusive,
    /// both optional). A window with no movements yields all-zero stats.
    async fn stats(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<LedgerStats, MovementStoreError>;

    /// Convenience: the most recent movements of one product.
    async fn recent_for_product(
        &self,
        product_id: ProductId,
        limit: u32,
    ) -> Result<MovementPage, MovementStoreError> {
        let filter = MovementFilter {
            product_id: Some(product_id),
            ..MovementFilter::default()
        };
        self.query_movements(&filter, Pagination::new(Some(limit), None))
            .await
    }
}

#[async_trait]
impl<S> MovementQuery for Arc<S>
where
    S: MovementQuery + ?Sized,
{
    async fn query_movements(
        &self,
        filter: &MovementFilter,
        pagination: Pagination,
    ) -> Result<MovementPage, MovementStoreError> {
        (**self).query_movements(filter, pagination).await
    }

    async fn stats(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<LedgerStats, MovementStoreError> {
        (**self).stats(from, to).await
    }
}
