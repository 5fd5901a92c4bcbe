//! In-memory movement store.
//!
//! Backs tests and single-process deployments. Keeps one vector per product;
//! queries scan, which is fine at that scale.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use kardex_core::ProductId;
use kardex_movements::{InventoryMovement, MovementType};

use super::query::{LedgerStats, MovementFilter, MovementPage, MovementQuery, Pagination};
use super::r#trait::{MovementStore, MovementStoreError};

#[derive(Debug, Default)]
pub struct InMemoryMovementStore {
    ledger: RwLock<HashMap<ProductId, Vec<InventoryMovement>>>,
}

impl InMemoryMovementStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn matches_filter(movement: &InventoryMovement, filter: &MovementFilter) -> bool {
    if let Some(product_id) = filter.product_id {
        if movement.product_id != product_id {
            return false;
        }
    }
    if let Some(movement_type) = filter.movement_type {
        if movement.movement_type != movement_type {
            return false;
        }
    }
    in_window(movement.occurred_at, filter.occurred_after, filter.occurred_before)
}

fn in_window(at: DateTime<Utc>, from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> bool {
    if let Some(from) = from {
        if at < from {
            return false;
        }
    }
    if let Some(to) = to {
        if at > to {
            return false;
        }
    }
    true
}

#[async_trait]
impl MovementStore for InMemoryMovementStore {
    async fn append(&self, movement: InventoryMovement) -> Result<(), MovementStoreError> {
        let mut ledger = self
            .ledger
            .write()
            .map_err(|_| MovementStoreError::Storage("lock poisoned".to_string()))?;
        ledger.entry(movement.product_id).or_default().push(movement);
        Ok(())
    }

    async fn load_for_product(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<InventoryMovement>, MovementStoreError> {
        let ledger = self
            .ledger
            .read()
            .map_err(|_| MovementStoreError::Storage("lock poisoned".to_string()))?;
        let mut history = ledger.get(&product_id).cloned().unwrap_or_default();
        history.sort_by_key(|m| (m.occurred_at, m.id));
        Ok(history)
    }

    async fn has_movements(&self, product_id: ProductId) -> Result<bool, MovementStoreError> {
        let ledger = self
            .ledger
            .read()
            .map_err(|_| MovementStoreError::Storage("lock poisoned".to_string()))?;
        Ok(ledger.get(&product_id).is_some_and(|history| !history.is_empty()))
    }
}

#[async_trait]
impl MovementQuery for InMemoryMovementStore {
    async fn query_movements(
        &self,
        filter: &MovementFilter,
        pagination: Pagination,
    ) -> Result<MovementPage, MovementStoreError> {
        let ledger = self
            .ledger
            .read()
            .map_err(|_| MovementStoreError::Storage("lock poisoned".to_string()))?;
        let mut matches: Vec<InventoryMovement> = ledger
            .values()
            .flatten()
            .filter(|movement| matches_filter(movement, filter))
            .cloned()
            .collect();
        drop(ledger);

        // Newest first, id as tie-breaker so pages stay stable.
        matches.sort_by(|a, b| (b.occurred_at, b.id).cmp(&(a.occurred_at, a.id)));

        let total = matches.len() as u64;
        let data: Vec<InventoryMovement> = matches
            .into_iter()
            .skip(pagination.offset as usize)
            .take(pagination.limit as usize)
            .collect();
        let has_more = total > u64::from(pagination.offset) + u64::from(pagination.limit);

        Ok(MovementPage {
            data,
            total,
            pagination,
            has_more,
        })
    }

    async fn stats(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<LedgerStats, MovementStoreError> {
        let ledger = self
            .ledger
            .read()
            .map_err(|_| MovementStoreError::Storage("lock poisoned".to_string()))?;
        let mut stats = LedgerStats::default();
        for movement in ledger.values().flatten() {
            if !in_window(movement.occurred_at, from, to) {
                continue;
            }
            match movement.movement_type {
                MovementType::In => stats.total_in += movement.quantity,
                MovementType::Out => stats.total_out += movement.quantity,
                MovementType::Adjustment => stats.adjustment_count += 1,
                MovementType::Transfer => stats.transfer_count += 1,
            }
            if let Some(category) = movement.reason_category {
                *stats.by_reason.entry(category).or_insert(0) += movement.quantity;
            }
        }
        Ok(stats)
    }
}
