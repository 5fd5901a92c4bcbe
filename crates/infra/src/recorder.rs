//! Automatic adjustment recording for manual product edits.
//!
//! Editing a product directly (fields, stock, activation) must leave the
//! same audit trail as an explicit movement. The catalog hands every
//! persisted change to this recorder, which consolidates the edit into one
//! `ADJUSTMENT` movement and appends it off the request path. Recording is
//! best-effort: a failure is logged and never surfaces to the caller, and
//! the explicit movement path in [`crate::ledger::StockLedger`] never goes
//! through here.

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use kardex_core::MovementId;
use kardex_movements::{InventoryMovement, MovementType};
use kardex_products::{FieldChange, Product, changed_fields};

use crate::movement_store::MovementStore;

/// One persisted catalog change, as seen by the recorder.
#[derive(Debug, Clone)]
pub struct ProductChange {
    /// State before the edit; `None` when the product was just created.
    pub before: Option<Product>,
    pub after: Product,
}

/// Handle used by the catalog to submit changes for recording.
#[derive(Debug, Clone)]
pub struct RecorderHandle {
    tx: mpsc::UnboundedSender<ProductChange>,
}

impl RecorderHandle {
    /// Queue a change for recording. Never blocks and never fails the caller.
    pub fn notify(&self, change: ProductChange) {
        if self.tx.send(change).is_err() {
            tracing::warn!("adjustment recorder is not running; product change not recorded");
        }
    }
}

/// Background worker that turns product changes into audit movements.
pub struct AdjustmentRecorder;

impl AdjustmentRecorder {
    /// Spawn the recording worker and return the handle to feed it.
    pub fn spawn<M>(movements: M) -> RecorderHandle
    where
        M: MovementStore + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<ProductChange>();
        tokio::spawn(async move {
            while let Some(change) = rx.recv().await {
                let product_id = change.after.id;
                if let Some(movement) = build_adjustment(&change, Utc::now()) {
                    if let Err(e) = movements.append(movement).await {
                        tracing::warn!(
                            product_id = %product_id,
                            error = %e,
                            "failed to record automatic adjustment"
                        );
                    }
                }
            }
        });
        RecorderHandle { tx }
    }
}

/// Consolidate one product change into a single audit movement.
///
/// Returns `None` when nothing observable changed. A stock change drives the
/// quantity and the reason summary; any other field edits ride along in the
/// comments as `field: old -> new` entries.
pub fn build_adjustment(change: &ProductChange, now: DateTime<Utc>) -> Option<InventoryMovement> {
    let after = &change.after;
    let Some(before) = &change.before else {
        // Newly created product: only a nonzero starting stock is
        // ledger-worthy, and it replays from zero like any other movement.
        if after.stock_current == 0 {
            return None;
        }
        return Some(InventoryMovement {
            id: MovementId::new(),
            product_id: after.id,
            batch_id: None,
            user_id: None,
            movement_type: MovementType::Adjustment,
            quantity: after.stock_current,
            stock_before: 0,
            stock_after: after.stock_current,
            reason: "Initial stock".to_string(),
            reason_category: None,
            reference_document: None,
            comments: None,
            occurred_at: now,
        });
    };

    let changes = changed_fields(before, after);
    if changes.is_empty() {
        return None;
    }

    let stock_before = before.stock_current;
    let stock_after = after.stock_current;
    let (quantity, reason) = if stock_after == stock_before {
        (0, "Product update: product details changed".to_string())
    } else {
        (
            (stock_after - stock_before).abs(),
            format!("Product update: stock changed from {stock_before} to {stock_after}"),
        )
    };
    let comments = changes
        .iter()
        .map(FieldChange::describe)
        .collect::<Vec<_>>()
        .join("; ");

    Some(InventoryMovement {
        id: MovementId::new(),
        product_id: after.id,
        batch_id: None,
        user_id: None,
        movement_type: MovementType::Adjustment,
        quantity,
        stock_before,
        stock_after,
        reason,
        reason_category: None,
        reference_document: None,
        comments: Some(comments),
        occurred_at: now,
    })
}
