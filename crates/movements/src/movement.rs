use chrono::{DateTime, Utc};
use core::str::FromStr;
use serde::{Deserialize, Serialize};

use kardex_core::{BatchId, DomainError, DomainResult, Entity, MovementId, ProductId, UserId};

/// Kind of stock movement.
///
/// `Transfer` is outbound-only: it records stock leaving this store, and the
/// receiving side is outside the system boundary.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementType {
    In,
    Out,
    Adjustment,
    Transfer,
}

impl MovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::In => "IN",
            MovementType::Out => "OUT",
            MovementType::Adjustment => "ADJUSTMENT",
            MovementType::Transfer => "TRANSFER",
        }
    }
}

impl core::fmt::Display for MovementType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MovementType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "IN" => Ok(MovementType::In),
            "OUT" => Ok(MovementType::Out),
            "ADJUSTMENT" => Ok(MovementType::Adjustment),
            "TRANSFER" => Ok(MovementType::Transfer),
            other => Err(DomainError::invalid_argument(format!(
                "unknown movement type: {other} (expected IN, OUT, ADJUSTMENT or TRANSFER)"
            ))),
        }
    }
}

/// Closed set of reasons a movement can be attributed to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReasonCategory {
    Purchase,
    Sale,
    Return,
    Damage,
    Expiry,
    Correction,
    InventoryCount,
    Other,
}

impl ReasonCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasonCategory::Purchase => "PURCHASE",
            ReasonCategory::Sale => "SALE",
            ReasonCategory::Return => "RETURN",
            ReasonCategory::Damage => "DAMAGE",
            ReasonCategory::Expiry => "EXPIRY",
            ReasonCategory::Correction => "CORRECTION",
            ReasonCategory::InventoryCount => "INVENTORY_COUNT",
            ReasonCategory::Other => "OTHER",
        }
    }

    /// Categories whose adjustments carry an absolute counted level rather
    /// than a delta.
    pub fn is_absolute_count(&self) -> bool {
        matches!(self, ReasonCategory::Correction | ReasonCategory::InventoryCount)
    }
}

impl core::fmt::Display for ReasonCategory {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReasonCategory {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PURCHASE" => Ok(ReasonCategory::Purchase),
            "SALE" => Ok(ReasonCategory::Sale),
            "RETURN" => Ok(ReasonCategory::Return),
            "DAMAGE" => Ok(ReasonCategory::Damage),
            "EXPIRY" => Ok(ReasonCategory::Expiry),
            "CORRECTION" => Ok(ReasonCategory::Correction),
            "INVENTORY_COUNT" => Ok(ReasonCategory::InventoryCount),
            "OTHER" => Ok(ReasonCategory::Other),
            other => Err(DomainError::invalid_argument(format!(
                "unknown reason category: {other}"
            ))),
        }
    }
}

/// Input for recording a movement through the ledger engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementRequest {
    pub product_id: ProductId,
    pub movement_type: MovementType,
    pub quantity: i64,
    pub reason: String,
    #[serde(default)]
    pub reason_category: Option<ReasonCategory>,
    #[serde(default)]
    pub batch_id: Option<BatchId>,
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub reference_document: Option<String>,
    #[serde(default)]
    pub comments: Option<String>,
}

impl MovementRequest {
    /// Field-level checks that do not depend on the product's state.
    pub fn validate(&self) -> DomainResult<()> {
        if self.quantity <= 0 {
            return Err(DomainError::invalid_argument(format!(
                "quantity must be positive, got {}",
                self.quantity
            )));
        }
        if self.reason.trim().is_empty() {
            return Err(DomainError::validation("reason cannot be empty"));
        }
        Ok(())
    }
}

/// One immutable row of the movement ledger.
///
/// Records are append-only: nothing in the system updates or deletes one
/// once written. `quantity` is always the non-negative size of the change;
/// direction lives in `movement_type`. `stock_before` and `stock_after`
/// snapshot the product's stock level around the movement, so any slice of
/// history can be audited without replaying from the start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryMovement {
    pub id: MovementId,
    pub product_id: ProductId,
    pub batch_id: Option<BatchId>,
    pub user_id: Option<UserId>,
    pub movement_type: MovementType,
    pub quantity: i64,
    pub stock_before: i64,
    pub stock_after: i64,
    pub reason: String,
    pub reason_category: Option<ReasonCategory>,
    pub reference_document: Option<String>,
    pub comments: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl InventoryMovement {
    /// Build the ledger record for an accepted request.
    pub fn record(
        request: &MovementRequest,
        stock_before: i64,
        stock_after: i64,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: MovementId::new(),
            product_id: request.product_id,
            batch_id: request.batch_id,
            user_id: request.user_id,
            movement_type: request.movement_type,
            quantity: request.quantity,
            stock_before,
            stock_after,
            reason: request.reason.trim().to_string(),
            reason_category: request.reason_category,
            reference_document: request.reference_document.clone(),
            comments: request.comments.clone(),
            occurred_at,
        }
    }

    /// Signed stock change this record represents.
    pub fn delta(&self) -> i64 {
        self.stock_after - self.stock_before
    }
}

impl Entity for InventoryMovement {
    type Id = MovementId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
