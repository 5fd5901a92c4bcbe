//! PostgreSQL-backed movement store.
//!
//! ## Schema
//!
//! Expects an `inventory_movements` table:
//!
//! ```sql
//! CREATE TABLE inventory_movements (
//!     id UUID PRIMARY KEY,
//!     product_id UUID NOT NULL REFERENCES products(id),
//!     batch_id UUID,
//!     user_id UUID,
//!     movement_type TEXT NOT NULL,
//!     quantity BIGINT NOT NULL CHECK (quantity >= 0),
//!     stock_before BIGINT NOT NULL,
//!     stock_after BIGINT NOT NULL,
//!     reason TEXT NOT NULL,
//!     reason_category TEXT,
//!     reference_document TEXT,
//!     comments TEXT,
//!     occurred_at TIMESTAMPTZ NOT NULL
//! );
//! CREATE INDEX idx_movements_product ON inventory_movements (product_id, occurred_at);
//! CREATE INDEX idx_movements_occurred_at ON inventory_movements (occurred_at);
//! ```
//!
//! ## Error Mapping
//!
//! | Postgres condition            | Mapped to                          |
//! |-------------------------------|------------------------------------|
//! | unique violation (23505)      | `MovementStoreError::InvalidAppend` |
//! | foreign key violation (23503) | `MovementStoreError::InvalidAppend` |
//! | check violation (23514)       | `MovementStoreError::InvalidAppend` |
//! | pool closed / io / other      | `MovementStoreError::Storage`       |

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::instrument;
use uuid::Uuid;

use kardex_core::{BatchId, MovementId, ProductId, UserId};
use kardex_movements::{InventoryMovement, MovementType, ReasonCategory};

use super::query::{LedgerStats, MovementFilter, MovementPage, MovementQuery, Pagination};
use super::r#trait::{MovementStore, MovementStoreError};

/// Movement store backed by PostgreSQL.
pub struct PostgresMovementStore {
    pool: Arc<PgPool>,
}

impl PostgresMovementStore {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

/// Map sqlx errors to movement store errors, logging unexpected ones.
fn map_sqlx_error(operation: &str, e: sqlx::Error) -> MovementStoreError {
    match &e {
        sqlx::Error::Database(db_err) => {
            let code = db_err.code().map(|c| c.to_string()).unwrap_or_default();
            match code.as_str() {
                "23505" => MovementStoreError::InvalidAppend(format!(
                    "duplicate movement id during {operation}: {db_err}"
                )),
                "23503" | "23514" => MovementStoreError::InvalidAppend(format!(
                    "constraint violation during {operation}: {db_err}"
                )),
                _ => {
                    tracing::error!(operation, error = %db_err, "database error");
                    MovementStoreError::Storage(format!("{operation}: {db_err}"))
                }
            }
        }
        sqlx::Error::PoolClosed => {
            MovementStoreError::Storage(format!("{operation}: connection pool closed"))
        }
        _ => {
            tracing::error!(operation, error = %e, "unexpected sqlx error");
            MovementStoreError::Storage(format!("{operation}: {e}"))
        }
    }
}

/// Raw row shape as stored in `inventory_movements`.
struct MovementRow {
    id: Uuid,
    product_id: Uuid,
    batch_id: Option<Uuid>,
    user_id: Option<Uuid>,
    movement_type: String,
    quantity: i64,
    stock_before: i64,
    stock_after: i64,
    reason: String,
    reason_category: Option<String>,
    reference_document: Option<String>,
    comments: Option<String>,
    occurred_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, PgRow> for MovementRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            product_id: row.try_get("product_id")?,
            batch_id: row.try_get("batch_id")?,
            user_id: row.try_get("user_id")?,
            movement_type: row.try_get("movement_type")?,
            quantity: row.try_get("quantity")?,
            stock_before: row.try_get("stock_before")?,
            stock_after: row.try_get("stock_after")?,
            reason: row.try_get("reason")?,
            reason_category: row.try_get("reason_category")?,
            reference_document: row.try_get("reference_document")?,
            comments: row.try_get("comments")?,
            occurred_at: row.try_get("occurred_at")?,
        })
    }
}

impl TryFrom<MovementRow> for InventoryMovement {
    type Error = MovementStoreError;

    fn try_from(row: MovementRow) -> Result<Self, Self::Error> {
        let movement_type = row
            .movement_type
            .parse::<MovementType>()
            .map_err(|e| MovementStoreError::Storage(format!("corrupt movement row: {e}")))?;
        let reason_category = row
            .reason_category
            .as_deref()
            .map(str::parse::<ReasonCategory>)
            .transpose()
            .map_err(|e| MovementStoreError::Storage(format!("corrupt movement row: {e}")))?;
        Ok(Self {
            id: MovementId::from_uuid(row.id),
            product_id: ProductId::from_uuid(row.product_id),
            batch_id: row.batch_id.map(BatchId::from_uuid),
            user_id: row.user_id.map(UserId::from_uuid),
            movement_type,
            quantity: row.quantity,
            stock_before: row.stock_before,
            stock_after: row.stock_after,
            reason: row.reason,
            reason_category,
            reference_document: row.reference_document,
            comments: row.comments,
            occurred_at: row.occurred_at,
        })
    }
}

const SELECT_COLUMNS: &str = "id, product_id, batch_id, user_id, movement_type, quantity, \
     stock_before, stock_after, reason, reason_category, reference_document, comments, occurred_at";

#[async_trait]
impl MovementStore for PostgresMovementStore {
    #[instrument(
        skip(self, movement),
        fields(movement_id = %movement.id, product_id = %movement.product_id),
        err
    )]
    async fn append(&self, movement: InventoryMovement) -> Result<(), MovementStoreError> {
        sqlx::query(
            r#"
            INSERT INTO inventory_movements (
                id, product_id, batch_id, user_id, movement_type, quantity,
                stock_before, stock_after, reason, reason_category,
                reference_document, comments, occurred_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(*movement.id.as_uuid())
        .bind(*movement.product_id.as_uuid())
        .bind(movement.batch_id.map(|b| *b.as_uuid()))
        .bind(movement.user_id.map(|u| *u.as_uuid()))
        .bind(movement.movement_type.as_str())
        .bind(movement.quantity)
        .bind(movement.stock_before)
        .bind(movement.stock_after)
        .bind(&movement.reason)
        .bind(movement.reason_category.map(|c| c.as_str()))
        .bind(&movement.reference_document)
        .bind(&movement.comments)
        .bind(movement.occurred_at)
        .execute(self.pool.as_ref())
        .await
        .map_err(|e| map_sqlx_error("append movement", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(product_id = %product_id), err)]
    async fn load_for_product(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<InventoryMovement>, MovementStoreError> {
        let query = format!(
            "SELECT {SELECT_COLUMNS} FROM inventory_movements \
             WHERE product_id = $1 ORDER BY occurred_at ASC, id ASC"
        );
        let rows: Vec<MovementRow> = sqlx::query_as(&query)
            .bind(*product_id.as_uuid())
            .fetch_all(self.pool.as_ref())
            .await
            .map_err(|e| map_sqlx_error("load movements", e))?;

        rows.into_iter().map(InventoryMovement::try_from).collect()
    }

    #[instrument(skip(self), fields(product_id = %product_id), err)]
    async fn has_movements(&self, product_id: ProductId) -> Result<bool, MovementStoreError> {
        let row = sqlx::query(
            "SELECT EXISTS(SELECT 1 FROM inventory_movements WHERE product_id = $1) AS present",
        )
        .bind(*product_id.as_uuid())
        .fetch_one(self.pool.as_ref())
        .await
        .map_err(|e| map_sqlx_error("check movements", e))?;

        row.try_get("present")
            .map_err(|e| map_sqlx_error("check movements", e))
    }
}

#[async_trait]
impl MovementQuery for PostgresMovementStore {
    #[instrument(
        skip(self, filter),
        fields(limit = pagination.limit, offset = pagination.offset),
        err
    )]
    async fn query_movements(
        &self,
        filter: &MovementFilter,
        pagination: Pagination,
    ) -> Result<MovementPage, MovementStoreError> {
        let product_id = filter.product_id.map(|p| *p.as_uuid());
        let movement_type = filter.movement_type.map(|t| t.as_str());

        let total_row = sqlx::query(
            r#"
            SELECT COUNT(*) AS total
            FROM inventory_movements
            WHERE ($1::uuid IS NULL OR product_id = $1)
              AND ($2::text IS NULL OR movement_type = $2)
              AND ($3::timestamptz IS NULL OR occurred_at >= $3)
              AND ($4::timestamptz IS NULL OR occurred_at <= $4)
            "#,
        )
        .bind(product_id)
        .bind(movement_type)
        .bind(filter.occurred_after)
        .bind(filter.occurred_before)
        .fetch_one(self.pool.as_ref())
        .await
        .map_err(|e| map_sqlx_error("count movements", e))?;
        let total: i64 = total_row
            .try_get("total")
            .map_err(|e| map_sqlx_error("count movements", e))?;

        let query = format!(
            "SELECT {SELECT_COLUMNS} FROM inventory_movements \
             WHERE ($1::uuid IS NULL OR product_id = $1) \
               AND ($2::text IS NULL OR movement_type = $2) \
               AND ($3::timestamptz IS NULL OR occurred_at >= $3) \
               AND ($4::timestamptz IS NULL OR occurred_at <= $4) \
             ORDER BY occurred_at DESC, id DESC \
             LIMIT $5 OFFSET $6"
        );
        let rows: Vec<MovementRow> = sqlx::query_as(&query)
            .bind(product_id)
            .bind(movement_type)
            .bind(filter.occurred_after)
            .bind(filter.occurred_before)
            .bind(i64::from(pagination.limit))
            .bind(i64::from(pagination.offset))
            .fetch_all(self.pool.as_ref())
            .await
            .map_err(|e| map_sqlx_error("query movements", e))?;

        let data = rows
            .into_iter()
            .map(InventoryMovement::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        let total = total as u64;
        let has_more = total > u64::from(pagination.offset) + u64::from(pagination.limit);

        Ok(MovementPage {
            data,
            total,
            pagination,
            has_more,
        })
    }

    #[instrument(skip(self), err)]
    async fn stats(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<LedgerStats, MovementStoreError> {
        let totals = sqlx::query(
            r#"
            SELECT
                COALESCE(SUM(quantity) FILTER (WHERE movement_type = 'IN'), 0)::bigint AS total_in,
                COALESCE(SUM(quantity) FILTER (WHERE movement_type = 'OUT'), 0)::bigint AS total_out,
                COUNT(*) FILTER (WHERE movement_type = 'ADJUSTMENT') AS adjustment_count,
                COUNT(*) FILTER (WHERE movement_type = 'TRANSFER') AS transfer_count
            FROM inventory_movements
            WHERE ($1::timestamptz IS NULL OR occurred_at >= $1)
              AND ($2::timestamptz IS NULL OR occurred_at <= $2)
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_one(self.pool.as_ref())
        .await
        .map_err(|e| map_sqlx_error("ledger stats", e))?;

        let mut stats = LedgerStats {
            total_in: totals
                .try_get("total_in")
                .map_err(|e| map_sqlx_error("ledger stats", e))?,
            total_out: totals
                .try_get("total_out")
                .map_err(|e| map_sqlx_error("ledger stats", e))?,
            adjustment_count: totals
                .try_get::<i64, _>("adjustment_count")
                .map_err(|e| map_sqlx_error("ledger stats", e))? as u64,
            transfer_count: totals
                .try_get::<i64, _>("transfer_count")
                .map_err(|e| map_sqlx_error("ledger stats", e))? as u64,
            by_reason: Default::default(),
        };

        let reason_rows = sqlx::query(
            r#"
            SELECT reason_category, SUM(quantity)::bigint AS total
            FROM inventory_movements
            WHERE reason_category IS NOT NULL
              AND ($1::timestamptz IS NULL OR occurred_at >= $1)
              AND ($2::timestamptz IS NULL OR occurred_at <= $2)
            GROUP BY reason_category
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(self.pool.as_ref())
        .await
        .map_err(|e| map_sqlx_error("ledger stats", e))?;

        for row in reason_rows {
            let raw: String = row
                .try_get("reason_category")
                .map_err(|e| map_sqlx_error("ledger stats", e))?;
            let total: i64 = row
                .try_get("total")
                .map_err(|e| map_sqlx_error("ledger stats", e))?;
            match raw.parse::<ReasonCategory>() {
                Ok(category) => {
                    stats.by_reason.insert(category, total);
                }
                Err(e) => {
                    tracing::warn!(category = %raw, error = %e, "skipping unknown reason category")
                }
            }
        }

        Ok(stats)
    }
}
