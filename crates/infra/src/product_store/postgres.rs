//! PostgreSQL-backed product store.
//!
//! ## Schema
//!
//! Expects a `products` table:
//!
//! ```sql
//! CREATE TABLE products (
//!     id UUID PRIMARY KEY,
//!     code TEXT NOT NULL,
//!     barcode TEXT,
//!     name TEXT NOT NULL,
//!     description TEXT,
//!     category TEXT,
//!     location TEXT,
//!     supplier TEXT,
//!     unit TEXT,
//!     cost_price BIGINT NOT NULL,
//!     sale_price BIGINT,
//!     currency TEXT,
//!     length_mm INTEGER,
//!     width_mm INTEGER,
//!     height_mm INTEGER,
//!     weight_g INTEGER,
//!     stock_current BIGINT NOT NULL CHECK (stock_current >= 0),
//!     stock_min BIGINT,
//!     stock_max BIGINT,
//!     active BOOLEAN NOT NULL,
//!     created_at TIMESTAMPTZ NOT NULL,
//!     updated_at TIMESTAMPTZ NOT NULL,
//!     version BIGINT NOT NULL
//! );
//! CREATE UNIQUE INDEX products_active_code ON products (code) WHERE active;
//! CREATE UNIQUE INDEX products_active_barcode
//!     ON products (barcode) WHERE active AND barcode IS NOT NULL;
//! ```
//!
//! The partial unique indexes back the catalog's uniqueness checks, so a
//! race between two writers surfaces as `Conflict` instead of a duplicate.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::instrument;
use uuid::Uuid;

use kardex_core::{ExpectedVersion, ProductId};
use kardex_products::{Dimensions, Pricing, Product};

use super::store::{ProductFilter, ProductStore, ProductStoreError};

/// Product store backed by PostgreSQL.
pub struct PostgresProductStore {
    pool: Arc<PgPool>,
}

impl PostgresProductStore {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(
        e,
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505")
    )
}

fn map_sqlx_error(operation: &str, e: sqlx::Error) -> ProductStoreError {
    match &e {
        sqlx::Error::Database(db_err) => {
            tracing::error!(operation, error = %db_err, "database error");
            ProductStoreError::Storage(format!("{operation}: {db_err}"))
        }
        sqlx::Error::PoolClosed => {
            ProductStoreError::Storage(format!("{operation}: connection pool closed"))
        }
        _ => {
            tracing::error!(operation, error = %e, "unexpected sqlx error");
            ProductStoreError::Storage(format!("{operation}: {e}"))
        }
    }
}

/// Raw row shape as stored in `products`.
struct ProductRow {
    id: Uuid,
    code: String,
    barcode: Option<String>,
    name: String,
    description: Option<String>,
    category: Option<String>,
    location: Option<String>,
    supplier: Option<String>,
    unit: Option<String>,
    cost_price: i64,
    sale_price: Option<i64>,
    currency: Option<String>,
    length_mm: Option<i32>,
    width_mm: Option<i32>,
    height_mm: Option<i32>,
    weight_g: Option<i32>,
    stock_current: i64,
    stock_min: Option<i64>,
    stock_max: Option<i64>,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: i64,
}

impl<'r> sqlx::FromRow<'r, PgRow> for ProductRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            code: row.try_get("code")?,
            barcode: row.try_get("barcode")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            category: row.try_get("category")?,
            location: row.try_get("location")?,
            supplier: row.try_get("supplier")?,
            unit: row.try_get("unit")?,
            cost_price: row.try_get("cost_price")?,
            sale_price: row.try_get("sale_price")?,
            currency: row.try_get("currency")?,
            length_mm: row.try_get("length_mm")?,
            width_mm: row.try_get("width_mm")?,
            height_mm: row.try_get("height_mm")?,
            weight_g: row.try_get("weight_g")?,
            stock_current: row.try_get("stock_current")?,
            stock_min: row.try_get("stock_min")?,
            stock_max: row.try_get("stock_max")?,
            active: row.try_get("active")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            version: row.try_get("version")?,
        })
    }
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: ProductId::from_uuid(row.id),
            code: row.code,
            barcode: row.barcode,
            name: row.name,
            description: row.description,
            category: row.category,
            location: row.location,
            supplier: row.supplier,
            unit: row.unit,
            pricing: Pricing {
                cost_price: row.cost_price as u64,
                sale_price: row.sale_price.map(|v| v as u64),
                currency: row.currency,
            },
            dimensions: Dimensions {
                length_mm: row.length_mm.map(|v| v as u32),
                width_mm: row.width_mm.map(|v| v as u32),
                height_mm: row.height_mm.map(|v| v as u32),
                weight_g: row.weight_g.map(|v| v as u32),
            },
            stock_current: row.stock_current,
            stock_min: row.stock_min,
            stock_max: row.stock_max,
            active: row.active,
            created_at: row.created_at,
            updated_at: row.updated_at,
            version: row.version as u64,
        }
    }
}

const SELECT_COLUMNS: &str = "id, code, barcode, name, description, category, location, supplier, \
     unit, cost_price, sale_price, currency, length_mm, width_mm, height_mm, weight_g, \
     stock_current, stock_min, stock_max, active, created_at, updated_at, version";

#[async_trait]
impl ProductStore for PostgresProductStore {
    #[instrument(skip(self, product), fields(product_id = %product.id, code = %product.code), err)]
    async fn insert(&self, product: Product) -> Result<(), ProductStoreError> {
        sqlx::query(
            r#"
            INSERT INTO products (
                id, code, barcode, name, description, category, location, supplier,
                unit, cost_price, sale_price, currency, length_mm, width_mm,
                height_mm, weight_g, stock_current, stock_min, stock_max, active,
                created_at, updated_at, version
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                    $15, $16, $17, $18, $19, $20, $21, $22, $23)
            "#,
        )
        .bind(*product.id.as_uuid())
        .bind(&product.code)
        .bind(&product.barcode)
        .bind(&product.name)
        .bind(&product.description)
        .bind(&product.category)
        .bind(&product.location)
        .bind(&product.supplier)
        .bind(&product.unit)
        .bind(product.pricing.cost_price as i64)
        .bind(product.pricing.sale_price.map(|v| v as i64))
        .bind(&product.pricing.currency)
        .bind(product.dimensions.length_mm.map(|v| v as i32))
        .bind(product.dimensions.width_mm.map(|v| v as i32))
        .bind(product.dimensions.height_mm.map(|v| v as i32))
        .bind(product.dimensions.weight_g.map(|v| v as i32))
        .bind(product.stock_current)
        .bind(product.stock_min)
        .bind(product.stock_max)
        .bind(product.active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .bind(product.version as i64)
        .execute(self.pool.as_ref())
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ProductStoreError::Conflict(format!("product {} already exists", product.id))
            } else {
                map_sqlx_error("insert product", e)
            }
        })?;
        Ok(())
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn get(&self, id: ProductId) -> Result<Option<Product>, ProductStoreError> {
        let query = format!("SELECT {SELECT_COLUMNS} FROM products WHERE id = $1");
        let row: Option<ProductRow> = sqlx::query_as(&query)
            .bind(*id.as_uuid())
            .fetch_optional(self.pool.as_ref())
            .await
            .map_err(|e| map_sqlx_error("get product", e))?;
        Ok(row.map(Product::from))
    }

    #[instrument(skip(self, product), fields(product_id = %product.id), err)]
    async fn update(
        &self,
        product: Product,
        expected: ExpectedVersion,
    ) -> Result<(), ProductStoreError> {
        let expected_version = match expected {
            ExpectedVersion::Any => None,
            ExpectedVersion::Exact(v) => Some(v as i64),
        };

        let result = sqlx::query(
            r#"
            UPDATE products SET
                code = $3, barcode = $4, name = $5, description = $6, category = $7,
                location = $8, supplier = $9, unit = $10, cost_price = $11,
                sale_price = $12, currency = $13, length_mm = $14, width_mm = $15,
                height_mm = $16, weight_g = $17, stock_current = $18, stock_min = $19,
                stock_max = $20, active = $21, updated_at = $22, version = $23
            WHERE id = $1 AND ($2::bigint IS NULL OR version = $2)
            "#,
        )
        .bind(*product.id.as_uuid())
        .bind(expected_version)
        .bind(&product.code)
        .bind(&product.barcode)
        .bind(&product.name)
        .bind(&product.description)
        .bind(&product.category)
        .bind(&product.location)
        .bind(&product.supplier)
        .bind(&product.unit)
        .bind(product.pricing.cost_price as i64)
        .bind(product.pricing.sale_price.map(|v| v as i64))
        .bind(&product.pricing.currency)
        .bind(product.dimensions.length_mm.map(|v| v as i32))
        .bind(product.dimensions.width_mm.map(|v| v as i32))
        .bind(product.dimensions.height_mm.map(|v| v as i32))
        .bind(product.dimensions.weight_g.map(|v| v as i32))
        .bind(product.stock_current)
        .bind(product.stock_min)
        .bind(product.stock_max)
        .bind(product.active)
        .bind(product.updated_at)
        .bind(product.version as i64)
        .execute(self.pool.as_ref())
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ProductStoreError::Conflict(format!(
                    "code or barcode of product {} is already in use",
                    product.id
                ))
            } else {
                map_sqlx_error("update product", e)
            }
        })?;

        if result.rows_affected() == 0 {
            // Distinguish a stale version from a missing row.
            if self.get(product.id).await?.is_some() {
                return Err(ProductStoreError::Conflict(format!(
                    "version check failed for product {}",
                    product.id
                )));
            }
            return Err(ProductStoreError::NotFound);
        }
        Ok(())
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn delete(&self, id: ProductId) -> Result<(), ProductStoreError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(*id.as_uuid())
            .execute(self.pool.as_ref())
            .await
            .map_err(|e| map_sqlx_error("delete product", e))?;
        if result.rows_affected() == 0 {
            return Err(ProductStoreError::NotFound);
        }
        Ok(())
    }

    #[instrument(skip(self, exclude), fields(code = %code), err)]
    async fn find_active_by_code(
        &self,
        code: &str,
        exclude: Option<ProductId>,
    ) -> Result<Option<Product>, ProductStoreError> {
        let query = format!(
            "SELECT {SELECT_COLUMNS} FROM products \
             WHERE active AND code = $1 AND ($2::uuid IS NULL OR id <> $2) LIMIT 1"
        );
        let row: Option<ProductRow> = sqlx::query_as(&query)
            .bind(code)
            .bind(exclude.map(|id| *id.as_uuid()))
            .fetch_optional(self.pool.as_ref())
            .await
            .map_err(|e| map_sqlx_error("find product by code", e))?;
        Ok(row.map(Product::from))
    }

    #[instrument(skip(self, exclude), fields(barcode = %barcode), err)]
    async fn find_active_by_barcode(
        &self,
        barcode: &str,
        exclude: Option<ProductId>,
    ) -> Result<Option<Product>, ProductStoreError> {
        let query = format!(
            "SELECT {SELECT_COLUMNS} FROM products \
             WHERE active AND barcode = $1 AND ($2::uuid IS NULL OR id <> $2) LIMIT 1"
        );
        let row: Option<ProductRow> = sqlx::query_as(&query)
            .bind(barcode)
            .bind(exclude.map(|id| *id.as_uuid()))
            .fetch_optional(self.pool.as_ref())
            .await
            .map_err(|e| map_sqlx_error("find product by barcode", e))?;
        Ok(row.map(Product::from))
    }

    #[instrument(skip(self, filter), err)]
    async fn list(&self, filter: &ProductFilter) -> Result<Vec<Product>, ProductStoreError> {
        let query = format!(
            "SELECT {SELECT_COLUMNS} FROM products \
             WHERE ($1::boolean IS NULL OR active = $1) \
               AND (NOT $2 OR (stock_min IS NOT NULL AND stock_current <= stock_min)) \
               AND ($3::text IS NULL \
                    OR code ILIKE '%' || $3 || '%' \
                    OR name ILIKE '%' || $3 || '%' \
                    OR barcode ILIKE '%' || $3 || '%' \
                    OR category ILIKE '%' || $3 || '%' \
                    OR location ILIKE '%' || $3 || '%') \
             ORDER BY code ASC"
        );
        let rows: Vec<ProductRow> = sqlx::query_as(&query)
            .bind(filter.active)
            .bind(filter.low_stock)
            .bind(&filter.search)
            .fetch_all(self.pool.as_ref())
            .await
            .map_err(|e| map_sqlx_error("list products", e))?;
        Ok(rows.into_iter().map(Product::from).collect())
    }
}
