use chrono::{DateTime, Utc};
use serde::Deserialize;

use kardex_infra::movement_store::{LedgerStats, MovementPage};
use kardex_movements::InventoryMovement;
use kardex_products::Product;

// -------------------------
// Query DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct ListProductsQuery {
    pub active: Option<bool>,
    pub low_stock: Option<bool>,
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListMovementsQuery {
    pub product_id: Option<String>,
    pub movement_type: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct ProductMovementsQuery {
    pub limit: Option<u32>,
}

// -------------------------
// JSON mapping helpers
// -------------------------

pub fn product_to_json(p: Product) -> serde_json::Value {
    let low_stock = p.is_low_stock();
    serde_json::json!({
        "id": p.id.to_string(),
        "code": p.code,
        "barcode": p.barcode,
        "name": p.name,
        "description": p.description,
        "category": p.category,
        "location": p.location,
        "supplier": p.supplier,
        "unit": p.unit,
        "pricing": {
            "cost_price": p.pricing.cost_price,
            "sale_price": p.pricing.sale_price,
            "currency": p.pricing.currency,
        },
        "dimensions": {
            "length_mm": p.dimensions.length_mm,
            "width_mm": p.dimensions.width_mm,
            "height_mm": p.dimensions.height_mm,
            "weight_g": p.dimensions.weight_g,
        },
        "stock_current": p.stock_current,
        "stock_min": p.stock_min,
        "stock_max": p.stock_max,
        "low_stock": low_stock,
        "active": p.active,
        "created_at": p.created_at.to_rfc3339(),
        "updated_at": p.updated_at.to_rfc3339(),
        "version": p.version,
    })
}

pub fn movement_to_json(m: InventoryMovement) -> serde_json::Value {
    serde_json::json!({
        "id": m.id.to_string(),
        "product_id": m.product_id.to_string(),
        "movement_type": m.movement_type.as_str(),
        "quantity": m.quantity,
        "stock_before": m.stock_before,
        "stock_after": m.stock_after,
        "reason": m.reason,
        "reason_category": m.reason_category.map(|c| c.as_str()),
        "batch_id": m.batch_id.map(|b| b.to_string()),
        "user_id": m.user_id.map(|u| u.to_string()),
        "reference_document": m.reference_document,
        "comments": m.comments,
        "occurred_at": m.occurred_at.to_rfc3339(),
    })
}

pub fn movement_page_to_json(page: MovementPage) -> serde_json::Value {
    serde_json::json!({
        "movements": page.data.into_iter().map(movement_to_json).collect::<Vec<_>>(),
        "total": page.total,
        "pagination": {
            "limit": page.pagination.limit,
            "offset": page.pagination.offset,
        },
        "has_more": page.has_more,
    })
}

pub fn stats_to_json(stats: LedgerStats) -> serde_json::Value {
    let by_reason = stats
        .by_reason
        .iter()
        .map(|(category, quantity)| (category.as_str().to_string(), serde_json::json!(quantity)))
        .collect::<serde_json::Map<_, _>>();

    serde_json::json!({
        "total_in": stats.total_in,
        "total_out": stats.total_out,
        "adjustment_count": stats.adjustment_count,
        "transfer_count": stats.transfer_count,
        "by_reason": by_reason,
    })
}
