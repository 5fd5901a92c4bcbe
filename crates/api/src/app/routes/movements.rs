//! Movement ledger endpoints.
//!
//! The ledger is append-only: movements enter through POST and everything
//! else is a read-only query over the recorded history.

use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use kardex_core::ProductId;
use kardex_infra::movement_store::{MovementFilter, Pagination};
use kardex_movements::MovementRequest;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

// ─────────────────────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────────────────────

pub fn router() -> Router {
    Router::new()
        .route("/", post(record_movement).get(list_movements))
        .route("/stats", get(movement_stats))
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// POST /movements
///
/// Record one stock movement. The request is validated before any state is
/// touched; an accepted movement comes back with its stock snapshots filled in.
pub async fn record_movement(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<MovementRequest>,
) -> axum::response::Response {
    match services.record_movement(body).await {
        Ok(movement) => {
            (StatusCode::CREATED, Json(dto::movement_to_json(movement))).into_response()
        }
        Err(e) => errors::ledger_error_to_response(e),
    }
}

/// GET /movements?product_id=X&movement_type=IN&limit=50&offset=0
///
/// List movements, newest first, with optional filters and pagination.
///
/// Query parameters:
/// - `product_id`: Filter by product (UUID)
/// - `movement_type`: Filter by type (IN, OUT, ADJUSTMENT, TRANSFER)
/// - `from`: Only movements at or after this timestamp (ISO 8601)
/// - `to`: Only movements at or before this timestamp (ISO 8601)
/// - `limit`: Maximum number of movements to return (default: 50, max: 1000)
/// - `offset`: Pagination offset (default: 0)
pub async fn list_movements(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::ListMovementsQuery>,
) -> axum::response::Response {
    let product_id = match query.product_id {
        Some(raw) => match raw.parse::<ProductId>() {
            Ok(id) => Some(id),
            Err(_) => {
                return errors::json_error(
                    StatusCode::BAD_REQUEST,
                    "invalid_id",
                    "invalid product id",
                )
            }
        },
        None => None,
    };

    let movement_type = match query.movement_type {
        Some(raw) => match errors::parse_movement_type(&raw) {
            Ok(t) => Some(t),
            Err(resp) => return resp,
        },
        None => None,
    };

    let filter = MovementFilter {
        product_id,
        movement_type,
        occurred_after: query.from,
        occurred_before: query.to,
    };
    let pagination = Pagination::new(query.limit, query.offset);

    match services.list_movements(filter, pagination).await {
        Ok(page) => (StatusCode::OK, Json(dto::movement_page_to_json(page))).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

/// GET /movements/stats?from=...&to=...
///
/// Aggregate ledger activity inside an optional time window. A window with
/// no movements returns all-zero totals rather than an error.
pub async fn movement_stats(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::StatsQuery>,
) -> axum::response::Response {
    match services.movement_stats(query.from, query.to).await {
        Ok(stats) => (StatusCode::OK, Json(dto::stats_to_json(stats))).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}
