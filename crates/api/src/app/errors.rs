use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use kardex_core::DomainError;
use kardex_infra::ledger::LedgerError;
use kardex_infra::movement_store::MovementStoreError;
use kardex_infra::product_store::ProductStoreError;
use kardex_movements::MovementType;

pub fn ledger_error_to_response(err: LedgerError) -> axum::response::Response {
    match err {
        LedgerError::Domain(e) => domain_error_to_response(e),
        LedgerError::Movements(MovementStoreError::InvalidAppend(msg)) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invalid_append", msg)
        }
        LedgerError::Movements(MovementStoreError::Storage(msg)) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "storage_error", msg)
        }
        LedgerError::Products(ProductStoreError::NotFound) => {
            json_error(StatusCode::NOT_FOUND, "not_found", "product not found")
        }
        LedgerError::Products(ProductStoreError::Conflict(msg)) => {
            json_error(StatusCode::CONFLICT, "conflict", msg)
        }
        LedgerError::Products(ProductStoreError::Storage(msg)) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "storage_error", msg)
        }
    }
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::Validation(msg) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "validation_failed", msg)
        }
        DomainError::InvalidArgument(msg) => {
            json_error(StatusCode::BAD_REQUEST, "invalid_argument", msg)
        }
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
        DomainError::NotFound { entity, id } => json_error(
            StatusCode::NOT_FOUND,
            "not_found",
            format!("{entity} not found: {id}"),
        ),
        DomainError::InsufficientStock {
            available,
            requested,
        } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            axum::Json(json!({
                "error": "insufficient_stock",
                "message": format!("insufficient stock: requested {requested}, available {available}"),
                "available": available,
                "requested": requested,
            })),
        )
            .into_response(),
        DomainError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn parse_movement_type(s: &str) -> Result<MovementType, axum::response::Response> {
    s.parse::<MovementType>().map_err(|_| {
        json_error(
            StatusCode::BAD_REQUEST,
            "invalid_movement_type",
            "movement_type must be one of: IN, OUT, ADJUSTMENT, TRANSFER",
        )
    })
}
