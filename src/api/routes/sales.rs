//! Today's sales passthrough handlers.

use crate::api::AppState;
use crate::error::Result;
use crate::types::{Entity, Partition};
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// Fetch today's records for one entity and partition
///
/// Records come back as a JSON array; a failed fetch is answered with 502 and the
/// `{error, details, kind}` payload.
async fn daily_sales(state: &AppState, entity: Entity, partition: Partition) -> Result<Response> {
    let response = match state.service.fetch_daily_sales(entity, partition).await? {
        Ok(records) => (StatusCode::OK, Json(records)).into_response(),
        Err(e) => {
            tracing::warn!(%entity, %partition, error = %e, "Daily sales fetch failed");
            (StatusCode::BAD_GATEWAY, Json(e.to_payload())).into_response()
        }
    };
    Ok(response)
}

/// GET /orders-daily-voucher-sales - Today's voucher orders
#[utoipa::path(
    get,
    path = "/orders-daily-voucher-sales",
    tag = "sales",
    responses(
        (status = 200, description = "Today's voucher orders"),
        (status = 502, description = "Sales API failure with {error, details, kind}")
    )
)]
pub async fn orders_daily_voucher_sales(State(state): State<AppState>) -> Result<Response> {
    daily_sales(&state, Entity::Orders, Partition::Voucher).await
}

/// GET /invoices-daily-voucher-sales - Today's voucher invoices
#[utoipa::path(
    get,
    path = "/invoices-daily-voucher-sales",
    tag = "sales",
    responses(
        (status = 200, description = "Today's voucher invoices"),
        (status = 502, description = "Sales API failure with {error, details, kind}")
    )
)]
pub async fn invoices_daily_voucher_sales(State(state): State<AppState>) -> Result<Response> {
    daily_sales(&state, Entity::Invoices, Partition::Voucher).await
}

/// GET /orders-daily-bis-sales - Today's BIS orders
#[utoipa::path(
    get,
    path = "/orders-daily-bis-sales",
    tag = "sales",
    responses(
        (status = 200, description = "Today's BIS orders"),
        (status = 502, description = "Sales API failure with {error, details, kind}")
    )
)]
pub async fn orders_daily_bis_sales(State(state): State<AppState>) -> Result<Response> {
    daily_sales(&state, Entity::Orders, Partition::Bis).await
}

/// GET /invoices-daily-bis-sales - Today's BIS invoices
#[utoipa::path(
    get,
    path = "/invoices-daily-bis-sales",
    tag = "sales",
    responses(
        (status = 200, description = "Today's BIS invoices"),
        (status = 502, description = "Sales API failure with {error, details, kind}")
    )
)]
pub async fn invoices_daily_bis_sales(State(state): State<AppState>) -> Result<Response> {
    daily_sales(&state, Entity::Invoices, Partition::Bis).await
}
