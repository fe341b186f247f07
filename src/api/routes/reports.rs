//! Manual report trigger.

use super::SendEmailQuery;
use crate::api::AppState;
use crate::error::{Error, Result};
use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::NaiveDate;

/// POST /send-email - Run the daily report now
///
/// Blocks until the task reaches a terminal state, retries included.
#[utoipa::path(
    post,
    path = "/send-email",
    tag = "reports",
    params(SendEmailQuery),
    responses(
        (status = 200, description = "Reports delivered; body is the task outcome"),
        (status = 400, description = "Invalid date", body = crate::error::ApiError),
        (status = 502, description = "Task failed permanently; body is the task outcome")
    )
)]
pub async fn send_email(
    State(state): State<AppState>,
    Query(query): Query<SendEmailQuery>,
) -> Result<Response> {
    let date = query
        .date
        .as_deref()
        .map(|raw| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
                Error::Validation(format!("invalid date '{}', expected YYYY-MM-DD", raw))
            })
        })
        .transpose()?;

    tracing::info!(?date, "Manual report run requested");
    let outcome = state
        .service
        .run_report_now(date, query.retry.unwrap_or(true))
        .await;

    let status = if outcome.is_success() {
        StatusCode::OK
    } else {
        StatusCode::BAD_GATEWAY
    };
    Ok((status, Json(outcome)).into_response())
}
