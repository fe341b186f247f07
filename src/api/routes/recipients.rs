//! CC recipient management handlers.

use super::{CreateRecipientRequest, MessageResponse, RecipientResponse, UpdateRecipientRequest};
use crate::api::AppState;
use crate::db::{NewRecipient, Recipient, RecipientUpdate};
use crate::error::{ApiError, Error, Result};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

/// GET /email-recipients - List recipients
#[utoipa::path(
    get,
    path = "/email-recipients",
    tag = "recipients",
    responses(
        (status = 200, description = "All recipients, active or not", body = Vec<Recipient>),
        (status = 500, description = "Internal server error", body = ApiError)
    )
)]
pub async fn list_recipients(State(state): State<AppState>) -> Result<Json<Vec<Recipient>>> {
    let recipients = state.service.db.list_recipients().await?;
    Ok(Json(recipients))
}

/// POST /email-recipients - Add recipient
#[utoipa::path(
    post,
    path = "/email-recipients",
    tag = "recipients",
    request_body = CreateRecipientRequest,
    responses(
        (status = 201, description = "Recipient added", body = RecipientResponse),
        (status = 400, description = "Missing email", body = ApiError),
        (status = 409, description = "Email already registered", body = ApiError)
    )
)]
pub async fn add_recipient(
    State(state): State<AppState>,
    Json(request): Json<CreateRecipientRequest>,
) -> Result<impl IntoResponse> {
    let email = request
        .email
        .filter(|email| !email.trim().is_empty())
        .ok_or_else(|| Error::Validation("Missing 'email' field".to_string()))?;

    let recipient = state
        .service
        .db
        .insert_recipient(NewRecipient {
            email,
            name: request.name,
            active: request.active.unwrap_or(true),
        })
        .await?;

    tracing::info!(id = recipient.id, email = %recipient.email, "Recipient added");
    Ok((
        StatusCode::CREATED,
        Json(RecipientResponse {
            message: "Recipient added successfully.".to_string(),
            recipient,
        }),
    ))
}

/// PUT /email-recipients/:id - Update recipient
#[utoipa::path(
    put,
    path = "/email-recipients/{id}",
    tag = "recipients",
    params(("id" = i64, Path, description = "Recipient ID")),
    request_body = UpdateRecipientRequest,
    responses(
        (status = 200, description = "Recipient updated", body = RecipientResponse),
        (status = 404, description = "Recipient not found", body = ApiError),
        (status = 409, description = "Email belongs to another recipient", body = ApiError)
    )
)]
pub async fn update_recipient(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateRecipientRequest>,
) -> Result<Json<RecipientResponse>> {
    let update = RecipientUpdate {
        email: request.email,
        name: request.name,
        active: request.active,
    };

    let recipient = state
        .service
        .db
        .update_recipient(id, update)
        .await?
        .ok_or_else(|| Error::NotFound(format!("recipient {}", id)))?;

    tracing::info!(id, "Recipient updated");
    Ok(Json(RecipientResponse {
        message: "Recipient updated successfully.".to_string(),
        recipient,
    }))
}

/// DELETE /email-recipients/:id - Delete recipient
#[utoipa::path(
    delete,
    path = "/email-recipients/{id}",
    tag = "recipients",
    params(("id" = i64, Path, description = "Recipient ID")),
    responses(
        (status = 200, description = "Recipient deleted", body = MessageResponse),
        (status = 404, description = "Recipient not found", body = ApiError)
    )
)]
pub async fn delete_recipient(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>> {
    if !state.service.db.delete_recipient(id).await? {
        return Err(Error::NotFound(format!("recipient {}", id)));
    }

    tracing::info!(id, "Recipient deleted");
    Ok(Json(MessageResponse {
        message: "Recipient deleted successfully.".to_string(),
    }))
}
