//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`recipients`]: CC recipient management
//! - [`sales`]: Today's sales passthrough
//! - [`reports`]: Manual report trigger
//! - [`system`]: Index, health, OpenAPI

use crate::db::Recipient;
use serde::{Deserialize, Serialize};

mod recipients;
mod reports;
mod sales;
mod system;

pub use recipients::*;
pub use reports::*;
pub use sales::*;
pub use system::*;

/// Request body for POST /email-recipients
#[derive(Debug, Default, Deserialize, Serialize, utoipa::ToSchema)]
pub struct CreateRecipientRequest {
    /// Email address (required)
    pub email: Option<String>,
    /// Display name
    pub name: Option<String>,
    /// Whether the recipient is copied on reports (default: true)
    pub active: Option<bool>,
}

/// Request body for PUT /email-recipients/:id; absent fields are left unchanged
#[derive(Debug, Default, Deserialize, Serialize, utoipa::ToSchema)]
pub struct UpdateRecipientRequest {
    /// New email address
    pub email: Option<String>,
    /// New display name
    pub name: Option<String>,
    /// New active flag
    pub active: Option<bool>,
}

/// Confirmation message
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct MessageResponse {
    /// Human-readable confirmation
    pub message: String,
}

/// Confirmation message with the affected recipient
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct RecipientResponse {
    /// Human-readable confirmation
    pub message: String,
    /// The recipient after the change
    pub recipient: Recipient,
}

/// Query parameters for POST /send-email
#[derive(Debug, Default, Deserialize, Serialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SendEmailQuery {
    /// Day to report on as YYYY-MM-DD (default: yesterday)
    pub date: Option<String>,
    /// Apply the retry policy (default: true)
    pub retry: Option<bool>,
}
