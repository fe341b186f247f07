//! Database layer for daily-basket
//!
//! SQLite persistence for the email recipients that receive the daily report in CC.
//!
//! ## Submodules
//!
//! Methods on [`Database`] are organized by domain:
//! - [`migrations`]: Database lifecycle, schema migrations
//! - [`recipients`]: Email recipient CRUD

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, sqlite::SqlitePool};
use utoipa::ToSchema;

mod migrations;
mod recipients;

/// Email recipient row
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize, ToSchema)]
pub struct Recipient {
    /// Row id
    pub id: i64,
    /// Email address (unique)
    pub email: String,
    /// Optional display name
    pub name: Option<String>,
    /// Whether the recipient is copied on the daily report
    pub active: bool,
}

/// New recipient to be inserted
#[derive(Debug, Clone)]
pub struct NewRecipient {
    /// Email address
    pub email: String,
    /// Optional display name
    pub name: Option<String>,
    /// Whether the recipient receives the report
    pub active: bool,
}

/// Partial update of a recipient; `None` fields are left unchanged
#[derive(Debug, Clone, Default)]
pub struct RecipientUpdate {
    /// New email address
    pub email: Option<String>,
    /// New display name
    pub name: Option<String>,
    /// New active flag
    pub active: Option<bool>,
}

/// Database handle for daily-basket
pub struct Database {
    pool: SqlitePool,
}
