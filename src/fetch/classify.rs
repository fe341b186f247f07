//! Failure classification for the sales API
//!
//! Every way a count or page request can go wrong ends up as a [`FetchError`] with one of
//! four [`FetchErrorKind`]s. Callers never see a raw `reqwest::Error`.

use crate::types::Entity;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;
use utoipa::ToSchema;

/// Operator-facing explanation for connection failures
pub const CONNECTION_DETAILS: &str =
    "The server might be unavailable or the connection was refused.";

/// Operator-facing explanation for timeouts
pub const TIMEOUT_DETAILS: &str = "The server did not respond in time. Please try again later.";

/// Longest body excerpt kept as failure context
const SNAPSHOT_LIMIT: usize = 2048;

/// Classified failure kind
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FetchErrorKind {
    /// Connection refused or host unreachable
    ConnectionUnavailable,
    /// No response within the configured timeout
    Timeout,
    /// Non-2xx status or any other transport failure
    RequestRejected,
    /// 2xx response whose body lacks an expected key (or is not JSON at all)
    MalformedResponse {
        /// The key that was missing or had the wrong shape
        missing_field: String,
    },
}

/// Which request of a fetch failed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchStage {
    /// The count request
    Count,
    /// A page request at the given offset
    Page {
        /// Offset of the failed page
        offset: u64,
    },
}

impl fmt::Display for FetchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchStage::Count => f.write_str("count"),
            FetchStage::Page { .. } => f.write_str("data"),
        }
    }
}

/// A classified fetch failure
#[derive(Clone, Debug, Error, Serialize)]
#[error("{message}")]
pub struct FetchError {
    /// Classified kind
    pub kind: FetchErrorKind,
    /// Which stage failed for which entity
    pub message: String,
    /// Operator-facing explanation
    pub details: String,
    /// Response snapshot, when a response was received
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

impl FetchError {
    /// Failure payload returned by the sales routes: `{error, details, kind}`
    pub fn to_payload(&self) -> Value {
        serde_json::json!({
            "error": self.message,
            "details": self.details,
            "kind": self.kind,
        })
    }
}

/// Classify a transport-level failure (no usable response)
pub(crate) fn transport_failure(
    err: &reqwest::Error,
    entity: Entity,
    stage: FetchStage,
) -> FetchError {
    if err.is_timeout() {
        FetchError {
            kind: FetchErrorKind::Timeout,
            message: format!("Request timed out while fetching {} {}", entity, stage),
            details: TIMEOUT_DETAILS.to_string(),
            context: None,
        }
    } else if err.is_connect() {
        FetchError {
            kind: FetchErrorKind::ConnectionUnavailable,
            message: format!(
                "Failed to connect to the server while fetching {} {}",
                entity, stage
            ),
            details: CONNECTION_DETAILS.to_string(),
            context: None,
        }
    } else {
        FetchError {
            kind: FetchErrorKind::RequestRejected,
            message: format!("An error occurred while fetching {} {}", entity, stage),
            details: err.to_string(),
            context: None,
        }
    }
}

/// Classify a response with a non-2xx status
pub(crate) fn rejected_status(
    status: StatusCode,
    body: &str,
    entity: Entity,
    stage: FetchStage,
) -> FetchError {
    FetchError {
        kind: FetchErrorKind::RequestRejected,
        message: format!("An error occurred while fetching {} {}", entity, stage),
        details: format!("server responded with status {}", status),
        context: Some(snapshot(body)),
    }
}

/// Classify a 2xx response whose body lacks `field` (or is not JSON)
pub(crate) fn malformed(field: &str, body: &str, entity: Entity, stage: FetchStage) -> FetchError {
    FetchError {
        kind: FetchErrorKind::MalformedResponse {
            missing_field: field.to_string(),
        },
        message: format!("Response for {} {} is missing '{}'", entity, stage, field),
        details: format!("the response body did not contain a usable '{}' value", field),
        context: Some(snapshot(body)),
    }
}

/// Body snapshot kept as context: parsed JSON when possible, else the leading text
fn snapshot(body: &str) -> Value {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        return value;
    }
    let excerpt: String = body.chars().take(SNAPSHOT_LIMIT).collect();
    Value::String(excerpt)
}
