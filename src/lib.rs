//! # daily-basket
//!
//! Scheduled sales report service. Once a day it pulls the previous day's BIS and voucher
//! orders from a paginated sales API, writes each set to a spreadsheet, and mails both
//! spreadsheets to a fixed recipient with the active database recipients in CC. A failed
//! run is retried from the start under a bounded retry policy.
//!
//! A small REST API manages the CC list, passes today's sales through as JSON and can
//! trigger the report on demand.
//!
//! ## Quick Start
//!
//! ```no_run
//! use daily_basket::{Config, ReportService, run_with_shutdown};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let service = Arc::new(ReportService::new(config).await?);
//!
//!     // Watch the report task
//!     let mut events = service.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     service.spawn_scheduler()?;
//!     service.spawn_api_server();
//!     run_with_shutdown(service).await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Configuration types
pub mod config;
/// Recipient persistence
pub mod db;
/// Error types
pub mod error;
/// Paginated sales API client
pub mod fetch;
/// Tracing subscriber setup
pub mod logging;
/// Email composition and delivery
pub mod mail;
/// Spreadsheet reports
pub mod report;
/// The daily report task and its retry state machine
pub mod report_task;
/// Retry logic with backoff
pub mod retry;
/// Daily trigger time computation
pub mod scheduler;
/// Scheduler loop
pub mod scheduler_task;
/// Service facade
pub mod service;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use db::{Database, Recipient};
pub use error::{ApiError, DatabaseError, Error, ErrorDetail, Result, ToHttpStatus};
pub use fetch::{BatchFetcher, FetchError, FetchErrorKind, FetchRequest, FetchResult};
pub use report_task::{ReportTask, TaskOutcome};
pub use service::ReportService;
pub use types::{Entity, Partition, Record, ReportEvent, TaskState};

/// Run until SIGTERM/SIGINT (Ctrl+C elsewhere), then shut the service down
///
/// Also returns once the service has been shut down by other means, such as the API server
/// failing. Failing to register a signal handler is an error.
pub async fn run_with_shutdown(service: std::sync::Arc<ReportService>) -> Result<()> {
    let stopped = service.shutdown_token();
    tokio::select! {
        signal = termination_signal() => {
            let signal = signal?;
            tracing::info!(signal, "Termination signal received");
            service.shutdown().await
        }
        _ = stopped.cancelled() => {
            tracing::info!("Report service stopped without a signal");
            Ok(())
        }
    }
}

#[cfg(unix)]
async fn termination_signal() -> Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    tokio::select! {
        _ = sigterm.recv() => Ok("SIGTERM"),
        _ = sigint.recv() => Ok("SIGINT"),
    }
}

#[cfg(not(unix))]
async fn termination_signal() -> Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    Ok("Ctrl+C")
}
