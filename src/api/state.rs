//! Application state for the API server

use crate::ReportService;
use std::sync::Arc;

/// Shared application state accessible to all route handlers
#[derive(Clone)]
pub struct AppState {
    /// The running report service
    pub service: Arc<ReportService>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(service: Arc<ReportService>) -> Self {
        Self { service }
    }
}
