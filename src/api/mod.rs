//! REST API server module
//!
//! Exposes recipient management, the daily sales passthrough and a manual trigger for the
//! report task, documented with OpenAPI.

use crate::{ReportService, Result};
use axum::{
    Router,
    routing::{get, post, put},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod error_response;
pub mod openapi;
pub mod routes;
pub mod state;

pub use openapi::ApiDoc;
pub use state::AppState;

/// Create the API router with all route definitions
///
/// # Routes
///
/// ## Recipients
/// - `GET /email-recipients` - List recipients
/// - `POST /email-recipients` - Add recipient
/// - `PUT /email-recipients/:id` - Update recipient
/// - `DELETE /email-recipients/:id` - Delete recipient
///
/// ## Sales
/// - `GET /orders-daily-voucher-sales`
/// - `GET /invoices-daily-voucher-sales`
/// - `GET /orders-daily-bis-sales`
/// - `GET /invoices-daily-bis-sales`
///
/// ## Reports
/// - `POST /send-email` - Run the report task now
///
/// ## System
/// - `GET /` - Banner
/// - `GET /health` - Health check
/// - `GET /openapi.json` - OpenAPI specification
/// - `GET /swagger-ui` - Swagger UI (if enabled)
pub fn create_router(service: Arc<ReportService>) -> Router {
    let swagger_ui = service.config.server.swagger_ui;
    let state = AppState::new(service);

    let router = Router::new()
        // Recipients
        .route(
            "/email-recipients",
            get(routes::list_recipients).post(routes::add_recipient),
        )
        .route(
            "/email-recipients/:id",
            put(routes::update_recipient).delete(routes::delete_recipient),
        )
        // Sales
        .route(
            "/orders-daily-voucher-sales",
            get(routes::orders_daily_voucher_sales),
        )
        .route(
            "/invoices-daily-voucher-sales",
            get(routes::invoices_daily_voucher_sales),
        )
        .route("/orders-daily-bis-sales", get(routes::orders_daily_bis_sales))
        .route(
            "/invoices-daily-bis-sales",
            get(routes::invoices_daily_bis_sales),
        )
        // Reports
        .route("/send-email", post(routes::send_email))
        // System
        .route("/", get(routes::index))
        .route("/health", get(routes::health_check))
        .route("/openapi.json", get(routes::openapi_spec));

    // Swagger UI serves its own copy of the spec so it cannot clash with /openapi.json
    let router = if swagger_ui {
        router.merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
    } else {
        router
    };

    router.with_state(state).layer(TraceLayer::new_for_http())
}

/// Start the API server on the configured bind address
///
/// Serves until the service's shutdown token is cancelled.
///
/// # Example
///
/// ```no_run
/// use daily_basket::{Config, ReportService};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let service = Arc::new(ReportService::new(Config::from_env()?).await?);
///
/// // Blocks until shutdown
/// daily_basket::api::start_api_server(service).await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_api_server(service: Arc<ReportService>) -> Result<()> {
    let bind_address = service.config.server.bind_address;
    let shutdown = service.shutdown_token();

    tracing::info!(address = %bind_address, "Starting API server");

    let app = create_router(service);
    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(crate::error::Error::Io)?;

    tracing::info!(address = %bind_address, "API server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| crate::error::Error::ApiServerError(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
