//! System handlers: index, health, OpenAPI.

use axum::{
    Json,
    response::{Html, IntoResponse},
};

/// GET / - Service banner
#[utoipa::path(
    get,
    path = "/",
    tag = "system",
    responses(
        (status = 200, description = "HTML banner", content_type = "text/html")
    )
)]
pub async fn index() -> Html<&'static str> {
    Html("<h1>Synergy Daily Basket</h1>")
}

/// GET /health - Health check
#[utoipa::path(
    get,
    path = "/health",
    tag = "system",
    responses(
        (status = 200, description = "Service is up", content_type = "text/plain")
    )
)]
pub async fn health_check() -> &'static str {
    "ok"
}

/// GET /openapi.json - OpenAPI specification
#[utoipa::path(
    get,
    path = "/openapi.json",
    tag = "system",
    responses(
        (status = 200, description = "OpenAPI specification in JSON format")
    )
)]
pub async fn openapi_spec() -> impl IntoResponse {
    use crate::api::openapi::ApiDoc;
    use utoipa::OpenApi;

    Json(ApiDoc::openapi())
}
