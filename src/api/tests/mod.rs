use super::*;
use crate::config::{Config, MailConfig, PersistenceConfig, ReportConfig, SalesApiConfig};
use axum::body::Body;
use axum::extract::Request;
use axum::http::StatusCode;
use serde_json::Value;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;
use wiremock::MockServer;


/// Service whose sales API and email provider both point at `remote`
async fn create_test_service(remote: &MockServer) -> (Arc<ReportService>, TempDir) {
    let temp_dir = tempfile::tempdir().unwrap();
    let config = Config {
        sales_api: SalesApiConfig {
            base_url: remote.uri(),
            timeout: Duration::from_secs(2),
            ..SalesApiConfig::default()
        },
        mail: MailConfig {
            api_url: remote.uri(),
            api_key: Some("re_test".into()),
            from_address: "reports@example.com".into(),
            to_address: "finance@example.com".into(),
            ..MailConfig::default()
        },
        reports: ReportConfig {
            output_dir: temp_dir.path().join("reports"),
        },
        persistence: PersistenceConfig {
            database_path: temp_dir.path().join("api.db"),
        },
        ..Config::default()
    };

    let service = ReportService::new(config).await.unwrap();
    (Arc::new(service), temp_dir)
}

/// Send `request` through a fresh router and decode the JSON body
async fn call(service: &Arc<ReportService>, request: Request) -> (StatusCode, Value) {
    let response = create_router(service.clone())
        .oneshot(request)
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

fn json_request(method: &str, uri: &str, body: Value) -> Request {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn text_of(service: &Arc<ReportService>, uri: &str) -> (StatusCode, String) {
    let response = create_router(service.clone())
        .oneshot(empty_request("GET", uri))
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

#[tokio::test]
async fn test_index_banner() {
    let remote = MockServer::start().await;
    let (service, _temp_dir) = create_test_service(&remote).await;

    let (status, body) = text_of(&service, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "<h1>Synergy Daily Basket</h1>");
}

#[tokio::test]
async fn test_health_endpoint() {
    let remote = MockServer::start().await;
    let (service, _temp_dir) = create_test_service(&remote).await;

    let (status, body) = text_of(&service, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ok");
}

#[tokio::test]
async fn test_openapi_endpoint() {
    let remote = MockServer::start().await;
    let (service, _temp_dir) = create_test_service(&remote).await;

    let (status, spec) = call(&service, empty_request("GET", "/openapi.json")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(spec["paths"]["/send-email"].is_object());
}

#[tokio::test]
async fn test_swagger_ui_toggle() {
    let remote = MockServer::start().await;
    let (service, _temp_dir) = create_test_service(&remote).await;
    let (status, _) = text_of(&service, "/api-docs/openapi.json").await;
    assert_eq!(status, StatusCode::OK);

    let temp_dir = tempfile::tempdir().unwrap();
    let mut config = (*service.config).clone();
    config.server.swagger_ui = false;
    config.persistence.database_path = temp_dir.path().join("no-swagger.db");
    let service = Arc::new(ReportService::new(config).await.unwrap());
    let (status, _) = text_of(&service, "/api-docs/openapi.json").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_api_server_stops_on_shutdown() {
    let remote = MockServer::start().await;
    let temp_dir = tempfile::tempdir().unwrap();
    let (service, _service_dir) = create_test_service(&remote).await;

    let mut config = (*service.config).clone();
    config.server.bind_address = "127.0.0.1:0".parse().unwrap();
    config.persistence.database_path = temp_dir.path().join("server.db");
    let service = Arc::new(ReportService::new(config).await.unwrap());

    let handle = service.spawn_api_server();
    tokio::time::sleep(Duration::from_millis(100)).await;
    service.shutdown().await.unwrap();

    let result = tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("server should stop after shutdown")
        .unwrap();
    assert!(result.is_ok());
}
