//! HTTP export service.
//!
//! # Routes
//!
//! - `GET /health` - liveness and available formats
//! - `GET /api/formats` - format catalogue
//! - `POST /api/test-credentials` - verify a URL, email and token
//! - `POST /api/search` - issue summaries by key list or JQL
//! - `POST /api/export` - render issues and return them as base64
//! - `GET /api/export/single/:issue_key` - render one issue, optionally as a download

pub mod routes;
pub mod state;

pub use state::AppState;

use crate::config::Settings;
use crate::error::Result;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(routes::health_check))
        .route("/api/formats", get(routes::list_formats))
        .route("/api/test-credentials", post(routes::test_credentials))
        .route("/api/search", post(routes::search_issues))
        .route("/api/export", post(routes::export_issues))
        .route("/api/export/single/:issue_key", get(routes::export_single))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Binds `host:port` and serves until Ctrl-C.
pub async fn serve(settings: Settings, host: &str, port: u16) -> Result<()> {
    if !settings.missing().is_empty() {
        log::warn!(
            "no Jira credentials in the environment ({}); requests must supply them",
            settings.missing().join(", ")
        );
    }
    let state = AppState::new(settings)?;
    let listener = TcpListener::bind((host, port)).await?;
    log::info!("export service listening on http://{}", listener.local_addr()?);

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    log::info!("export service stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        log::error!("failed to listen for shutdown signal: {}", err);
    }
}

#[cfg(test)]
mod tests {
    use super::{create_router, AppState};
    use crate::config::Settings;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use axum::Router;
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine as _;
    use mockito::{Matcher, Server, ServerGuard};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app(settings: Settings) -> Router {
        create_router(AppState::new(settings).unwrap())
    }

    fn settings_for(server: &ServerGuard) -> Settings {
        Settings {
            jira_url: server.url(),
            email: "me@acme.io".into(),
            api_token: "secret".into(),
            ..Settings::default()
        }
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn read_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn mock_issue(server: &mut ServerGuard, key: &str) {
        server
            .mock("GET", "/rest/api/3/field")
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;
        server
            .mock("GET", format!("/rest/api/3/issue/{}", key).as_str())
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(
                json!({
                    "id": "10001",
                    "key": key,
                    "fields": {
                        "summary": "Icon bibliotek",
                        "issuetype": {"name": "Story"},
                        "status": {"name": "Done"}
                    }
                })
                .to_string(),
            )
            .create_async()
            .await;
    }

    #[tokio::test]
    async fn health_lists_every_format() {
        let response = app(Settings::default())
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["status"], "ok");
        for id in ["pdf", "docx", "md", "png"] {
            assert_eq!(body["formats"][id], true);
        }
    }

    #[tokio::test]
    async fn formats_endpoint_describes_extensions() {
        let response = app(Settings::default())
            .oneshot(Request::builder().uri("/api/formats").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = read_json(response).await;
        let formats = body["formats"].as_array().unwrap();
        assert_eq!(formats.len(), 4);
        assert_eq!(formats[2]["id"], "md");
        assert_eq!(formats[2]["extension"], ".md");
    }

    #[tokio::test]
    async fn export_without_keys_is_rejected() {
        let response = app(Settings::default())
            .oneshot(post_json("/api/export", json!({"issue_keys": []})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = read_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "No issue_keys provided");
    }

    #[tokio::test]
    async fn export_without_credentials_is_rejected() {
        let response = app(Settings::default())
            .oneshot(post_json("/api/export", json!({"issue_keys": ["PROJ-1"]})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = read_json(response).await;
        assert!(body["error"].as_str().unwrap().contains("JIRA_API_TOKEN"));
    }

    #[tokio::test]
    async fn export_with_unknown_format_is_rejected() {
        let response = app(Settings::default())
            .oneshot(post_json(
                "/api/export",
                json!({
                    "issue_keys": ["PROJ-1"],
                    "format": "odt",
                    "jira_url": "https://acme.atlassian.net",
                    "email": "me@acme.io",
                    "api_token": "secret"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = read_json(response).await;
        assert!(body["error"].as_str().unwrap().starts_with("Invalid format"));
    }

    #[tokio::test]
    async fn malformed_body_is_a_bad_request() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/export")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = app(Settings::default()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(read_json(response).await["success"], false);
    }

    #[tokio::test]
    async fn search_requires_keys_or_jql() {
        let response = app(Settings::default())
            .oneshot(post_json(
                "/api/search",
                json!({"jira_url": "https://acme.atlassian.net", "email": "a@b.c", "api_token": "t"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(read_json(response).await["error"], "Provide issue_keys or jql");
    }

    #[tokio::test]
    async fn credential_check_requires_every_field() {
        let response = app(Settings::default())
            .oneshot(post_json("/api/test-credentials", json!({"jira_url": "https://acme.atlassian.net"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "All fields are required");
    }

    #[tokio::test]
    async fn credential_check_explains_forbidden() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/rest/api/3/myself")
            .with_status(403)
            .create_async()
            .await;

        let response = app(Settings::default())
            .oneshot(post_json(
                "/api/test-credentials",
                json!({"jira_url": server.url(), "email": "me@acme.io", "api_token": "secret"}),
            ))
            .await
            .unwrap();
        let body = read_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Access denied. Check your permissions.");
    }

    #[tokio::test]
    async fn export_returns_rendered_markdown_inline() {
        let mut server = Server::new_async().await;
        mock_issue(&mut server, "PROJ-1").await;

        let response = app(settings_for(&server))
            .oneshot(post_json(
                "/api/export",
                json!({"issue_keys": ["PROJ-1"], "format": "md"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["exported"], 1);
        assert_eq!(body["failed"], 0);
        assert_eq!(body["format"], "md");

        let file = &body["files"][0];
        assert_eq!(file["filename"], "PROJ-1.md");
        let encoded = file["file_base64"].as_str().unwrap();
        assert_eq!(file["size"], encoded.len());
        let markdown = String::from_utf8(BASE64.decode(encoded).unwrap()).unwrap();
        assert!(markdown.contains("issue_key: PROJ-1"));
        assert!(markdown.contains("Icon bibliotek"));
    }

    #[tokio::test]
    async fn single_export_can_download_the_file() {
        let mut server = Server::new_async().await;
        mock_issue(&mut server, "PROJ-2").await;

        let request = Request::builder()
            .uri("/api/export/single/PROJ-2?format=md&download=true")
            .body(Body::empty())
            .unwrap();
        let response = app(settings_for(&server)).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"PROJ-2.md\""
        );
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/markdown");
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(String::from_utf8_lossy(&bytes).contains("PROJ-2"));
    }

    #[tokio::test]
    async fn single_export_of_missing_issue_is_not_found() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/rest/api/3/issue/PROJ-404")
            .match_query(Matcher::Any)
            .with_status(404)
            .with_body(r#"{"errorMessages":["Issue does not exist"]}"#)
            .create_async()
            .await;

        let request = Request::builder()
            .uri("/api/export/single/PROJ-404?format=md")
            .body(Body::empty())
            .unwrap();
        let response = app(settings_for(&server)).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = read_json(response).await;
        assert!(body["error"].as_str().unwrap().contains("PROJ-404"));
    }
}
