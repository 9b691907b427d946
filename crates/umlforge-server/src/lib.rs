//! HTTP surface over the diagram pipeline.

mod error;
pub mod handlers;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use umlforge_core::Settings;

pub use error::{ApiError, ErrorResponse};

/// Uploads above this are rejected before the handler runs.
pub const MAX_UPLOAD_BYTES: usize = 8 * 1024 * 1024;

pub struct AppState {
    pub settings: Settings,
    /// Shared by every outbound provider call.
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(settings: Settings) -> Result<Self, reqwest::Error> {
        Ok(AppState {
            settings,
            http: reqwest::Client::builder().build()?,
        })
    }
}

pub type SharedState = Arc<AppState>;

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/api/parse/diagram", post(handlers::parse_diagram))
        .route("/api/diagram/sanitize", post(handlers::sanitize_diagram))
        .route("/api/diagram/apply", post(handlers::apply_diagram_changes))
        .route("/api/diagram/generate", post(handlers::generate_diagram))
        .route("/api/diagram/modify", post(handlers::modify_diagram))
        .route("/api/diagram/suggestions", post(handlers::suggest_improvements))
        .route("/api/chat", post(handlers::chat))
        .route("/api/command", post(handlers::process_command))
        .route("/api/export/flutter", post(handlers::export_flutter))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use umlforge_core::VisionSettings;

    const BOUNDARY: &str = "umlforge-test-boundary";

    fn app_with(settings: Settings) -> Router {
        router(Arc::new(AppState::new(settings).unwrap()))
    }

    fn app() -> Router {
        app_with(Settings::default())
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    /// `(name, content type for file parts, bytes)`
    fn post_multipart(parts: &[(&str, Option<&str>, &[u8])]) -> Request<Body> {
        let mut body = Vec::new();
        for (name, mime, bytes) in parts {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            match mime {
                Some(mime) => body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"diagram\"\r\nContent-Type: {mime}\r\n\r\n"
                    )
                    .as_bytes(),
                ),
                None => body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                ),
            }
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        Request::post("/api/parse/diagram")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn health() {
        let (status, body) = send(app(), Request::get("/health").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn sanitize_fills_defaults() {
        let (status, body) = send(app(), post_json("/api/diagram/sanitize", json!({"entities": "nope"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["entities"], json!([]));
        assert_eq!(body["relations"], json!([]));
    }

    #[tokio::test]
    async fn apply_adds_entity_then_relation() {
        let request = post_json(
            "/api/diagram/apply",
            json!({
                "diagram": {"entities": [{"id": "e1", "name": "Cliente"}], "relations": []},
                "changes": {
                    "newEntities": [{"name": "Factura"}],
                    "newRelations": [{
                        "sourceId": "Cliente", "targetId": "Factura", "type": "association",
                        "sourceCardinality": "1", "targetCardinality": "*"
                    }]
                }
            }),
        );
        let (status, body) = send(app(), request).await;
        assert_eq!(status, StatusCode::OK);
        let entities = body["entities"].as_array().unwrap();
        assert_eq!(entities.len(), 2);
        let relations = body["relations"].as_array().unwrap();
        assert_eq!(relations.len(), 1);
        assert_eq!(relations[0]["source"], "e1");
        assert_eq!(relations[0]["target"], entities[1]["id"]);
    }

    #[tokio::test]
    async fn generate_without_provider_fails_softly() {
        let (status, body) = send(
            app(),
            post_json("/api/diagram/generate", json!({"description": "Sistema de ventas"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], false);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn blank_command_is_rejected() {
        let (status, body) = send(app(), post_json("/api/command", json!({"command": "  "}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "command is required");
    }

    #[tokio::test]
    async fn export_returns_file_map() {
        let request = post_json(
            "/api/export/flutter",
            json!({"diagram": {"entities": [{"name": "Producto"}]}, "projectName": "Mi Tienda"}),
        );
        let (status, body) = send(app(), request).await;
        assert_eq!(status, StatusCode::OK);
        let files = body["files"].as_object().unwrap();
        assert!(files.contains_key("lib/models/producto_model.dart"));
        assert!(files["pubspec.yaml"].as_str().unwrap().starts_with("name: mi_tienda\n"));
    }

    #[tokio::test]
    async fn parse_requires_an_image() {
        let (status, body) = send(app(), post_multipart(&[("lang", None, b"es".as_slice())])).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No image provided");
    }

    #[tokio::test]
    async fn oversized_upload_is_payload_too_large() {
        let image = vec![0u8; MAX_UPLOAD_BYTES + 1];
        let (status, body) = send(app(), post_multipart(&[("image", Some("image/png"), image.as_slice())])).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body["error"], "invalid multipart body");
    }

    #[tokio::test]
    async fn parse_without_vision_config_returns_sample() {
        let (status, body) = send(app(), post_multipart(&[("image", Some("image/png"), b"\x89PNG".as_slice())])).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["meta"]["engine"], "fallback-mock");
        assert!(body["meta"].get("error").is_none());
        assert_eq!(body["diagram"]["entities"][0]["name"], "Usuario");
    }

    #[tokio::test]
    async fn parse_reports_provider_failure_as_bad_gateway() {
        let settings = Settings {
            vision: VisionSettings {
                api_key: "k".into(),
                api_url: "http://127.0.0.1:9/v1beta/models/gemini-1.5-flash:generateContent".into(),
            },
            ..Settings::default()
        };
        let (status, body) = send(
            app_with(settings),
            post_multipart(&[("image", Some("image/png"), b"\x89PNG".as_slice()), ("useLLM", None, b"true".as_slice())]),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"], "AI provider failed");
        assert!(body["details"].is_string());
        assert_eq!(body["meta"]["engine"], "fallback-mock");
        assert!(body["diagram"]["entities"].is_array());
    }
}
