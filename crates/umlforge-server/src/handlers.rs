use std::collections::BTreeMap;

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use umlforge_assist::{
    analyze_image, ChatResponse, CommandResponse, GenerationRequest, GenerationResponse, ImageOptions,
    ModificationResponse,
};
use umlforge_core::{apply_changes, sanitize, ChangeSet, Diagram};
use umlforge_flutter::{generate_project_files, ExportOptions};

use crate::error::ApiError;
use crate::SharedState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// Multipart upload: `image` (required), `lang`, `useLLM`.
pub async fn parse_diagram(
    State(state): State<SharedState>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let mut image: Option<Vec<u8>> = None;
    let mut options = ImageOptions::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("image") => {
                if let Some(mime) = field.content_type() {
                    options.mime_type = mime.to_string();
                }
                image = Some(field.bytes().await?.to_vec());
            }
            Some("lang") => {
                let lang = field.text().await?;
                if !lang.trim().is_empty() {
                    options.lang = lang.trim().to_string();
                }
            }
            Some("useLLM") => options.use_llm = field.text().await?.trim() != "false",
            _ => {}
        }
    }

    let image = image.filter(|bytes| !bytes.is_empty()).ok_or(ApiError::MissingImage)?;
    info!(
        bytes = image.len(),
        mime = %options.mime_type,
        lang = %options.lang,
        use_llm = options.use_llm,
        "received diagram image"
    );

    let analysis = analyze_image(&state.http, &state.settings.vision, &image, &options).await;
    if analysis.is_degraded() {
        warn!("vision provider failed, answering with the placeholder diagram");
        let body = json!({
            "error": "AI provider failed",
            "details": analysis.meta.error,
            "diagram": analysis.diagram,
            "meta": analysis.meta,
        });
        return Ok((StatusCode::BAD_GATEWAY, Json(body)).into_response());
    }
    Ok(Json(analysis).into_response())
}

pub async fn sanitize_diagram(Json(raw): Json<Value>) -> Json<Diagram> {
    Json(sanitize(&raw))
}

#[derive(Debug, Deserialize)]
pub struct ApplyRequest {
    #[serde(default)]
    pub diagram: Value,
    #[serde(default)]
    pub changes: Value,
}

pub async fn apply_diagram_changes(Json(request): Json<ApplyRequest>) -> Json<Diagram> {
    let diagram = sanitize(&request.diagram);
    let changes = ChangeSet::from_value(&request.changes);
    Json(apply_changes(&diagram, &changes))
}

pub async fn generate_diagram(
    State(state): State<SharedState>,
    Json(request): Json<GenerationRequest>,
) -> Result<Json<GenerationResponse>, ApiError> {
    if request.description.trim().is_empty() {
        return Err(ApiError::MissingField("description"));
    }
    Ok(Json(
        umlforge_assist::generate_diagram(&state.settings.text, &request).await,
    ))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModifyRequest {
    #[serde(default)]
    pub command: String,
    #[serde(default)]
    pub current_diagram: Value,
    pub lang: Option<String>,
}

pub async fn modify_diagram(
    State(state): State<SharedState>,
    Json(request): Json<ModifyRequest>,
) -> Result<Json<ModificationResponse>, ApiError> {
    if request.command.trim().is_empty() {
        return Err(ApiError::MissingField("command"));
    }
    let current = sanitize(&request.current_diagram);
    Ok(Json(
        umlforge_assist::modify_diagram(
            &state.settings.text,
            &request.command,
            &current,
            request.lang.as_deref(),
        )
        .await,
    ))
}

#[derive(Debug, Deserialize)]
pub struct SuggestionsRequest {
    #[serde(default)]
    pub diagram: Value,
}

#[derive(Debug, Serialize)]
pub struct SuggestionsResponse {
    pub suggestions: Vec<String>,
}

pub async fn suggest_improvements(
    State(state): State<SharedState>,
    Json(request): Json<SuggestionsRequest>,
) -> Json<SuggestionsResponse> {
    let diagram = sanitize(&request.diagram);
    Json(SuggestionsResponse {
        suggestions: umlforge_assist::suggest_improvements(&state.settings.text, &diagram).await,
    })
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    pub diagram: Option<Value>,
}

pub async fn chat(
    State(state): State<SharedState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    if request.message.trim().is_empty() {
        return Err(ApiError::MissingField("message"));
    }
    let diagram = request.diagram.as_ref().map(sanitize);
    Ok(Json(
        umlforge_assist::chat(&state.settings.text, &request.message, diagram.as_ref()).await,
    ))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandRequest {
    #[serde(default)]
    pub command: String,
    pub current_diagram: Option<Value>,
    pub lang: Option<String>,
}

pub async fn process_command(
    State(state): State<SharedState>,
    Json(request): Json<CommandRequest>,
) -> Result<Json<CommandResponse>, ApiError> {
    if request.command.trim().is_empty() {
        return Err(ApiError::MissingField("command"));
    }
    let current = request.current_diagram.as_ref().map(sanitize);
    Ok(Json(
        umlforge_assist::process_command(
            &state.settings.text,
            &request.command,
            current.as_ref(),
            request.lang.as_deref(),
        )
        .await,
    ))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRequest {
    #[serde(default)]
    pub diagram: Value,
    pub project_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ExportResponse {
    pub files: BTreeMap<String, String>,
}

pub async fn export_flutter(Json(request): Json<ExportRequest>) -> Json<ExportResponse> {
    let diagram = sanitize(&request.diagram);
    let mut options = ExportOptions::default();
    if let Some(name) = request.project_name.filter(|n| !n.trim().is_empty()) {
        options.project_name = name;
    }
    let files = generate_project_files(&diagram, &options);
    info!(entities = diagram.entities.len(), files = files.len(), "exported flutter project");
    Json(ExportResponse { files })
}
