use std::path::PathBuf;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, ServerCapabilities, ServerInfo},
    schemars, tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler, ServiceExt,
};
use serde::Deserialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use umlforge_assist::{analyze_image, GenerationRequest, ImageOptions};
use umlforge_core::settings::{apply_env_overrides, read_settings};
use umlforge_core::{apply_changes, sanitize, ChangeSet, Diagram, Settings};
use umlforge_flutter::{generate_project_files, write_project, ExportOptions};

// --- Request types ---

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct SanitizeRequest {
    /// Diagram as a JSON string. Any shape is accepted; missing or malformed fields get defaults.
    diagram: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct ApplyChangesRequest {
    /// Current diagram as a JSON string
    diagram: String,
    /// Change set as a JSON string: {newEntities, modifiedEntities, newRelations, deletedEntities, deletedRelations}. See get_rules for each key.
    changes: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct GenerateRequest {
    /// What the system is about, e.g. "sistema de ventas con clientes, productos y facturas"
    description: String,
    /// Business context the model should respect
    business_context: Option<String>,
    /// Extra requirements, e.g. "incluir auditoría"
    additional_requirements: Option<String>,
    /// Language for names and descriptions (default "es")
    lang: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct ModifyRequest {
    /// Natural-language edit, e.g. "agrega la clase Pago relacionada con Factura"
    command: String,
    /// Current diagram as a JSON string
    diagram: String,
    /// Language for new names (default "es")
    lang: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct ParseImageRequest {
    /// Image bytes, base64 encoded
    image_base64: String,
    /// MIME type of the image (default "image/jpeg")
    mime_type: Option<String>,
    /// Language for names (default "es")
    lang: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct ExportFlutterRequest {
    /// Diagram as a JSON string
    diagram: String,
    /// Dart package name (default "uml_flutter_ui")
    project_name: Option<String>,
    /// Directory to write the project into. When omitted the files are returned as a JSON object of path to content.
    output_dir: Option<String>,
}

// --- Server ---

#[derive(Clone)]
pub struct UmlforgeServer {
    tool_router: ToolRouter<Self>,
    settings: Arc<Settings>,
    http: reqwest::Client,
}

fn parse_diagram(raw: &str) -> Result<Diagram, String> {
    serde_json::from_str::<serde_json::Value>(raw)
        .map(|value| sanitize(&value))
        .map_err(|e| format!("Invalid diagram JSON: {e}"))
}

fn json_result<T: serde::Serialize>(value: &T) -> CallToolResult {
    match serde_json::to_string_pretty(value) {
        Ok(json) => CallToolResult::success(vec![Content::text(json)]),
        Err(e) => CallToolResult::error(vec![Content::text(format!("Serialization error: {e}"))]),
    }
}

#[tool_router]
impl UmlforgeServer {
    pub fn new(settings: Settings, http: reqwest::Client) -> Self {
        Self {
            tool_router: Self::tool_router(),
            settings: Arc::new(settings),
            http,
        }
    }

    #[tool(description = "Get the class-diagram modeling rules, the change-set format and the recommended workflow")]
    fn get_rules(&self) -> Result<CallToolResult, McpError> {
        Ok(CallToolResult::success(vec![Content::text(
            umlforge_core::rules::RULES,
        )]))
    }

    #[tool(description = "Get the JSON schema of a diagram: {id, name, entities: [{id, name, type, attributes, methods, position}], relations: [{id, source, target, type, sourceCardinality, targetCardinality, label?}], metadata}")]
    fn get_schema(&self) -> Result<CallToolResult, McpError> {
        Ok(json_result(&schemars::schema_for!(Diagram)))
    }

    #[tool(description = "Normalize a diagram: fill defaults, canonicalize types, visibilities and cardinalities. Never fails on malformed input.")]
    fn sanitize_diagram(
        &self,
        Parameters(req): Parameters<SanitizeRequest>,
    ) -> Result<CallToolResult, McpError> {
        match parse_diagram(&req.diagram) {
            Ok(diagram) => Ok(json_result(&diagram)),
            Err(e) => Ok(CallToolResult::error(vec![Content::text(e)])),
        }
    }

    #[tool(description = "Apply an explicit change set to a diagram and return the updated diagram. Changes that reference unknown entities are skipped.")]
    fn apply_changes(
        &self,
        Parameters(req): Parameters<ApplyChangesRequest>,
    ) -> Result<CallToolResult, McpError> {
        let diagram = match parse_diagram(&req.diagram) {
            Ok(d) => d,
            Err(e) => return Ok(CallToolResult::error(vec![Content::text(e)])),
        };
        let changes = match serde_json::from_str::<serde_json::Value>(&req.changes) {
            Ok(value) => ChangeSet::from_value(&value),
            Err(e) => {
                return Ok(CallToolResult::error(vec![Content::text(format!(
                    "Invalid change set JSON: {e}"
                ))]))
            }
        };
        Ok(json_result(&apply_changes(&diagram, &changes)))
    }

    #[tool(description = "Generate a complete class diagram from a natural-language description using the configured text model")]
    async fn generate_diagram(
        &self,
        Parameters(req): Parameters<GenerateRequest>,
    ) -> Result<CallToolResult, McpError> {
        let request = GenerationRequest {
            description: req.description,
            business_context: req.business_context,
            additional_requirements: req.additional_requirements,
            lang: req.lang,
        };
        let response = umlforge_assist::generate_diagram(&self.settings.text, &request).await;
        if response.success {
            Ok(json_result(&response))
        } else {
            Ok(CallToolResult::error(vec![Content::text(format!(
                "Generation failed: {}",
                response.error.unwrap_or_default()
            ))]))
        }
    }

    #[tool(description = "Modify a diagram with a natural-language command. The text model proposes a change set which is then applied; returns {success, updatedDiagram, message, action}.")]
    async fn modify_diagram(
        &self,
        Parameters(req): Parameters<ModifyRequest>,
    ) -> Result<CallToolResult, McpError> {
        let current = match parse_diagram(&req.diagram) {
            Ok(d) => d,
            Err(e) => return Ok(CallToolResult::error(vec![Content::text(e)])),
        };
        let response = umlforge_assist::modify_diagram(
            &self.settings.text,
            &req.command,
            &current,
            req.lang.as_deref(),
        )
        .await;
        if response.success {
            Ok(json_result(&response))
        } else {
            Ok(CallToolResult::error(vec![Content::text(format!(
                "Modification failed: {}",
                response.error.unwrap_or_default()
            ))]))
        }
    }

    #[tool(description = "Read a class diagram from an image of one. Returns {diagram, meta: {engine, model?, rawResponse?}}. When the vision provider fails the result is an error carrying a placeholder diagram that must not be treated as the real content.")]
    async fn parse_image(
        &self,
        Parameters(req): Parameters<ParseImageRequest>,
    ) -> Result<CallToolResult, McpError> {
        let image = match BASE64.decode(req.image_base64.trim()) {
            Ok(bytes) if !bytes.is_empty() => bytes,
            Ok(_) => return Ok(CallToolResult::error(vec![Content::text("No image provided")])),
            Err(e) => {
                return Ok(CallToolResult::error(vec![Content::text(format!(
                    "Invalid base64 image: {e}"
                ))]))
            }
        };
        let mut options = ImageOptions::default();
        if let Some(mime) = req.mime_type {
            options.mime_type = mime;
        }
        if let Some(lang) = req.lang {
            options.lang = lang;
        }

        let analysis = analyze_image(&self.http, &self.settings.vision, &image, &options).await;
        if analysis.is_degraded() {
            warn!("parse_image answered with a placeholder diagram");
            let warning = format!(
                "AI provider failed: {}. The diagram below is a placeholder.",
                analysis.meta.error.as_deref().unwrap_or("unknown error")
            );
            let body = serde_json::to_string_pretty(&analysis).unwrap_or_default();
            return Ok(CallToolResult::error(vec![
                Content::text(warning),
                Content::text(body),
            ]));
        }
        Ok(json_result(&analysis))
    }

    #[tool(description = "Generate a Flutter CRUD project (models, services, list/form/detail screens, app shell) from a diagram. Writes it to output_dir when given, otherwise returns the files.")]
    fn export_flutter(
        &self,
        Parameters(req): Parameters<ExportFlutterRequest>,
    ) -> Result<CallToolResult, McpError> {
        let diagram = match parse_diagram(&req.diagram) {
            Ok(d) => d,
            Err(e) => return Ok(CallToolResult::error(vec![Content::text(e)])),
        };
        let mut options = ExportOptions::default();
        if let Some(name) = req.project_name {
            options.project_name = name;
        }
        let files = generate_project_files(&diagram, &options);

        let Some(dir) = req.output_dir else {
            return Ok(json_result(&files));
        };
        let root = PathBuf::from(dir);
        match write_project(&root, &files) {
            Ok(count) => {
                let listing = files.keys().cloned().collect::<Vec<_>>().join("\n");
                Ok(CallToolResult::success(vec![Content::text(format!(
                    "Wrote {count} files to {}:\n{listing}",
                    root.display()
                ))]))
            }
            Err(e) => Ok(CallToolResult::error(vec![Content::text(e.to_string())])),
        }
    }
}

#[tool_handler]
impl ServerHandler for UmlforgeServer {
    fn get_info(&self) -> ServerInfo {
        let instructions = format!(
            "{}\n\n## Modeling Rules\n{}",
            INSTRUCTIONS,
            umlforge_core::rules::RULES
        );
        ServerInfo {
            instructions: Some(instructions.into()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

const INSTRUCTIONS: &str = r#"umlforge builds UML class diagrams and turns them into Flutter CRUD apps.

Diagrams travel as JSON strings. Tools that change a diagram return the whole updated diagram; pass it back on the next call, nothing is stored between calls.
Call `get_rules` before creating or editing a diagram. Prefer `apply_changes` when you already know the exact edit and `modify_diagram` when the user describes it in words."#;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout carries the protocol.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = apply_env_overrides(read_settings(), |key| std::env::var(key).ok());
    let http = reqwest::Client::builder().build()?;
    info!(provider = %settings.text.provider, "starting umlforge MCP server");

    let service = UmlforgeServer::new(settings, http)
        .serve(rmcp::transport::io::stdio())
        .await
        .inspect_err(|e| tracing::error!(error = %e, "MCP server error"))?;
    service.waiting().await?;
    Ok(())
}
