pub mod engine;
mod error;
pub mod intent;
pub mod parse;
pub mod prompt;
pub mod vision;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use umlforge_core::settings::ai_configured;
use umlforge_core::{apply_changes, next_stamp, relink_relations, sanitize, AiSettings, ChangeSet, Diagram};

use crate::engine::Completion;
pub use crate::error::AssistError;
pub use crate::intent::{detect_user_intent, Intent};
pub use crate::vision::{analyze_image, fallback_diagram, AnalysisMeta, FallbackKind, ImageAnalysis, ImageOptions};

pub const DEFAULT_LANG: &str = "es";
pub const GENERATED_DIAGRAM_NAME: &str = "Generated UML Diagram";
pub const SUGGESTIONS_UNAVAILABLE: &str = "No se pudieron obtener sugerencias en este momento.";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    /// What the system is about, e.g. "sistema de biblioteca con 4 clases".
    pub description: String,
    #[serde(default)]
    pub business_context: Option<String>,
    #[serde(default)]
    pub additional_requirements: Option<String>,
    /// Language for generated names (default "es").
    #[serde(default)]
    pub lang: Option<String>,
}

#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagram: Option<Diagram>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ModificationResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_diagram: Option<Diagram>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct ChatResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of an intent-routed command.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResponse {
    pub intent: Intent,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_diagram: Option<Diagram>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn require_text_provider(settings: &AiSettings) -> Result<(), AssistError> {
    if ai_configured(settings) {
        Ok(())
    } else {
        Err(AssistError::NotConfigured("text"))
    }
}

/// Generate a whole diagram from a description. Failures are reported in the
/// response, never as an `Err`.
pub async fn generate_diagram(settings: &AiSettings, request: &GenerationRequest) -> GenerationResponse {
    match try_generate(settings, request).await {
        Ok(diagram) => {
            let explanation = format!(
                "Generated UML diagram with {} entities and {} relations.",
                diagram.entities.len(),
                diagram.relations.len()
            );
            info!(entities = diagram.entities.len(), relations = diagram.relations.len(), "generated diagram");
            GenerationResponse {
                success: true,
                diagram: Some(diagram),
                explanation: Some(explanation),
                error: None,
            }
        }
        Err(e) => {
            warn!(error = %e, "diagram generation failed");
            GenerationResponse {
                success: false,
                error: Some(e.to_string()),
                ..GenerationResponse::default()
            }
        }
    }
}

async fn try_generate(settings: &AiSettings, request: &GenerationRequest) -> Result<Diagram, AssistError> {
    require_text_provider(settings)?;
    let lang = request.lang.as_deref().unwrap_or(DEFAULT_LANG);
    let system = prompt::generation_system_prompt(lang);
    let user = prompt::generation_user_prompt(request);

    let raw = engine::generate(
        settings,
        &Completion {
            system: &system,
            user: &user,
            temperature: 0.7,
            max_tokens: 4000,
        },
    )
    .await?;
    diagram_from_generation(&raw)
}

/// Interpret generation output: sanitize, give it a fresh diagram id, and
/// point relations that name entities at their ids.
pub fn diagram_from_generation(raw: &str) -> Result<Diagram, AssistError> {
    let value = parse::extract_json(raw).ok_or(AssistError::Unparseable)?;
    let mut diagram = sanitize(&value);
    diagram.id = format!("diagram-{}", next_stamp());
    if value.get("name").and_then(Value::as_str).is_none() {
        diagram.name = GENERATED_DIAGRAM_NAME.to_string();
    }
    relink_relations(&mut diagram);
    Ok(diagram)
}

/// Ask the model for a change set and apply it to `current`.
pub async fn modify_diagram(
    settings: &AiSettings,
    command: &str,
    current: &Diagram,
    lang: Option<&str>,
) -> ModificationResponse {
    let outcome = async {
        require_text_provider(settings)?;
        let system = prompt::modification_system_prompt(current, lang.unwrap_or(DEFAULT_LANG));
        let raw = engine::generate(
            settings,
            &Completion {
                system: &system,
                user: command,
                temperature: 0.3,
                max_tokens: 1500,
            },
        )
        .await?;
        apply_model_changes(&raw, current)
    }
    .await;

    match outcome {
        Ok(response) => response,
        Err(e) => {
            warn!(error = %e, "diagram modification failed");
            ModificationResponse {
                success: false,
                error: Some(e.to_string()),
                ..ModificationResponse::default()
            }
        }
    }
}

/// Interpret modification output. The change set is read from `changes`, or
/// from the top level when the model left the wrapper out.
pub fn apply_model_changes(raw: &str, current: &Diagram) -> Result<ModificationResponse, AssistError> {
    let value = parse::extract_json(raw).ok_or(AssistError::Unparseable)?;
    let changes = ChangeSet::from_value(value.get("changes").unwrap_or(&value));
    let updated = apply_changes(current, &changes);
    info!(
        entities = updated.entities.len(),
        relations = updated.relations.len(),
        "applied model changes"
    );

    Ok(ModificationResponse {
        success: true,
        updated_diagram: Some(updated),
        message: Some(
            value
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("Diagrama modificado correctamente")
                .to_string(),
        ),
        action: Some(
            value
                .get("action")
                .and_then(Value::as_str)
                .unwrap_or("modify")
                .to_string(),
        ),
        error: None,
    })
}

pub async fn chat(settings: &AiSettings, message: &str, diagram: Option<&Diagram>) -> ChatResponse {
    let outcome = async {
        require_text_provider(settings)?;
        let system = prompt::chat_system_prompt(diagram);
        engine::generate(
            settings,
            &Completion {
                system: &system,
                user: message,
                temperature: 0.7,
                max_tokens: 1000,
            },
        )
        .await
    }
    .await;

    match outcome {
        Ok(text) => ChatResponse {
            success: true,
            response: Some(text),
            error: None,
        },
        Err(e) => {
            warn!(error = %e, "chat failed");
            ChatResponse {
                success: false,
                response: None,
                error: Some(e.to_string()),
            }
        }
    }
}

/// Review suggestions. On failure a single apology line is returned.
pub async fn suggest_improvements(settings: &AiSettings, diagram: &Diagram) -> Vec<String> {
    let outcome = async {
        require_text_provider(settings)?;
        let system = prompt::suggestions_system_prompt();
        let user = prompt::suggestions_user_message(diagram);
        engine::generate(
            settings,
            &Completion {
                system: &system,
                user: &user,
                temperature: 0.7,
                max_tokens: 1000,
            },
        )
        .await
    }
    .await;

    match outcome {
        Ok(raw) => parse::parse_suggestions(&raw),
        Err(e) => {
            warn!(error = %e, "suggestions failed");
            vec![SUGGESTIONS_UNAVAILABLE.to_string()]
        }
    }
}

/// Route a free-form command by intent: create a new diagram, modify the
/// current one, or just talk about it.
pub async fn process_command(
    settings: &AiSettings,
    command: &str,
    current: Option<&Diagram>,
    lang: Option<&str>,
) -> CommandResponse {
    let intent = detect_user_intent(command, current.is_some());
    info!(?intent, "routing command");

    match (intent, current) {
        (Intent::Modify, Some(diagram)) => {
            let r = modify_diagram(settings, command, diagram, lang).await;
            CommandResponse {
                intent,
                success: r.success,
                updated_diagram: r.updated_diagram,
                message: r.message,
                error: r.error,
            }
        }
        (Intent::Chat, _) => {
            let r = chat(settings, command, current).await;
            CommandResponse {
                intent,
                success: r.success,
                updated_diagram: None,
                message: r.response,
                error: r.error,
            }
        }
        _ => {
            let request = GenerationRequest {
                description: command.to_string(),
                business_context: None,
                additional_requirements: None,
                lang: lang.map(str::to_string),
            };
            let r = generate_diagram(settings, &request).await;
            CommandResponse {
                intent: Intent::Create,
                success: r.success,
                updated_diagram: r.diagram,
                message: r.explanation,
                error: r.error,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn unconfigured() -> AiSettings {
        AiSettings::default()
    }

    fn current() -> Diagram {
        sanitize(&json!({"entities": [{"id": "e1", "name": "Cliente"}]}))
    }

    #[test]
    fn generation_output_is_relinked() {
        let raw = r#"Claro:
```json
{"entities": [{"id": "c1", "name": "Libro"}, {"id": "c2", "name": "Autor"}],
 "relations": [{"sourceId": "libro", "targetId": "Autor", "type": "generalization"}]}
```"#;
        let diagram = diagram_from_generation(raw).unwrap();
        assert!(diagram.id.starts_with("diagram-"));
        assert_eq!(diagram.name, GENERATED_DIAGRAM_NAME);
        assert_eq!(diagram.relations[0].source, "c1");
        assert_eq!(diagram.relations[0].target, "c2");
    }

    #[test]
    fn unparseable_generation_is_an_error() {
        assert!(matches!(diagram_from_generation("lo siento"), Err(AssistError::Unparseable)));
    }

    #[test]
    fn model_changes_apply_with_defaults() {
        let raw = r#"{"changes": {"newEntities": [{"name": "Factura"}],
            "newRelations": [{"sourceId": "Cliente", "targetId": "Factura"}]}}"#;
        let response = apply_model_changes(raw, &current()).unwrap();
        assert!(response.success);
        assert_eq!(response.action.as_deref(), Some("modify"));
        assert_eq!(response.message.as_deref(), Some("Diagrama modificado correctamente"));
        let updated = response.updated_diagram.unwrap();
        assert_eq!(updated.entities.len(), 2);
        assert_eq!(updated.relations.len(), 1);
    }

    #[test]
    fn unwrapped_change_set_is_accepted() {
        let raw = r#"{"action": "delete", "deletedEntities": ["Cliente"]}"#;
        let response = apply_model_changes(raw, &current()).unwrap();
        assert_eq!(response.action.as_deref(), Some("delete"));
        assert!(response.updated_diagram.unwrap().entities.is_empty());
    }

    #[tokio::test]
    async fn unconfigured_generation_fails_soft() {
        let request = GenerationRequest {
            description: "tienda".into(),
            business_context: None,
            additional_requirements: None,
            lang: None,
        };
        let response = generate_diagram(&unconfigured(), &request).await;
        assert!(!response.success);
        assert!(response.diagram.is_none());
        assert!(response.error.unwrap().contains("not configured"));
    }

    #[tokio::test]
    async fn unconfigured_suggestions_apologize() {
        let suggestions = suggest_improvements(&unconfigured(), &current()).await;
        assert_eq!(suggestions, vec![SUGGESTIONS_UNAVAILABLE.to_string()]);
    }

    #[tokio::test]
    async fn command_routes_by_intent() {
        let chat = process_command(&unconfigured(), "¿qué es UML?", Some(&current()), None).await;
        assert_eq!(chat.intent, Intent::Chat);
        assert!(!chat.success);

        let create = process_command(&unconfigured(), "agrega Pago", None, None).await;
        assert_eq!(create.intent, Intent::Create);

        let modify = process_command(&unconfigured(), "agrega Pago", Some(&current()), None).await;
        assert_eq!(modify.intent, Intent::Modify);
        assert!(modify.error.is_some());
    }
}
