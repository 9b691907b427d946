//! Read a class diagram out of an image through a Gemini `generateContent` endpoint.

use std::sync::OnceLock;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::Utc;
use regex::Regex;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use umlforge_core::settings::vision_configured;
use umlforge_core::{next_stamp, sanitize, Diagram, VisionSettings};

use crate::parse::extract_json_span;
use crate::prompt::vision_prompt;
use crate::AssistError;

pub const VISION_TIMEOUT: Duration = Duration::from_secs(120);
pub const ENGINE_VISION: &str = "gemini-vision";
pub const ENGINE_FALLBACK: &str = "fallback-mock";
const RAW_RESPONSE_LIMIT: usize = 1000;

#[derive(Debug, Clone)]
pub struct ImageOptions {
    pub mime_type: String,
    pub lang: String,
    /// `false` skips the provider and returns the sample diagram.
    pub use_llm: bool,
}

impl Default for ImageOptions {
    fn default() -> Self {
        ImageOptions {
            mime_type: "image/jpeg".to_string(),
            lang: "es".to_string(),
            use_llm: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisMeta {
    pub engine: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageAnalysis {
    pub diagram: Diagram,
    pub meta: AnalysisMeta,
}

impl ImageAnalysis {
    /// The provider was tried and failed, so `diagram` is a placeholder.
    pub fn is_degraded(&self) -> bool {
        self.meta.error.is_some()
    }
}

/// Never fails: an unconfigured endpoint, a disabled provider, a transport
/// error or unreadable output all produce a placeholder diagram, and only
/// the last two record `meta.error`.
pub async fn analyze_image(
    client: &reqwest::Client,
    settings: &VisionSettings,
    image: &[u8],
    options: &ImageOptions,
) -> ImageAnalysis {
    if !options.use_llm || !vision_configured(settings) {
        warn!(
            use_llm = options.use_llm,
            "vision provider not used, returning sample diagram"
        );
        return ImageAnalysis {
            diagram: fallback_diagram(FallbackKind::NotConfigured),
            meta: AnalysisMeta {
                engine: ENGINE_FALLBACK.to_string(),
                model: None,
                raw_response: None,
                error: None,
            },
        };
    }

    match request_diagram(client, settings, image, options).await {
        Ok((diagram, raw, model)) => {
            info!(
                model = %model,
                entities = diagram.entities.len(),
                relations = diagram.relations.len(),
                "diagram read from image"
            );
            ImageAnalysis {
                diagram,
                meta: AnalysisMeta {
                    engine: ENGINE_VISION.to_string(),
                    model: Some(model),
                    raw_response: Some(truncate_chars(&raw, RAW_RESPONSE_LIMIT)),
                    error: None,
                },
            }
        }
        Err(e) => {
            warn!(error = %e, "vision provider failed, returning placeholder diagram");
            ImageAnalysis {
                diagram: fallback_diagram(FallbackKind::ProviderFailed),
                meta: AnalysisMeta {
                    engine: ENGINE_FALLBACK.to_string(),
                    model: None,
                    raw_response: None,
                    error: Some(e.to_string()),
                },
            }
        }
    }
}

async fn request_diagram(
    client: &reqwest::Client,
    settings: &VisionSettings,
    image: &[u8],
    options: &ImageOptions,
) -> Result<(Diagram, String, String), AssistError> {
    let url = normalize_gemini_url(settings.api_url.trim());
    let model = model_name(&url);
    let payload = gemini_payload(&vision_prompt(next_stamp(), &options.lang), image, &options.mime_type);

    debug!(url = %url, model = %model, bytes = image.len(), "calling vision provider");
    let response = client
        .post(&url)
        .query(&[("key", settings.api_key.trim())])
        .timeout(VISION_TIMEOUT)
        .json(&payload)
        .send()
        .await?;

    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(AssistError::Status {
            status: status.as_u16(),
            body: truncate_chars(&body, 512),
        });
    }
    let parsed: Value = serde_json::from_str(&body).map_err(|_| AssistError::Unparseable)?;
    let (diagram, span) = read_diagram(&candidate_text(&parsed)?)?;
    Ok((diagram, span, model))
}

/// The sanitized diagram and the JSON text it was read from.
fn read_diagram(text: &str) -> Result<(Diagram, String), AssistError> {
    let (value, span) = extract_json_span(text).ok_or(AssistError::Unparseable)?;
    Ok((sanitize(&value), span))
}

fn gemini_payload(prompt: &str, image: &[u8], mime_type: &str) -> Value {
    json!({
        "contents": [{
            "role": "user",
            "parts": [
                {"text": prompt},
                {"inlineData": {"mimeType": mime_type, "data": BASE64.encode(image)}}
            ]
        }],
        "generationConfig": {
            "temperature": 0.05,
            "topK": 1,
            "topP": 0.9,
            "maxOutputTokens": 8192,
            "response_mime_type": "text/plain"
        }
    })
}

/// Text of the first part of the first candidate.
fn candidate_text(response: &Value) -> Result<String, AssistError> {
    let first = response
        .get("candidates")
        .and_then(Value::as_array)
        .and_then(|c| c.first())
        .ok_or(AssistError::NoCandidates)?;
    first
        .pointer("/content/parts/0/text")
        .and_then(Value::as_str)
        .filter(|t| !t.trim().is_empty())
        .map(str::to_string)
        .ok_or(AssistError::EmptyResponse)
}

fn latest_suffix_pattern() -> &'static Regex {
    static LATEST: OnceLock<Regex> = OnceLock::new();
    LATEST.get_or_init(|| {
        Regex::new(r"(models/gemini-[^:\s]+?)-latest(:generateContent)").expect("valid regex")
    })
}

/// Fix the legacy `generativeai` host and drop a `-latest` model suffix.
pub fn normalize_gemini_url(url: &str) -> String {
    let host_fixed = url.replace("generativeai.googleapis.com", "generativelanguage.googleapis.com");
    latest_suffix_pattern()
        .replace(&host_fixed, "${1}${2}")
        .into_owned()
}

/// Model name from a `.../models/<name>:generateContent` URL, `unknown` otherwise.
pub fn model_name(url: &str) -> String {
    url.split_once("models/")
        .map(|(_, rest)| rest.split(':').next().unwrap_or(rest))
        .filter(|m| !m.is_empty())
        .unwrap_or("unknown")
        .to_string()
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackKind {
    /// No provider configured: a fuller sample so the editor has something to show.
    NotConfigured,
    ProviderFailed,
}

/// Single `Usuario` class used when the image could not be read.
pub fn fallback_diagram(kind: FallbackKind) -> Diagram {
    let ts = next_stamp();
    let mut attributes = vec![
        json!({"id": format!("attr-{ts}-1-1"), "name": "id", "type": "String", "visibility": "private", "isKey": true}),
        json!({"id": format!("attr-{ts}-1-2"), "name": "nombre", "type": "String", "visibility": "private"}),
    ];
    if kind == FallbackKind::NotConfigured {
        attributes.push(json!({"id": format!("attr-{ts}-1-3"), "name": "apellido", "type": "String", "visibility": "private"}));
        attributes.push(json!({"id": format!("attr-{ts}-1-4"), "name": "email", "type": "String", "visibility": "private"}));
    }

    sanitize(&json!({
        "id": format!("import-{ts}"),
        "name": format!("Diagrama importado {}", Utc::now().to_rfc3339()),
        "entities": [{
            "id": format!("entity-{ts}-1"),
            "name": "Usuario",
            "type": "class",
            "attributes": attributes,
            "methods": [],
            "position": {"x": 100, "y": 100}
        }],
        "relations": []
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attribute_names(d: &Diagram) -> Vec<&str> {
        d.entities[0].attributes.iter().map(|a| a.name.as_str()).collect()
    }

    #[test]
    fn normalizes_legacy_urls() {
        assert_eq!(
            normalize_gemini_url(
                "https://generativeai.googleapis.com/v1beta/models/gemini-1.5-flash-latest:generateContent"
            ),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent"
        );
        let current = "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent";
        assert_eq!(normalize_gemini_url(current), current);
    }

    #[test]
    fn extracts_model_name() {
        assert_eq!(
            model_name("https://x/v1beta/models/gemini-1.5-flash:generateContent"),
            "gemini-1.5-flash"
        );
        assert_eq!(model_name("https://x/v1/chat"), "unknown");
    }

    #[test]
    fn candidate_text_errors() {
        assert!(matches!(candidate_text(&json!({})), Err(AssistError::NoCandidates)));
        assert!(matches!(
            candidate_text(&json!({"candidates": [{"content": {"parts": [{}]}}]})),
            Err(AssistError::EmptyResponse)
        ));
        let ok = json!({"candidates": [{"content": {"parts": [{"text": "{\"a\":1}"}]}}]});
        assert_eq!(candidate_text(&ok).unwrap(), "{\"a\":1}");
    }

    #[test]
    fn raw_response_is_the_parsed_json() {
        let text = "```json\nEl diagrama: {\"entities\": [{\"name\": \"Libro\"}]}\nListo.\n```";
        let (diagram, raw) = read_diagram(text).unwrap();
        assert_eq!(diagram.entities[0].name, "Libro");
        assert_eq!(raw, r#"{"entities": [{"name": "Libro"}]}"#);
        assert!(matches!(read_diagram("sin json"), Err(AssistError::Unparseable)));
    }

    #[test]
    fn payload_inlines_base64_image() {
        let payload = gemini_payload("p", b"abc", "image/png");
        assert_eq!(payload["contents"][0]["parts"][1]["inlineData"]["data"], json!("YWJj"));
        assert_eq!(payload["contents"][0]["parts"][1]["inlineData"]["mimeType"], json!("image/png"));
    }

    #[tokio::test]
    async fn unconfigured_provider_returns_sample_without_error() {
        let client = reqwest::Client::new();
        let analysis = analyze_image(&client, &VisionSettings::default(), b"img", &ImageOptions::default()).await;
        assert_eq!(analysis.meta.engine, ENGINE_FALLBACK);
        assert!(!analysis.is_degraded());
        assert_eq!(analysis.diagram.entities[0].name, "Usuario");
        assert_eq!(attribute_names(&analysis.diagram), vec!["id", "nombre", "apellido", "email"]);
    }

    #[tokio::test]
    async fn disabled_llm_skips_provider() {
        let client = reqwest::Client::new();
        let settings = VisionSettings {
            api_key: "k".into(),
            api_url: "http://127.0.0.1:9/v1beta/models/gemini-1.5-flash:generateContent".into(),
        };
        let options = ImageOptions {
            use_llm: false,
            ..ImageOptions::default()
        };
        let analysis = analyze_image(&client, &settings, b"img", &options).await;
        assert_eq!(analysis.meta.engine, ENGINE_FALLBACK);
        assert!(analysis.meta.error.is_none());
    }

    #[tokio::test]
    async fn unreachable_provider_degrades_with_error() {
        let client = reqwest::Client::new();
        let settings = VisionSettings {
            api_key: "k".into(),
            api_url: "http://127.0.0.1:9/v1beta/models/gemini-1.5-flash:generateContent".into(),
        };
        let analysis = analyze_image(&client, &settings, b"img", &ImageOptions::default()).await;
        assert!(analysis.is_degraded());
        assert_eq!(analysis.meta.engine, ENGINE_FALLBACK);
        assert_eq!(attribute_names(&analysis.diagram), vec!["id", "nombre"]);
        assert!(analysis.diagram.entities[0].attributes[0].is_key);
    }
}
