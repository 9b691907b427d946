//! Provider settings, persisted as JSON under `~/.umlforge/`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

pub const DEFAULT_PROVIDER: &str = "groq";
pub const DEFAULT_MODEL: &str = "llama-3.1-8b-instant";
pub const DEFAULT_TEXT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to access settings file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid settings file {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Text-generation provider used for generating and modifying diagrams.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AiSettings {
    pub provider: String,
    pub api_key: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for AiSettings {
    fn default() -> Self {
        AiSettings {
            provider: DEFAULT_PROVIDER.to_string(),
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            timeout_secs: DEFAULT_TEXT_TIMEOUT_SECS,
        }
    }
}

/// Vision endpoint used to read diagrams out of images. `api_url` is a full
/// `...:generateContent` URL; the key travels as a query parameter.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct VisionSettings {
    pub api_key: String,
    pub api_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub text: AiSettings,
    pub vision: VisionSettings,
}

/// Resolve the global config directory (~/.umlforge/).
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".umlforge")
}

pub fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

/// Read the global settings file. A missing or unreadable file yields defaults.
pub fn read_settings() -> Settings {
    match read_settings_from(&settings_path()) {
        Ok(settings) => settings,
        Err(e) => {
            warn!(error = %e, "using default settings");
            Settings::default()
        }
    }
}

/// Strict variant: a missing file is still defaults, anything else is an error.
pub fn read_settings_from(path: &Path) -> Result<Settings, SettingsError> {
    if !path.exists() {
        debug!(path = %path.display(), "no settings file");
        return Ok(Settings::default());
    }
    let raw = fs::read_to_string(path).map_err(|source| SettingsError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| SettingsError::Json {
        path: path.to_path_buf(),
        source,
    })
}

pub fn write_settings(settings: &Settings) -> Result<(), SettingsError> {
    write_settings_to(&settings_path(), settings)
}

pub fn write_settings_to(path: &Path, settings: &Settings) -> Result<(), SettingsError> {
    let io_err = |source| SettingsError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(io_err)?;
    }
    let json = serde_json::to_string_pretty(settings).map_err(|source| SettingsError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, json).map_err(io_err)
}

pub fn ai_configured(settings: &AiSettings) -> bool {
    !settings.provider.is_empty()
        && !settings.model.is_empty()
        && (settings.provider == "ollama" || !settings.api_key.is_empty())
}

pub fn vision_configured(settings: &VisionSettings) -> bool {
    !settings.api_key.trim().is_empty() && !settings.api_url.trim().is_empty()
}

/// Layer environment variables over file settings. `lookup` is usually
/// `|k| std::env::var(k).ok()`; only the binaries call it that way.
///
/// `GROQ_API_KEY`, `LLM_PROVIDER` and `LLM_MODEL` feed the text provider,
/// `LLM_API_KEY` and `LLM_API_URL` the vision endpoint. Blank values are ignored.
pub fn apply_env_overrides(mut settings: Settings, lookup: impl Fn(&str) -> Option<String>) -> Settings {
    let var = |key: &str| {
        lookup(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    if let Some(key) = var("GROQ_API_KEY") {
        settings.text.api_key = key;
    }
    if let Some(provider) = var("LLM_PROVIDER") {
        settings.text.provider = provider;
    }
    if let Some(model) = var("LLM_MODEL") {
        settings.text.model = model;
    }
    if let Some(key) = var("LLM_API_KEY") {
        settings.vision.api_key = key;
    }
    if let Some(url) = var("LLM_API_URL") {
        settings.vision.api_url = url;
    }
    settings
}
