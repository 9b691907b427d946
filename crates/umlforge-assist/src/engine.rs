use llm::builder::{LLMBackend, LLMBuilder};
use llm::chat::ChatMessage;
use tracing::debug;

use umlforge_core::AiSettings;

use crate::AssistError;

fn map_backend(provider: &str) -> Result<LLMBackend, AssistError> {
    match provider {
        "openai" => Ok(LLMBackend::OpenAI),
        "anthropic" => Ok(LLMBackend::Anthropic),
        "google" => Ok(LLMBackend::Google),
        "ollama" => Ok(LLMBackend::Ollama),
        "groq" => Ok(LLMBackend::Groq),
        "mistral" => Ok(LLMBackend::Mistral),
        "deepseek" => Ok(LLMBackend::DeepSeek),
        other => Err(AssistError::UnknownProvider(other.to_string())),
    }
}

/// One system + user exchange.
pub struct Completion<'a> {
    pub system: &'a str,
    pub user: &'a str,
    pub temperature: f32,
    pub max_tokens: u32,
}

pub async fn generate(settings: &AiSettings, completion: &Completion<'_>) -> Result<String, AssistError> {
    let backend = map_backend(&settings.provider)?;

    let mut builder = LLMBuilder::new()
        .backend(backend)
        .model(&settings.model)
        .system(completion.system)
        .temperature(completion.temperature)
        .max_tokens(completion.max_tokens)
        .timeout_seconds(settings.timeout_secs);

    if !settings.api_key.is_empty() {
        builder = builder.api_key(&settings.api_key);
    }

    let llm = builder.build().map_err(|e| AssistError::Build(e.to_string()))?;

    let messages = vec![ChatMessage::user().content(completion.user).build()];

    debug!(provider = %settings.provider, model = %settings.model, "sending chat request");
    let response = llm
        .chat(&messages)
        .await
        .map_err(|e| AssistError::Chat(e.to_string()))?;

    match response.text() {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(AssistError::EmptyResponse),
    }
}
