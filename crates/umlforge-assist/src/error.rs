use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssistError {
    #[error("{0} provider is not configured")]
    NotConfigured(&'static str),
    #[error("unknown provider: {0}")]
    UnknownProvider(String),
    #[error("build LLM: {0}")]
    Build(String),
    #[error("chat: {0}")]
    Chat(String),
    #[error("model returned no text")]
    EmptyResponse,
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("provider returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("no candidates in provider response")]
    NoCandidates,
    #[error("no JSON object found in model output")]
    Unparseable,
}
