use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use umlforge_core::settings::{ai_configured, apply_env_overrides, read_settings, read_settings_from, vision_configured};
use umlforge_server::{router, AppState};

/// HTTP API for diagram parsing, editing and Flutter export
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to listen on
    #[arg(long, env = "UMLFORGE_BIND", default_value = "127.0.0.1:3001")]
    bind: SocketAddr,

    /// Settings file (defaults to ~/.umlforge/settings.json)
    #[arg(long)]
    settings: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let settings = match &args.settings {
        Some(path) => read_settings_from(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => read_settings(),
    };
    let settings = apply_env_overrides(settings, |key| std::env::var(key).ok());

    if !ai_configured(&settings.text) {
        warn!(provider = %settings.text.provider, "text provider not configured, generation endpoints will fail");
    }
    if !vision_configured(&settings.vision) {
        warn!("vision provider not configured, image parsing returns a sample diagram");
    }

    let state = Arc::new(AppState::new(settings).context("building HTTP client")?);
    let listener = tokio::net::TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("binding {}", args.bind))?;
    info!(addr = %args.bind, "umlforge server listening");

    axum::serve(listener, router(state)).await?;
    Ok(())
}
