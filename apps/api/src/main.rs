mod config;
mod errors;
mod interview;
mod llm_client;
mod retrieval;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::interview::registry::{spawn_reaper, SessionRegistry};
use crate::interview::transcript::TranscriptWriter;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::state::AppState;

/// How often idle sessions are swept.
const REAPER_INTERVAL: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Interviewer API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize LLM client
    let llm = LlmClient::new(config.anthropic_api_key.clone())?;
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    // Session registry + transcript persistence
    let sessions = Arc::new(SessionRegistry::new(config.idle_timeout));
    let transcripts = TranscriptWriter::new(config.transcript_dir.clone());
    info!(
        "Transcripts will be written to {} (idle timeout {}s, difficulty policy {:?})",
        transcripts.dir().display(),
        config.idle_timeout.as_secs(),
        config.difficulty_policy
    );

    spawn_reaper(
        sessions.clone(),
        transcripts.clone(),
        REAPER_INTERVAL
            .min(config.idle_timeout)
            .max(Duration::from_secs(1)),
    );

    // Build app state
    let state = AppState {
        llm: Arc::new(llm),
        config: config.clone(),
        sessions,
        transcripts,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict CORS to the interview frontend origin

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
