use std::sync::Arc;

use crate::config::Config;
use crate::interview::registry::SessionRegistry;
use crate::interview::transcript::TranscriptWriter;
use crate::llm_client::TextCompletion;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Shared by every session. Production: `LlmClient`.
    pub llm: Arc<dyn TextCompletion>,
    pub config: Config,
    pub sessions: Arc<SessionRegistry>,
    pub transcripts: TranscriptWriter,
}
