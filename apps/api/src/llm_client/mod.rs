/// LLM Client: the single point of entry for all Claude API calls in the interviewer.
///
/// ARCHITECTURAL RULE: No other module may call the Anthropic API directly.
/// The interview core only sees the `TextCompletion` trait; `LlmClient` is the
/// production implementation.
///
/// Model: claude-sonnet-4-5, fixed for every decision.
use std::fmt;

use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod prompts;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
/// The model used for all LLM calls.
pub const MODEL: &str = "claude-sonnet-4-5";
const MAX_TOKENS: u32 = 2048;
const MAX_RETRIES: u32 = 3;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("LLM returned empty content")]
    EmptyContent,
}

// ────────────────────────────────────────────────────────────────────────────
// Prompt contract
// ────────────────────────────────────────────────────────────────────────────

/// Which decision a prompt belongs to. Carried on every request so logs and
/// test doubles can tell calls apart without inspecting prompt text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionKind {
    CompetencyExtraction,
    PreInterviewQuestions,
    PreInterviewValidation,
    VerificationQuestions,
    VerificationValidation,
    AuthenticityCheck,
    CompetencyAssessment,
    DifficultyAssessment,
    CandidateQuestion,
    QuestionRefinement,
}

impl DecisionKind {
    pub fn label(self) -> &'static str {
        match self {
            DecisionKind::CompetencyExtraction => "competency_extraction",
            DecisionKind::PreInterviewQuestions => "pre_interview_questions",
            DecisionKind::PreInterviewValidation => "pre_interview_validation",
            DecisionKind::VerificationQuestions => "verification_questions",
            DecisionKind::VerificationValidation => "verification_validation",
            DecisionKind::AuthenticityCheck => "authenticity_check",
            DecisionKind::CompetencyAssessment => "competency_assessment",
            DecisionKind::DifficultyAssessment => "difficulty_assessment",
            DecisionKind::CandidateQuestion => "candidate_question",
            DecisionKind::QuestionRefinement => "question_refinement",
        }
    }
}

impl fmt::Display for DecisionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A fully rendered prompt: system instructions plus the user turn.
#[derive(Debug, Clone)]
pub struct StructuredPrompt {
    pub kind: DecisionKind,
    pub system: String,
    pub user: String,
    /// The caller will parse the reply as a JSON object.
    pub expects_json: bool,
}

impl StructuredPrompt {
    pub fn json(kind: DecisionKind, system: &str, user: String) -> Self {
        Self {
            kind,
            system: system.to_string(),
            user,
            expects_json: true,
        }
    }

    pub fn text(kind: DecisionKind, system: &str, user: String) -> Self {
        Self {
            kind,
            system: system.to_string(),
            user,
            expects_json: false,
        }
    }
}

/// A text completion service: one prompt in, one text reply out.
///
/// Implementations may fail; callers are responsible for recovering.
#[async_trait]
pub trait TextCompletion: Send + Sync {
    async fn complete(&self, prompt: &StructuredPrompt) -> Result<String, LlmError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Anthropic wire types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct LlmResponse {
    pub content: Vec<ContentBlock>,
    pub usage: Usage,
}

#[derive(Debug, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl LlmResponse {
    /// Extracts the text content from the first text block.
    pub fn text(&self) -> Option<&str> {
        self.content
            .iter()
            .find(|b| b.block_type == "text")
            .and_then(|b| b.text.as_deref())
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: AnthropicErrorBody,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorBody {
    message: String,
}

/// The production completion client.
/// Wraps the Anthropic Messages API with retry logic.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
}

impl LlmClient {
    pub fn new(api_key: String) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .build()?,
            api_key,
        })
    }

    /// Makes a raw call to the Claude API, returning the full response object.
    /// Retries on 429 (rate limit) and 5xx errors with exponential backoff.
    pub async fn call(&self, prompt: &str, system: &str) -> Result<LlmResponse, LlmError> {
        let request_body = AnthropicRequest {
            model: MODEL,
            max_tokens: MAX_TOKENS,
            system,
            messages: vec![AnthropicMessage {
                role: "user",
                content: prompt,
            }],
        };

        let mut last_error: Option<LlmError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s
                let delay = std::time::Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    "LLM call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(ANTHROPIC_API_URL)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .header("content-type", "application/json")
                .json(&request_body)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(LlmError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("LLM API returned {}: {}", status, body);
                last_error = Some(LlmError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<AnthropicError>(&body)
                    .map(|e| e.error.message)
                    .unwrap_or(body);
                return Err(LlmError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let llm_response: LlmResponse = response.json().await?;

            debug!(
                "LLM call succeeded: input_tokens={}, output_tokens={}",
                llm_response.usage.input_tokens, llm_response.usage.output_tokens
            );

            return Ok(llm_response);
        }

        Err(last_error.unwrap_or(LlmError::RateLimited {
            retries: MAX_RETRIES,
        }))
    }
}

#[async_trait]
impl TextCompletion for LlmClient {
    async fn complete(&self, prompt: &StructuredPrompt) -> Result<String, LlmError> {
        debug!(
            "Calling {} for {} (json reply expected: {})",
            MODEL, prompt.kind, prompt.expects_json
        );
        let response = self.call(&prompt.user, &prompt.system).await?;
        let text = response.text().ok_or(LlmError::EmptyContent)?;
        Ok(text.to_string())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// JSON extraction helpers
// ────────────────────────────────────────────────────────────────────────────

/// Parses a model reply as JSON of type `T`.
///
/// Tolerates markdown fences, stray control characters and prose around the
/// object: the outermost `{ ... }` span is what gets parsed.
pub fn parse_json_reply<T: DeserializeOwned>(text: &str) -> Result<T, LlmError> {
    let cleaned: String = strip_json_fences(text)
        .chars()
        .filter(|c| !c.is_control() || matches!(c, '\n' | '\r' | '\t'))
        .collect();
    let object = extract_json_object(&cleaned).ok_or(LlmError::EmptyContent)?;
    serde_json::from_str(object).map_err(LlmError::Parse)
}

/// Returns the span from the first `{` to the last `}`, if any.
fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}
