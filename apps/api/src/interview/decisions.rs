//! Prompted Decision Maker: one typed request/response contract per decision.
//!
//! Every model decision goes through here. Replies are parsed into closed enums
//! with tolerant parsers, and each decision documents what it degrades to when
//! the completion fails or the reply cannot be parsed. The session never sees
//! an `LlmError`.

use std::sync::Arc;

use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use thiserror::Error;
use tracing::{debug, warn, Instrument, Span};

use crate::interview::prompts::{
    AUTHENTICITY_CHECK_PROMPT, COMPETENCY_ASSESSMENT_PROMPT, COMPETENCY_EXTRACTION_PROMPT,
    DIFFICULTY_ASSESSMENT_PROMPT, PRE_INTERVIEW_QUESTIONS_PROMPT, PRE_INTERVIEW_VALIDATION_PROMPT,
    QUESTION_REFINEMENT_PROMPT, VERIFICATION_QUESTIONS_PROMPT, VERIFICATION_VALIDATION_PROMPT,
};
use crate::llm_client::prompts::{render, GROUNDING_INSTRUCTION, JSON_ONLY_SYSTEM};
use crate::llm_client::{parse_json_reply, DecisionKind, LlmError, StructuredPrompt, TextCompletion};

/// Prompts and replies are logged at debug level, cut to this many characters.
const LOG_PREVIEW_CHARS: usize = 500;

pub const DEFAULT_CLOSING_QUESTION: &str = "Thank you. That's all I have.";
const DEFAULT_VALIDATION_FEEDBACK: &str = "Unable to validate answer.";
const DEFAULT_VALIDATION_FOLLOW_UP: &str = "Can you elaborate on that?";

#[derive(Debug, Error)]
pub enum DecisionError {
    #[error("Completion failed: {0}")]
    Completion(#[from] LlmError),

    #[error("Unparseable {kind} reply: {reason}")]
    Unparseable { kind: DecisionKind, reason: String },
}

// ────────────────────────────────────────────────────────────────────────────
// Decision results
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationStatus {
    Comprehensive,
    Adequate,
    Vague,
    Authentic,
    Generic,
    Inconsistent,
}

impl ValidationStatus {
    /// Unknown labels are treated as `Vague`.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "COMPREHENSIVE" => ValidationStatus::Comprehensive,
            "ADEQUATE" => ValidationStatus::Adequate,
            "AUTHENTIC" => ValidationStatus::Authentic,
            "GENERIC" => ValidationStatus::Generic,
            "INCONSISTENT" => ValidationStatus::Inconsistent,
            _ => ValidationStatus::Vague,
        }
    }

    pub fn is_satisfactory(self) -> bool {
        matches!(
            self,
            ValidationStatus::Comprehensive | ValidationStatus::Adequate | ValidationStatus::Authentic
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub status: ValidationStatus,
    /// Always within [0, 1].
    pub confidence: f64,
    pub feedback: String,
    pub needs_clarification: bool,
    pub suggested_follow_up: Option<String>,
}

impl ValidationResult {
    /// Used when the validation call fails: ask the candidate to elaborate.
    pub fn fallback() -> Self {
        Self {
            status: ValidationStatus::Vague,
            confidence: 0.5,
            feedback: DEFAULT_VALIDATION_FEEDBACK.to_string(),
            needs_clarification: true,
            suggested_follow_up: Some(DEFAULT_VALIDATION_FOLLOW_UP.to_string()),
        }
    }

    fn from_reply(reply: ValidationReply) -> Self {
        let status = reply
            .validation_status
            .as_deref()
            .map(ValidationStatus::parse)
            .unwrap_or(ValidationStatus::Vague);
        Self {
            status,
            confidence: reply.confidence_score.unwrap_or(0.5).clamp(0.0, 1.0),
            feedback: reply
                .feedback
                .unwrap_or_else(|| DEFAULT_VALIDATION_FEEDBACK.to_string()),
            needs_clarification: reply
                .needs_clarification
                .unwrap_or(!status.is_satisfactory()),
            suggested_follow_up: non_empty(reply.suggested_followup),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Authenticity {
    Authentic,
    Generic,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuthenticityVerdict {
    pub status: Authenticity,
    /// Only present for `Generic` answers.
    pub follow_up: Option<String>,
}

impl AuthenticityVerdict {
    pub fn authentic() -> Self {
        Self {
            status: Authenticity::Authentic,
            follow_up: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompetencyEvidence {
    pub competency: String,
    pub confidence: Option<f64>,
    pub rationale: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerQuality {
    Strong,
    Adequate,
    Weak,
}

impl AnswerQuality {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "STRONG" => Some(AnswerQuality::Strong),
            "ADEQUATE" => Some(AnswerQuality::Adequate),
            "WEAK" => Some(AnswerQuality::Weak),
            _ => None,
        }
    }
}

/// The interviewer's next move, chosen by the refinement decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InterviewAction {
    Deepen,
    Authenticate,
    Pivot,
    NewTopic,
    EndInterview,
}

impl InterviewAction {
    /// Unknown labels continue the interview rather than ending it.
    pub fn parse(raw: &str) -> Self {
        let normalized: String = raw
            .trim()
            .chars()
            .map(|c| match c {
                ' ' | '-' => '_',
                c => c.to_ascii_uppercase(),
            })
            .collect();
        match normalized.as_str() {
            "AUTHENTICATE" => InterviewAction::Authenticate,
            "PIVOT" => InterviewAction::Pivot,
            "NEW_TOPIC" => InterviewAction::NewTopic,
            "END_INTERVIEW" => InterviewAction::EndInterview,
            _ => InterviewAction::Deepen,
        }
    }
}

impl<'de> Deserialize<'de> for InterviewAction {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(InterviewAction::parse(&raw))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RefinementDecision {
    pub reasoning: String,
    pub action: InterviewAction,
    pub question: String,
    pub new_topic: Option<String>,
}

impl RefinementDecision {
    fn from_reply(reply: RefinementReply) -> Self {
        Self {
            reasoning: reply.reasoning.unwrap_or_default(),
            action: reply.decision.unwrap_or(InterviewAction::EndInterview),
            question: non_empty(reply.question)
                .unwrap_or_else(|| DEFAULT_CLOSING_QUESTION.to_string()),
            new_topic: non_empty(reply.new_topic),
        }
    }
}

/// Everything the refinement prompt is rendered from.
#[derive(Debug, Clone)]
pub struct RefinementInputs<'a> {
    pub total_minutes: u32,
    pub elapsed_minutes: u32,
    pub remaining_minutes: u32,
    pub current_topic: &'a str,
    pub history: &'a str,
    pub difficulty: f64,
    pub coverage_status: &'a str,
    pub remaining_checklist: &'a str,
    pub jd_context: &'a str,
    pub resume_context: &'a str,
    pub candidate_question: &'a str,
}

// ────────────────────────────────────────────────────────────────────────────
// Raw reply shapes
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct CompetencyListReply {
    #[serde(default)]
    competencies: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct QuestionListReply {
    #[serde(default)]
    questions: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ValidationReply {
    validation_status: Option<String>,
    confidence_score: Option<f64>,
    feedback: Option<String>,
    needs_clarification: Option<bool>,
    #[serde(alias = "suggested_follow_up")]
    suggested_followup: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AuthenticityReply {
    status: Option<String>,
    follow_up_question: Option<String>,
}

/// Evidence may come back as a bare name or as a full object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EvidenceItem {
    Name(String),
    Detailed {
        competency: String,
        #[serde(default)]
        confidence: Option<f64>,
        #[serde(default)]
        rationale: Option<String>,
    },
}

#[derive(Debug, Deserialize)]
struct CompetencyAssessmentReply {
    #[serde(default)]
    assessed_competencies: Vec<EvidenceItem>,
}

#[derive(Debug, Deserialize)]
struct DifficultyReply {
    quality: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RefinementReply {
    reasoning: Option<String>,
    decision: Option<InterviewAction>,
    question: Option<String>,
    new_topic: Option<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Decision maker
// ────────────────────────────────────────────────────────────────────────────

/// Issues decision calls on behalf of one session, inside that session's span.
#[derive(Clone)]
pub struct DecisionMaker {
    completion: Arc<dyn TextCompletion>,
    span: Span,
}

impl DecisionMaker {
    pub fn new(completion: Arc<dyn TextCompletion>, span: Span) -> Self {
        Self { completion, span }
    }

    pub async fn extract_competencies(&self, jd_context: &str) -> Result<Vec<String>, DecisionError> {
        let prompt = StructuredPrompt::json(
            DecisionKind::CompetencyExtraction,
            JSON_ONLY_SYSTEM,
            render(COMPETENCY_EXTRACTION_PROMPT, &[("jd_context", jd_context)]),
        );
        let reply: CompetencyListReply = self.ask_json(prompt).await?;
        Ok(clean_lines(reply.competencies))
    }

    pub async fn pre_interview_questions(
        &self,
        jd_context: &str,
        resume_context: &str,
    ) -> Result<Vec<String>, DecisionError> {
        self.question_list(
            DecisionKind::PreInterviewQuestions,
            PRE_INTERVIEW_QUESTIONS_PROMPT,
            jd_context,
            resume_context,
        )
        .await
    }

    pub async fn verification_questions(
        &self,
        jd_context: &str,
        resume_context: &str,
    ) -> Result<Vec<String>, DecisionError> {
        self.question_list(
            DecisionKind::VerificationQuestions,
            VERIFICATION_QUESTIONS_PROMPT,
            jd_context,
            resume_context,
        )
        .await
    }

    /// Never fails: degrades to `ValidationResult::fallback()`.
    pub async fn validate_pre_interview(&self, question: &str, answer: &str) -> ValidationResult {
        let prompt = StructuredPrompt::json(
            DecisionKind::PreInterviewValidation,
            JSON_ONLY_SYSTEM,
            render(
                PRE_INTERVIEW_VALIDATION_PROMPT,
                &[("question", question), ("answer", answer)],
            ),
        );
        self.validation(prompt).await
    }

    /// Never fails: degrades to `ValidationResult::fallback()`.
    pub async fn validate_verification(
        &self,
        resume_context: &str,
        question: &str,
        answer: &str,
    ) -> ValidationResult {
        let prompt = StructuredPrompt::json(
            DecisionKind::VerificationValidation,
            JSON_ONLY_SYSTEM,
            render(
                VERIFICATION_VALIDATION_PROMPT,
                &[
                    ("resume_context", resume_context),
                    ("question", question),
                    ("answer", answer),
                ],
            ),
        );
        self.validation(prompt).await
    }

    /// Never fails: degrades to `Authentic` with no follow-up.
    pub async fn check_authenticity(&self, question: &str, answer: &str) -> AuthenticityVerdict {
        let prompt = StructuredPrompt::json(
            DecisionKind::AuthenticityCheck,
            JSON_ONLY_SYSTEM,
            render(
                AUTHENTICITY_CHECK_PROMPT,
                &[("question", question), ("answer", answer)],
            ),
        );
        let reply: AuthenticityReply = match self.ask_json(prompt).await {
            Ok(reply) => reply,
            Err(e) => {
                self.degraded(&e);
                return AuthenticityVerdict::authentic();
            }
        };

        let generic = reply
            .status
            .as_deref()
            .map(|s| s.trim().eq_ignore_ascii_case("GENERIC"))
            .unwrap_or(false);
        if generic {
            AuthenticityVerdict {
                status: Authenticity::Generic,
                follow_up: non_empty(reply.follow_up_question),
            }
        } else {
            AuthenticityVerdict::authentic()
        }
    }

    /// Never fails: degrades to no evidence.
    pub async fn assess_competencies(
        &self,
        question: &str,
        answer: &str,
        remaining: &[String],
    ) -> Vec<CompetencyEvidence> {
        let remaining_json = match serde_json::to_string(remaining) {
            Ok(json) => json,
            Err(e) => {
                warn!(parent: &self.span, "Could not serialize remaining competencies: {e}");
                return Vec::new();
            }
        };
        let prompt = StructuredPrompt::json(
            DecisionKind::CompetencyAssessment,
            JSON_ONLY_SYSTEM,
            render(
                COMPETENCY_ASSESSMENT_PROMPT,
                &[
                    ("remaining_competencies", remaining_json.as_str()),
                    ("question", question),
                    ("answer", answer),
                ],
            ),
        );
        match self.ask_json::<CompetencyAssessmentReply>(prompt).await {
            Ok(reply) => reply
                .assessed_competencies
                .into_iter()
                .map(|item| match item {
                    EvidenceItem::Name(competency) => CompetencyEvidence {
                        competency,
                        confidence: None,
                        rationale: None,
                    },
                    EvidenceItem::Detailed {
                        competency,
                        confidence,
                        rationale,
                    } => CompetencyEvidence {
                        competency,
                        confidence: confidence.map(|c| c.clamp(0.0, 1.0)),
                        rationale,
                    },
                })
                .collect(),
            Err(e) => {
                self.degraded(&e);
                Vec::new()
            }
        }
    }

    /// `None` means "leave difficulty unchanged".
    pub async fn assess_difficulty(
        &self,
        question: &str,
        answer: &str,
        difficulty: f64,
    ) -> Option<AnswerQuality> {
        let level = format!("{difficulty:.1}");
        let prompt = StructuredPrompt::json(
            DecisionKind::DifficultyAssessment,
            JSON_ONLY_SYSTEM,
            render(
                DIFFICULTY_ASSESSMENT_PROMPT,
                &[
                    ("question", question),
                    ("answer", answer),
                    ("difficulty_level", level.as_str()),
                ],
            ),
        );
        match self.ask_json::<DifficultyReply>(prompt).await {
            Ok(reply) => reply.quality.as_deref().and_then(AnswerQuality::parse),
            Err(e) => {
                self.degraded(&e);
                None
            }
        }
    }

    /// Runs a strategy prompt and returns the single drafted question.
    pub async fn candidate_question(&self, prompt: StructuredPrompt) -> Result<String, DecisionError> {
        let kind = prompt.kind;
        let reply = self.ask_text(prompt).await?;
        let question = reply.trim().trim_matches('"').trim();
        if question.is_empty() {
            return Err(DecisionError::Unparseable {
                kind,
                reason: "empty question".to_string(),
            });
        }
        Ok(question.to_string())
    }

    pub async fn refine(&self, inputs: &RefinementInputs<'_>) -> Result<RefinementDecision, DecisionError> {
        let total = inputs.total_minutes.to_string();
        let elapsed = inputs.elapsed_minutes.to_string();
        let remaining = inputs.remaining_minutes.to_string();
        let difficulty = format!("{:.1}", inputs.difficulty);
        let prompt = StructuredPrompt::json(
            DecisionKind::QuestionRefinement,
            JSON_ONLY_SYSTEM,
            render(
                QUESTION_REFINEMENT_PROMPT,
                &[
                    ("total_duration_minutes", total.as_str()),
                    ("elapsed_time_minutes", elapsed.as_str()),
                    ("time_remaining_minutes", remaining.as_str()),
                    ("current_topic", inputs.current_topic),
                    ("history", inputs.history),
                    ("difficulty_level", difficulty.as_str()),
                    ("coverage_status", inputs.coverage_status),
                    ("remaining_checklist", inputs.remaining_checklist),
                    ("jd_context", inputs.jd_context),
                    ("resume_context", inputs.resume_context),
                    ("candidate_question", inputs.candidate_question),
                ],
            ),
        );
        let reply: RefinementReply = self.ask_json(prompt).await?;
        Ok(RefinementDecision::from_reply(reply))
    }

    // ── internals ──────────────────────────────────────────────────────────

    async fn question_list(
        &self,
        kind: DecisionKind,
        template: &str,
        jd_context: &str,
        resume_context: &str,
    ) -> Result<Vec<String>, DecisionError> {
        let prompt = StructuredPrompt::json(
            kind,
            JSON_ONLY_SYSTEM,
            render(
                template,
                &[
                    ("jd_context", jd_context),
                    ("resume_context", resume_context),
                    ("grounding_instruction", GROUNDING_INSTRUCTION),
                ],
            ),
        );
        let reply: QuestionListReply = self.ask_json(prompt).await?;
        Ok(clean_lines(reply.questions))
    }

    async fn validation(&self, prompt: StructuredPrompt) -> ValidationResult {
        match self.ask_json::<ValidationReply>(prompt).await {
            Ok(reply) => ValidationResult::from_reply(reply),
            Err(e) => {
                self.degraded(&e);
                ValidationResult::fallback()
            }
        }
    }

    async fn ask_json<T: DeserializeOwned>(&self, prompt: StructuredPrompt) -> Result<T, DecisionError> {
        let kind = prompt.kind;
        let reply = self.ask_text(prompt).await?;
        parse_json_reply(&reply).map_err(|e| DecisionError::Unparseable {
            kind,
            reason: e.to_string(),
        })
    }

    async fn ask_text(&self, prompt: StructuredPrompt) -> Result<String, DecisionError> {
        let kind = prompt.kind;
        async move {
            debug!(decision = %kind, prompt = %preview(&prompt.user), "Decision request");
            let reply = self.completion.complete(&prompt).await?;
            debug!(decision = %kind, reply = %preview(&reply), "Decision reply");
            Ok::<String, DecisionError>(reply)
        }
        .instrument(self.span.clone())
        .await
    }

    fn degraded(&self, error: &DecisionError) {
        warn!(parent: &self.span, "Decision degraded to default: {error}");
    }
}

fn preview(text: &str) -> String {
    text.chars().take(LOG_PREVIEW_CHARS).collect()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("null"))
}

fn clean_lines(lines: Vec<String>) -> Vec<String> {
    lines
        .into_iter()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .collect()
}
