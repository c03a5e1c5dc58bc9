//! Interview Session: the state machine that drives one candidate's interview.
//!
//! Phases run PreValidation → Verification → MainInterview → Ended. Either
//! screening phase is skipped when it has no questions. Every answer is one
//! turn: the session consults the time tracker, issues zero or more decision
//! calls, and returns exactly one reply or the terminal sentinel.
//!
//! Once ended, the session is absorbing: every later call returns
//! `BotReply::Ended` and no decision call is issued.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span, warn, Instrument, Span};
use uuid::Uuid;

use crate::interview::competency::CompetencyTracker;
use crate::interview::decisions::{Authenticity, DecisionMaker, ValidationResult};
use crate::interview::difficulty::{DifficultyController, DifficultyPolicy};
use crate::interview::history::{ConversationHistory, Role};
use crate::interview::question_gen::{generate_next, GenerationContext, GenerationOutcome};
use crate::interview::timing::{TimeTracker, TimeWarning};
use crate::interview::transcript::{ScreeningRecord, TranscriptMetadata, TranscriptRecord};
use crate::llm_client::TextCompletion;
use crate::retrieval::context::{extract_context, ContextSource, ExtractedContext};
use crate::retrieval::RetrievalStore;

/// Sent by the transport when the candidate's clock runs out client-side.
pub const TIME_UP_SIGNAL: &str = "TIME_UP_SIGNAL";
pub const DEFAULT_MAX_VALIDATION_ATTEMPTS: u32 = 2;
pub const INITIAL_TOPIC: &str = "Opening";

const WELCOME_MESSAGE: &str = "Welcome to your interview!\n\n\
    We'll start with a few brief questions to better understand your background.\n\
    Please provide specific, detailed answers based on your experience.\n\n\
    Let's begin when you're ready.";
const PRE_INTERVIEW_TRANSITION: &str = "Thank you for those initial answers. Now let's move to \
    the main interview questions.\n\nRemember to provide specific examples from your experience \
    where possible.";
const VERIFICATION_TRANSITION: &str =
    "Thank you for confirming your background. Let's continue with the main interview.";
const PRE_INTERVIEW_CLARIFICATION: &str =
    "Could you please provide more specific details about that?";
const VERIFICATION_CLARIFICATION: &str = "Could you elaborate on that for me?";

pub const FALLBACK_PRE_INTERVIEW_QUESTIONS: [&str; 3] = [
    "Can you briefly summarize your most relevant experience for this role?",
    "What specific skills from the job description do you feel most confident about?",
    "Why are you interested in this particular position and company?",
];
const MIN_PRE_INTERVIEW_QUESTIONS: usize = 2;
const MAX_SCREENING_QUESTIONS: usize = 3;

const SKIP_PHRASES: [&str; 15] = [
    "i don't know",
    "i do not know",
    "don't know",
    "not sure",
    "no idea",
    "can't answer",
    "cannot answer",
    "skip",
    "pass",
    "i'm not sure",
    "im not sure",
    "not familiar",
    "repeat that",
    "can you repeat",
    "what was the question",
];
/// Longer utterances only count as skips on an exact phrase match.
const MAX_SKIP_WORDS: usize = 6;

// ────────────────────────────────────────────────────────────────────────────
// Public types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotReply {
    Message(String),
    /// Terminal sentinel. Every call after the end returns this.
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// The transport signalled time-up.
    TimeUp,
    /// The session clock ran out.
    TimeExpired,
    /// The interviewer chose to end.
    InterviewComplete,
    /// Question generation failed.
    GenerationFailed,
}

impl EndReason {
    pub fn label(self) -> &'static str {
        match self {
            EndReason::TimeUp => "time_up",
            EndReason::TimeExpired => "time_expired",
            EndReason::InterviewComplete => "interview_complete",
            EndReason::GenerationFailed => "generation_failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepState {
    AwaitingAnswer { index: usize },
    Clarifying { index: usize, attempt: u32 },
}

impl StepState {
    fn index(self) -> usize {
        match self {
            StepState::AwaitingAnswer { index } | StepState::Clarifying { index, .. } => index,
        }
    }

    fn attempt(self) -> u32 {
        match self {
            StepState::AwaitingAnswer { .. } => 0,
            StepState::Clarifying { attempt, .. } => attempt,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    NotStarted,
    PreValidation(StepState),
    Verification(StepState),
    MainInterview,
    Ended(EndReason),
}

/// Where a screening phase gets its questions from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuestionPlan {
    Generate,
    Fixed(Vec<String>),
}

pub struct SessionSetup {
    pub session_id: Uuid,
    pub candidate_name: String,
    pub duration_minutes: u32,
    pub pre_interview: QuestionPlan,
    pub verification: QuestionPlan,
    pub max_validation_attempts: u32,
    pub difficulty_policy: DifficultyPolicy,
    /// Fixes strategy selection; `None` seeds from entropy.
    pub rng_seed: Option<u64>,
    /// Every log line and decision call of the session is recorded under this span.
    pub span: Span,
}

impl SessionSetup {
    pub fn new(session_id: Uuid, candidate_name: impl Into<String>, duration_minutes: u32) -> Self {
        Self {
            session_id,
            candidate_name: candidate_name.into(),
            duration_minutes,
            pre_interview: QuestionPlan::Generate,
            verification: QuestionPlan::Generate,
            max_validation_attempts: DEFAULT_MAX_VALIDATION_ATTEMPTS,
            difficulty_policy: DifficultyPolicy::default(),
            rng_seed: None,
            span: info_span!("interview", session_id = %session_id),
        }
    }
}

pub struct SessionDeps {
    pub completion: Arc<dyn TextCompletion>,
    pub jd_store: Arc<dyn RetrievalStore>,
    pub resume_store: Arc<dyn RetrievalStore>,
}

// ────────────────────────────────────────────────────────────────────────────
// Session
// ────────────────────────────────────────────────────────────────────────────

pub struct InterviewSession {
    id: Uuid,
    candidate_name: String,
    started_at: DateTime<Utc>,
    time: TimeTracker,
    phase: Phase,
    end_logged: bool,
    current_topic: String,
    current_question: Option<String>,
    difficulty: DifficultyController,
    competencies: CompetencyTracker,
    history: ConversationHistory,
    pre_interview: ScreeningRecord,
    verification: ScreeningRecord,
    max_validation_attempts: u32,
    decisions: DecisionMaker,
    jd: ExtractedContext,
    resume: ExtractedContext,
    resume_store: Arc<dyn RetrievalStore>,
    rng: StdRng,
    span: Span,
}

impl InterviewSession {
    /// Extracts context, target competencies and screening questions.
    /// Never fails: every decision failure degrades to a default.
    pub async fn prepare(setup: SessionSetup, deps: SessionDeps) -> Self {
        let span = setup.span.clone();
        async move {
            let decisions = DecisionMaker::new(deps.completion, setup.span.clone());
            let jd = extract_context(deps.jd_store.as_ref(), ContextSource::JobDescription).await;
            let resume = extract_context(deps.resume_store.as_ref(), ContextSource::Resume).await;

            for context in [&jd, &resume] {
                info!("{:?} context: {} passages", context.source, context.passages.len());
            }

            let competencies = CompetencyTracker::extract(&decisions, &jd).await;
            let pre_questions = match setup.pre_interview {
                QuestionPlan::Fixed(questions) => questions,
                QuestionPlan::Generate => pre_interview_questions(&decisions, &jd, &resume).await,
            };
            let verification_questions = match setup.verification {
                QuestionPlan::Fixed(questions) => questions,
                QuestionPlan::Generate => verification_questions(&decisions, &jd, &resume).await,
            };

            info!(
                "Session prepared: {} pre-interview, {} verification questions, {} minutes",
                pre_questions.len(),
                verification_questions.len(),
                setup.duration_minutes
            );

            Self {
                id: setup.session_id,
                candidate_name: setup.candidate_name,
                started_at: Utc::now(),
                time: TimeTracker::start(setup.duration_minutes),
                phase: Phase::NotStarted,
                end_logged: false,
                current_topic: INITIAL_TOPIC.to_string(),
                current_question: None,
                difficulty: DifficultyController::new(setup.difficulty_policy),
                competencies,
                history: ConversationHistory::new(),
                pre_interview: ScreeningRecord::new(pre_questions),
                verification: ScreeningRecord::new(verification_questions),
                max_validation_attempts: setup.max_validation_attempts,
                decisions,
                jd,
                resume,
                resume_store: deps.resume_store,
                rng: setup
                    .rng_seed
                    .map(StdRng::seed_from_u64)
                    .unwrap_or_else(StdRng::from_entropy),
                span: setup.span,
            }
        }
        .instrument(span)
        .await
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_ended(&self) -> bool {
        matches!(self.phase, Phase::Ended(_))
    }

    pub fn end_reason(&self) -> Option<EndReason> {
        match self.phase {
            Phase::Ended(reason) => Some(reason),
            _ => None,
        }
    }

    pub fn current_topic(&self) -> &str {
        &self.current_topic
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    /// Emits the welcome and the first question. Calling it again returns
    /// the pending question.
    pub async fn start(&mut self) -> BotReply {
        let span = self.span.clone();
        self.begin().instrument(span).await
    }

    /// Processes one candidate utterance and returns the next reply.
    pub async fn submit_answer(&mut self, answer: &str) -> BotReply {
        let span = self.span.clone();
        self.handle_answer(answer).instrument(span).await
    }

    pub async fn force_time_up(&mut self) -> BotReply {
        self.submit_answer(TIME_UP_SIGNAL).await
    }

    pub fn export_transcript(&self) -> TranscriptRecord {
        TranscriptRecord {
            metadata: TranscriptMetadata {
                session_id: self.id,
                candidate_name: self.candidate_name.clone(),
                start_time: self.started_at,
                duration_minutes: self.time.duration_minutes(),
                target_competencies: self.competencies.targets().to_vec(),
                completed_competencies: self.competencies.completed(),
                final_difficulty: self.difficulty.level(),
                end_reason: self.end_reason(),
                pre_interview: self.pre_interview.clone(),
                verification: self.verification.clone(),
            },
            transcript: self.history.turns().to_vec(),
        }
    }

    // ── turn handling ──────────────────────────────────────────────────────

    async fn begin(&mut self) -> BotReply {
        match self.phase {
            Phase::Ended(_) => return BotReply::Ended,
            Phase::NotStarted => {}
            _ => return BotReply::Message(self.current_question.clone().unwrap_or_default()),
        }

        let text = if let Some(first) = self.pre_interview.questions.first().cloned() {
            self.phase = Phase::PreValidation(StepState::AwaitingAnswer { index: 0 });
            self.current_question = Some(first.clone());
            format!("{WELCOME_MESSAGE}\n\n**First Question:** {first}")
        } else if let Some(first) = self.verification.questions.first().cloned() {
            self.phase = Phase::Verification(StepState::AwaitingAnswer { index: 0 });
            self.current_question = Some(first.clone());
            format!("{WELCOME_MESSAGE}\n\n{first}")
        } else {
            self.phase = Phase::MainInterview;
            let question = self.next_main_question().await;
            format!("{WELCOME_MESSAGE}\n\n{question}")
        };

        info!("Interview started in phase {:?}", self.phase);
        self.emit(text, &[])
    }

    async fn handle_answer(&mut self, answer: &str) -> BotReply {
        if self.is_ended() {
            return BotReply::Ended;
        }
        if answer.trim() == TIME_UP_SIGNAL {
            info!("Time-up signal received");
            self.end(EndReason::TimeUp);
            self.log_end();
            return BotReply::Ended;
        }
        if self.phase == Phase::NotStarted {
            warn!("Answer received before start; starting the interview instead");
            return self.begin().await;
        }

        self.history.push(Role::User, answer);

        let status = self.time.poll();
        debug!(
            "Time: {} min elapsed, {} min remaining ({:.0}% used)",
            status.elapsed_minutes, status.remaining_minutes, status.percentage_used
        );
        if status.is_expired() {
            info!("Interview time expired after {} minutes", status.elapsed_minutes);
            self.end(EndReason::TimeExpired);
            self.log_end();
            return BotReply::Ended;
        }

        let text = match self.phase {
            Phase::PreValidation(step) => self.handle_pre_interview(step, answer).await,
            Phase::Verification(step) => self.handle_verification(step, answer).await,
            Phase::MainInterview => self.handle_main(answer).await,
            Phase::NotStarted | Phase::Ended(_) => return BotReply::Ended,
        };

        self.emit(text, &status.new_warnings)
    }

    async fn handle_pre_interview(&mut self, step: StepState, answer: &str) -> String {
        let index = step.index();
        let Some(question) = self.pre_interview.questions.get(index).cloned() else {
            return self.leave_pre_interview().await;
        };
        let asked = self.current_question.clone().unwrap_or_else(|| question.clone());

        let validation = self.decisions.validate_pre_interview(&asked, answer).await;
        self.pre_interview
            .record(index, step.attempt(), &asked, answer, validation.clone());

        if let Some(follow_up) = self.clarification(&validation, step, PRE_INTERVIEW_CLARIFICATION) {
            self.phase = Phase::PreValidation(StepState::Clarifying {
                index,
                attempt: step.attempt() + 1,
            });
            self.current_question = Some(follow_up.clone());
            return follow_up;
        }

        let next = index + 1;
        match self.pre_interview.questions.get(next).cloned() {
            Some(next_question) => {
                self.phase = Phase::PreValidation(StepState::AwaitingAnswer { index: next });
                self.current_question = Some(next_question.clone());
                let ack = if validation.status.is_satisfactory() {
                    "Thank you for that detailed answer."
                } else {
                    "Thank you."
                };
                format!("{ack} Next question: {next_question}")
            }
            None => self.leave_pre_interview().await,
        }
    }

    async fn leave_pre_interview(&mut self) -> String {
        info!("Pre-interview validation complete");
        if let Some(first) = self.verification.questions.first().cloned() {
            self.phase = Phase::Verification(StepState::AwaitingAnswer { index: 0 });
            self.current_question = Some(first.clone());
            return format!("{PRE_INTERVIEW_TRANSITION}\n\n{first}");
        }
        self.phase = Phase::MainInterview;
        let question = self.next_main_question().await;
        format!("{PRE_INTERVIEW_TRANSITION}\n\n{question}")
    }

    async fn handle_verification(&mut self, step: StepState, answer: &str) -> String {
        let index = step.index();
        let Some(question) = self.verification.questions.get(index).cloned() else {
            return self.leave_verification().await;
        };
        let asked = self.current_question.clone().unwrap_or_else(|| question.clone());

        let validation = self
            .decisions
            .validate_verification(&self.resume.blob, &asked, answer)
            .await;
        self.verification
            .record(index, step.attempt(), &asked, answer, validation.clone());

        if let Some(follow_up) = self.clarification(&validation, step, VERIFICATION_CLARIFICATION) {
            self.phase = Phase::Verification(StepState::Clarifying {
                index,
                attempt: step.attempt() + 1,
            });
            self.current_question = Some(follow_up.clone());
            return follow_up;
        }

        let next = index + 1;
        match self.verification.questions.get(next).cloned() {
            Some(next_question) => {
                self.phase = Phase::Verification(StepState::AwaitingAnswer { index: next });
                self.current_question = Some(next_question.clone());
                next_question
            }
            None => self.leave_verification().await,
        }
    }

    async fn leave_verification(&mut self) -> String {
        info!("Verification phase complete");
        self.phase = Phase::MainInterview;
        let question = self.next_main_question().await;
        format!("{VERIFICATION_TRANSITION}\n\n{question}")
    }

    async fn handle_main(&mut self, answer: &str) -> String {
        if is_skip_answer(answer) {
            info!("Candidate skipped the question");
            return self.next_main_question().await;
        }

        let question = self.current_question.clone().unwrap_or_default();
        let verdict = self.decisions.check_authenticity(&question, answer).await;
        self.competencies
            .assess(&self.decisions, &question, answer)
            .await;
        self.difficulty
            .update(&self.decisions, &question, answer, verdict.status)
            .await;
        info!(
            "Answer assessed: {:?}, difficulty {:.1}, {}",
            verdict.status,
            self.difficulty.level(),
            self.competencies.coverage_status()
        );

        if verdict.status == Authenticity::Generic {
            if let Some(follow_up) = verdict.follow_up {
                warn!("Generic answer detected; asking for a personal example");
                self.current_question = Some(follow_up.clone());
                return follow_up;
            }
        }

        self.next_main_question().await
    }

    /// Generates the next main-interview question. An `End` outcome ends the
    /// session and returns the closing line.
    async fn next_main_question(&mut self) -> String {
        let outcome = {
            let ctx = GenerationContext {
                decisions: &self.decisions,
                time: &self.time,
                current_topic: &self.current_topic,
                history: &self.history,
                difficulty: self.difficulty.level(),
                competencies: &self.competencies,
                jd: &self.jd,
                resume: &self.resume,
                resume_store: self.resume_store.as_ref(),
            };
            generate_next(&ctx, &mut self.rng).await
        };

        match outcome {
            GenerationOutcome::Continue {
                question,
                action,
                new_topic,
            } => {
                debug!("Next question chosen via {action:?}");
                if let Some(topic) = new_topic {
                    self.current_topic = topic;
                }
                self.current_question = Some(question.clone());
                question
            }
            GenerationOutcome::End { closing, reason } => {
                self.end(reason);
                self.current_question = None;
                closing
            }
        }
    }

    /// The follow-up to ask, if the answer needs clarification and attempts remain.
    fn clarification(
        &self,
        validation: &ValidationResult,
        step: StepState,
        default_follow_up: &str,
    ) -> Option<String> {
        (validation.needs_clarification && step.attempt() < self.max_validation_attempts).then(|| {
            validation
                .suggested_follow_up
                .clone()
                .unwrap_or_else(|| default_follow_up.to_string())
        })
    }

    /// Prepends newly crossed time warnings and records the reply.
    fn emit(&mut self, text: String, warnings: &[TimeWarning]) -> BotReply {
        let text = if warnings.is_empty() {
            text
        } else {
            let notice = warnings
                .iter()
                .map(|w| w.message())
                .collect::<Vec<_>>()
                .join("\n\n");
            format!("{notice}\n\n{text}")
        };
        self.history.push(Role::Bot, text.clone());
        self.log_end();
        BotReply::Message(text)
    }

    fn end(&mut self, reason: EndReason) {
        if !self.is_ended() {
            info!("Interview ended: {}", reason.label());
            self.phase = Phase::Ended(reason);
        }
    }

    /// Appends the system turn naming the end reason, once.
    fn log_end(&mut self) {
        if let (Some(reason), false) = (self.end_reason(), self.end_logged) {
            self.history
                .push(Role::System, format!("Interview ended: {}", reason.label()));
            self.end_logged = true;
        }
    }
}

async fn pre_interview_questions(
    decisions: &DecisionMaker,
    jd: &ExtractedContext,
    resume: &ExtractedContext,
) -> Vec<String> {
    let fallback = || -> Vec<String> {
        FALLBACK_PRE_INTERVIEW_QUESTIONS[..MIN_PRE_INTERVIEW_QUESTIONS]
            .iter()
            .map(|q| q.to_string())
            .collect()
    };

    if !jd.is_sufficient() && !resume.is_sufficient() {
        warn!("No context for pre-interview questions; using fallback questions");
        return fallback();
    }

    match decisions.pre_interview_questions(&jd.blob, &resume.blob).await {
        Ok(questions) if questions.len() >= MIN_PRE_INTERVIEW_QUESTIONS => {
            questions.into_iter().take(MAX_SCREENING_QUESTIONS).collect()
        }
        Ok(questions) => {
            warn!(
                "Only {} pre-interview questions generated; using fallback questions",
                questions.len()
            );
            fallback()
        }
        Err(e) => {
            warn!("Pre-interview question generation failed: {e}");
            fallback()
        }
    }
}

async fn verification_questions(
    decisions: &DecisionMaker,
    jd: &ExtractedContext,
    resume: &ExtractedContext,
) -> Vec<String> {
    if !jd.is_sufficient() {
        warn!("Insufficient job description context for verification questions");
        return Vec::new();
    }
    match decisions.verification_questions(&jd.blob, &resume.blob).await {
        Ok(questions) => questions.into_iter().take(MAX_SCREENING_QUESTIONS).collect(),
        Err(e) => {
            warn!("Verification question generation failed: {e}");
            Vec::new()
        }
    }
}

/// Whether the utterance declines to answer ("I don't know", "pass", ...).
pub fn is_skip_answer(answer: &str) -> bool {
    let normalized = normalize_utterance(answer);
    if SKIP_PHRASES.contains(&normalized.as_str()) {
        return true;
    }

    let words: Vec<&str> = normalized
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric() && c != '\''))
        .filter(|w| !w.is_empty())
        .collect();
    if words.len() > MAX_SKIP_WORDS {
        return false;
    }

    SKIP_PHRASES.iter().any(|phrase| {
        let phrase_words: Vec<&str> = phrase.split_whitespace().collect();
        words
            .windows(phrase_words.len())
            .any(|window| window == phrase_words.as_slice())
    })
}

fn normalize_utterance(answer: &str) -> String {
    answer
        .trim()
        .to_lowercase()
        .replace(['\u{2019}', '\u{2018}', '`'], "'")
        .trim_end_matches(|c: char| c.is_ascii_punctuation() && c != '\'')
        .trim()
        .to_string()
}
