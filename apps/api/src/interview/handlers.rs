//! Axum route handlers for the Interview API.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::interview::registry::SharedSession;
use crate::interview::session::{
    BotReply, InterviewSession, QuestionPlan, SessionDeps, SessionSetup,
};
use crate::interview::transcript::TranscriptRecord;
use crate::retrieval::InMemoryStore;
use crate::state::AppState;

/// Shown to the candidate once the interview is over.
pub const FINAL_MESSAGE: &str =
    "Thank you for your time. The interview is now complete. You may close this window.";
const MAX_INTERVIEW_MINUTES: u32 = 180;
const MAX_FIXED_QUESTIONS: usize = 5;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateInterviewRequest {
    pub candidate_name: String,
    pub job_description: String,
    pub resume: String,
    pub duration_minutes: Option<u32>,
    /// Recruiter-supplied screening questions. When absent they are generated;
    /// an empty list skips the phase.
    #[serde(default)]
    pub pre_interview_questions: Option<Vec<String>>,
    #[serde(default)]
    pub verification_questions: Option<Vec<String>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateInterviewResponse {
    pub session_id: Uuid,
    pub duration_minutes: u32,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AnswerResponse {
    pub reply: Option<String>,
    pub ended: bool,
    pub closing_message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TimeUpResponse {
    pub ended: bool,
    pub closing_message: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/interviews
///
/// Builds retrieval stores from the raw documents, prepares a session and
/// returns the opening message.
pub async fn handle_create_interview(
    State(state): State<AppState>,
    Json(request): Json<CreateInterviewRequest>,
) -> Result<Json<CreateInterviewResponse>, AppError> {
    if request.candidate_name.trim().is_empty() {
        return Err(AppError::Validation("candidate_name cannot be empty".to_string()));
    }
    if request.job_description.trim().is_empty() {
        return Err(AppError::Validation("job_description cannot be empty".to_string()));
    }
    if request.resume.trim().is_empty() {
        return Err(AppError::Validation("resume cannot be empty".to_string()));
    }

    let duration_minutes = request
        .duration_minutes
        .unwrap_or(state.config.default_interview_minutes);
    if duration_minutes == 0 || duration_minutes > MAX_INTERVIEW_MINUTES {
        return Err(AppError::Validation(format!(
            "duration_minutes must be between 1 and {MAX_INTERVIEW_MINUTES}"
        )));
    }

    let pre_interview = question_plan("pre_interview_questions", request.pre_interview_questions)?;
    let verification = question_plan("verification_questions", request.verification_questions)?;

    let session_id = Uuid::new_v4();
    let setup = SessionSetup {
        pre_interview,
        verification,
        max_validation_attempts: state.config.max_validation_attempts,
        difficulty_policy: state.config.difficulty_policy,
        ..SessionSetup::new(session_id, request.candidate_name.trim(), duration_minutes)
    };
    let deps = SessionDeps {
        completion: state.llm.clone(),
        jd_store: Arc::new(InMemoryStore::from_text(&request.job_description)),
        resume_store: Arc::new(InMemoryStore::from_text(&request.resume)),
    };

    let mut session = InterviewSession::prepare(setup, deps).await;
    let message = match session.start().await {
        BotReply::Message(text) => text,
        BotReply::Ended => FINAL_MESSAGE.to_string(),
    };

    let shared = state.sessions.insert(session).await;
    shared.lock().await.persist_if_ended(&state.transcripts).await;
    info!(
        "Interview {session_id} created ({duration_minutes} minutes, {} active sessions)",
        state.sessions.len().await
    );

    Ok(Json(CreateInterviewResponse {
        session_id,
        duration_minutes,
        message,
    }))
}

/// POST /api/v1/interviews/:id/answers
pub async fn handle_submit_answer(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<AnswerRequest>,
) -> Result<Json<AnswerResponse>, AppError> {
    if request.content.trim().is_empty() {
        return Err(AppError::Validation("content cannot be empty".to_string()));
    }

    let shared = find_session(&state, session_id).await?;
    let mut entry = shared.lock().await;
    let reply = entry.session.submit_answer(&request.content).await;
    entry.touch();
    entry.persist_if_ended(&state.transcripts).await;
    let ended = entry.session.is_ended();
    info!(
        "Answer processed for {session_id}: phase {:?}, topic {}",
        entry.session.phase(),
        entry.session.current_topic()
    );

    let response = match reply {
        BotReply::Message(text) => AnswerResponse {
            reply: Some(text),
            ended,
            closing_message: ended.then(|| FINAL_MESSAGE.to_string()),
        },
        BotReply::Ended => AnswerResponse {
            reply: None,
            ended: true,
            closing_message: Some(FINAL_MESSAGE.to_string()),
        },
    };
    Ok(Json(response))
}

/// POST /api/v1/interviews/:id/time-up
pub async fn handle_time_up(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<TimeUpResponse>, AppError> {
    let shared = find_session(&state, session_id).await?;
    let mut entry = shared.lock().await;
    entry.session.force_time_up().await;
    entry.touch();
    entry.persist_if_ended(&state.transcripts).await;

    Ok(Json(TimeUpResponse {
        ended: true,
        closing_message: FINAL_MESSAGE.to_string(),
    }))
}

/// GET /api/v1/interviews/:id/transcript
pub async fn handle_get_transcript(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<TranscriptRecord>, AppError> {
    let shared = find_session(&state, session_id).await?;
    let entry = shared.lock().await;
    Ok(Json(entry.session.export_transcript()))
}

fn question_plan(field: &str, questions: Option<Vec<String>>) -> Result<QuestionPlan, AppError> {
    let Some(questions) = questions else {
        return Ok(QuestionPlan::Generate);
    };
    let questions: Vec<String> = questions
        .into_iter()
        .map(|q| q.trim().to_string())
        .filter(|q| !q.is_empty())
        .collect();
    if questions.len() > MAX_FIXED_QUESTIONS {
        return Err(AppError::Validation(format!(
            "{field} accepts at most {MAX_FIXED_QUESTIONS} questions"
        )));
    }
    Ok(QuestionPlan::Fixed(questions))
}

async fn find_session(state: &AppState, session_id: Uuid) -> Result<SharedSession, AppError> {
    state
        .sessions
        .get(session_id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Interview {session_id} not found")))
}
