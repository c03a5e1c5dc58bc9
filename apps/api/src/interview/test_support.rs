//! Scripted completion double shared by the interview tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm_client::{DecisionKind, LlmError, StructuredPrompt, TextCompletion};

enum Scripted {
    Reply(String),
    Fail,
}

/// Replies are queued per decision kind; an empty queue falls back to a
/// well-formed default reply for that kind. Every call is counted.
#[derive(Default)]
pub struct ScriptedCompletion {
    queued: Mutex<HashMap<DecisionKind, VecDeque<Scripted>>>,
    always_fail: Mutex<Vec<DecisionKind>>,
    calls: Mutex<Vec<StructuredPrompt>>,
}

impl ScriptedCompletion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, kind: DecisionKind, reply: &str) {
        self.queued
            .lock()
            .unwrap()
            .entry(kind)
            .or_default()
            .push_back(Scripted::Reply(reply.to_string()));
    }

    /// The next call of `kind` fails.
    pub fn fail(&self, kind: DecisionKind) {
        self.queued
            .lock()
            .unwrap()
            .entry(kind)
            .or_default()
            .push_back(Scripted::Fail);
    }

    /// Every call of `kind` fails.
    pub fn fail_always(&self, kind: DecisionKind) {
        self.always_fail.lock().unwrap().push(kind);
    }

    pub fn calls(&self, kind: DecisionKind) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.kind == kind)
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn last_prompt(&self, kind: DecisionKind) -> Option<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|p| p.kind == kind)
            .map(|p| p.user.clone())
    }
}

#[async_trait]
impl TextCompletion for ScriptedCompletion {
    async fn complete(&self, prompt: &StructuredPrompt) -> Result<String, LlmError> {
        self.calls.lock().unwrap().push(prompt.clone());

        if self.always_fail.lock().unwrap().contains(&prompt.kind) {
            return Err(scripted_failure());
        }

        let next = self
            .queued
            .lock()
            .unwrap()
            .get_mut(&prompt.kind)
            .and_then(|queue| queue.pop_front());

        match next {
            Some(Scripted::Reply(reply)) => Ok(reply),
            Some(Scripted::Fail) => Err(scripted_failure()),
            None => Ok(default_reply(prompt.kind).to_string()),
        }
    }
}

fn scripted_failure() -> LlmError {
    LlmError::Api {
        status: 500,
        message: "scripted failure".to_string(),
    }
}

pub const DEFAULT_MAIN_QUESTION: &str = "Can you walk me through a recent design decision?";

fn default_reply(kind: DecisionKind) -> &'static str {
    match kind {
        DecisionKind::CompetencyExtraction => {
            r#"{"competencies": ["Rust", "Kafka", "Communication"]}"#
        }
        DecisionKind::PreInterviewQuestions => {
            r#"{"questions": ["What drew you to this role?", "Which of your projects fits it best?"]}"#
        }
        DecisionKind::PreInterviewValidation => {
            r#"{"validation_status": "ADEQUATE", "confidence_score": 0.8, "feedback": "Relevant.", "needs_clarification": false, "suggested_followup": null}"#
        }
        DecisionKind::VerificationQuestions => {
            r#"{"questions": ["When did you join Acme?", "What was your title there?"]}"#
        }
        DecisionKind::VerificationValidation => {
            r#"{"validation_status": "AUTHENTIC", "confidence_score": 0.9, "feedback": "Matches.", "needs_clarification": false, "suggested_followup": null}"#
        }
        DecisionKind::AuthenticityCheck => r#"{"status": "AUTHENTIC", "follow_up_question": null}"#,
        DecisionKind::CompetencyAssessment => r#"{"assessed_competencies": []}"#,
        DecisionKind::DifficultyAssessment => r#"{"quality": "ADEQUATE", "rationale": "Fine."}"#,
        DecisionKind::CandidateQuestion => "Tell me about a system you designed end to end.",
        DecisionKind::QuestionRefinement => {
            r#"{"reasoning": "Keep going.", "decision": "DEEPEN", "question": "Can you walk me through a recent design decision?", "new_topic": "System design"}"#
        }
    }
}
