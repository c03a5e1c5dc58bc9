//! Candidate-question strategies.
//!
//! A static table of pure prompt builders. A strategy is selectable only when
//! the passages it needs exist, and selection among the selectable ones is
//! uniform.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use tracing::warn;

use crate::interview::prompts::{
    JD_QUESTION_PROMPT, RAG_QUESTION_PROMPT, RESUME_QUESTION_PROMPT, SITUATIONAL_QUESTION_PROMPT,
};
use crate::llm_client::prompts::{render, QUESTION_ONLY_SYSTEM};
use crate::llm_client::{DecisionKind, StructuredPrompt};
use crate::retrieval::RetrievalStore;

const NO_MATCHING_BACKGROUND: &str = "No specific context found.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestionStrategy {
    Situational,
    #[serde(rename = "JD")]
    JobDescription,
    Resume,
    Rag,
}

#[derive(Debug, Clone, Default)]
pub struct StrategyInputs {
    pub jd_passage: String,
    pub resume_passage: String,
}

pub struct StrategySpec {
    pub strategy: QuestionStrategy,
    pub needs_jd: bool,
    pub needs_resume: bool,
    pub build_prompt: fn(&StrategyInputs) -> StructuredPrompt,
}

pub static STRATEGIES: [StrategySpec; 4] = [
    StrategySpec {
        strategy: QuestionStrategy::Situational,
        needs_jd: true,
        needs_resume: false,
        build_prompt: situational_prompt,
    },
    StrategySpec {
        strategy: QuestionStrategy::JobDescription,
        needs_jd: true,
        needs_resume: false,
        build_prompt: jd_prompt,
    },
    StrategySpec {
        strategy: QuestionStrategy::Resume,
        needs_jd: false,
        needs_resume: true,
        build_prompt: resume_prompt,
    },
    StrategySpec {
        strategy: QuestionStrategy::Rag,
        needs_jd: true,
        needs_resume: true,
        build_prompt: rag_prompt,
    },
];

fn situational_prompt(inputs: &StrategyInputs) -> StructuredPrompt {
    candidate_prompt(render(
        SITUATIONAL_QUESTION_PROMPT,
        &[("jd_passage", inputs.jd_passage.as_str())],
    ))
}

fn jd_prompt(inputs: &StrategyInputs) -> StructuredPrompt {
    candidate_prompt(render(
        JD_QUESTION_PROMPT,
        &[("jd_passage", inputs.jd_passage.as_str())],
    ))
}

fn resume_prompt(inputs: &StrategyInputs) -> StructuredPrompt {
    candidate_prompt(render(
        RESUME_QUESTION_PROMPT,
        &[("resume_passage", inputs.resume_passage.as_str())],
    ))
}

fn rag_prompt(inputs: &StrategyInputs) -> StructuredPrompt {
    candidate_prompt(render(
        RAG_QUESTION_PROMPT,
        &[
            ("jd_passage", inputs.jd_passage.as_str()),
            ("resume_passage", inputs.resume_passage.as_str()),
        ],
    ))
}

fn candidate_prompt(user: String) -> StructuredPrompt {
    StructuredPrompt::text(DecisionKind::CandidateQuestion, QUESTION_ONLY_SYSTEM, user)
}

/// Strategies whose required passages are present.
pub fn available(has_jd: bool, has_resume: bool) -> Vec<&'static StrategySpec> {
    STRATEGIES
        .iter()
        .filter(|s| (!s.needs_jd || has_jd) && (!s.needs_resume || has_resume))
        .collect()
}

/// Picks a strategy uniformly at random and resolves its inputs.
/// Returns `None` when no strategy is selectable.
pub async fn choose<R: Rng + Send>(
    rng: &mut R,
    jd_passages: &[String],
    resume_passages: &[String],
    resume_store: &dyn RetrievalStore,
) -> Option<(&'static StrategySpec, StrategyInputs)> {
    let options = available(!jd_passages.is_empty(), !resume_passages.is_empty());
    let spec = *options.choose(rng)?;

    let jd_passage = if spec.needs_jd {
        jd_passages.choose(rng).cloned().unwrap_or_default()
    } else {
        String::new()
    };

    let resume_passage = match spec.strategy {
        QuestionStrategy::Rag => match resume_store.search(&jd_passage, 1).await {
            Ok(hits) => hits
                .into_iter()
                .next()
                .unwrap_or_else(|| NO_MATCHING_BACKGROUND.to_string()),
            Err(e) => {
                warn!("Résumé search failed for RAG strategy: {e}");
                NO_MATCHING_BACKGROUND.to_string()
            }
        },
        QuestionStrategy::Resume => resume_passages.choose(rng).cloned().unwrap_or_default(),
        _ => String::new(),
    };

    Some((
        spec,
        StrategyInputs {
            jd_passage,
            resume_passage,
        },
    ))
}
