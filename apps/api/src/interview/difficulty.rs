//! Difficulty Controller: a saturating scalar in [1, 5].

use serde::{Deserialize, Serialize};

use crate::interview::decisions::{AnswerQuality, Authenticity, DecisionMaker};

pub const MIN_DIFFICULTY: f64 = 1.0;
pub const MAX_DIFFICULTY: f64 = 5.0;

const HEURISTIC_STEP: f64 = 0.5;
const DETAILED_ANSWER_WORDS: usize = 30;
const SHORT_ANSWER_WORDS: usize = 15;
const EXAMPLE_MARKERS: [&str; 4] = ["example", "for instance", "specifically", "when i"];

/// How answers move the difficulty level. Chosen once per process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DifficultyPolicy {
    /// Word-count and example-marker rules, no model call.
    #[default]
    Heuristic,
    /// A decision call grades the answer STRONG / ADEQUATE / WEAK.
    ModelJudged,
}

impl DifficultyPolicy {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "heuristic" => Some(DifficultyPolicy::Heuristic),
            "model" | "model_judged" => Some(DifficultyPolicy::ModelJudged),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DifficultyController {
    level: f64,
    policy: DifficultyPolicy,
}

impl DifficultyController {
    pub fn new(policy: DifficultyPolicy) -> Self {
        Self {
            level: MIN_DIFFICULTY,
            policy,
        }
    }

    pub fn level(&self) -> f64 {
        self.level
    }

    /// Moves the level by `delta`, saturating at the bounds.
    pub fn adjust(&mut self, delta: f64) {
        if delta.is_finite() {
            self.level = (self.level + delta).clamp(MIN_DIFFICULTY, MAX_DIFFICULTY);
        }
    }

    /// Applies the configured policy to one main-interview answer.
    pub async fn update(
        &mut self,
        decisions: &DecisionMaker,
        question: &str,
        answer: &str,
        authenticity: Authenticity,
    ) {
        let delta = match self.policy {
            DifficultyPolicy::Heuristic => heuristic_delta(authenticity, answer),
            DifficultyPolicy::ModelJudged => decisions
                .assess_difficulty(question, answer, self.level)
                .await
                .map(quality_delta)
                .unwrap_or(0.0),
        };
        self.adjust(delta);
    }
}

/// +0.5 for an authentic, detailed answer with a concrete example;
/// -0.5 for a short or unsure one.
pub fn heuristic_delta(authenticity: Authenticity, answer: &str) -> f64 {
    let lower = answer.to_lowercase();
    let words = answer.split_whitespace().count();
    let has_example = EXAMPLE_MARKERS.iter().any(|m| lower.contains(m));

    if authenticity == Authenticity::Authentic && words > DETAILED_ANSWER_WORDS && has_example {
        HEURISTIC_STEP
    } else if words < SHORT_ANSWER_WORDS || lower.contains("not sure") {
        -HEURISTIC_STEP
    } else {
        0.0
    }
}

fn quality_delta(quality: AnswerQuality) -> f64 {
    match quality {
        AnswerQuality::Strong => 1.0,
        AnswerQuality::Adequate => 0.0,
        AnswerQuality::Weak => -1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interview::test_support::ScriptedCompletion;
    use crate::llm_client::DecisionKind;
    use proptest::prelude::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};
    use std::sync::Arc;
    use tracing::Span;

    const DETAILED: &str = "For example, when I led the migration of our billing pipeline to Kafka \
        we had to keep exactly-once semantics, so I designed an idempotent consumer keyed on invoice \
        ids and rolled it out behind a flag over two weeks without downtime.";

    #[test]
    fn test_heuristic_rewards_detailed_authentic_example() {
        assert_eq!(heuristic_delta(Authenticity::Authentic, DETAILED), 0.5);
    }

    #[test]
    fn test_heuristic_ignores_generic_detailed_answer() {
        assert_eq!(heuristic_delta(Authenticity::Generic, DETAILED), 0.0);
    }

    #[test]
    fn test_heuristic_penalizes_short_answer() {
        assert_eq!(heuristic_delta(Authenticity::Authentic, "I used Rust."), -0.5);
    }

    #[test]
    fn test_level_saturates_at_bounds() {
        let mut controller = DifficultyController::new(DifficultyPolicy::Heuristic);
        controller.adjust(-3.0);
        assert_eq!(controller.level(), MIN_DIFFICULTY);
        controller.adjust(100.0);
        assert_eq!(controller.level(), MAX_DIFFICULTY);
        controller.adjust(f64::NAN);
        assert_eq!(controller.level(), MAX_DIFFICULTY);
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!(DifficultyPolicy::parse("Model"), Some(DifficultyPolicy::ModelJudged));
        assert_eq!(DifficultyPolicy::parse("heuristic"), Some(DifficultyPolicy::Heuristic));
        assert_eq!(DifficultyPolicy::parse("random"), None);
    }

    #[test]
    fn test_level_stays_in_bounds_over_random_adjustments() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut controller = DifficultyController::new(DifficultyPolicy::Heuristic);
        for _ in 0..1000 {
            controller.adjust(rng.gen_range(-2.0..2.0));
            assert!((MIN_DIFFICULTY..=MAX_DIFFICULTY).contains(&controller.level()));
        }
    }

    #[tokio::test]
    async fn test_model_judged_strong_raises_by_one() {
        let completion = Arc::new(ScriptedCompletion::new());
        completion.push(DecisionKind::DifficultyAssessment, r#"{"quality": "STRONG"}"#);
        let decisions = DecisionMaker::new(completion.clone(), Span::none());
        let mut controller = DifficultyController::new(DifficultyPolicy::ModelJudged);
        controller
            .update(&decisions, "q", "a", Authenticity::Authentic)
            .await;
        assert_eq!(controller.level(), 2.0);
    }

    #[tokio::test]
    async fn test_model_judged_failure_leaves_level() {
        let completion = Arc::new(ScriptedCompletion::new());
        completion.fail(DecisionKind::DifficultyAssessment);
        let decisions = DecisionMaker::new(completion.clone(), Span::none());
        let mut controller = DifficultyController::new(DifficultyPolicy::ModelJudged);
        controller.adjust(1.0);
        controller
            .update(&decisions, "q", "a", Authenticity::Authentic)
            .await;
        assert_eq!(controller.level(), 2.0);
    }

    #[tokio::test]
    async fn test_heuristic_policy_makes_no_model_call() {
        let completion = Arc::new(ScriptedCompletion::new());
        let decisions = DecisionMaker::new(completion.clone(), Span::none());
        let mut controller = DifficultyController::new(DifficultyPolicy::Heuristic);
        controller
            .update(&decisions, "q", DETAILED, Authenticity::Authentic)
            .await;
        assert_eq!(controller.level(), 1.5);
        assert_eq!(completion.total_calls(), 0);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        #[test]
        fn prop_level_never_leaves_bounds(deltas in prop::collection::vec(-10.0f64..10.0, 0..200)) {
            let mut controller = DifficultyController::new(DifficultyPolicy::Heuristic);
            for delta in deltas {
                controller.adjust(delta);
                prop_assert!(controller.level() >= MIN_DIFFICULTY);
                prop_assert!(controller.level() <= MAX_DIFFICULTY);
            }
        }
    }
}
