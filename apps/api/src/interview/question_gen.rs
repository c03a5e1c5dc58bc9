//! Question Generation: candidate question, refinement, and time overrides.
//!
//! Flow: time pre-check → strategy candidate (or fallback) → refinement call →
//!       time rules re-applied against the clock → outcome.

use rand::Rng;
use tracing::{debug, info, warn};

use crate::interview::competency::CompetencyTracker;
use crate::interview::decisions::{
    DecisionError, DecisionMaker, InterviewAction, RefinementDecision, RefinementInputs,
};
use crate::interview::history::ConversationHistory;
use crate::interview::session::EndReason;
use crate::interview::strategy;
use crate::interview::timing::TimeTracker;
use crate::retrieval::context::ExtractedContext;
use crate::retrieval::RetrievalStore;

pub const FALLBACK_CANDIDATE_QUESTION: &str =
    "What is a recent technical challenge you faced and how did you overcome it?";
pub const TIME_EXPIRED_CLOSING: &str = "Thank you for your time. We've reached the end of our \
    allocated time. This concludes our interview.";
pub const NEARLY_OUT_OF_TIME_CLOSING: &str =
    "We're nearly out of time. Thank you for this discussion.";
pub const UNPARSEABLE_CLOSING: &str =
    "I appreciate your time. We'll conclude the interview here. Thank you.";
pub const COMPLETION_FAILED_CLOSING: &str =
    "Thank you for your time. We'll conclude our session here.";

/// Below this many remaining minutes the interview is wrapped up.
const WRAP_UP_MINUTES: u32 = 2;

#[derive(Debug, Clone, PartialEq)]
pub enum GenerationOutcome {
    Continue {
        question: String,
        action: InterviewAction,
        new_topic: Option<String>,
    },
    End {
        closing: String,
        reason: EndReason,
    },
}

/// Read-only view of the session state a generation step needs.
pub struct GenerationContext<'a> {
    pub decisions: &'a DecisionMaker,
    pub time: &'a TimeTracker,
    pub current_topic: &'a str,
    pub history: &'a ConversationHistory,
    pub difficulty: f64,
    pub competencies: &'a CompetencyTracker,
    pub jd: &'a ExtractedContext,
    pub resume: &'a ExtractedContext,
    pub resume_store: &'a dyn RetrievalStore,
}

pub async fn generate_next<R: Rng + Send>(ctx: &GenerationContext<'_>, rng: &mut R) -> GenerationOutcome {
    if ctx.time.remaining_minutes() == 0 {
        info!("No time remaining; ending without generation");
        return GenerationOutcome::End {
            closing: TIME_EXPIRED_CLOSING.to_string(),
            reason: EndReason::TimeExpired,
        };
    }

    let candidate = draft_candidate(ctx, rng).await;

    let history = ctx.history.prompt_view();
    let coverage = ctx.competencies.coverage_status();
    let remaining_checklist = ctx.competencies.remaining().join(", ");
    let inputs = RefinementInputs {
        total_minutes: ctx.time.duration_minutes(),
        elapsed_minutes: ctx.time.elapsed_minutes(),
        remaining_minutes: ctx.time.remaining_minutes(),
        current_topic: ctx.current_topic,
        history: &history,
        difficulty: ctx.difficulty,
        coverage_status: &coverage,
        remaining_checklist: &remaining_checklist,
        jd_context: &ctx.jd.blob,
        resume_context: &ctx.resume.blob,
        candidate_question: &candidate,
    };

    let decision = match ctx.decisions.refine(&inputs).await {
        Ok(decision) => decision,
        Err(e @ DecisionError::Unparseable { .. }) => {
            warn!("Refinement reply unusable, ending interview: {e}");
            return GenerationOutcome::End {
                closing: UNPARSEABLE_CLOSING.to_string(),
                reason: EndReason::GenerationFailed,
            };
        }
        Err(e) => {
            warn!("Question generation failed, ending interview: {e}");
            return GenerationOutcome::End {
                closing: COMPLETION_FAILED_CLOSING.to_string(),
                reason: EndReason::GenerationFailed,
            };
        }
    };

    // The clock is read again: the refinement call itself takes time.
    let (decision, forced_by_time) = enforce_time_rules(
        decision,
        ctx.time.elapsed_minutes(),
        ctx.time.duration_minutes(),
        ctx.time.remaining_minutes(),
    );

    info!(
        "Refinement decision: {:?} (topic: {:?})",
        decision.action, decision.new_topic
    );
    debug!("Refinement reasoning: {}", decision.reasoning);

    match decision.action {
        InterviewAction::EndInterview => GenerationOutcome::End {
            closing: decision.question,
            reason: if forced_by_time {
                EndReason::TimeExpired
            } else {
                EndReason::InterviewComplete
            },
        },
        action => GenerationOutcome::Continue {
            question: decision.question,
            action,
            new_topic: decision.new_topic,
        },
    }
}

/// Overrides the model's decision when the clock says the interview is over
/// or about to be. The flag reports whether an override happened.
pub fn enforce_time_rules(
    mut decision: RefinementDecision,
    elapsed_minutes: u32,
    total_minutes: u32,
    remaining_minutes: u32,
) -> (RefinementDecision, bool) {
    if elapsed_minutes >= total_minutes {
        if decision.action != InterviewAction::EndInterview {
            decision.action = InterviewAction::EndInterview;
            decision.question = TIME_EXPIRED_CLOSING.to_string();
        }
        return (decision, true);
    }
    if remaining_minutes < WRAP_UP_MINUTES && decision.action != InterviewAction::EndInterview {
        decision.action = InterviewAction::EndInterview;
        decision.question = NEARLY_OUT_OF_TIME_CLOSING.to_string();
        return (decision, true);
    }
    (decision, false)
}

async fn draft_candidate<R: Rng + Send>(ctx: &GenerationContext<'_>, rng: &mut R) -> String {
    let Some((spec, inputs)) =
        strategy::choose(rng, &ctx.jd.passages, &ctx.resume.passages, ctx.resume_store).await
    else {
        warn!("No question strategy available; using fallback candidate");
        return FALLBACK_CANDIDATE_QUESTION.to_string();
    };

    info!("Drafting candidate question with {:?} strategy", spec.strategy);
    match ctx
        .decisions
        .candidate_question((spec.build_prompt)(&inputs))
        .await
    {
        Ok(question) => question,
        Err(e) => {
            warn!("Candidate question failed ({e}); using fallback");
            FALLBACK_CANDIDATE_QUESTION.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interview::test_support::{ScriptedCompletion, DEFAULT_MAIN_QUESTION};
    use crate::llm_client::DecisionKind;
    use crate::retrieval::context::ContextSource;
    use crate::retrieval::InMemoryStore;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::Arc;
    use std::time::Duration;
    use tracing::Span;

    fn deepen() -> RefinementDecision {
        RefinementDecision {
            reasoning: String::new(),
            action: InterviewAction::Deepen,
            question: "Go deeper?".to_string(),
            new_topic: None,
        }
    }

    struct Fixture {
        completion: Arc<ScriptedCompletion>,
        decisions: DecisionMaker,
        time: TimeTracker,
        history: ConversationHistory,
        competencies: CompetencyTracker,
        jd: ExtractedContext,
        resume: ExtractedContext,
        store: InMemoryStore,
    }

    impl Fixture {
        fn new(minutes: u32, jd: &[&str], resume: &[&str]) -> Self {
            let completion = Arc::new(ScriptedCompletion::new());
            let resume: Vec<String> = resume.iter().map(|s| s.to_string()).collect();
            Self {
                decisions: DecisionMaker::new(completion.clone(), Span::none()),
                completion,
                time: TimeTracker::start(minutes),
                history: ConversationHistory::new(),
                competencies: CompetencyTracker::fallback(),
                jd: ExtractedContext::from_passages(
                    ContextSource::JobDescription,
                    jd.iter().map(|s| s.to_string()).collect(),
                ),
                store: InMemoryStore::new(resume.clone()),
                resume: ExtractedContext::from_passages(ContextSource::Resume, resume),
            }
        }

        async fn generate(&self) -> GenerationOutcome {
            let ctx = GenerationContext {
                decisions: &self.decisions,
                time: &self.time,
                current_topic: "Opening",
                history: &self.history,
                difficulty: 1.0,
                competencies: &self.competencies,
                jd: &self.jd,
                resume: &self.resume,
                resume_store: &self.store,
            };
            generate_next(&ctx, &mut StdRng::seed_from_u64(3)).await
        }
    }

    #[test]
    fn test_elapsed_past_total_overrides_deepen() {
        let (decision, forced) = enforce_time_rules(deepen(), 15, 15, 0);
        assert!(forced);
        assert_eq!(decision.action, InterviewAction::EndInterview);
        assert_eq!(decision.question, TIME_EXPIRED_CLOSING);
    }

    #[test]
    fn test_under_two_minutes_wraps_up() {
        let (decision, forced) = enforce_time_rules(deepen(), 14, 15, 1);
        assert!(forced);
        assert_eq!(decision.question, NEARLY_OUT_OF_TIME_CLOSING);
    }

    #[test]
    fn test_plenty_of_time_keeps_decision() {
        let (decision, forced) = enforce_time_rules(deepen(), 3, 15, 12);
        assert!(!forced);
        assert_eq!(decision, deepen());
    }

    #[test]
    fn test_model_closing_line_kept_when_wrapping_up() {
        let mut end = deepen();
        end.action = InterviewAction::EndInterview;
        end.question = "Thanks, that covers it.".to_string();
        let (decision, _) = enforce_time_rules(end, 14, 15, 1);
        assert_eq!(decision.question, "Thanks, that covers it.");
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        #[test]
        fn prop_out_of_time_always_ends(total in 0u32..60, over in 0u32..30, label in "[A-Z_ ]{0,12}") {
            let mut decision = deepen();
            decision.action = InterviewAction::parse(&label);
            let (decision, _) = enforce_time_rules(decision, total + over, total, 0);
            prop_assert_eq!(decision.action, InterviewAction::EndInterview);
        }
    }

    #[tokio::test]
    async fn test_continue_with_refined_question() {
        let fx = Fixture::new(15, &["Operate Kafka"], &["Ran Kafka"]);
        match fx.generate().await {
            GenerationOutcome::Continue { question, action, new_topic } => {
                assert_eq!(question, DEFAULT_MAIN_QUESTION);
                assert_eq!(action, InterviewAction::Deepen);
                assert_eq!(new_topic.as_deref(), Some("System design"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(fx.completion.calls(DecisionKind::CandidateQuestion), 1);
        assert_eq!(fx.completion.calls(DecisionKind::QuestionRefinement), 1);
    }

    #[tokio::test]
    async fn test_no_passages_uses_fallback_candidate() {
        let fx = Fixture::new(15, &[], &[]);
        fx.generate().await;
        assert_eq!(fx.completion.calls(DecisionKind::CandidateQuestion), 0);
        let prompt = fx
            .completion
            .last_prompt(DecisionKind::QuestionRefinement)
            .unwrap();
        assert!(prompt.contains(FALLBACK_CANDIDATE_QUESTION));
    }

    #[tokio::test]
    async fn test_unknown_decision_continues() {
        let fx = Fixture::new(15, &[], &[]);
        fx.completion.push(
            DecisionKind::QuestionRefinement,
            r#"{"decision": "CIRCLE_BACK", "question": "Tell me more?"}"#,
        );
        assert!(matches!(fx.generate().await, GenerationOutcome::Continue { .. }));
    }

    #[tokio::test]
    async fn test_unparseable_refinement_ends_with_closing() {
        let fx = Fixture::new(15, &[], &[]);
        fx.completion
            .push(DecisionKind::QuestionRefinement, "Let's DEEPEN into Kafka.");
        assert_eq!(
            fx.generate().await,
            GenerationOutcome::End {
                closing: UNPARSEABLE_CLOSING.to_string(),
                reason: EndReason::GenerationFailed,
            }
        );
    }

    #[tokio::test]
    async fn test_completion_error_ends_with_closing() {
        let fx = Fixture::new(15, &[], &[]);
        fx.completion.fail(DecisionKind::QuestionRefinement);
        assert_eq!(
            fx.generate().await,
            GenerationOutcome::End {
                closing: COMPLETION_FAILED_CLOSING.to_string(),
                reason: EndReason::GenerationFailed,
            }
        );
    }

    #[tokio::test]
    async fn test_model_end_interview_completes() {
        let fx = Fixture::new(15, &[], &[]);
        fx.completion.push(
            DecisionKind::QuestionRefinement,
            r#"{"decision": "END_INTERVIEW", "question": "That covers everything, thank you."}"#,
        );
        assert_eq!(
            fx.generate().await,
            GenerationOutcome::End {
                closing: "That covers everything, thank you.".to_string(),
                reason: EndReason::InterviewComplete,
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_clock_makes_no_model_call() {
        let fx = Fixture::new(15, &["Operate Kafka"], &["Ran Kafka"]);
        tokio::time::advance(Duration::from_secs(16 * 60)).await;
        let outcome = fx.generate().await;
        assert!(matches!(
            outcome,
            GenerationOutcome::End {
                reason: EndReason::TimeExpired,
                ..
            }
        ));
        assert_eq!(fx.completion.total_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_last_minute_forces_wrap_up() {
        let fx = Fixture::new(15, &[], &[]);
        tokio::time::advance(Duration::from_secs(14 * 60)).await;
        assert_eq!(
            fx.generate().await,
            GenerationOutcome::End {
                closing: NEARLY_OUT_OF_TIME_CLOSING.to_string(),
                reason: EndReason::TimeExpired,
            }
        );
    }
}
