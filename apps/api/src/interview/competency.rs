//! Competency Tracker: target competencies and the monotone set already evidenced.

use std::collections::BTreeSet;

use tracing::{debug, info, warn};

use crate::interview::decisions::{CompetencyEvidence, DecisionMaker};
use crate::retrieval::context::ExtractedContext;

pub const MAX_TARGETS: usize = 8;
pub const FALLBACK_COMPETENCIES: [&str; 3] = ["Problem Solving", "Communication", "Technical Skills"];

#[derive(Debug, Clone)]
pub struct CompetencyTracker {
    targets: Vec<String>,
    completed: BTreeSet<String>,
}

impl CompetencyTracker {
    /// Deduplicates (case-insensitively) and caps `targets`; an empty list
    /// becomes the fallback set.
    pub fn from_targets(targets: Vec<String>) -> Self {
        let mut seen = BTreeSet::new();
        let targets: Vec<String> = targets
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty() && seen.insert(t.to_lowercase()))
            .take(MAX_TARGETS)
            .collect();

        if targets.is_empty() {
            return Self::fallback();
        }
        Self {
            targets,
            completed: BTreeSet::new(),
        }
    }

    pub fn fallback() -> Self {
        Self {
            targets: FALLBACK_COMPETENCIES.iter().map(|c| c.to_string()).collect(),
            completed: BTreeSet::new(),
        }
    }

    /// Asks the model for the role's competencies; any failure yields the fallback set.
    pub async fn extract(decisions: &DecisionMaker, jd: &ExtractedContext) -> Self {
        if !jd.is_sufficient() {
            warn!("Insufficient job description context for competency extraction");
            return Self::fallback();
        }
        match decisions.extract_competencies(&jd.blob).await {
            Ok(targets) => {
                let tracker = Self::from_targets(targets);
                info!("Target competencies: {:?}", tracker.targets);
                tracker
            }
            Err(e) => {
                warn!("Competency extraction failed: {e}");
                Self::fallback()
            }
        }
    }

    pub fn targets(&self) -> &[String] {
        &self.targets
    }

    /// Completed competencies in target order.
    pub fn completed(&self) -> Vec<String> {
        self.targets
            .iter()
            .filter(|t| self.completed.contains(*t))
            .cloned()
            .collect()
    }

    pub fn remaining(&self) -> Vec<String> {
        self.targets
            .iter()
            .filter(|t| !self.completed.contains(*t))
            .cloned()
            .collect()
    }

    pub fn coverage_status(&self) -> String {
        format!(
            "{}/{} competencies covered",
            self.completed.len(),
            self.targets.len()
        )
    }

    /// Folds evidence into the completed set. Names that do not match a
    /// remaining target are ignored. Returns the newly completed names.
    pub fn record(&mut self, evidence: &[CompetencyEvidence]) -> Vec<String> {
        let mut newly = Vec::new();
        for item in evidence {
            let wanted = item.competency.trim();
            let matched = self
                .targets
                .iter()
                .find(|t| t.eq_ignore_ascii_case(wanted) && !self.completed.contains(*t))
                .cloned();
            if let Some(name) = matched {
                debug!(
                    "Evidence for {name}: confidence {:?}, {}",
                    item.confidence,
                    item.rationale.as_deref().unwrap_or("no rationale")
                );
                self.completed.insert(name.clone());
                newly.push(name);
            }
        }
        newly
    }

    /// Assesses one answer against the remaining competencies. No call is made
    /// once every target is covered.
    pub async fn assess(&mut self, decisions: &DecisionMaker, question: &str, answer: &str) {
        let remaining = self.remaining();
        if remaining.is_empty() {
            return;
        }
        let evidence = decisions.assess_competencies(question, answer, &remaining).await;
        let newly = self.record(&evidence);
        if !newly.is_empty() {
            info!("Competencies evidenced: {:?} ({})", newly, self.coverage_status());
        }
    }
}
