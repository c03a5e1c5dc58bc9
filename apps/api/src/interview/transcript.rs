//! Transcript Writer: the terminal artifact consumed by report generation.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::interview::decisions::ValidationResult;
use crate::interview::history::Turn;
use crate::interview::session::EndReason;

/// A clarification exchange attached to the question it clarifies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FollowUp {
    pub prompt: String,
    pub answer: String,
    pub validation: ValidationResult,
}

/// One record per screening question: the first answer plus any clarifications.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QaRecord {
    pub question: String,
    pub answer: String,
    pub validation: ValidationResult,
    #[serde(default)]
    pub follow_ups: Vec<FollowUp>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScreeningRecord {
    pub questions: Vec<String>,
    pub answers: Vec<QaRecord>,
}

impl ScreeningRecord {
    pub fn new(questions: Vec<String>) -> Self {
        Self {
            questions,
            answers: Vec::new(),
        }
    }

    /// First attempts open a new record; clarification attempts attach to it.
    pub fn record(
        &mut self,
        index: usize,
        attempt: u32,
        prompt: &str,
        answer: &str,
        validation: ValidationResult,
    ) {
        match self.answers.get_mut(index) {
            Some(existing) if attempt > 0 => existing.follow_ups.push(FollowUp {
                prompt: prompt.to_string(),
                answer: answer.to_string(),
                validation,
            }),
            _ => self.answers.push(QaRecord {
                question: prompt.to_string(),
                answer: answer.to_string(),
                validation,
                follow_ups: Vec::new(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptMetadata {
    pub session_id: Uuid,
    pub candidate_name: String,
    pub start_time: DateTime<Utc>,
    pub duration_minutes: u32,
    pub target_competencies: Vec<String>,
    pub completed_competencies: Vec<String>,
    pub final_difficulty: f64,
    pub end_reason: Option<EndReason>,
    pub pre_interview: ScreeningRecord,
    pub verification: ScreeningRecord,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptRecord {
    pub metadata: TranscriptMetadata,
    pub transcript: Vec<Turn>,
}

/// Persists transcripts as `<dir>/<session_id>_transcript.json`.
#[derive(Debug, Clone)]
pub struct TranscriptWriter {
    dir: PathBuf,
}

impl TranscriptWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, session_id: Uuid) -> PathBuf {
        self.dir.join(format!("{session_id}_transcript.json"))
    }

    pub async fn write(&self, record: &TranscriptRecord) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("Failed to create transcript dir {}", self.dir.display()))?;

        let path = self.path_for(record.metadata.session_id);
        let body = serde_json::to_vec_pretty(record).context("Failed to serialize transcript")?;
        tokio::fs::write(&path, body)
            .await
            .with_context(|| format!("Failed to write transcript {}", path.display()))?;

        info!("Transcript saved to {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interview::history::Role;

    fn validation() -> ValidationResult {
        ValidationResult::fallback()
    }

    fn sample_record() -> TranscriptRecord {
        let mut pre = ScreeningRecord::new(vec!["Why this role?".to_string()]);
        pre.record(0, 0, "Why this role?", "Money.", validation());
        pre.record(0, 1, "Can you elaborate on that?", "Payments are fun.", validation());

        TranscriptRecord {
            metadata: TranscriptMetadata {
                session_id: Uuid::new_v4(),
                candidate_name: "Jane Doe".to_string(),
                start_time: Utc::now(),
                duration_minutes: 15,
                target_competencies: vec!["Rust".to_string(), "Kafka".to_string()],
                completed_competencies: vec!["Kafka".to_string()],
                final_difficulty: 1.5,
                end_reason: Some(EndReason::InterviewComplete),
                pre_interview: pre,
                verification: ScreeningRecord::default(),
            },
            transcript: vec![
                Turn {
                    role: Role::Bot,
                    content: "Why this role?".to_string(),
                    sequence: 0,
                },
                Turn {
                    role: Role::User,
                    content: "Money.".to_string(),
                    sequence: 1,
                },
            ],
        }
    }

    #[test]
    fn test_clarifications_attach_to_their_question() {
        let record = sample_record();
        let answers = &record.metadata.pre_interview.answers;
        assert_eq!(answers.len(), 1);
        assert_eq!(answers[0].answer, "Money.");
        assert_eq!(answers[0].follow_ups[0].prompt, "Can you elaborate on that?");
    }

    #[test]
    fn test_record_serializes_expected_shape() {
        let value = serde_json::to_value(sample_record()).unwrap();
        assert_eq!(value["metadata"]["end_reason"], "interview_complete");
        assert_eq!(value["metadata"]["pre_interview"]["answers"][0]["validation"]["status"], "VAGUE");
        assert_eq!(value["transcript"][1]["role"], "user");
        assert_eq!(value["transcript"][1]["sequence"], 1);
    }

    #[tokio::test]
    async fn test_write_persists_pretty_json() {
        let dir = tempfile::tempdir().unwrap();
        let writer = TranscriptWriter::new(dir.path().join("transcripts"));
        let record = sample_record();

        let path = writer.write(&record).await.unwrap();

        assert_eq!(path, writer.path_for(record.metadata.session_id));
        let body = std::fs::read_to_string(&path).unwrap();
        assert!(body.contains("\n  \"metadata\""));
        let read_back: TranscriptRecord = serde_json::from_str(&body).unwrap();
        assert_eq!(read_back, record);
    }
}
