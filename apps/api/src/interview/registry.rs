//! Session registry: one lock per session, plus idle reaping.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{error, info, Instrument};
use uuid::Uuid;

use crate::interview::session::InterviewSession;
use crate::interview::transcript::TranscriptWriter;

pub struct SessionEntry {
    pub session: InterviewSession,
    pub last_activity: Instant,
    /// Set once the transcript of an ended session has been written.
    pub persisted: bool,
}

impl SessionEntry {
    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    /// Writes the transcript once the session has ended. Repeated calls are no-ops.
    pub async fn persist_if_ended(&mut self, writer: &TranscriptWriter) {
        if !self.session.is_ended() || self.persisted {
            return;
        }
        match writer.write(&self.session.export_transcript()).await {
            Ok(_) => self.persisted = true,
            Err(e) => error!("Failed to persist transcript for {}: {e:?}", self.session.id()),
        }
    }
}

pub type SharedSession = Arc<Mutex<SessionEntry>>;

pub struct SessionRegistry {
    sessions: RwLock<HashMap<Uuid, SharedSession>>,
    idle_timeout: Duration,
}

impl SessionRegistry {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            idle_timeout,
        }
    }

    pub async fn insert(&self, session: InterviewSession) -> SharedSession {
        let id = session.id();
        let entry = Arc::new(Mutex::new(SessionEntry {
            session,
            last_activity: Instant::now(),
            persisted: false,
        }));
        self.sessions.write().await.insert(id, entry.clone());
        entry
    }

    pub async fn get(&self, id: Uuid) -> Option<SharedSession> {
        self.sessions.read().await.get(&id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Force-ends sessions idle for longer than the timeout, persists their
    /// transcripts and drops them. Sessions with a turn in flight are skipped.
    pub async fn reap_idle(&self, writer: &TranscriptWriter) -> usize {
        let snapshot: Vec<(Uuid, SharedSession)> = self
            .sessions
            .read()
            .await
            .iter()
            .map(|(id, entry)| (*id, entry.clone()))
            .collect();

        let mut reaped = Vec::new();
        for (id, shared) in snapshot {
            let Ok(mut entry) = shared.try_lock() else {
                continue;
            };
            if entry.last_activity.elapsed() < self.idle_timeout {
                continue;
            }
            info!(
                "Reaping idle session {id} after {} turns",
                entry.session.history().len()
            );
            entry.session.force_time_up().await;
            entry.persist_if_ended(writer).await;
            reaped.push(id);
        }

        if !reaped.is_empty() {
            let mut sessions = self.sessions.write().await;
            for id in &reaped {
                sessions.remove(id);
            }
        }
        reaped.len()
    }
}

/// Runs `reap_idle` on a fixed interval for the life of the process.
pub fn spawn_reaper(
    registry: Arc<SessionRegistry>,
    writer: TranscriptWriter,
    every: Duration,
) -> JoinHandle<()> {
    tokio::spawn(
        async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                let reaped = registry.reap_idle(&writer).await;
                if reaped > 0 {
                    info!("Reaped {reaped} idle session(s)");
                }
            }
        }
        .instrument(tracing::info_span!("session_reaper")),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interview::session::{
        EndReason, QuestionPlan, SessionDeps, SessionSetup,
    };
    use crate::interview::test_support::ScriptedCompletion;
    use crate::retrieval::InMemoryStore;

    async fn new_session() -> InterviewSession {
        let setup = SessionSetup {
            pre_interview: QuestionPlan::Fixed(Vec::new()),
            verification: QuestionPlan::Fixed(Vec::new()),
            rng_seed: Some(5),
            ..SessionSetup::new(Uuid::new_v4(), "Jane Doe", 30)
        };
        let mut session = InterviewSession::prepare(
            setup,
            SessionDeps {
                completion: Arc::new(ScriptedCompletion::new()),
                jd_store: Arc::new(InMemoryStore::from_text("Operate Kafka clusters.")),
                resume_store: Arc::new(InMemoryStore::from_text("Ran Kafka at Acme.")),
            },
        )
        .await;
        session.start().await;
        session
    }

    #[tokio::test(start_paused = true)]
    async fn test_reap_idle_ends_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let writer = TranscriptWriter::new(dir.path());
        let registry = SessionRegistry::new(Duration::from_secs(300));

        let idle = registry.insert(new_session().await).await;
        let idle_id = idle.lock().await.session.id();
        tokio::time::advance(Duration::from_secs(200)).await;
        let active = registry.insert(new_session().await).await;
        let active_id = active.lock().await.session.id();
        tokio::time::advance(Duration::from_secs(150)).await;

        assert_eq!(registry.reap_idle(&writer).await, 1);

        assert!(registry.get(idle_id).await.is_none());
        assert!(registry.get(active_id).await.is_some());
        let entry = idle.lock().await;
        assert_eq!(entry.session.end_reason(), Some(EndReason::TimeUp));
        assert!(entry.persisted);
        assert!(writer.path_for(idle_id).exists());
    }

    #[tokio::test(start_paused = true)]
    async fn test_touch_keeps_session_alive() {
        let dir = tempfile::tempdir().unwrap();
        let writer = TranscriptWriter::new(dir.path());
        let registry = SessionRegistry::new(Duration::from_secs(300));

        let shared = registry.insert(new_session().await).await;
        tokio::time::advance(Duration::from_secs(250)).await;
        shared.lock().await.touch();
        tokio::time::advance(Duration::from_secs(250)).await;

        assert_eq!(registry.reap_idle(&writer).await, 0);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_persist_only_once() {
        let dir = tempfile::tempdir().unwrap();
        let writer = TranscriptWriter::new(dir.path());
        let registry = SessionRegistry::new(Duration::from_secs(300));
        let shared = registry.insert(new_session().await).await;

        let mut entry = shared.lock().await;
        entry.persist_if_ended(&writer).await;
        assert!(!entry.persisted);

        entry.session.force_time_up().await;
        entry.persist_if_ended(&writer).await;
        assert!(entry.persisted);
        std::fs::remove_file(writer.path_for(entry.session.id())).unwrap();
        entry.persist_if_ended(&writer).await;
        assert!(!writer.path_for(entry.session.id()).exists());
    }
}
