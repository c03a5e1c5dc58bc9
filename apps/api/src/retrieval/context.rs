//! Context Extractor: flattens every passage of a store into one tagged blob.

use serde::Serialize;
use tracing::warn;

use crate::retrieval::RetrievalStore;

const NO_INFORMATION: &str = "No specific information could be extracted.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ContextSource {
    JobDescription,
    Resume,
}

impl ContextSource {
    fn tag(self) -> &'static str {
        match self {
            ContextSource::JobDescription => "JD",
            ContextSource::Resume => "Resume",
        }
    }
}

/// Passages of one document plus the flat, source-tagged prompt blob.
#[derive(Debug, Clone)]
pub struct ExtractedContext {
    pub source: ContextSource,
    pub passages: Vec<String>,
    pub blob: String,
}

impl ExtractedContext {
    pub fn from_passages(source: ContextSource, passages: Vec<String>) -> Self {
        let body = if passages.is_empty() {
            NO_INFORMATION.to_string()
        } else {
            passages.join("\n")
        };
        Self {
            source,
            blob: format!("\n--- {} CONTEXT ---\n{body}", source.tag()),
            passages,
        }
    }

    /// Enough material to drive model calls that depend on this document.
    pub fn is_sufficient(&self) -> bool {
        !self.passages.is_empty()
    }
}

/// Pulls every passage out of `store`. A failing store degrades to an empty context.
pub async fn extract_context(store: &dyn RetrievalStore, source: ContextSource) -> ExtractedContext {
    match store.all_passages().await {
        Ok(passages) => ExtractedContext::from_passages(source, passages),
        Err(e) => {
            warn!("Could not extract context from {} store: {e}", source.tag());
            ExtractedContext::from_passages(source, Vec::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieval::{InMemoryStore, RetrievalError};
    use async_trait::async_trait;

    struct BrokenStore;

    #[async_trait]
    impl RetrievalStore for BrokenStore {
        async fn all_passages(&self) -> Result<Vec<String>, RetrievalError> {
            Err(RetrievalError::Unavailable("index missing".to_string()))
        }

        async fn search(&self, _query: &str, _k: usize) -> Result<Vec<String>, RetrievalError> {
            Err(RetrievalError::Unavailable("index missing".to_string()))
        }
    }

    #[tokio::test]
    async fn test_blob_is_tagged_by_source() {
        let store = InMemoryStore::new(vec!["Rust required".into(), "Kafka a plus".into()]);
        let ctx = extract_context(&store, ContextSource::JobDescription).await;
        assert_eq!(ctx.blob, "\n--- JD CONTEXT ---\nRust required\nKafka a plus");
        assert!(ctx.is_sufficient());
    }

    #[tokio::test]
    async fn test_failing_store_degrades_to_empty_context() {
        let ctx = extract_context(&BrokenStore, ContextSource::Resume).await;
        assert!(!ctx.is_sufficient());
        assert!(ctx.blob.contains("--- Resume CONTEXT ---"));
        assert!(ctx.blob.contains(NO_INFORMATION));
    }
}
