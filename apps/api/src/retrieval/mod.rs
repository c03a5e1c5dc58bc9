//! Retrieval: the passage-store seam the interview core reads context through.
//!
//! The core only needs two operations: dump every passage (bulk context) and
//! rank passages against a query (the RAG question strategy). `InMemoryStore`
//! is a naive lexical implementation so the service runs without a vector index.

use std::collections::HashSet;

use async_trait::async_trait;
use thiserror::Error;

pub mod context;

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("Retrieval store unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),
}

#[async_trait]
pub trait RetrievalStore: Send + Sync {
    /// Every indexed passage, in index order.
    async fn all_passages(&self) -> Result<Vec<String>, RetrievalError>;

    /// Up to `k` passages ranked by similarity to `query`, best first.
    async fn search(&self, query: &str, k: usize) -> Result<Vec<String>, RetrievalError>;
}

/// Passages held in memory, one per blank-line separated paragraph.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    passages: Vec<String>,
}

impl InMemoryStore {
    pub fn new(passages: Vec<String>) -> Self {
        Self {
            passages: passages
                .into_iter()
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    /// Splits raw document text on blank lines.
    pub fn from_text(text: &str) -> Self {
        let mut passages = Vec::new();
        let mut current: Vec<&str> = Vec::new();

        for line in text.lines() {
            if line.trim().is_empty() {
                if !current.is_empty() {
                    passages.push(current.join(" "));
                    current.clear();
                }
            } else {
                current.push(line.trim());
            }
        }
        if !current.is_empty() {
            passages.push(current.join(" "));
        }

        Self::new(passages)
    }

    pub fn len(&self) -> usize {
        self.passages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }
}

#[async_trait]
impl RetrievalStore for InMemoryStore {
    async fn all_passages(&self) -> Result<Vec<String>, RetrievalError> {
        Ok(self.passages.clone())
    }

    async fn search(&self, query: &str, k: usize) -> Result<Vec<String>, RetrievalError> {
        if k == 0 {
            return Err(RetrievalError::InvalidQuery("k must be at least 1".to_string()));
        }

        let query_tokens = tokenize(query);
        let mut scored: Vec<(usize, usize)> = self
            .passages
            .iter()
            .enumerate()
            .map(|(idx, passage)| (idx, tokenize(passage).intersection(&query_tokens).count()))
            .collect();

        // Stable sort keeps index order among ties
        scored.sort_by(|a, b| b.1.cmp(&a.1));

        Ok(scored
            .into_iter()
            .filter(|(_, score)| *score > 0)
            .take(k)
            .map(|(idx, _)| self.passages[idx].clone())
            .collect())
    }
}

/// Lowercased alphanumeric tokens longer than two characters.
fn tokenize(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() > 2)
        .map(|t| t.to_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESUME: &str = "Jane Doe. Summary: backend engineer.\n\n\
        Role: Senior Engineer at Acme (2019 - Present).\nBuilt Kafka pipelines in Rust.\n\n\
        Skills: Rust, Kafka, PostgreSQL";

    #[test]
    fn test_from_text_splits_on_blank_lines() {
        let store = InMemoryStore::from_text(RESUME);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_from_text_joins_wrapped_lines() {
        let store = InMemoryStore::from_text(RESUME);
        assert_eq!(
            store.passages[1],
            "Role: Senior Engineer at Acme (2019 - Present). Built Kafka pipelines in Rust."
        );
    }

    #[test]
    fn test_from_text_empty_input_has_no_passages() {
        assert!(InMemoryStore::from_text("  \n\n \n").is_empty());
    }

    #[tokio::test]
    async fn test_search_ranks_by_overlap() {
        let store = InMemoryStore::from_text(RESUME);
        let hits = store.search("Experience with Kafka pipelines", 1).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].contains("Kafka pipelines"));
    }

    #[tokio::test]
    async fn test_search_without_overlap_returns_nothing() {
        let store = InMemoryStore::from_text(RESUME);
        let hits = store.search("Gardening and watercolour painting", 2).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_search_rejects_zero_k() {
        let store = InMemoryStore::from_text(RESUME);
        assert!(store.search("rust", 0).await.is_err());
    }

    #[tokio::test]
    async fn test_all_passages_preserves_order() {
        let store = InMemoryStore::new(vec!["b".into(), " ".into(), "a".into()]);
        assert_eq!(store.all_passages().await.unwrap(), vec!["b", "a"]);
    }
}
