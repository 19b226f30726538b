//! The interaction store — persistent JSONL storage with embedding search.
//!
//! Each line of `records.jsonl` is one JSON-encoded `InteractionRecord`.
//! Records are loaded into memory on open and the whole file is flushed on
//! every add. Simple, portable, human-inspectable.
//!
//! Search recomputes every record's embedding instead of trusting the one
//! captured at write time, so records written under an older embedding model
//! still rank correctly. O(n) per search, acceptable at personal scale.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quill_core::error::{ProviderError, StoreError};
use quill_core::provider::Embedder;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Substituted when the summary call fails or no summarizer is wired up.
pub const SUMMARY_FALLBACK: &str = "Interaction summary unavailable";

/// One persisted (query, response) pair with its metadata and embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub id: String,
    pub query: String,
    pub response: String,
    pub summary: String,
    pub model: String,
    /// Free-form tag: "question", "file_analysis", "session", ...
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub embedding: Vec<f32>,
}

/// A record paired with its similarity to a search query.
#[derive(Debug, Clone)]
pub struct ScoredInteraction {
    pub record: InteractionRecord,
    pub similarity: f32,
}

/// Produces a one-sentence summary of an interaction.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, query: &str, response: &str) -> Result<String, ProviderError>;
}

pub struct InteractionStore {
    path: PathBuf,
    records: Arc<RwLock<Vec<InteractionRecord>>>,
    embedder: Arc<dyn Embedder>,
    summarizer: Option<Arc<dyn Summarizer>>,
}

impl InteractionStore {
    /// Open the store, loading existing records from disk.
    /// A missing file starts the store empty; corrupt lines are skipped.
    pub fn open(
        path: PathBuf,
        embedder: Arc<dyn Embedder>,
        summarizer: Option<Arc<dyn Summarizer>>,
    ) -> Self {
        let records = Self::load_from_disk(&path);
        debug!(path = %path.display(), count = records.len(), "Interaction store loaded");
        Self {
            path,
            records: Arc::new(RwLock::new(records)),
            embedder,
            summarizer,
        }
    }

    fn load_from_disk(path: &PathBuf) -> Vec<InteractionRecord> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(_) => return Vec::new(),
        };

        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str::<InteractionRecord>(line) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(error = %e, "Skipping corrupted interaction record");
                    None
                }
            })
            .collect()
    }

    async fn flush(&self) -> Result<(), StoreError> {
        let records = self.records.read().await;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Storage(format!("Failed to create store directory: {e}"))
            })?;
        }

        let mut content = String::new();
        for record in records.iter() {
            let line = serde_json::to_string(record)
                .map_err(|e| StoreError::Storage(format!("Failed to serialize record: {e}")))?;
            content.push_str(&line);
            content.push('\n');
        }

        std::fs::write(&self.path, &content)
            .map_err(|e| StoreError::Storage(format!("Failed to write store file: {e}")))?;

        Ok(())
    }

    fn combined_text(query: &str, response: &str) -> String {
        format!("Query: {query}\nResponse: {response}")
    }

    /// Record a completed interaction. Returns the new record's id.
    ///
    /// Summary generation is best-effort: a failed or absent summarizer
    /// yields the fallback string, never an error.
    pub async fn add(
        &self,
        query: &str,
        response: &str,
        model: &str,
        kind: &str,
        file_path: Option<String>,
    ) -> Result<String, StoreError> {
        let combined = Self::combined_text(query, response);
        let embedding = self
            .embedder
            .embed(&combined)
            .await
            .map_err(|e| StoreError::EmbeddingFailed(e.to_string()))?;

        let summary = match &self.summarizer {
            Some(summarizer) => match summarizer.summarize(query, response).await {
                Ok(summary) => summary,
                Err(e) => {
                    warn!(error = %e, "Summary generation failed, using fallback");
                    SUMMARY_FALLBACK.to_string()
                }
            },
            None => SUMMARY_FALLBACK.to_string(),
        };

        let record = InteractionRecord {
            id: Uuid::new_v4().to_string(),
            query: query.to_string(),
            response: response.to_string(),
            summary,
            model: model.to_string(),
            kind: kind.to_string(),
            file_path,
            created_at: Utc::now(),
            embedding,
        };
        let id = record.id.clone();

        self.records.write().await.push(record);
        self.flush().await?;

        info!(id = %id, "Added interaction to store");
        Ok(id)
    }

    /// Rank all records by cosine similarity to the query, descending, and
    /// return the top `limit`. Equal similarities keep insertion order.
    pub async fn search(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<ScoredInteraction>, StoreError> {
        let query_embedding = self
            .embedder
            .embed(query)
            .await
            .map_err(|e| StoreError::EmbeddingFailed(e.to_string()))?;

        let records = self.records.read().await;
        let mut scored = Vec::with_capacity(records.len());

        for record in records.iter() {
            let combined = Self::combined_text(&record.query, &record.response);
            let embedding = self
                .embedder
                .embed(&combined)
                .await
                .map_err(|e| StoreError::EmbeddingFailed(e.to_string()))?;

            let similarity = crate::vector::cosine_similarity(&query_embedding, &embedding);
            debug!(id = %record.id, similarity, "Scored record");
            scored.push(ScoredInteraction {
                record: record.clone(),
                similarity,
            });
        }

        // sort_by is stable, so ties keep insertion order
        scored.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(limit);

        Ok(scored)
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}
