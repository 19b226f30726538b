//! Search over past interactions, with display formatting.
//!
//! Thin contract in front of the store: fetch `limit` candidates, then drop
//! those under the similarity threshold. Filtering happens after limiting,
//! so fewer than `limit` results come back whenever sub-threshold records
//! occupy the top-`limit` window. Callers were written against this exact
//! behavior, so it is kept as-is.

use quill_core::error::StoreError;
use tracing::info;

use crate::store::{InteractionStore, ScoredInteraction};

const RULE_WIDTH: usize = 80;
const PREVIEW_LEN: usize = 100;

pub struct SearchService {
    store: InteractionStore,
}

impl SearchService {
    pub fn new(store: InteractionStore) -> Self {
        Self { store }
    }

    /// Top `limit` records by similarity, filtered to `min_similarity`.
    pub async fn search(
        &self,
        query: &str,
        limit: usize,
        min_similarity: f32,
    ) -> Result<Vec<ScoredInteraction>, StoreError> {
        info!(query = %query, "Searching past interactions");
        let results = self.store.search(query, limit).await?;

        let filtered: Vec<ScoredInteraction> = results
            .into_iter()
            .filter(|r| r.similarity >= min_similarity)
            .collect();

        info!(
            count = filtered.len(),
            min_similarity, "Relevant results after filtering"
        );
        Ok(filtered)
    }

    /// Render results for terminal display.
    pub fn format_results(results: &[ScoredInteraction], detailed: bool) -> String {
        if results.is_empty() {
            return "No matching results found.".to_string();
        }

        let rule = "=".repeat(RULE_WIDTH);
        let mut output = format!(
            "\n{rule}\nFOUND {} RELEVANT PAST INTERACTIONS\n{rule}\n\n",
            results.len()
        );

        for (i, result) in results.iter().enumerate() {
            let record = &result.record;
            let similarity_pct = (result.similarity * 100.0) as i32;
            let date = record.created_at.format("%Y-%m-%d %H:%M");

            output.push_str(&format!("{}. [{similarity_pct}% match] {}\n", i + 1, record.summary));
            output.push_str(&format!("   Model: {} | Date: {date}\n", record.model));

            if let Some(ref file_path) = record.file_path {
                output.push_str(&format!("   File: {file_path}\n"));
            }

            output.push_str(&format!("   Query: {}\n", record.query));

            if detailed {
                output.push_str(&format!("   {}\n", "-".repeat(40)));
                output.push_str(&format!("   Response:\n{}\n", record.response));
            } else {
                let preview = if record.response.len() > PREVIEW_LEN {
                    let mut cut = PREVIEW_LEN;
                    while !record.response.is_char_boundary(cut) {
                        cut -= 1;
                    }
                    format!("{}...", &record.response[..cut])
                } else {
                    record.response.clone()
                };
                output.push_str(&format!("   Preview: {preview}\n"));
            }

            output.push('\n');
        }

        output
    }
}
