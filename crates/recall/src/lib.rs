//! Semantic recall for quill.
//!
//! Persists past (query, response) interactions with embeddings and ranks
//! them by cosine similarity against new queries.

pub mod service;
pub mod store;
pub mod vector;

pub use service::SearchService;
pub use store::{InteractionRecord, InteractionStore, ScoredInteraction, Summarizer, SUMMARY_FALLBACK};
pub use vector::cosine_similarity;
