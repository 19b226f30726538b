//! Web-search term resolution with on-disk caching.
//!
//! Search terms attached to a session are resolved once through a
//! search-capable model and cached under the session's `search/` directory.
//! A term that fails to resolve is logged and dropped from the bundle; it
//! never aborts assembly.

use std::fs;
use std::path::Path;

use async_trait::async_trait;
use quill_core::error::ProviderError;
use tracing::{error, info};

use crate::files::sanitize_name;

/// Answers a search term with real-time web results.
#[async_trait]
pub trait SearchResolver: Send + Sync {
    async fn resolve(&self, term: &str) -> Result<String, ProviderError>;
}

/// Resolve search terms in order, returning `(term, content)` pairs.
///
/// With a cache directory, each term is keyed by its sanitized name and
/// resolved results are written through; without one, every term hits the
/// resolver fresh.
pub async fn load_search(
    terms: &[String],
    cache_dir: Option<&Path>,
    resolver: &dyn SearchResolver,
) -> Vec<(String, String)> {
    let mut results = Vec::new();

    for term in terms {
        match load_term(term, cache_dir, resolver).await {
            Some(content) => results.push((term.clone(), content)),
            None => {
                error!(term = %term, "Failed to get search result, skipping");
            }
        }
    }

    results
}

async fn load_term(
    term: &str,
    cache_dir: Option<&Path>,
    resolver: &dyn SearchResolver,
) -> Option<String> {
    let cache_path = cache_dir.map(|dir| dir.join(format!("{}.txt", sanitize_name(term))));

    if let Some(ref path) = cache_path {
        if let Ok(cached) = fs::read_to_string(path) {
            return Some(cached.trim().to_string());
        }
    }

    info!(term = %term, "Searching");
    let content = match resolver.resolve(term).await {
        Ok(content) => content,
        Err(e) => {
            error!(term = %term, error = %e, "Search call failed");
            return None;
        }
    };

    if let Some(ref path) = cache_path {
        if let Err(e) = fs::write(path, &content) {
            error!(path = %path.display(), error = %e, "Failed to cache search result");
        }
    }

    Some(content.trim().to_string())
}
