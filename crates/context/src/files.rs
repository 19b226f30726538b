//! File loading for context assembly.
//!
//! Text files are read whole and token-estimated; oversized content is
//! replaced with a marker instead of failing the bundle. Images become
//! base64 data URIs. Directories expand recursively through an extension
//! allow-list, skipping hidden entries and well-known junk directories.

use std::fs;
use std::path::{Path, PathBuf};

use base64::Engine;
use quill_core::error::ContextError;
use quill_core::message::ContentPart;
use quill_core::token::estimate_tokens;
use tracing::{debug, warn};

/// Extensions eligible for text extraction.
pub const ALLOWED_EXTENSIONS: &[&str] = &[
    "txt", "md", "py", "js", "jsx", "ts", "tsx", "html", "css", "json", "yaml", "yml", "pdf",
    "doc", "docx", "rtf", "sql", "sh", "bash", "zsh", "fish", "rs", "toml",
];

/// Extensions routed to image handling instead of text extraction.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

/// Directory names never descended into.
pub const EXCLUDED_DIRS: &[&str] = &[
    ".git",
    "node_modules",
    "target",
    "__pycache__",
    ".venv",
    "venv",
    "dist",
    "build",
];

/// Turn an arbitrary string into a safe cache filename.
/// Every non-alphanumeric character becomes an underscore.
pub fn sanitize_name(term: &str) -> String {
    term.chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect()
}

/// Marker substituted for content that exceeds the token ceiling.
pub fn oversize_marker(token_count: usize, max_tokens: usize) -> String {
    format!("[File too large ({token_count} tokens) - exceeds limit of {max_tokens} tokens]")
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

pub fn is_image(path: &Path) -> bool {
    extension_of(path).is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

pub fn is_allowed_text(path: &Path) -> bool {
    extension_of(path).is_some_and(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
}

pub fn is_excluded_dir(name: &str) -> bool {
    EXCLUDED_DIRS.contains(&name)
}

/// Read a text file, substituting the oversize marker when the content
/// blows past the token ceiling.
pub fn load_text_file(path: &Path, max_tokens: usize) -> Result<String, ContextError> {
    let content = fs::read_to_string(path).map_err(|e| ContextError::ReadFailed {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    let token_count = estimate_tokens(&content);
    if token_count > max_tokens {
        warn!(
            path = %path.display(),
            tokens = token_count,
            limit = max_tokens,
            "File exceeds token ceiling, substituting marker"
        );
        return Ok(oversize_marker(token_count, max_tokens));
    }

    Ok(content)
}

/// Read an image file into a `data:` URI content part.
pub fn load_image(path: &Path) -> Result<ContentPart, ContextError> {
    let bytes = fs::read(path).map_err(|e| ContextError::ReadFailed {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    let media_type = match extension_of(path).as_deref() {
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "image/jpeg",
    };

    let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);
    debug!(path = %path.display(), media_type, "Encoded image");

    Ok(ContentPart::Image {
        url: format!("data:{media_type};base64,{encoded}"),
    })
}

/// Recursively collect loadable files under a directory, sorted for
/// deterministic bundle ordering.
pub fn collect_files(dir: &Path) -> Result<Vec<PathBuf>, ContextError> {
    let mut out = Vec::new();
    walk(dir, &mut out)?;
    out.sort_unstable();
    Ok(out)
}

fn walk(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), ContextError> {
    let entries = fs::read_dir(dir).map_err(|e| ContextError::ReadFailed {
        path: dir.display().to_string(),
        reason: e.to_string(),
    })?;

    for entry in entries.flatten() {
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if name.starts_with('.') {
            continue;
        }

        if path.is_dir() {
            if !is_excluded_dir(name) {
                walk(&path, out)?;
            }
        } else if is_image(&path) || is_allowed_text(&path) {
            out.push(path);
        }
    }

    Ok(())
}
