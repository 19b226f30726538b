//! Session file parsing and appending.
//!
//! A session file is Markdown with an optional YAML header:
//!
//! ```text
//! ---
//! llm_config: flash
//! created_at: '2026-08-30 10:00:00'
//! ---
//!
//! What is ownership?
//! *ChatBot*: Ownership is Rust's memory model...
//!
//! ====================
//! How does borrowing relate?
//! ```
//!
//! Exchanges are separated by the block delimiter; inside a block the
//! assistant's answer follows the role delimiter. Whatever trails the last
//! delimiter is the pending user query.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use quill_core::error::SessionError;
use quill_core::message::ChatTurn;
use tracing::{info, warn};

use crate::meta::SessionMeta;

/// Separates completed exchanges in the file.
pub const BLOCK_DELIMITER: &str = "====================";

/// Marks the start of the assistant's answer inside a block.
pub const ROLE_DELIMITER: &str = "*ChatBot*: ";

const HEADER_MARKER: &str = "---";

/// A parsed session file.
#[derive(Debug)]
pub struct SessionLog {
    path: PathBuf,
    pub meta: SessionMeta,
    pub chat_history: Vec<ChatTurn>,
    pub latest_query: String,
}

impl SessionLog {
    /// Load and parse a session file.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, SessionError> {
        let path = path.into();
        if !path.exists() {
            return Err(SessionError::NotFound(path.display().to_string()));
        }

        let content = fs::read_to_string(&path).map_err(|e| SessionError::ReadFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let (meta, body) = split_header(&content);
        let (chat_history, latest_query) = parse_chat_history(body);

        Ok(Self {
            path,
            meta,
            chat_history,
            latest_query,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append an assistant answer as a completed exchange.
    ///
    /// The file is re-read so edits made while the request was in flight are
    /// kept, then rewritten atomically: header (if the file carries one),
    /// body verbatim, answer block, block delimiter. The current `meta` is
    /// serialized into the header, so token counts updated on this struct
    /// land on disk here.
    pub fn append_response(&self, answer: &str) -> Result<(), SessionError> {
        let content = fs::read_to_string(&self.path).map_err(|e| SessionError::ReadFailed {
            path: self.path.display().to_string(),
            reason: e.to_string(),
        })?;

        let mut out = String::new();

        if content.contains(HEADER_MARKER) {
            let body = header_body(&content);
            let yaml = serde_yaml::to_string(&self.meta)
                .map_err(|e| SessionError::HeaderSerialization(e.to_string()))?;
            out.push_str("---\n");
            out.push_str(&yaml);
            out.push_str("---");
            if body.trim().is_empty() {
                out.push('\n');
            } else {
                out.push_str(body);
            }
        } else {
            info!(path = %self.path.display(), "No header in session file, leaving body as-is");
            if content.trim().is_empty() {
                out.push('\n');
            } else {
                out.push_str(&content);
            }
        }

        out.push_str(&format!("\n{ROLE_DELIMITER}{answer}\n\n"));
        out.push_str(BLOCK_DELIMITER);

        atomic_write(&self.path, &out)
    }
}

/// Split an optional YAML header off the content.
///
/// Header parsing only engages when the file starts with `---`. A malformed
/// or unsplittable header degrades to default metadata with the full content
/// treated as body, so a damaged file stays usable.
fn split_header(content: &str) -> (SessionMeta, &str) {
    if !content.starts_with(HEADER_MARKER) {
        return (SessionMeta::default(), content);
    }

    let mut parts = content.splitn(3, HEADER_MARKER);
    let _ = parts.next();
    let header = parts.next();
    let body = parts.next();

    match (header, body) {
        (Some(header), Some(body)) => {
            let meta = serde_yaml::from_str(header).unwrap_or_else(|e| {
                warn!(error = %e, "Malformed session header, using defaults");
                SessionMeta::default()
            });
            (meta, body)
        }
        _ => {
            warn!("Unterminated session header, treating file as body");
            (SessionMeta::default(), content)
        }
    }
}

/// Body after the header, for rewriting. Empty if the header never closes.
fn header_body(content: &str) -> &str {
    let mut parts = content.splitn(3, HEADER_MARKER);
    let _ = parts.next();
    let _ = parts.next();
    parts.next().unwrap_or("")
}

/// Parse the body into completed exchanges plus the pending query.
///
/// Blocks without a role delimiter are skipped (stray notes the user wrote
/// between exchanges). An empty side of an exchange becomes `"..."` so the
/// history keeps its user/assistant alternation.
fn parse_chat_history(body: &str) -> (Vec<ChatTurn>, String) {
    let blocks: Vec<&str> = body.split(BLOCK_DELIMITER).collect();

    let (history_blocks, last) = match blocks.split_last() {
        Some((last, rest)) => (rest, *last),
        None => return (Vec::new(), String::new()),
    };

    let mut history = Vec::new();

    for block in history_blocks {
        let Some((user_part, assistant_part)) = block.split_once(ROLE_DELIMITER) else {
            continue;
        };

        let user = match user_part.trim() {
            "" => "...",
            s => s,
        };
        let assistant = match assistant_part.trim() {
            "" => "...",
            s => s,
        };

        history.push(ChatTurn::user(user));
        history.push(ChatTurn::assistant(assistant));
    }

    (history, last.trim().to_string())
}

/// Write via a temp file in the same directory, then rename over the target.
fn atomic_write(path: &Path, content: &str) -> Result<(), SessionError> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let write_err = |e: String| SessionError::WriteFailed {
        path: path.display().to_string(),
        reason: e,
    };

    let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(|e| write_err(e.to_string()))?;
    tmp.write_all(content.as_bytes())
        .map_err(|e| write_err(e.to_string()))?;
    tmp.persist(path).map_err(|e| write_err(e.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_core::message::Role;

    fn write_session(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(format!("{name}.md"));
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn load_missing_file() {
        let err = SessionLog::load("/nonexistent/spot.md").unwrap_err();
        assert!(matches!(err, SessionError::NotFound(_)));
    }

    #[test]
    fn parse_with_header_and_history() {
        let dir = tempfile::tempdir().unwrap();
        let content = "---\nllm_config: sonnet\ncurrent_tokens: 42\n---\n\nWhat is ownership?\n*ChatBot*: A memory model.\n\n====================\nAnd borrowing?";
        let path = write_session(dir.path(), "rust", content);

        let log = SessionLog::load(&path).unwrap();
        assert_eq!(log.meta.llm_config, "sonnet");
        assert_eq!(log.meta.current_tokens, 42);
        assert_eq!(log.chat_history.len(), 2);
        assert_eq!(log.chat_history[0].role, Role::User);
        assert_eq!(log.chat_history[0].content, "What is ownership?");
        assert_eq!(log.chat_history[1].content, "A memory model.");
        assert_eq!(log.latest_query, "And borrowing?");
    }

    #[test]
    fn parse_without_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_session(dir.path(), "plain", "just a question");

        let log = SessionLog::load(&path).unwrap();
        assert_eq!(log.meta, SessionMeta::default());
        assert!(log.chat_history.is_empty());
        assert_eq!(log.latest_query, "just a question");
    }

    #[test]
    fn malformed_header_degrades_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let content = "---\n: : not yaml [\n---\nhello";
        let path = write_session(dir.path(), "broken", content);

        let log = SessionLog::load(&path).unwrap();
        assert_eq!(log.meta, SessionMeta::default());
        assert_eq!(log.latest_query, "hello");
    }

    #[test]
    fn malformed_header_keeps_completed_blocks() {
        let dir = tempfile::tempdir().unwrap();
        let content =
            format!("---\n: : not yaml [\n---\nWhat is 2+2?\n{ROLE_DELIMITER}4\n\n{BLOCK_DELIMITER}\n");
        let path = write_session(dir.path(), "broken_history", &content);

        let log = SessionLog::load(&path).unwrap();
        assert_eq!(log.meta, SessionMeta::default());
        assert_eq!(log.chat_history.len(), 2);
        assert_eq!(log.chat_history[0].content, "What is 2+2?");
        assert_eq!(log.chat_history[1].content, "4");
        assert!(log.latest_query.is_empty());
    }

    #[test]
    fn unterminated_header_treated_as_body() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_session(dir.path(), "stub", "--- oops no closing marker");

        let log = SessionLog::load(&path).unwrap();
        assert_eq!(log.meta, SessionMeta::default());
        assert!(log.latest_query.contains("oops"));
    }

    #[test]
    fn empty_sides_become_ellipsis() {
        let (history, _) =
            parse_chat_history("\n*ChatBot*: answer only\n====================\n");
        assert_eq!(history[0].content, "...");
        assert_eq!(history[1].content, "answer only");

        let (history, _) = parse_chat_history("question only\n*ChatBot*: \n====================\n");
        assert_eq!(history[0].content, "question only");
        assert_eq!(history[1].content, "...");
    }

    #[test]
    fn blocks_without_role_delimiter_skipped() {
        let body = "a stray note\n====================\nreal question\n*ChatBot*: real answer\n====================\nnext";
        let (history, latest) = parse_chat_history(body);
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].content, "real question");
        assert_eq!(latest, "next");
    }

    #[test]
    fn append_then_reload() {
        let dir = tempfile::tempdir().unwrap();
        let content = "---\nllm_config: flash\n---\n\nWhat is 2+2?";
        let path = write_session(dir.path(), "math", content);

        let log = SessionLog::load(&path).unwrap();
        assert_eq!(log.latest_query, "What is 2+2?");

        log.append_response("4").unwrap();

        let log = SessionLog::load(&path).unwrap();
        assert_eq!(log.chat_history.len(), 2);
        assert_eq!(log.chat_history[0].content, "What is 2+2?");
        assert_eq!(log.chat_history[1].content, "4");
        assert_eq!(log.latest_query, "");
    }

    #[test]
    fn append_preserves_body_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let content = "---\nllm_config: flash\n---\n\nfirst question";
        let path = write_session(dir.path(), "keep", content);

        let log = SessionLog::load(&path).unwrap();
        log.append_response("first answer").unwrap();

        let after_first = fs::read_to_string(&path).unwrap();
        assert!(after_first.contains("\nfirst question"));
        assert!(after_first.ends_with(BLOCK_DELIMITER));

        // Simulate the user typing the next question, then answer it
        fs::write(&path, format!("{after_first}\nsecond question")).unwrap();
        let log = SessionLog::load(&path).unwrap();
        assert_eq!(log.latest_query, "second question");
        log.append_response("second answer").unwrap();

        // Earlier exchanges are untouched by later appends
        let after_second = fs::read_to_string(&path).unwrap();
        assert!(after_second.starts_with(&after_first));

        let log = SessionLog::load(&path).unwrap();
        assert_eq!(log.chat_history.len(), 4);
    }

    #[test]
    fn append_without_header_leaves_body_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_session(dir.path(), "raw", "a bare question");

        let log = SessionLog::load(&path).unwrap();
        log.append_response("an answer").unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("a bare question"));
        assert!(content.contains("*ChatBot*: an answer"));
        assert!(!content.contains("llm_config"));
    }

    #[test]
    fn updated_meta_lands_in_header() {
        let dir = tempfile::tempdir().unwrap();
        let content = "---\nllm_config: flash\n---\n\nquery";
        let path = write_session(dir.path(), "tokens", content);

        let mut log = SessionLog::load(&path).unwrap();
        log.meta.current_tokens = 1234;
        log.append_response("ok").unwrap();

        let log = SessionLog::load(&path).unwrap();
        assert_eq!(log.meta.current_tokens, 1234);
    }
}
