//! Bundles a query with its surrounding context into the outgoing messages.
//!
//! Bundle ordering is fixed: directory trees, then the `<query>`, `<files>`
//! and `<search>` blocks as one text part, then image parts. The fixed order
//! keeps prompts reproducible.

use std::fs;
use std::path::{Path, PathBuf};

use quill_core::error::{ContextError, Error};
use quill_core::message::{ChatTurn, Content, ContentPart, Message, Role};
use quill_core::token::{estimate_tokens, truncate_to_tokens};
use tracing::{debug, info, warn};

use crate::files::{
    is_allowed_text, is_image, load_image, load_text_file, oversize_marker, sanitize_name,
    collect_files,
};
use crate::search::{load_search, SearchResolver};
use crate::tree::render_tree;

const DEFAULT_MAX_FILE_TOKENS: usize = 100_000;

pub struct ContextAssembler {
    query: String,
    chat_history: Vec<ChatTurn>,
    files: Vec<String>,
    search_terms: Vec<String>,
    session_dir: Option<PathBuf>,
    max_file_tokens: usize,
}

impl ContextAssembler {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            chat_history: Vec::new(),
            files: Vec::new(),
            search_terms: Vec::new(),
            session_dir: None,
            max_file_tokens: DEFAULT_MAX_FILE_TOKENS,
        }
    }

    pub fn with_history(mut self, history: Vec<ChatTurn>) -> Self {
        self.chat_history = history;
        self
    }

    pub fn with_files(mut self, files: Vec<String>) -> Self {
        self.files = files;
        self
    }

    pub fn with_search(mut self, terms: Vec<String>) -> Self {
        self.search_terms = terms;
        self
    }

    /// Session mode: relative paths resolve against this directory and
    /// extracted text / search results are cached under it.
    pub fn with_session_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.session_dir = Some(dir.into());
        self
    }

    pub fn with_max_file_tokens(mut self, max: usize) -> Self {
        self.max_file_tokens = max;
        self
    }

    /// Assemble the full message sequence: prior history plus one new user
    /// turn carrying the context bundle.
    pub async fn get_messages(
        &self,
        resolver: &dyn SearchResolver,
    ) -> Result<Vec<Message>, Error> {
        let files_cache = self.ensure_cache_dir("files")?;
        let search_cache = self.ensure_cache_dir("search")?;

        let mut trees: Vec<String> = Vec::new();
        let mut file_entries: Vec<(String, String)> = Vec::new();
        let mut image_parts: Vec<ContentPart> = Vec::new();

        for raw in &self.files {
            let path = self.resolve_path(raw);
            if !path.exists() {
                return Err(ContextError::FileNotFound(path.display().to_string()).into());
            }

            if path.is_dir() {
                trees.push(render_tree(&path)?);
                for file in collect_files(&path)? {
                    self.load_one(&file, files_cache.as_deref(), &mut file_entries, &mut image_parts)?;
                }
            } else {
                self.load_one(&path, files_cache.as_deref(), &mut file_entries, &mut image_parts)?;
            }
        }

        let search_entries =
            load_search(&self.search_terms, search_cache.as_deref(), resolver).await;

        let text = self.render_prompt(&trees, &file_entries, &search_entries);

        let mut parts = vec![ContentPart::Text { text }];
        parts.extend(image_parts);

        let mut messages: Vec<Message> = self
            .chat_history
            .iter()
            .cloned()
            .map(Message::from)
            .collect();
        messages.push(Message {
            role: Role::User,
            content: Content::from_parts(parts),
        });

        debug!(count = messages.len(), "Assembled messages");
        Ok(messages)
    }

    fn render_prompt(
        &self,
        trees: &[String],
        files: &[(String, String)],
        search: &[(String, String)],
    ) -> String {
        let mut text = String::new();
        for tree in trees {
            text.push_str(tree);
            text.push('\n');
        }

        let join = |entries: &[(String, String)]| {
            entries
                .iter()
                .map(|(name, content)| format!("{name}: {content}"))
                .collect::<Vec<_>>()
                .join("\n")
        };

        text.push_str(&format!(
            "<query>\n{}\n</query>\n<files>\n{}\n</files>\n<search>\n{}\n</search>\n",
            self.query,
            join(files),
            join(search),
        ));
        text
    }

    fn load_one(
        &self,
        path: &Path,
        cache_dir: Option<&Path>,
        file_entries: &mut Vec<(String, String)>,
        image_parts: &mut Vec<ContentPart>,
    ) -> Result<(), ContextError> {
        if is_image(path) {
            image_parts.push(load_image(path)?);
            return Ok(());
        }
        if !is_allowed_text(path) {
            debug!(path = %path.display(), "Skipping, extension not in allow-list");
            return Ok(());
        }

        // Extraction failures (binary pdf/doc content and the like) drop the
        // file, not the bundle; the rest of the context still goes out.
        let content = match self.text_content(path, cache_dir) {
            Ok(content) => content,
            Err(ContextError::ReadFailed { path, reason }) => {
                warn!(path = %path, reason = %reason, "Text extraction failed, skipping file");
                return Ok(());
            }
            Err(e) => return Err(e),
        };
        if content.is_empty() {
            info!(path = %path.display(), "Empty file, skipping");
            return Ok(());
        }

        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        file_entries.push((name, content));
        Ok(())
    }

    /// Text content with the session cache in front of extraction.
    /// The cache holds raw content; the token ceiling applies on the way out
    /// so a lowered ceiling takes effect on cached files too.
    fn text_content(&self, path: &Path, cache_dir: Option<&Path>) -> Result<String, ContextError> {
        let Some(cache_dir) = cache_dir else {
            return load_text_file(path, self.max_file_tokens);
        };

        let key = sanitize_name(&path.display().to_string());
        let cache_path = cache_dir.join(format!("{key}.txt"));

        let content = if cache_path.exists() {
            fs::read_to_string(&cache_path).map_err(|e| ContextError::CacheFailed {
                path: cache_path.display().to_string(),
                reason: e.to_string(),
            })?
        } else {
            let content = fs::read_to_string(path).map_err(|e| ContextError::ReadFailed {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
            fs::write(&cache_path, &content).map_err(|e| ContextError::CacheFailed {
                path: cache_path.display().to_string(),
                reason: e.to_string(),
            })?;
            content
        };

        let token_count = estimate_tokens(&content);
        if token_count > self.max_file_tokens {
            return Ok(oversize_marker(token_count, self.max_file_tokens));
        }
        Ok(content.trim().to_string())
    }

    fn resolve_path(&self, raw: &str) -> PathBuf {
        let path = PathBuf::from(raw);
        if path.is_absolute() {
            return path;
        }
        match &self.session_dir {
            Some(dir) => dir.join(path),
            None => path,
        }
    }

    fn ensure_cache_dir(&self, name: &str) -> Result<Option<PathBuf>, ContextError> {
        let Some(session_dir) = &self.session_dir else {
            return Ok(None);
        };
        let dir = session_dir.join(name);
        fs::create_dir_all(&dir).map_err(|e| ContextError::CacheFailed {
            path: dir.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(Some(dir))
    }
}

/// Wrap piped stdin as a context block, truncating oversized input.
pub fn terminal_context(input: &str, max_tokens: usize) -> String {
    let trimmed = input.trim();
    let token_count = estimate_tokens(trimmed);

    if token_count > max_tokens {
        let truncated = truncate_to_tokens(trimmed, max_tokens);
        return format!("\nTerminal context:\n{truncated}\n[Input truncated due to size limit]");
    }

    format!("\nTerminal context:\n{trimmed}")
}
