//! The session registry — named sessions under a common directory.
//!
//! Each session is a directory holding `<name>.md` plus its attached context
//! (`files/`, `search/`). A directory without a matching markdown file is not
//! a session.

use std::fs;
use std::path::{Path, PathBuf};

use quill_core::error::SessionError;
use tracing::info;

use crate::log::SessionLog;
use crate::meta::SessionMeta;

pub struct SessionRegistry {
    sessions_dir: PathBuf,
}

impl SessionRegistry {
    /// Open the registry, creating the sessions directory if needed.
    pub fn open(sessions_dir: impl Into<PathBuf>) -> Result<Self, SessionError> {
        let sessions_dir = sessions_dir.into();
        fs::create_dir_all(&sessions_dir).map_err(|e| SessionError::WriteFailed {
            path: sessions_dir.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self { sessions_dir })
    }

    /// Create a session with a fresh header. Recreating an existing session
    /// resets its markdown file but keeps attached context files.
    pub fn create(&self, name: &str, meta: &SessionMeta) -> Result<PathBuf, SessionError> {
        let session_dir = self.session_dir(name);
        fs::create_dir_all(&session_dir).map_err(|e| SessionError::WriteFailed {
            path: session_dir.display().to_string(),
            reason: e.to_string(),
        })?;

        let md_path = self.markdown_path(name);
        let yaml = serde_yaml::to_string(meta)
            .map_err(|e| SessionError::HeaderSerialization(e.to_string()))?;
        let content = format!("---\n{yaml}---\n\n");

        fs::write(&md_path, content).map_err(|e| SessionError::WriteFailed {
            path: md_path.display().to_string(),
            reason: e.to_string(),
        })?;

        info!(session = %name, "Created session");
        Ok(session_dir)
    }

    /// Load a session's markdown log by name.
    pub fn load(&self, name: &str) -> Result<SessionLog, SessionError> {
        SessionLog::load(self.markdown_path(name))
    }

    /// Session names, sorted. A session exists when its directory contains
    /// a markdown file named after it.
    pub fn list(&self) -> Result<Vec<String>, SessionError> {
        let entries = fs::read_dir(&self.sessions_dir).map_err(|e| SessionError::ReadFailed {
            path: self.sessions_dir.display().to_string(),
            reason: e.to_string(),
        })?;

        let mut names = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if path.join(format!("{name}.md")).exists() {
                names.push(name.to_string());
            }
        }
        names.sort_unstable();
        Ok(names)
    }

    /// Delete a session and everything attached to it.
    pub fn delete(&self, name: &str) -> Result<(), SessionError> {
        let session_dir = self.session_dir(name);
        if !session_dir.exists() {
            return Err(SessionError::NotFound(name.to_string()));
        }
        fs::remove_dir_all(&session_dir).map_err(|e| SessionError::WriteFailed {
            path: session_dir.display().to_string(),
            reason: e.to_string(),
        })?;
        info!(session = %name, "Deleted session");
        Ok(())
    }

    pub fn session_dir(&self, name: &str) -> PathBuf {
        self.sessions_dir.join(name)
    }

    pub fn markdown_path(&self, name: &str) -> PathBuf {
        self.session_dir(name).join(format!("{name}.md"))
    }

    pub fn sessions_dir(&self) -> &Path {
        &self.sessions_dir
    }
}
