//! Directory tree rendering.
//!
//! Produces the familiar `tree`-style listing with branch glyphs, pruned by
//! the same exclusion rules as file collection. One tree is inserted into the
//! bundle per directory argument, ahead of the query text.

use std::fs;
use std::path::Path;

use quill_core::error::ContextError;

use crate::files::is_excluded_dir;

/// Render a directory as an indented tree rooted at its name.
pub fn render_tree(root: &Path) -> Result<String, ContextError> {
    let name = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| root.display().to_string());

    let mut out = format!("{name}/\n");
    render_children(root, "", &mut out)?;
    Ok(out)
}

fn render_children(dir: &Path, prefix: &str, out: &mut String) -> Result<(), ContextError> {
    let entries = fs::read_dir(dir).map_err(|e| ContextError::ReadFailed {
        path: dir.display().to_string(),
        reason: e.to_string(),
    })?;

    let mut children: Vec<(String, bool)> = entries
        .flatten()
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                return None;
            }
            let is_dir = entry.path().is_dir();
            if is_dir && is_excluded_dir(&name) {
                return None;
            }
            Some((name, is_dir))
        })
        .collect();
    children.sort_unstable();

    let count = children.len();
    for (i, (name, is_dir)) in children.into_iter().enumerate() {
        let last = i + 1 == count;
        let branch = if last { "└── " } else { "├── " };
        let suffix = if is_dir { "/" } else { "" };
        out.push_str(&format!("{prefix}{branch}{name}{suffix}\n"));

        if is_dir {
            let child_prefix = if last {
                format!("{prefix}    ")
            } else {
                format!("{prefix}│   ")
            };
            render_children(&dir.join(&name), &child_prefix, out)?;
        }
    }

    Ok(())
}
