//! Context assembly for quill.
//!
//! Turns a query plus its attached files, directories, search terms, and
//! prior chat turns into the exact ordered message payload handed to the
//! LLM, caching expensive extraction under the session directory.

pub mod assembler;
pub mod files;
pub mod search;
pub mod tree;

pub use assembler::{terminal_context, ContextAssembler};
pub use files::{load_image, sanitize_name, ALLOWED_EXTENSIONS, EXCLUDED_DIRS, IMAGE_EXTENSIONS};
pub use search::SearchResolver;
pub use tree::render_tree;
