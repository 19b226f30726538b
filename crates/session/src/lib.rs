//! Markdown-file sessions for quill.
//!
//! A session is a directory with a markdown transcript the user edits
//! directly: they type a question at the bottom of the file, `quill session
//! run` answers it in place. Parsing and rewriting of that file live here.

pub mod log;
pub mod meta;
pub mod registry;

pub use log::{SessionLog, BLOCK_DELIMITER, ROLE_DELIMITER};
pub use meta::SessionMeta;
pub use registry::SessionRegistry;
