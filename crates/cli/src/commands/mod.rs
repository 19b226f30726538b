//! Command handlers for the quill CLI.

pub mod models;
pub mod query;
pub mod run_file;
pub mod search;
pub mod session;
pub mod support;
