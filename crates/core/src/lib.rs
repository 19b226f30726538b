//! # Quill Core
//!
//! Domain types, traits, and error definitions for the quill CLI assistant.
//! This crate defines the domain model that all other crates implement
//! against; it carries no HTTP, config, or filesystem machinery of its own.
//!
//! ## Design Philosophy
//!
//! The external collaborators (LLM backends, embedders) are defined as traits
//! here. Implementations live in their respective crates. This enables:
//! - Swapping implementations via configuration
//! - Easy testing with mock/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod message;
pub mod provider;
pub mod token;

// Re-export key types at crate root for ergonomics
pub use error::{Error, Result};
pub use message::{ChatTurn, Content, ContentPart, Message, Role};
pub use provider::{
    Embedder, EmbeddingRequest, EmbeddingResponse, Provider, ProviderRequest, ProviderResponse,
    StreamChunk, Usage,
};
pub use token::estimate_tokens;
