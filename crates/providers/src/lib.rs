//! LLM provider implementations for quill.
//!
//! All providers implement the `quill_core::Provider` trait.
//! The router builds one provider per model-registry entry from configuration.

pub mod anthropic;
pub mod openai_compat;
pub mod router;

pub use anthropic::AnthropicProvider;
pub use openai_compat::OpenAiCompatProvider;
pub use router::ProviderRouter;
