//! LLM provider implementations for Voiceprint.
//!
//! All providers implement the `voiceprint_core::Provider` trait. The factory
//! builds the configured backend and wraps it with timeout and retry handling.

pub mod factory;
pub mod openai_compat;
pub mod retry;

pub use factory::{build_from_config, resolve_model};
pub use openai_compat::OpenAiCompatProvider;
pub use retry::RetryingProvider;
