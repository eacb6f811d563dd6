//! LLM integration - OpenRouter API
//!
//! Transport only: the oracle layer decides prompts, timeouts and fallbacks.

mod client;
mod types;

pub use client::{LlmClient, LlmClientBuilder};
pub use types::{ChatRequest, ChatResponse, LlmResponse, Message, MessageRole};
