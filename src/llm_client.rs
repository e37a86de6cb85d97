//! Unified LLM client trait
//!
//! All model calls in this crate are synchronous request/response from the
//! caller's perspective; a stalled upstream call stalls the turn.

use crate::error::Result;
use crate::openrouter::{CompletionRequest, CompletionResponse};
use async_trait::async_trait;

/// Trait for chat-completion backends (OpenRouter in production, scripted
/// clients in tests)
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a completion request
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;

    /// Get the client type for debugging/logging
    fn client_type(&self) -> &str;

    /// Get the endpoint this client talks to
    fn endpoint(&self) -> &str;
}
