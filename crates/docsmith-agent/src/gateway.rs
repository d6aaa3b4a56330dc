// ABOUTME: Defines the ChatGateway trait that all model provider adapters must implement.
// ABOUTME: Also defines AgentError, the failure taxonomy for a single think step.

use async_trait::async_trait;

use docsmith_core::message::{AssistantMessage, Message};
use docsmith_core::tool::ToolDefinition;

/// Callback receiving streamed text deltas as the model produces them.
pub type TokenSink<'a> = &'a (dyn Fn(&str) + Send + Sync);

/// Errors that can occur while producing one assistant message.
///
/// These abort the current loop turn: tool failures never appear here, they
/// are converted to error-text results by the executor instead.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Rate limited")]
    RateLimited,
}

/// Trait that all model provider adapters must implement. A gateway owns its
/// own network policy (timeouts, bounded retries); the agent loop only ever
/// sees complete assistant messages.
#[async_trait]
pub trait ChatGateway: Send + Sync {
    /// Produce one assistant message for the given conversation, with the
    /// supplied tool schemas bound for this call.
    async fn complete(
        &self,
        system_prompt: &str,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<AssistantMessage, AgentError>;

    /// Streaming variant delivering text deltas to `on_token` as they arrive.
    /// The final message has the same semantics as `complete`; adapters
    /// without streaming support fall back to it and deliver the text whole.
    async fn complete_streaming(
        &self,
        system_prompt: &str,
        messages: &[Message],
        tools: &[ToolDefinition],
        on_token: TokenSink<'_>,
    ) -> Result<AssistantMessage, AgentError> {
        let reply = self.complete(system_prompt, messages, tools).await?;
        if !reply.content.is_empty() {
            on_token(&reply.content);
        }
        Ok(reply)
    }

    /// Provider name for logging and display (e.g. "openrouter").
    fn provider_name(&self) -> &str;

    /// Model identifier being used (e.g. "openai/gpt-4o").
    fn model_name(&self) -> &str;
}
