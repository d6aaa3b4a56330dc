// ABOUTME: Test utilities for docsmith-agent, including stub and scripted gateways.
// ABOUTME: Used in tests to simulate model replies without real API calls.

use std::collections::VecDeque;

use async_trait::async_trait;
use tokio::sync::Mutex;

use docsmith_core::message::{AssistantMessage, Message};
use docsmith_core::tool::ToolDefinition;

use crate::gateway::{AgentError, ChatGateway};

/// A stub gateway that always returns a pre-configured text reply.
///
/// Useful in tests to drive a loop to immediate completion without making
/// real API calls. The reply carries no tool calls, so the loop sees a
/// final answer on the first think step.
#[derive(Debug, Clone)]
pub struct StubGateway {
    reply_text: String,
}

impl StubGateway {
    /// Create a stub gateway that always returns the given text.
    pub fn new(reply_text: &str) -> Self {
        Self {
            reply_text: reply_text.to_owned(),
        }
    }

    /// Create a stub gateway that returns "Done."
    ///
    /// Convenience constructor for the common case where you just need a
    /// loop to complete without doing anything interesting.
    pub fn done() -> Self {
        Self::new("Done.")
    }
}

#[async_trait]
impl ChatGateway for StubGateway {
    async fn complete(
        &self,
        _system_prompt: &str,
        _messages: &[Message],
        _tools: &[ToolDefinition],
    ) -> Result<AssistantMessage, AgentError> {
        Ok(AssistantMessage::text(&self.reply_text))
    }

    fn provider_name(&self) -> &str {
        "stub"
    }

    fn model_name(&self) -> &str {
        "stub-model"
    }
}

/// One request as seen by a scripted gateway, kept for assertions.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub system_prompt: String,
    pub messages: Vec<Message>,
    /// Names of the tool definitions bound to the request, in order.
    pub tool_names: Vec<String>,
}

/// A gateway that replays a fixed script of assistant replies and records
/// every request it receives.
///
/// Each `complete` call pops the next scripted reply; an exhausted script
/// fails like a dead provider, which doubles as the way a test asserts that
/// no further think steps happen.
pub struct ScriptedGateway {
    script: Mutex<VecDeque<AssistantMessage>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedGateway {
    pub fn new(replies: Vec<AssistantMessage>) -> Self {
        Self {
            script: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Every request seen so far, in arrival order.
    pub async fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl ChatGateway for ScriptedGateway {
    async fn complete(
        &self,
        system_prompt: &str,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<AssistantMessage, AgentError> {
        self.requests.lock().await.push(RecordedRequest {
            system_prompt: system_prompt.to_string(),
            messages: messages.to_vec(),
            tool_names: tools.iter().map(|tool| tool.name.clone()).collect(),
        });

        self.script
            .lock()
            .await
            .pop_front()
            .ok_or_else(|| AgentError::ProviderError("scripted gateway exhausted".to_string()))
    }

    fn provider_name(&self) -> &str {
        "scripted"
    }

    fn model_name(&self) -> &str {
        "scripted-model"
    }
}
