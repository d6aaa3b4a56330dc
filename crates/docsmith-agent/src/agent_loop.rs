// ABOUTME: The think/act/done state machine driving one bounded reasoning session.
// ABOUTME: Used at supervisor level and inside every expert tool; experts are fresh nested instances.

use std::sync::Arc;

use tracing::{debug, info};

use docsmith_core::message::{AssistantMessage, Message};

use crate::executor;
use crate::gateway::{AgentError, ChatGateway, TokenSink};
use crate::registry::ToolRegistry;

/// Answer given when the loop runs out of think steps while the model still
/// wants to call tools.
pub const STEP_LIMIT_ANSWER: &str =
    "Sorry, I could not find an answer to your question in the specified number of steps.";

pub const DEFAULT_STEP_BUDGET: usize = 8;

/// One bounded reasoning session over a conversation history.
///
/// The loop owns its history for the duration of `run`: nested loops never
/// see it, they receive only the seed messages their caller passes in.
pub struct AgentLoop {
    label: String,
    system_prompt: String,
    gateway: Arc<dyn ChatGateway>,
    tools: ToolRegistry,
    step_budget: usize,
}

/// What a finished loop produced.
#[derive(Debug, Clone)]
pub struct LoopOutcome {
    /// Final assistant text. Always present, never empty of meaning: either a
    /// substantive answer or the fixed step-limit notice.
    pub answer: String,
    /// Full history, beginning with the seed messages.
    pub messages: Vec<Message>,
    /// Think steps consumed.
    pub steps: usize,
    /// True when the answer is the step-limit notice.
    pub out_of_steps: bool,
}

impl AgentLoop {
    pub fn new(
        label: impl Into<String>,
        system_prompt: impl Into<String>,
        gateway: Arc<dyn ChatGateway>,
        tools: ToolRegistry,
    ) -> Self {
        Self {
            label: label.into(),
            system_prompt: system_prompt.into(),
            gateway,
            tools,
            step_budget: DEFAULT_STEP_BUDGET,
        }
    }

    /// Bound the number of think steps. Clamped to at least one so the loop
    /// always produces an answer.
    pub fn with_step_budget(mut self, budget: usize) -> Self {
        self.step_budget = budget.max(1);
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Drive the loop from the seed messages to completion.
    pub async fn run(&self, seed: Vec<Message>) -> Result<LoopOutcome, AgentError> {
        self.run_inner(seed, None).await
    }

    /// Like `run`, but streams the model's text deltas to `on_token` during
    /// each think step. Tool dispatch is unaffected.
    pub async fn run_streaming(
        &self,
        seed: Vec<Message>,
        on_token: TokenSink<'_>,
    ) -> Result<LoopOutcome, AgentError> {
        self.run_inner(seed, Some(on_token)).await
    }

    async fn run_inner(
        &self,
        seed: Vec<Message>,
        on_token: Option<TokenSink<'_>>,
    ) -> Result<LoopOutcome, AgentError> {
        let mut messages = seed;
        let definitions = self.tools.definitions();
        let mut step = 0;

        loop {
            step += 1;
            debug!(agent = %self.label, step, history_len = messages.len(), "think");

            let reply = match on_token {
                Some(sink) => {
                    self.gateway
                        .complete_streaming(&self.system_prompt, &messages, &definitions, sink)
                        .await?
                }
                None => {
                    self.gateway
                        .complete(&self.system_prompt, &messages, &definitions)
                        .await?
                }
            };

            if reply.is_final() {
                info!(agent = %self.label, step, "loop finished with an answer");
                let answer = reply.content.clone();
                messages.push(Message::assistant(reply));
                return Ok(LoopOutcome {
                    answer,
                    messages,
                    steps: step,
                    out_of_steps: false,
                });
            }

            if step >= self.step_budget {
                // Out of budget with calls still requested: the calls are
                // discarded and the reply's content is replaced by the fixed
                // notice, so no dangling calls enter the history.
                info!(
                    agent = %self.label,
                    step,
                    discarded_calls = reply.tool_calls.len(),
                    "step budget exhausted"
                );
                messages.push(Message::assistant(AssistantMessage::text(STEP_LIMIT_ANSWER)));
                return Ok(LoopOutcome {
                    answer: STEP_LIMIT_ANSWER.to_string(),
                    messages,
                    steps: step,
                    out_of_steps: true,
                });
            }

            debug!(agent = %self.label, step, calls = reply.tool_calls.len(), "act");
            let calls = reply.tool_calls.clone();
            messages.push(Message::assistant(reply));

            // Every result lands in history before the next think step.
            let results = executor::dispatch(&self.tools, &calls).await;
            for result in results {
                messages.push(Message::tool_result(result));
            }
        }
    }
}
