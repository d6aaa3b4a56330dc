// ABOUTME: OpenRouter API adapter implementing the ChatGateway trait.
// ABOUTME: Translates message history into Chat Completions calls with function calling and SSE streaming.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{Value, json};
use tracing::warn;
use ulid::Ulid;

use docsmith_core::message::{AssistantMessage, Message, ToolCall};
use docsmith_core::tool::ToolDefinition;

use crate::gateway::{AgentError, ChatGateway, TokenSink};

const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
const DEFAULT_MODEL: &str = "openai/gpt-4o";
const MAX_TOKENS: u32 = 4096;
const TEMPERATURE: f32 = 0.5;

/// Additional attempts after the first, on 429/5xx/timeout.
const MAX_RETRIES: u32 = 2;
const INITIAL_BACKOFF: Duration = Duration::from_millis(500);

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .connect_timeout(CONNECT_TIMEOUT)
        .build()
        .unwrap_or_else(|error| {
            warn!(%error, "failed to build HTTP client, falling back to defaults");
            reqwest::Client::new()
        })
}

/// A tool-calling model reachable through OpenRouter.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelInfo {
    pub id: String,
    pub name: String,
}

/// OpenRouter gateway adapter. Calls the OpenAI-compatible Chat Completions
/// API with function definitions and maps tool_calls responses back into
/// assistant messages.
pub struct OpenRouterGateway {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenRouterGateway {
    /// Create a new OpenRouterGateway reading configuration from environment variables.
    /// Required: `OPENROUTER_API_KEY`
    /// Optional: `OPENROUTER_BASE_URL` (defaults to https://openrouter.ai/api/v1)
    /// Optional: `OPENROUTER_MODEL` (defaults to openai/gpt-4o)
    pub fn from_env() -> Result<Self, AgentError> {
        let api_key = std::env::var("OPENROUTER_API_KEY")
            .map_err(|_| AgentError::ProviderError("OPENROUTER_API_KEY not set".to_string()))?;

        let base_url =
            std::env::var("OPENROUTER_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        let model =
            std::env::var("OPENROUTER_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        Ok(Self::new(api_key, base_url, model))
    }

    /// Create a new OpenRouterGateway with explicit configuration.
    pub fn new(api_key: String, base_url: String, model: String) -> Self {
        Self {
            client: http_client(),
            api_key,
            base_url,
            model,
        }
    }

    /// Switch the model this gateway sends requests to.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Build the JSON request body for the Chat Completions API.
    pub fn build_request_body(
        &self,
        system_prompt: &str,
        messages: &[Message],
        tools: &[ToolDefinition],
        stream: bool,
    ) -> Value {
        let mut wire_messages = vec![json!({
            "role": "system",
            "content": system_prompt
        })];

        for message in messages {
            match message {
                Message::User { content } => {
                    wire_messages.push(json!({
                        "role": "user",
                        "content": content
                    }));
                }
                Message::Assistant(reply) => {
                    let mut entry = json!({
                        "role": "assistant",
                        "content": reply.content
                    });
                    if !reply.tool_calls.is_empty() {
                        // The wire format carries arguments as a JSON-encoded string.
                        let calls: Vec<Value> = reply
                            .tool_calls
                            .iter()
                            .map(|call| {
                                json!({
                                    "id": call.call_id,
                                    "type": "function",
                                    "function": {
                                        "name": call.name,
                                        "arguments": call.arguments.to_string()
                                    }
                                })
                            })
                            .collect();
                        entry["tool_calls"] = Value::Array(calls);
                    }
                    wire_messages.push(entry);
                }
                Message::Tool(result) => {
                    wire_messages.push(json!({
                        "role": "tool",
                        "tool_call_id": result.call_id,
                        "content": result.content
                    }));
                }
            }
        }

        let mut body = json!({
            "model": self.model,
            "max_tokens": MAX_TOKENS,
            "temperature": TEMPERATURE,
            "messages": wire_messages
        });

        if !tools.is_empty() {
            let wire_tools: Vec<Value> = tools
                .iter()
                .map(|tool| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": tool.name,
                            "description": tool.description,
                            "parameters": tool.parameters
                        }
                    })
                })
                .collect();
            body["tools"] = Value::Array(wire_tools);
            body["tool_choice"] = json!("auto");
        }
        if stream {
            body["stream"] = json!(true);
        }

        body
    }

    /// Parse a Chat Completions response into an assistant message.
    pub fn parse_response(response_body: &Value) -> Result<AssistantMessage, AgentError> {
        let choices = response_body
            .get("choices")
            .and_then(|c| c.as_array())
            .ok_or_else(|| {
                AgentError::InvalidResponse("missing choices array in response".to_string())
            })?;

        let choice = choices
            .first()
            .ok_or_else(|| AgentError::InvalidResponse("empty choices array".to_string()))?;

        let message = choice
            .get("message")
            .ok_or_else(|| AgentError::InvalidResponse("missing message in choice".to_string()))?;

        let content = message
            .get("content")
            .and_then(|c| c.as_str())
            .unwrap_or_default();

        let mut calls = Vec::new();
        if let Some(tool_calls) = message.get("tool_calls").and_then(|t| t.as_array()) {
            for tool_call in tool_calls {
                calls.push(parse_tool_call(tool_call)?);
            }
        }

        if calls.is_empty() {
            Ok(AssistantMessage::text(content))
        } else {
            Ok(AssistantMessage::with_tool_calls(content, calls))
        }
    }

    /// Parse the `/models` listing down to the models that can call tools.
    pub fn parse_model_list(response_body: &Value) -> Vec<ModelInfo> {
        let Some(models) = response_body.get("data").and_then(|d| d.as_array()) else {
            return Vec::new();
        };

        models
            .iter()
            .filter(|model| {
                model
                    .get("supported_parameters")
                    .and_then(|p| p.as_array())
                    .is_some_and(|params| params.iter().any(|p| p.as_str() == Some("tools")))
            })
            .filter_map(|model| {
                let id = model.get("id").and_then(|i| i.as_str())?;
                let name = model.get("name").and_then(|n| n.as_str()).unwrap_or(id);
                Some(ModelInfo {
                    id: id.to_string(),
                    name: name.to_string(),
                })
            })
            .collect()
    }

    /// List the models OpenRouter can route tool-calling requests to.
    pub async fn list_tool_models(&self) -> Result<Vec<ModelInfo>, AgentError> {
        let url = format!("{}/models", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await
            .map_err(|e| AgentError::ProviderError(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(AgentError::ProviderError(format!(
                "API error {}: {}",
                status, error_body
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| AgentError::InvalidResponse(format!("failed to parse JSON: {}", e)))?;
        Ok(Self::parse_model_list(&body))
    }

    /// POST the request body, retrying 429/5xx/timeouts with exponential
    /// backoff, then triage the final status.
    async fn send_with_retry(&self, body: &Value) -> Result<reqwest::Response, AgentError> {
        let url = format!("{}/chat/completions", self.base_url);
        let mut backoff = INITIAL_BACKOFF;
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            let sent = self
                .client
                .post(&url)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("Content-Type", "application/json")
                .json(body)
                .send()
                .await;

            match sent {
                Ok(response) => {
                    let status = response.status();
                    let retryable = status == reqwest::StatusCode::TOO_MANY_REQUESTS
                        || status.is_server_error();
                    if retryable && attempt <= MAX_RETRIES {
                        warn!(attempt, status = %status, "retryable provider status, backing off");
                        tokio::time::sleep(backoff).await;
                        backoff *= 2;
                        continue;
                    }

                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        return Err(AgentError::RateLimited);
                    }
                    if status == reqwest::StatusCode::UNAUTHORIZED {
                        return Err(AgentError::ProviderError(
                            "Unauthorized: check OPENROUTER_API_KEY".to_string(),
                        ));
                    }
                    if status.is_server_error() {
                        return Err(AgentError::ProviderError(format!(
                            "Server error: {}",
                            status
                        )));
                    }
                    if !status.is_success() {
                        let error_body = response.text().await.unwrap_or_default();
                        return Err(AgentError::ProviderError(format!(
                            "API error {}: {}",
                            status, error_body
                        )));
                    }

                    return Ok(response);
                }
                Err(error) if (error.is_timeout() || error.is_connect()) && attempt <= MAX_RETRIES => {
                    warn!(attempt, %error, "provider request failed, backing off");
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
                Err(error) => {
                    return Err(AgentError::ProviderError(format!(
                        "HTTP request failed: {}",
                        error
                    )));
                }
            }
        }
    }
}

/// Parse a single tool_call entry from the response.
fn parse_tool_call(tool_call: &Value) -> Result<ToolCall, AgentError> {
    let function = tool_call
        .get("function")
        .ok_or_else(|| AgentError::InvalidResponse("tool_call missing function".to_string()))?;

    let name = function
        .get("name")
        .and_then(|n| n.as_str())
        .ok_or_else(|| AgentError::InvalidResponse("function missing name".to_string()))?;

    let arguments_str = function
        .get("arguments")
        .and_then(|a| a.as_str())
        .unwrap_or("{}");
    let arguments_str = if arguments_str.trim().is_empty() {
        "{}"
    } else {
        arguments_str
    };

    let arguments: Value = serde_json::from_str(arguments_str).map_err(|e| {
        AgentError::InvalidResponse(format!("failed to parse function arguments: {}", e))
    })?;

    let call_id = tool_call
        .get("id")
        .and_then(|i| i.as_str())
        .map(String::from)
        .unwrap_or_else(|| format!("call_{}", Ulid::new()));

    Ok(ToolCall::new(call_id, name, arguments))
}

/// Accumulates SSE delta events into one complete assistant message.
///
/// Content arrives as `delta.content` tokens; tool calls arrive as
/// `delta.tool_calls` fragments keyed by index, with the id and name on the
/// first fragment and the arguments string split across the rest.
#[derive(Default)]
pub struct StreamAccumulator {
    content: String,
    calls: Vec<PartialCall>,
}

#[derive(Default)]
struct PartialCall {
    id: String,
    name: String,
    arguments: String,
}

impl StreamAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one parsed SSE event in; returns the content token it carried,
    /// if any, for the caller to forward to the renderer.
    pub fn apply(&mut self, event: &Value) -> Option<String> {
        let delta = event.pointer("/choices/0/delta")?;

        if let Some(fragments) = delta.get("tool_calls").and_then(|t| t.as_array()) {
            for fragment in fragments {
                let index = fragment.get("index").and_then(|i| i.as_u64()).unwrap_or(0) as usize;
                while self.calls.len() <= index {
                    self.calls.push(PartialCall::default());
                }
                let slot = &mut self.calls[index];

                if let Some(id) = fragment.get("id").and_then(|i| i.as_str()) {
                    slot.id = id.to_string();
                }
                if let Some(name) = fragment.pointer("/function/name").and_then(|n| n.as_str()) {
                    slot.name.push_str(name);
                }
                if let Some(args) = fragment
                    .pointer("/function/arguments")
                    .and_then(|a| a.as_str())
                {
                    slot.arguments.push_str(args);
                }
            }
        }

        let token = delta.get("content").and_then(|c| c.as_str())?;
        if token.is_empty() {
            return None;
        }
        self.content.push_str(token);
        Some(token.to_string())
    }

    /// Close the stream and produce the final assistant message.
    pub fn finish(self) -> Result<AssistantMessage, AgentError> {
        let mut calls = Vec::with_capacity(self.calls.len());
        for partial in self.calls {
            if partial.name.is_empty() {
                return Err(AgentError::InvalidResponse(
                    "streamed tool_call missing function name".to_string(),
                ));
            }
            let raw = if partial.arguments.trim().is_empty() {
                "{}"
            } else {
                partial.arguments.as_str()
            };
            let arguments: Value = serde_json::from_str(raw).map_err(|e| {
                AgentError::InvalidResponse(format!(
                    "failed to parse streamed function arguments: {}",
                    e
                ))
            })?;
            let call_id = if partial.id.is_empty() {
                format!("call_{}", Ulid::new())
            } else {
                partial.id
            };
            calls.push(ToolCall::new(call_id, partial.name, arguments));
        }

        if calls.is_empty() {
            Ok(AssistantMessage::text(self.content))
        } else {
            Ok(AssistantMessage::with_tool_calls(self.content, calls))
        }
    }
}

#[async_trait]
impl ChatGateway for OpenRouterGateway {
    async fn complete(
        &self,
        system_prompt: &str,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<AssistantMessage, AgentError> {
        let body = self.build_request_body(system_prompt, messages, tools, false);
        let response = self.send_with_retry(&body).await?;

        let response_body: Value = response
            .json()
            .await
            .map_err(|e| AgentError::InvalidResponse(format!("failed to parse JSON: {}", e)))?;

        Self::parse_response(&response_body)
    }

    async fn complete_streaming(
        &self,
        system_prompt: &str,
        messages: &[Message],
        tools: &[ToolDefinition],
        on_token: TokenSink<'_>,
    ) -> Result<AssistantMessage, AgentError> {
        let body = self.build_request_body(system_prompt, messages, tools, true);
        let response = self.send_with_retry(&body).await?;

        let mut accumulator = StreamAccumulator::new();
        let mut stream = response.bytes_stream();
        let mut buffer = String::new();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk
                .map_err(|e| AgentError::ProviderError(format!("stream read failed: {}", e)))?;
            buffer.push_str(&String::from_utf8_lossy(&chunk));

            while let Some(newline) = buffer.find('\n') {
                let line = buffer[..newline].trim().to_string();
                buffer.drain(..=newline);

                let Some(data) = line.strip_prefix("data:") else {
                    continue;
                };
                let data = data.trim();
                if data == "[DONE]" {
                    return accumulator.finish();
                }

                let event: Value = serde_json::from_str(data).map_err(|e| {
                    AgentError::InvalidResponse(format!("failed to parse stream event: {}", e))
                })?;
                if let Some(token) = accumulator.apply(&event) {
                    on_token(&token);
                }
            }
        }

        accumulator.finish()
    }

    fn provider_name(&self) -> &str {
        "openrouter"
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docsmith_core::message::ToolResultMessage;

    fn gateway() -> OpenRouterGateway {
        OpenRouterGateway::new(
            "test-key".to_string(),
            DEFAULT_BASE_URL.to_string(),
            DEFAULT_MODEL.to_string(),
        )
    }

    fn echo_definition() -> ToolDefinition {
        ToolDefinition {
            name: "echo".to_string(),
            description: "Echo the input.".to_string(),
            parameters: json!({"type": "object", "properties": {}}),
        }
    }

    #[test]
    fn gateway_creation() {
        let gateway = gateway();
        assert_eq!(gateway.provider_name(), "openrouter");
        assert_eq!(gateway.model_name(), "openai/gpt-4o");
        assert_eq!(gateway.api_key, "test-key");
        assert_eq!(gateway.base_url, "https://openrouter.ai/api/v1");
    }

    #[test]
    fn request_body_wires_history_and_tools() {
        let gateway = gateway();
        let messages = vec![
            Message::user("How do I connect?"),
            Message::assistant(AssistantMessage::with_tool_calls(
                "",
                vec![ToolCall::new(
                    "call_1",
                    "echo",
                    json!({"message": "hello"}),
                )],
            )),
            Message::tool_result(ToolResultMessage::success("call_1", "echo", "hello")),
        ];

        let body =
            gateway.build_request_body("You are helpful.", &messages, &[echo_definition()], false);

        assert_eq!(body["model"], "openai/gpt-4o");
        assert_eq!(body["tool_choice"], "auto");
        assert!(body.get("stream").is_none());

        let wire = body["messages"].as_array().expect("messages");
        assert_eq!(wire.len(), 4);
        assert_eq!(wire[0]["role"], "system");
        assert_eq!(wire[0]["content"], "You are helpful.");
        assert_eq!(wire[1]["role"], "user");

        // Assistant tool calls carry arguments as a JSON-encoded string.
        assert_eq!(wire[2]["role"], "assistant");
        let call = &wire[2]["tool_calls"][0];
        assert_eq!(call["id"], "call_1");
        assert_eq!(call["type"], "function");
        assert_eq!(call["function"]["name"], "echo");
        assert_eq!(call["function"]["arguments"], r#"{"message":"hello"}"#);

        assert_eq!(wire[3]["role"], "tool");
        assert_eq!(wire[3]["tool_call_id"], "call_1");
        assert_eq!(wire[3]["content"], "hello");

        let tools = body["tools"].as_array().expect("tools");
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0]["type"], "function");
        assert_eq!(tools[0]["function"]["name"], "echo");
    }

    #[test]
    fn request_body_without_tools_omits_tool_choice() {
        let gateway = gateway();
        let body = gateway.build_request_body("sys", &[Message::user("hi")], &[], true);

        assert!(body.get("tools").is_none());
        assert!(body.get("tool_choice").is_none());
        assert_eq!(body["stream"], true);
    }

    #[test]
    fn parses_text_response() {
        let response = json!({
            "id": "gen-123",
            "choices": [
                {
                    "index": 0,
                    "message": {
                        "role": "assistant",
                        "content": "Use connect() to open a session."
                    },
                    "finish_reason": "stop"
                }
            ]
        });

        let reply = OpenRouterGateway::parse_response(&response).expect("parse");
        assert!(reply.is_final());
        assert_eq!(reply.content, "Use connect() to open a session.");
    }

    #[test]
    fn parses_multiple_tool_calls() {
        let response = json!({
            "choices": [
                {
                    "message": {
                        "role": "assistant",
                        "content": null,
                        "tool_calls": [
                            {
                                "id": "call_a",
                                "type": "function",
                                "function": {
                                    "name": "alpha_expert",
                                    "arguments": "{\"query\": \"connect\"}"
                                }
                            },
                            {
                                "type": "function",
                                "function": {
                                    "name": "beta_expert",
                                    "arguments": ""
                                }
                            }
                        ]
                    },
                    "finish_reason": "tool_calls"
                }
            ]
        });

        let reply = OpenRouterGateway::parse_response(&response).expect("parse");
        assert_eq!(reply.content, "");
        assert_eq!(reply.tool_calls.len(), 2);
        assert_eq!(reply.tool_calls[0].call_id, "call_a");
        assert_eq!(reply.tool_calls[0].arguments["query"], "connect");

        // Missing id gets a generated one; empty arguments become {}.
        assert!(reply.tool_calls[1].call_id.starts_with("call_"));
        assert_eq!(reply.tool_calls[1].arguments, json!({}));
    }

    #[test]
    fn rejects_unparseable_arguments() {
        let response = json!({
            "choices": [
                {
                    "message": {
                        "role": "assistant",
                        "content": null,
                        "tool_calls": [
                            {
                                "id": "call_bad",
                                "type": "function",
                                "function": {
                                    "name": "echo",
                                    "arguments": "{not json"
                                }
                            }
                        ]
                    }
                }
            ]
        });

        let result = OpenRouterGateway::parse_response(&response);
        assert!(matches!(result, Err(AgentError::InvalidResponse(_))));
    }

    #[test]
    fn rejects_response_without_choices() {
        let result = OpenRouterGateway::parse_response(&json!({"error": "nope"}));
        assert!(matches!(result, Err(AgentError::InvalidResponse(_))));
    }

    #[test]
    fn accumulator_rebuilds_streamed_content_and_tool_calls() {
        let mut accumulator = StreamAccumulator::new();

        let token = accumulator.apply(&json!({
            "choices": [{"delta": {"content": "Check"}}]
        }));
        assert_eq!(token.as_deref(), Some("Check"));

        let token = accumulator.apply(&json!({
            "choices": [{"delta": {"content": "ing."}}]
        }));
        assert_eq!(token.as_deref(), Some("ing."));

        // Tool call fragments: id and name first, arguments split after.
        assert!(
            accumulator
                .apply(&json!({
                    "choices": [{"delta": {"tool_calls": [
                        {"index": 0, "id": "call_s", "function": {"name": "retrieve_docs", "arguments": ""}}
                    ]}}]
                }))
                .is_none()
        );
        accumulator.apply(&json!({
            "choices": [{"delta": {"tool_calls": [
                {"index": 0, "function": {"arguments": "{\"query\":"}}
            ]}}]
        }));
        accumulator.apply(&json!({
            "choices": [{"delta": {"tool_calls": [
                {"index": 0, "function": {"arguments": " \"connect\"}"}}
            ]}}]
        }));

        let reply = accumulator.finish().expect("finish");
        assert_eq!(reply.content, "Checking.");
        assert_eq!(reply.tool_calls.len(), 1);
        assert_eq!(reply.tool_calls[0].call_id, "call_s");
        assert_eq!(reply.tool_calls[0].name, "retrieve_docs");
        assert_eq!(reply.tool_calls[0].arguments["query"], "connect");
    }

    #[test]
    fn accumulator_rejects_nameless_streamed_call() {
        let mut accumulator = StreamAccumulator::new();
        accumulator.apply(&json!({
            "choices": [{"delta": {"tool_calls": [
                {"index": 0, "id": "call_x", "function": {"arguments": "{}"}}
            ]}}]
        }));
        assert!(accumulator.finish().is_err());
    }

    #[test]
    fn model_list_keeps_only_tool_capable_models() {
        let body = json!({
            "data": [
                {
                    "id": "openai/gpt-4o",
                    "name": "OpenAI: GPT-4o",
                    "supported_parameters": ["tools", "temperature"]
                },
                {
                    "id": "acme/no-tools",
                    "name": "No Tools",
                    "supported_parameters": ["temperature"]
                },
                {
                    "id": "acme/bare"
                }
            ]
        });

        let models = OpenRouterGateway::parse_model_list(&body);
        assert_eq!(
            models,
            vec![ModelInfo {
                id: "openai/gpt-4o".to_string(),
                name: "OpenAI: GPT-4o".to_string(),
            }]
        );
    }

    #[test]
    fn model_list_without_data_is_empty() {
        assert!(OpenRouterGateway::parse_model_list(&json!({})).is_empty());
    }

    #[tokio::test]
    #[cfg(feature = "live-test")]
    async fn openrouter_adapter_basic() {
        let gateway = OpenRouterGateway::from_env().expect("OPENROUTER_API_KEY must be set");
        let result = gateway
            .complete("You are terse.", &[Message::user("Say hi in one word.")], &[])
            .await;
        assert!(result.is_ok(), "live test failed: {:?}", result.err());
    }
}
