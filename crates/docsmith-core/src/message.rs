// ABOUTME: Defines the conversation message types exchanged between agent loops and the model.
// ABOUTME: A history is an ordered sequence of user, assistant, and tool-result messages.

use serde::{Deserialize, Serialize};

/// A single tool invocation requested by the model.
///
/// The call identifier is unique within one assistant message and is echoed
/// back on the matching tool-result message for correlation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub call_id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

impl ToolCall {
    pub fn new(
        call_id: impl Into<String>,
        name: impl Into<String>,
        arguments: serde_json::Value,
    ) -> Self {
        Self {
            call_id: call_id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// The model's reply for one think step: answer text plus any requested tool calls.
///
/// An assistant message with zero tool calls is a terminal answer for its loop.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssistantMessage {
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
}

impl AssistantMessage {
    /// A plain text reply with no tool calls.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    /// A reply requesting one or more tool invocations.
    pub fn with_tool_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            content: content.into(),
            tool_calls,
        }
    }

    /// True when this message carries no tool calls and therefore ends the loop.
    pub fn is_final(&self) -> bool {
        self.tool_calls.is_empty()
    }
}

/// Outcome of one tool call, correlated back to its originating call by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResultMessage {
    pub call_id: String,
    pub tool_name: String,
    pub content: String,
    #[serde(default)]
    pub is_error: bool,
}

impl ToolResultMessage {
    pub fn success(
        call_id: impl Into<String>,
        tool_name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            call_id: call_id.into(),
            tool_name: tool_name.into(),
            content: content.into(),
            is_error: false,
        }
    }

    pub fn error(
        call_id: impl Into<String>,
        tool_name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            call_id: call_id.into(),
            tool_name: tool_name.into(),
            content: content.into(),
            is_error: true,
        }
    }
}

/// One entry in a conversation history owned by a single agent loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Message {
    User { content: String },
    Assistant(AssistantMessage),
    Tool(ToolResultMessage),
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Message::User {
            content: content.into(),
        }
    }

    pub fn assistant(reply: AssistantMessage) -> Self {
        Message::Assistant(reply)
    }

    pub fn tool_result(result: ToolResultMessage) -> Self {
        Message::Tool(result)
    }

    /// Wire-level role name, used for logging and provider payloads.
    pub fn role(&self) -> &'static str {
        match self {
            Message::User { .. } => "user",
            Message::Assistant(_) => "assistant",
            Message::Tool(_) => "tool",
        }
    }

    /// Visible text content of this message.
    pub fn content(&self) -> &str {
        match self {
            Message::User { content } => content,
            Message::Assistant(reply) => &reply.content,
            Message::Tool(result) => &result.content,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn message_roles_serialize_with_role_tag() {
        let user = Message::user("hello");
        let json = serde_json::to_value(&user).expect("serialize user");
        assert_eq!(json["role"], "user");
        assert_eq!(json["content"], "hello");

        let assistant = Message::assistant(AssistantMessage::text("hi there"));
        let json = serde_json::to_value(&assistant).expect("serialize assistant");
        assert_eq!(json["role"], "assistant");
        // No tool calls means the field is omitted entirely.
        assert!(json.get("tool_calls").is_none());

        let tool = Message::tool_result(ToolResultMessage::success("call_1", "read_file", "ok"));
        let json = serde_json::to_value(&tool).expect("serialize tool");
        assert_eq!(json["role"], "tool");
        assert_eq!(json["call_id"], "call_1");
    }

    #[test]
    fn message_round_trips_through_json() {
        let original = Message::assistant(AssistantMessage::with_tool_calls(
            "checking the docs",
            vec![ToolCall::new(
                "call_7",
                "retrieve_docs",
                json!({"query": "connect"}),
            )],
        ));
        let text = serde_json::to_string(&original).expect("serialize");
        let restored: Message = serde_json::from_str(&text).expect("deserialize");
        assert_eq!(original, restored);
    }

    #[test]
    fn assistant_without_tool_calls_is_final() {
        assert!(AssistantMessage::text("done").is_final());

        let calling = AssistantMessage::with_tool_calls(
            "",
            vec![ToolCall::new("call_1", "find_file", json!({"file_name": "main.rs"}))],
        );
        assert!(!calling.is_final());
    }

    #[test]
    fn tool_result_constructors_set_error_flag() {
        let ok = ToolResultMessage::success("c1", "read_file", "contents");
        assert!(!ok.is_error);

        let failed = ToolResultMessage::error("c2", "read_file", "Error: no such file");
        assert!(failed.is_error);
        assert_eq!(failed.call_id, "c2");
    }
}
