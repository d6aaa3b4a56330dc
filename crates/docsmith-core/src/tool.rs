// ABOUTME: Defines the Tool trait implemented by every action the model can invoke.
// ABOUTME: Tools own the data they are parameterized with rather than capturing ambient state.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Declared schema for one tool, in the shape providers bind per request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Successful output of a tool invocation, always rendered as text for the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    pub content: String,
}

impl ToolOutput {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

/// An invocable action exposed to the model.
///
/// Implementations are immutable once constructed: anything a tool needs at
/// execution time (a package name, a store handle, a project root) is owned by
/// the value itself and never supplied by the caller. Expected failures that
/// the model should see (missing files, empty search results) are returned as
/// `Ok` text; `Err` is reserved for failures worth surfacing as an error
/// result by the executor.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON schema for the tool's arguments.
    fn schema(&self) -> Value;

    async fn execute(&self, params: Value) -> Result<ToolOutput, anyhow::Error>;

    /// The declared form of this tool, bound into model requests.
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.schema(),
        }
    }
}
