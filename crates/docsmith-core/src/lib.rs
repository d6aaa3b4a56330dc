// ABOUTME: Core library for docsmith, containing the shared conversation data model.
// ABOUTME: Defines messages, tool calls, the Tool trait, and package catalog types.

pub mod catalog;
pub mod message;
pub mod tool;

pub use catalog::{PackageCatalog, PackageRecord};
pub use message::{AssistantMessage, Message, ToolCall, ToolResultMessage};
pub use tool::{Tool, ToolDefinition, ToolOutput};
