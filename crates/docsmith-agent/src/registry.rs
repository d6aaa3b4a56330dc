// ABOUTME: Ordered collection of the tools equipped on one agent loop.
// ABOUTME: Lookup is by name; registration order is preserved so tool lists are deterministic.

use std::sync::Arc;

use docsmith_core::tool::{Tool, ToolDefinition};

/// The tools equipped on one agent loop, in registration order.
///
/// Order matters: the supervisor registry lists expert tools in catalog order
/// followed by the generic tools, and the same inputs always produce the same
/// list.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.push(tool);
    }

    /// Find a tool by its declared name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|tool| tool.name() == name)
    }

    /// Declared schemas for every registered tool, bound into model requests.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|tool| tool.definition()).collect()
    }

    /// Registered tool names, in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|tool| tool.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
