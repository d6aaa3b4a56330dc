// ABOUTME: Agent engine for docsmith, orchestrating supervisor and expert loops.
// ABOUTME: Defines the gateway trait, tool registry, executor, and the step-budgeted loop.

pub mod agent_loop;
pub mod executor;
pub mod experts;
pub mod gateway;
pub mod prompts;
pub mod providers;
pub mod registry;
pub mod testing;
pub mod tools;

pub use agent_loop::{AgentLoop, DEFAULT_STEP_BUDGET, LoopOutcome, STEP_LIMIT_ANSWER};
pub use experts::{ExpertDeps, ExpertTool, build_expert_tools, build_supervisor_tools};
pub use gateway::{AgentError, ChatGateway, TokenSink};
pub use prompts::SUPERVISOR_SYSTEM_PROMPT;
pub use providers::{ModelInfo, OpenRouterGateway};
pub use registry::ToolRegistry;
