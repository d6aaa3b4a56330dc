// ABOUTME: Dispatches the tool calls from one assistant message and collects their results.
// ABOUTME: Failures become error-text results tagged with the call id; one call never sinks the others.

use std::time::Instant;

use futures::future::join_all;
use tracing::{debug, warn};

use docsmith_core::message::{ToolCall, ToolResultMessage};

use crate::registry::ToolRegistry;

/// Execute every pending call concurrently, yielding exactly one result per
/// call. Each result carries its originating call id for correlation; errors
/// are rendered as text the model can read and react to.
pub async fn dispatch(registry: &ToolRegistry, calls: &[ToolCall]) -> Vec<ToolResultMessage> {
    join_all(calls.iter().map(|call| run_call(registry, call))).await
}

async fn run_call(registry: &ToolRegistry, call: &ToolCall) -> ToolResultMessage {
    let Some(tool) = registry.get(&call.name) else {
        warn!(tool = %call.name, call_id = %call.call_id, "model requested unknown tool");
        return ToolResultMessage::error(
            &call.call_id,
            &call.name,
            format!("Unknown tool: {}", call.name),
        );
    };

    let started = Instant::now();
    match tool.execute(call.arguments.clone()).await {
        Ok(output) => {
            debug!(
                tool = %call.name,
                call_id = %call.call_id,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "tool call completed"
            );
            ToolResultMessage::success(&call.call_id, &call.name, output.content)
        }
        Err(error) => {
            warn!(tool = %call.name, call_id = %call.call_id, %error, "tool call failed");
            ToolResultMessage::error(
                &call.call_id,
                &call.name,
                format!("Error executing {}: {}", call.name, error),
            )
        }
    }
}
