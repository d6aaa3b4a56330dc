// ABOUTME: Builds the supervisor's tool set and the per-package expert tools.
// ABOUTME: An expert tool owns its PackageRecord and runs a fresh nested loop per invocation.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::{debug, warn};

use docsmith_core::catalog::PackageRecord;
use docsmith_core::message::Message;
use docsmith_core::tool::{Tool, ToolOutput};
use docsmith_store::embedding::Embedder;
use docsmith_store::store::DocStore;

use crate::agent_loop::AgentLoop;
use crate::gateway::ChatGateway;
use crate::prompts::expert_system_prompt;
use crate::registry::ToolRegistry;
use crate::tools::{
    FindFileTool, GetPageTool, ListPagesTool, ProjectStructureTool, ReadFileTool,
    RetrieveDocsTool,
};

/// Shared collaborators handed to every expert loop.
///
/// Owned by the top-level orchestrator and cloned into each tool; the handles
/// are `Arc`s, so clones share the underlying gateway, store, and embedder.
#[derive(Clone)]
pub struct ExpertDeps {
    pub gateway: Arc<dyn ChatGateway>,
    pub store: Arc<dyn DocStore>,
    pub embedder: Arc<dyn Embedder>,
    /// Step budget for each nested expert loop.
    pub step_budget: usize,
}

/// The retrieval tools one expert loop is equipped with, all bound to a
/// single package. Built fresh for every expert invocation.
pub fn build_expert_tools(package_name: &str, deps: &ExpertDeps) -> ToolRegistry {
    let mut tools = ToolRegistry::new();
    tools.register(Arc::new(RetrieveDocsTool::new(
        package_name,
        Arc::clone(&deps.store),
        Arc::clone(&deps.embedder),
    )));
    tools.register(Arc::new(ListPagesTool::new(
        package_name,
        Arc::clone(&deps.store),
    )));
    tools.register(Arc::new(GetPageTool::new(
        package_name,
        Arc::clone(&deps.store),
    )));
    tools
}

/// A tool that answers documentation questions about one package by running
/// a nested agent loop equipped with that package's retrieval tools.
pub struct ExpertTool {
    record: PackageRecord,
    tool_name: String,
    description: String,
    deps: ExpertDeps,
}

impl ExpertTool {
    pub fn new(record: PackageRecord, deps: ExpertDeps) -> Self {
        let tool_name = format!("{}_expert", record.package_name);
        let description = format!(
            "Get information from the documentation of the {} Python package.\n\n\
             Here's a quick description of the package: {}\n\n\
             Use the query to explain what information is needed from the documentation.",
            record.display_name, record.description,
        );
        Self {
            record,
            tool_name,
            description,
            deps,
        }
    }

    pub fn package_name(&self) -> &str {
        &self.record.package_name
    }
}

#[async_trait]
impl Tool for ExpertTool {
    fn name(&self) -> &str {
        &self.tool_name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "What information is needed from this package's documentation."
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, params: Value) -> Result<ToolOutput, anyhow::Error> {
        let Some(query) = params.get("query").and_then(Value::as_str) else {
            anyhow::bail!("query parameter is required");
        };

        debug!(
            expert = self.tool_name.as_str(),
            package = self.record.package_name.as_str(),
            "running expert loop"
        );

        // A fresh loop per call: no history or tool state survives between
        // invocations of the same expert.
        let expert = AgentLoop::new(
            self.tool_name.clone(),
            expert_system_prompt(&self.record),
            Arc::clone(&self.deps.gateway),
            build_expert_tools(&self.record.package_name, &self.deps),
        )
        .with_step_budget(self.deps.step_budget);

        let outcome = expert.run(vec![Message::user(query)]).await?;
        Ok(ToolOutput::text(outcome.answer))
    }
}

/// Assemble the supervisor's tool set for one turn.
///
/// Experts appear in catalog order, filtered to `enabled`; the generic
/// project tools are always appended last. Enabled names missing from the
/// catalog are skipped with a warning. Callers rebuild this whenever the
/// enabled set changes, so a turn never sees a stale tool list.
pub fn build_supervisor_tools(
    catalog: &[PackageRecord],
    enabled: &[String],
    deps: &ExpertDeps,
    project_root: &Path,
) -> ToolRegistry {
    let mut tools = ToolRegistry::new();

    for record in catalog {
        if enabled.iter().any(|name| name == &record.package_name) {
            tools.register(Arc::new(ExpertTool::new(record.clone(), deps.clone())));
        }
    }
    for name in enabled {
        if !catalog.iter().any(|record| &record.package_name == name) {
            warn!(package = name.as_str(), "enabled package not in catalog, skipping");
        }
    }

    tools.register(Arc::new(ProjectStructureTool::new(project_root)));
    tools.register(Arc::new(ReadFileTool::new(project_root)));
    tools.register(Arc::new(FindFileTool::new(project_root)));
    tools
}

#[cfg(test)]
mod tests {
    use super::*;
    use docsmith_core::message::{AssistantMessage, ToolCall};
    use docsmith_store::chunk::DocChunk;
    use docsmith_store::testing::{HashEmbedder, MemoryDocStore};

    use crate::testing::ScriptedGateway;
    use crate::tools::retrieval::NO_DOCS_FOUND;

    fn alpha_record() -> PackageRecord {
        PackageRecord::new("alpha", "Alpha", "Client library for the Alpha service")
    }

    async fn deps_with_alpha_docs(
        replies: Vec<AssistantMessage>,
    ) -> (ExpertDeps, Arc<ScriptedGateway>) {
        let embedder = HashEmbedder::default();
        let mut store = MemoryDocStore::new();
        let chunk = DocChunk::new(
            "Alpha - Connecting",
            "connect() opens a session to the Alpha service.",
            "https://alpha.dev/connecting",
            0,
            "alpha",
        );
        let embedding = embedder.embed(&chunk.content).await;
        store.insert(chunk, embedding);

        let gateway = Arc::new(ScriptedGateway::new(replies));
        let deps = ExpertDeps {
            gateway: Arc::clone(&gateway) as Arc<dyn ChatGateway>,
            store: Arc::new(store),
            embedder: Arc::new(embedder),
            step_budget: 4,
        };
        (deps, gateway)
    }

    #[test]
    fn expert_tool_is_named_after_the_package() {
        let gateway = Arc::new(ScriptedGateway::new(vec![]));
        let deps = ExpertDeps {
            gateway,
            store: Arc::new(MemoryDocStore::new()),
            embedder: Arc::new(HashEmbedder::default()),
            step_budget: 4,
        };
        let tool = ExpertTool::new(alpha_record(), deps);

        assert_eq!(tool.name(), "alpha_expert");
        assert!(tool.description().contains("Alpha"));
        assert_eq!(tool.schema()["required"][0], "query");
    }

    #[tokio::test]
    async fn expert_runs_nested_loop_and_returns_its_final_text() {
        let (deps, gateway) = deps_with_alpha_docs(vec![
            AssistantMessage::with_tool_calls(
                "",
                vec![ToolCall::new(
                    "call_1",
                    "retrieve_docs",
                    json!({"query": "connect() opens a session to the Alpha service."}),
                )],
            ),
            AssistantMessage::text("Use connect() to open a session."),
        ])
        .await;
        let tool = ExpertTool::new(alpha_record(), deps);

        let output = tool
            .execute(json!({"query": "How do I connect?"}))
            .await
            .expect("execute");
        assert_eq!(output.content, "Use connect() to open a session.");

        // The nested loop was equipped with exactly the retrieval tools.
        let requests = gateway.requests().await;
        assert_eq!(requests.len(), 2);
        assert_eq!(
            requests[0].tool_names,
            vec!["retrieve_docs", "list_doc_pages", "get_doc_page"]
        );
        // And the retrieval result was fed back before the final answer.
        assert!(
            requests[1]
                .messages
                .iter()
                .any(|m| matches!(m, Message::Tool(r) if r.content.contains("connect()")))
        );
    }

    #[tokio::test]
    async fn expert_searches_its_own_package_regardless_of_query_text() {
        // The scripted model asks about "beta", but this expert was built
        // for alpha: the search stays scoped to alpha's docs and misses.
        let (deps, gateway) = deps_with_alpha_docs(vec![
            AssistantMessage::with_tool_calls(
                "",
                vec![ToolCall::new(
                    "call_1",
                    "retrieve_docs",
                    json!({"query": "beta beta beta"}),
                )],
            ),
            AssistantMessage::text("Nothing found."),
        ])
        .await;
        let tool = ExpertTool::new(alpha_record(), deps);

        tool.execute(json!({"query": "tell me about beta"}))
            .await
            .expect("execute");

        let requests = gateway.requests().await;
        assert!(
            requests[1]
                .messages
                .iter()
                .any(|m| matches!(m, Message::Tool(r) if r.content == NO_DOCS_FOUND))
        );
        // The expert's schema has no package parameter to override.
        let tool2 = ExpertTool::new(alpha_record(), ExpertDeps {
            gateway: Arc::new(ScriptedGateway::new(vec![])),
            store: Arc::new(MemoryDocStore::new()),
            embedder: Arc::new(HashEmbedder::default()),
            step_budget: 1,
        });
        assert!(tool2.schema()["properties"].get("package").is_none());
    }

    #[tokio::test]
    async fn expert_propagates_gateway_failure_as_error() {
        let (deps, _gateway) = deps_with_alpha_docs(vec![]).await;
        let tool = ExpertTool::new(alpha_record(), deps);

        let result = tool.execute(json!({"query": "anything"})).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn supervisor_tools_follow_catalog_order_then_generics() {
        let (deps, _gateway) = deps_with_alpha_docs(vec![]).await;
        let catalog = vec![
            alpha_record(),
            PackageRecord::new("beta", "Beta", "Beta toolkit"),
        ];

        let one = build_supervisor_tools(
            &catalog,
            &["alpha".to_string()],
            &deps,
            Path::new("."),
        );
        assert_eq!(
            one.names(),
            vec!["alpha_expert", "project_structure", "read_file", "find_file"]
        );

        let both = build_supervisor_tools(
            &catalog,
            &["beta".to_string(), "alpha".to_string()],
            &deps,
            Path::new("."),
        );
        assert_eq!(
            both.names(),
            vec![
                "alpha_expert",
                "beta_expert",
                "project_structure",
                "read_file",
                "find_file"
            ]
        );
    }

    #[tokio::test]
    async fn unknown_enabled_package_is_skipped() {
        let (deps, _gateway) = deps_with_alpha_docs(vec![]).await;
        let catalog = vec![alpha_record()];

        let tools = build_supervisor_tools(
            &catalog,
            &["alpha".to_string(), "gamma".to_string()],
            &deps,
            Path::new("."),
        );
        assert_eq!(
            tools.names(),
            vec!["alpha_expert", "project_structure", "read_file", "find_file"]
        );
    }
}
