// ABOUTME: Documentation retrieval tools equipped on expert loops.
// ABOUTME: Each tool is bound to one package at construction; callers only ever supply a query.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};

use docsmith_core::tool::{Tool, ToolOutput};
use docsmith_store::chunk::DocChunk;
use docsmith_store::embedding::Embedder;
use docsmith_store::store::DocStore;

/// How many chunks a similarity search returns.
pub const MATCH_COUNT: usize = 5;

/// Sentinel answer when a search matches nothing. Distinguishable from an
/// error by the model: retrieval worked, the docs just have nothing relevant.
pub const NO_DOCS_FOUND: &str = "No relevant documentation found.";

/// Render matched chunks as titled sections separated by a rule.
pub fn format_chunks(chunks: &[DocChunk]) -> String {
    chunks
        .iter()
        .map(|chunk| format!("# {}\n\n{}", chunk.title, chunk.content))
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}

/// Sort URLs and drop duplicates; many chunks share one page URL.
pub fn sorted_unique_urls(mut urls: Vec<String>) -> Vec<String> {
    urls.sort();
    urls.dedup();
    urls
}

/// Join one page's chunks in sequence order under a derived page title.
/// Stored titles look like "Page Title - Section"; the page title is the part
/// before the first " - ".
pub fn assemble_page(mut chunks: Vec<DocChunk>) -> String {
    chunks.sort_by_key(|chunk| chunk.chunk_number);

    let page_title = chunks
        .first()
        .map(|chunk| chunk.title.split(" - ").next().unwrap_or(&chunk.title))
        .unwrap_or_default();

    let mut parts = vec![format!("# {}\n", page_title)];
    parts.extend(chunks.into_iter().map(|chunk| chunk.content));
    parts.join("\n\n")
}

/// Similarity search over one package's documentation.
pub struct RetrieveDocsTool {
    package: String,
    store: Arc<dyn DocStore>,
    embedder: Arc<dyn Embedder>,
}

impl RetrieveDocsTool {
    pub fn new(
        package: impl Into<String>,
        store: Arc<dyn DocStore>,
        embedder: Arc<dyn Embedder>,
    ) -> Self {
        Self {
            package: package.into(),
            store,
            embedder,
        }
    }
}

#[async_trait]
impl Tool for RetrieveDocsTool {
    fn name(&self) -> &str {
        "retrieve_docs"
    }

    fn description(&self) -> &str {
        "Retrieve documentation passages relevant to the query. Returns the best matching \
         chunks as titled sections."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "What to look up in the documentation."
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, params: Value) -> Result<ToolOutput, anyhow::Error> {
        let Some(query) = params.get("query").and_then(Value::as_str) else {
            anyhow::bail!("query parameter is required");
        };

        let embedding = self.embedder.embed(query).await;
        let chunks = self
            .store
            .match_chunks(&embedding, &self.package, MATCH_COUNT)
            .await?;

        if chunks.is_empty() {
            return Ok(ToolOutput::text(NO_DOCS_FOUND));
        }
        Ok(ToolOutput::text(format_chunks(&chunks)))
    }
}

/// Lists the documentation page URLs indexed for one package.
pub struct ListPagesTool {
    package: String,
    store: Arc<dyn DocStore>,
}

impl ListPagesTool {
    pub fn new(package: impl Into<String>, store: Arc<dyn DocStore>) -> Self {
        Self {
            package: package.into(),
            store,
        }
    }
}

#[async_trait]
impl Tool for ListPagesTool {
    fn name(&self) -> &str {
        "list_doc_pages"
    }

    fn description(&self) -> &str {
        "List the URLs of every documentation page indexed for this package."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {},
            "required": []
        })
    }

    async fn execute(&self, _params: Value) -> Result<ToolOutput, anyhow::Error> {
        let urls = sorted_unique_urls(self.store.list_urls(&self.package).await?);

        if urls.is_empty() {
            return Ok(ToolOutput::text(
                "No documentation pages indexed for this package.",
            ));
        }
        Ok(ToolOutput::text(urls.join("\n")))
    }
}

/// Fetches the full content of one documentation page by URL.
pub struct GetPageTool {
    package: String,
    store: Arc<dyn DocStore>,
}

impl GetPageTool {
    pub fn new(package: impl Into<String>, store: Arc<dyn DocStore>) -> Self {
        Self {
            package: package.into(),
            store,
        }
    }
}

#[async_trait]
impl Tool for GetPageTool {
    fn name(&self) -> &str {
        "get_doc_page"
    }

    fn description(&self) -> &str {
        "Fetch the full content of one documentation page by its URL, assembled from its \
         stored chunks."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "url": {
                    "type": "string",
                    "description": "Exact URL of the page, as returned by list_doc_pages."
                }
            },
            "required": ["url"]
        })
    }

    async fn execute(&self, params: Value) -> Result<ToolOutput, anyhow::Error> {
        let Some(url) = params.get("url").and_then(Value::as_str) else {
            anyhow::bail!("url parameter is required");
        };

        let chunks = self.store.page_chunks(url, &self.package).await?;

        if chunks.is_empty() {
            return Ok(ToolOutput::text(format!("No content found for URL: {}", url)));
        }
        Ok(ToolOutput::text(assemble_page(chunks)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docsmith_store::testing::{HashEmbedder, MemoryDocStore};

    fn chunk(title: &str, content: &str, url: &str, number: i64) -> DocChunk {
        DocChunk::new(title, content, url, number, "alpha")
    }

    async fn alpha_fixture() -> (Arc<MemoryDocStore>, Arc<HashEmbedder>) {
        let embedder = HashEmbedder::default();
        let mut store = MemoryDocStore::new();

        let rows = vec![
            chunk(
                "Alpha - Connecting",
                "connect() opens a session to the Alpha service.",
                "https://alpha.dev/connecting",
                0,
            ),
            chunk(
                "Alpha - Connecting",
                "Sessions are closed with close().",
                "https://alpha.dev/connecting",
                1,
            ),
            chunk(
                "Alpha - Errors",
                "All failures surface as AlphaError.",
                "https://alpha.dev/errors",
                0,
            ),
        ];
        for row in rows {
            // Index each chunk under its own content so querying with the
            // same text is an exact hit.
            let embedding = embedder.embed(&row.content).await;
            store.insert(row, embedding);
        }

        (Arc::new(store), Arc::new(embedder))
    }

    #[tokio::test]
    async fn retrieve_formats_matches_as_titled_sections() {
        let (store, embedder) = alpha_fixture().await;
        let tool = RetrieveDocsTool::new("alpha", store, embedder);

        let output = tool
            .execute(json!({"query": "connect() opens a session to the Alpha service."}))
            .await
            .expect("execute");

        assert!(output.content.starts_with("# Alpha - Connecting"));
        assert!(output.content.contains("connect() opens a session"));
        assert!(output.content.contains("\n\n---\n\n"));
    }

    #[tokio::test]
    async fn retrieve_returns_sentinel_for_unknown_package() {
        let (store, embedder) = alpha_fixture().await;
        let tool = RetrieveDocsTool::new("nonexistent_package", store, embedder);

        let output = tool
            .execute(json!({"query": "obscure nonsense query"}))
            .await
            .expect("execute");

        assert_eq!(output.content, NO_DOCS_FOUND);
    }

    #[tokio::test]
    async fn retrieve_without_query_is_an_error() {
        let (store, embedder) = alpha_fixture().await;
        let tool = RetrieveDocsTool::new("alpha", store, embedder);

        let result = tool.execute(json!({})).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn list_pages_sorts_and_deduplicates() {
        let (store, _) = alpha_fixture().await;
        let tool = ListPagesTool::new("alpha", store);

        let output = tool.execute(json!({})).await.expect("execute");

        // Two chunks share the connecting URL; it appears once, sorted first.
        assert_eq!(
            output.content,
            "https://alpha.dev/connecting\nhttps://alpha.dev/errors"
        );
    }

    #[tokio::test]
    async fn list_pages_for_empty_package_is_a_notice_not_an_error() {
        let (store, _) = alpha_fixture().await;
        let tool = ListPagesTool::new("beta", store);

        let output = tool.execute(json!({})).await.expect("execute");
        assert_eq!(
            output.content,
            "No documentation pages indexed for this package."
        );
    }

    #[tokio::test]
    async fn get_page_joins_chunks_in_sequence_under_page_title() {
        let (store, _) = alpha_fixture().await;
        let tool = GetPageTool::new("alpha", store);

        let output = tool
            .execute(json!({"url": "https://alpha.dev/connecting"}))
            .await
            .expect("execute");

        // Derived page title strips the " - Section" suffix.
        assert!(output.content.starts_with("# Alpha\n"));
        let connect = output.content.find("connect()").expect("first chunk");
        let close = output.content.find("close()").expect("second chunk");
        assert!(connect < close, "chunks must appear in sequence order");
    }

    #[tokio::test]
    async fn get_page_for_unknown_url_returns_not_found_sentinel() {
        let (store, _) = alpha_fixture().await;
        let tool = GetPageTool::new("alpha", store);

        let output = tool
            .execute(json!({"url": "https://alpha.dev/missing"}))
            .await
            .expect("execute");

        assert_eq!(
            output.content,
            "No content found for URL: https://alpha.dev/missing"
        );
    }

    #[test]
    fn assemble_page_orders_out_of_order_chunks() {
        let page = assemble_page(vec![
            chunk("Alpha - Guide", "second part", "https://alpha.dev/guide", 1),
            chunk("Alpha - Guide", "first part", "https://alpha.dev/guide", 0),
        ]);
        assert_eq!(page, "# Alpha\n\n\nfirst part\n\nsecond part");
    }

    #[test]
    fn format_chunks_renders_each_title_once() {
        let rendered = format_chunks(&[
            chunk("Alpha - One", "a", "u1", 0),
            chunk("Alpha - Two", "b", "u2", 0),
        ]);
        assert_eq!(rendered, "# Alpha - One\n\na\n\n---\n\n# Alpha - Two\n\nb");
    }
}
