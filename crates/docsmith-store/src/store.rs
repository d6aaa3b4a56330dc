// ABOUTME: Defines the DocStore trait consumed by the retrieval tools.
// ABOUTME: Covers similarity search plus exact-match listing and page fetch by package.

use async_trait::async_trait;

use crate::chunk::DocChunk;

/// Failures talking to the documentation store or the embedding service.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store request failed: {0}")]
    Request(String),
    #[error("Store returned an unexpected payload: {0}")]
    InvalidPayload(String),
}

/// Read-only access to package-scoped documentation chunks.
///
/// All operations are scoped by the `source` column so one store serves many
/// packages. Callers own ordering and deduplication of the returned rows.
#[async_trait]
pub trait DocStore: Send + Sync {
    /// Top-`limit` chunks most similar to the query embedding within one package.
    async fn match_chunks(
        &self,
        query_embedding: &[f32],
        package: &str,
        limit: usize,
    ) -> Result<Vec<DocChunk>, StoreError>;

    /// Page URLs indexed for the package, one entry per stored chunk.
    async fn list_urls(&self, package: &str) -> Result<Vec<String>, StoreError>;

    /// Every chunk of one page within the package.
    async fn page_chunks(&self, url: &str, package: &str) -> Result<Vec<DocChunk>, StoreError>;
}
