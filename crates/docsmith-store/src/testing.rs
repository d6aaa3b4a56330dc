// ABOUTME: In-memory test doubles for the documentation store, catalog, and embedder.
// ABOUTME: Used by unit and smoke tests to drive agent loops without any network access.

use async_trait::async_trait;

use docsmith_core::catalog::{PackageCatalog, PackageRecord};

use crate::chunk::DocChunk;
use crate::store::{DocStore, StoreError};

/// In-memory documentation store ranking chunks by cosine similarity.
///
/// Populate it before sharing: `insert` takes `&mut self`, so all rows are
/// loaded up front and the store is immutable once wrapped in an `Arc`.
#[derive(Default)]
pub struct MemoryDocStore {
    rows: Vec<(DocChunk, Vec<f32>)>,
}

impl MemoryDocStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, chunk: DocChunk, embedding: Vec<f32>) {
        self.rows.push((chunk, embedding));
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl DocStore for MemoryDocStore {
    async fn match_chunks(
        &self,
        query_embedding: &[f32],
        package: &str,
        limit: usize,
    ) -> Result<Vec<DocChunk>, StoreError> {
        let mut scored: Vec<(f32, &DocChunk)> = self
            .rows
            .iter()
            .filter(|(chunk, _)| chunk.source == package)
            .map(|(chunk, embedding)| (cosine_similarity(query_embedding, embedding), chunk))
            .collect();

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        Ok(scored
            .into_iter()
            .take(limit)
            .map(|(_, chunk)| chunk.clone())
            .collect())
    }

    async fn list_urls(&self, package: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .rows
            .iter()
            .filter(|(chunk, _)| chunk.source == package)
            .map(|(chunk, _)| chunk.url.clone())
            .collect())
    }

    async fn page_chunks(&self, url: &str, package: &str) -> Result<Vec<DocChunk>, StoreError> {
        Ok(self
            .rows
            .iter()
            .filter(|(chunk, _)| chunk.source == package && chunk.url == url)
            .map(|(chunk, _)| chunk.clone())
            .collect())
    }
}

/// Fixed catalog returning the packages it was constructed with.
pub struct StaticCatalog {
    packages: Vec<PackageRecord>,
}

impl StaticCatalog {
    pub fn new(packages: Vec<PackageRecord>) -> Self {
        Self { packages }
    }
}

#[async_trait]
impl PackageCatalog for StaticCatalog {
    async fn list_packages(&self) -> Vec<PackageRecord> {
        self.packages.clone()
    }
}

/// Deterministic offline embedder: folds the text's bytes into a small vector.
///
/// Identical texts embed identically, so tests index a chunk under
/// `embedder.embed(text)` and query with the same text for an exact match.
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(16)
    }
}

#[async_trait]
impl crate::embedding::Embedder for HashEmbedder {
    async fn embed(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        for (i, byte) in text.bytes().enumerate() {
            vector[i % self.dimension] += byte as f32;
        }
        vector
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
