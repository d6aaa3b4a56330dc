// ABOUTME: Storage library for docsmith: documentation store, embeddings, and catalog adapters.
// ABOUTME: Provides the Supabase-backed production adapters and in-memory test doubles.

pub mod chunk;
pub mod embedding;
pub mod store;
pub mod supabase;
pub mod testing;

pub use chunk::DocChunk;
pub use embedding::{Embedder, OpenAiEmbedder, EMBEDDING_DIMENSION};
pub use store::{DocStore, StoreError};
pub use supabase::SupabaseClient;
