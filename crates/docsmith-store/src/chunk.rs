// ABOUTME: Defines the DocChunk row type shared by every documentation store adapter.
// ABOUTME: A page is stored as numbered chunks; `source` names the owning package.

use serde::{Deserialize, Serialize};

/// One indexed chunk of documentation content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocChunk {
    pub title: String,
    pub content: String,
    pub url: String,
    pub chunk_number: i64,
    /// Package identifier this chunk belongs to.
    #[serde(default)]
    pub source: String,
}

impl DocChunk {
    pub fn new(
        title: impl Into<String>,
        content: impl Into<String>,
        url: impl Into<String>,
        chunk_number: i64,
        source: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            url: url.into(),
            chunk_number,
            source: source.into(),
        }
    }
}
