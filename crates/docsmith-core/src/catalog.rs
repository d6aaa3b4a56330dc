// ABOUTME: Defines the package catalog types naming the documentation corpora available.
// ABOUTME: Catalog failures degrade to an empty list so expert tools quietly disappear.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One documentation corpus available for expert consultation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageRecord {
    /// Identifier used to scope retrieval, e.g. "pydantic_ai".
    pub package_name: String,
    /// Human-facing name, e.g. "Pydantic AI".
    pub display_name: String,
    pub description: String,
}

impl PackageRecord {
    pub fn new(
        package_name: impl Into<String>,
        display_name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            package_name: package_name.into(),
            display_name: display_name.into(),
            description: description.into(),
        }
    }
}

/// Source of the packages that can be equipped as experts.
///
/// Listing is infallible by contract: adapters log and return an empty list on
/// failure, which disables expert tools for the turn without ending the
/// conversation.
#[async_trait]
pub trait PackageCatalog: Send + Sync {
    async fn list_packages(&self) -> Vec<PackageRecord>;
}
