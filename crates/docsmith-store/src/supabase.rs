// ABOUTME: Supabase adapter implementing the DocStore and PackageCatalog traits over PostgREST.
// ABOUTME: Similarity search goes through the match_site_pages RPC; listings query site_pages rows.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use docsmith_core::catalog::{PackageCatalog, PackageRecord};

use crate::chunk::DocChunk;
use crate::store::{DocStore, StoreError};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const MATCH_RPC: &str = "match_site_pages";

/// Build a reqwest client with sane timeouts, falling back to the default
/// client if the builder cannot be constructed.
pub(crate) fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .connect_timeout(CONNECT_TIMEOUT)
        .build()
        .unwrap_or_else(|error| {
            tracing::warn!(%error, "falling back to default HTTP client");
            reqwest::Client::new()
        })
}

/// Supabase PostgREST client. One instance serves both the documentation
/// store and the package catalog, shared across loops behind an `Arc`.
pub struct SupabaseClient {
    client: reqwest::Client,
    base_url: String,
    service_key: String,
}

impl SupabaseClient {
    /// Create a new SupabaseClient reading configuration from environment variables.
    /// Required: `SUPABASE_URL`, `SUPABASE_SERVICE_KEY`
    pub fn from_env() -> Result<Self, StoreError> {
        let base_url = std::env::var("SUPABASE_URL")
            .map_err(|_| StoreError::Request("SUPABASE_URL not set".to_string()))?;
        let service_key = std::env::var("SUPABASE_SERVICE_KEY")
            .map_err(|_| StoreError::Request("SUPABASE_SERVICE_KEY not set".to_string()))?;

        Ok(Self::new(base_url, service_key))
    }

    /// Create a new SupabaseClient with explicit configuration.
    pub fn new(base_url: String, service_key: String) -> Self {
        Self {
            client: http_client(),
            base_url,
            service_key,
        }
    }

    fn rest_url(&self, path: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url.trim_end_matches('/'), path)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("apikey", &self.service_key)
            .header("Authorization", format!("Bearer {}", self.service_key))
    }

    async fn read_rows(&self, response: reqwest::Response) -> Result<Value, StoreError> {
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Request(format!(
                "Supabase error {}: {}",
                status, body
            )));
        }

        response
            .json()
            .await
            .map_err(|e| StoreError::InvalidPayload(format!("failed to parse JSON: {}", e)))
    }

    /// Parse similarity-search rows returned by the match RPC.
    pub fn parse_match_rows(rows: &Value) -> Result<Vec<DocChunk>, StoreError> {
        let rows = rows
            .as_array()
            .ok_or_else(|| StoreError::InvalidPayload("expected an array of rows".to_string()))?;

        let mut chunks = Vec::with_capacity(rows.len());
        for row in rows {
            chunks.push(DocChunk {
                title: string_field(row, "title"),
                content: string_field(row, "content"),
                url: string_field(row, "url"),
                chunk_number: row.get("chunk_number").and_then(Value::as_i64).unwrap_or(0),
                source: row
                    .pointer("/metadata/source")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            });
        }
        Ok(chunks)
    }

    /// Parse catalog rows from the `packages` table into domain records.
    /// The table's `package` column is the human display name.
    pub fn parse_package_rows(rows: &Value) -> Result<Vec<PackageRecord>, StoreError> {
        let rows = rows
            .as_array()
            .ok_or_else(|| StoreError::InvalidPayload("expected an array of rows".to_string()))?;

        let mut packages = Vec::with_capacity(rows.len());
        for row in rows {
            let package_name = string_field(row, "package_name");
            if package_name.is_empty() {
                continue;
            }
            packages.push(PackageRecord {
                package_name,
                display_name: string_field(row, "package"),
                description: string_field(row, "description"),
            });
        }
        Ok(packages)
    }
}

fn string_field(row: &Value, key: &str) -> String {
    row.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

#[async_trait]
impl DocStore for SupabaseClient {
    async fn match_chunks(
        &self,
        query_embedding: &[f32],
        package: &str,
        limit: usize,
    ) -> Result<Vec<DocChunk>, StoreError> {
        let body = json!({
            "query_embedding": query_embedding,
            "match_count": limit,
            "filter": { "source": package }
        });

        let response = self
            .authorize(self.client.post(self.rest_url(&format!("rpc/{}", MATCH_RPC))))
            .json(&body)
            .send()
            .await
            .map_err(|e| StoreError::Request(format!("HTTP request failed: {}", e)))?;

        let rows = self.read_rows(response).await?;
        Self::parse_match_rows(&rows)
    }

    async fn list_urls(&self, package: &str) -> Result<Vec<String>, StoreError> {
        let response = self
            .authorize(self.client.get(self.rest_url("site_pages")))
            .query(&[
                ("select", "url"),
                ("metadata->>source", &format!("eq.{}", package)),
            ])
            .send()
            .await
            .map_err(|e| StoreError::Request(format!("HTTP request failed: {}", e)))?;

        let rows = self.read_rows(response).await?;
        let rows = rows
            .as_array()
            .ok_or_else(|| StoreError::InvalidPayload("expected an array of rows".to_string()))?;

        Ok(rows
            .iter()
            .map(|row| string_field(row, "url"))
            .filter(|url| !url.is_empty())
            .collect())
    }

    async fn page_chunks(&self, url: &str, package: &str) -> Result<Vec<DocChunk>, StoreError> {
        let response = self
            .authorize(self.client.get(self.rest_url("site_pages")))
            .query(&[
                ("select", "title,content,chunk_number"),
                ("url", &format!("eq.{}", url)),
                ("metadata->>source", &format!("eq.{}", package)),
                ("order", "chunk_number.asc"),
            ])
            .send()
            .await
            .map_err(|e| StoreError::Request(format!("HTTP request failed: {}", e)))?;

        let rows = self.read_rows(response).await?;
        let rows = rows
            .as_array()
            .ok_or_else(|| StoreError::InvalidPayload("expected an array of rows".to_string()))?;

        Ok(rows
            .iter()
            .map(|row| DocChunk {
                title: string_field(row, "title"),
                content: string_field(row, "content"),
                url: url.to_string(),
                chunk_number: row.get("chunk_number").and_then(Value::as_i64).unwrap_or(0),
                source: package.to_string(),
            })
            .collect())
    }
}

#[async_trait]
impl PackageCatalog for SupabaseClient {
    async fn list_packages(&self) -> Vec<PackageRecord> {
        let result = async {
            let response = self
                .authorize(self.client.get(self.rest_url("packages")))
                .query(&[("select", "*")])
                .send()
                .await
                .map_err(|e| StoreError::Request(format!("HTTP request failed: {}", e)))?;

            let rows = self.read_rows(response).await?;
            Self::parse_package_rows(&rows)
        }
        .await;

        match result {
            Ok(packages) => packages,
            Err(error) => {
                tracing::warn!(%error, "package catalog unavailable, continuing with none");
                Vec::new()
            }
        }
    }
}
