// ABOUTME: OpenAI embeddings adapter used to vectorize retrieval queries.
// ABOUTME: Failures degrade to a zero vector so similarity search returns no match instead of crashing.

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::store::StoreError;
use crate::supabase::http_client;

/// Dimension of the stored document embeddings.
pub const EMBEDDING_DIMENSION: usize = 1536;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "text-embedding-3-small";

/// Turns query text into the vector space the documentation store is indexed in.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed one query string. Never fails: adapters degrade to the zero
    /// vector, which similarity search treats as matching nothing relevant.
    async fn embed(&self, text: &str) -> Vec<f32>;

    fn dimension(&self) -> usize {
        EMBEDDING_DIMENSION
    }
}

/// OpenAI embeddings client.
pub struct OpenAiEmbedder {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiEmbedder {
    /// Create a new OpenAiEmbedder reading configuration from environment variables.
    /// Required: `OPENAI_API_KEY`
    /// Optional: `OPENAI_EMBEDDING_BASE_URL` (defaults to https://api.openai.com/v1)
    /// Optional: `OPENAI_EMBEDDING_MODEL` (defaults to text-embedding-3-small)
    pub fn from_env() -> Result<Self, StoreError> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| StoreError::Request("OPENAI_API_KEY not set".to_string()))?;

        let base_url = std::env::var("OPENAI_EMBEDDING_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        let model =
            std::env::var("OPENAI_EMBEDDING_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        Ok(Self::new(api_key, base_url, model))
    }

    /// Create a new OpenAiEmbedder with explicit configuration.
    pub fn new(api_key: String, base_url: String, model: String) -> Self {
        Self {
            client: http_client(),
            api_key,
            base_url,
            model,
        }
    }

    /// Parse an embeddings API response into a vector.
    pub fn parse_response(body: &Value) -> Result<Vec<f32>, StoreError> {
        let values = body
            .pointer("/data/0/embedding")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                StoreError::InvalidPayload("missing data[0].embedding in response".to_string())
            })?;

        Ok(values
            .iter()
            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
            .collect())
    }

    async fn request_embedding(&self, text: &str) -> Result<Vec<f32>, StoreError> {
        let url = format!("{}/embeddings", self.base_url.trim_end_matches('/'));
        let body = json!({
            "model": self.model,
            "input": text,
        });

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| StoreError::Request(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Request(format!(
                "Embeddings API error {}: {}",
                status, body
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| StoreError::InvalidPayload(format!("failed to parse JSON: {}", e)))?;

        Self::parse_response(&body)
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Vec<f32> {
        match self.request_embedding(text).await {
            Ok(embedding) => embedding,
            Err(error) => {
                tracing::warn!(%error, "embedding request failed, using zero vector");
                vec![0.0; EMBEDDING_DIMENSION]
            }
        }
    }
}
