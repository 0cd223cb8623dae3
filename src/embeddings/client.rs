//! Embedding API clients for the supported providers

use std::time::Duration;

use async_trait::async_trait;
use futures::stream;
use futures::stream::StreamExt;
use reqwest::Client;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use super::Embedder;
use super::MAX_BATCH_SIZE;
use crate::config::resolve_api_key;
use crate::config::AppConfig;
use crate::config::EmbeddingsConfig;
use crate::errors::LabRagError;
use crate::errors::Result;

/// Supported embedding providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// `OpenAI` embeddings API
    #[serde(rename = "openai")]
    OpenAI,
    /// Groq, spoken to through its OpenAI-compatible endpoint
    Groq,
    /// Ollama local embeddings
    Ollama,
}

impl EmbeddingProvider {
    const fn needs_api_key(self) -> bool {
        matches!(self, Self::OpenAI | Self::Groq)
    }
}

impl std::fmt::Display for EmbeddingProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OpenAI => write!(f, "openai"),
            Self::Groq => write!(f, "groq"),
            Self::Ollama => write!(f, "ollama"),
        }
    }
}

/// Client for generating embeddings from the configured provider
pub struct EmbeddingClient {
    provider: EmbeddingProvider,
    model: String,
    endpoint: String,
    api_key: Option<String>,
    dimension: Option<usize>,
    concurrency: usize,
    client: Client,
}

impl EmbeddingClient {
    /// Create a new embedding client
    ///
    /// # Errors
    /// - HTTP client build errors
    /// - Missing API key for a hosted provider
    pub fn new(config: &EmbeddingsConfig) -> Result<Self> {
        let api_key = resolve_api_key(config.api_key.as_deref(), config.api_key_env.as_deref());
        if config.provider.needs_api_key() && api_key.is_none() {
            return Err(LabRagError::ConfigError(format!(
                "{} embeddings need embeddings.api_key or embeddings.api_key_env",
                config.provider
            )));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .pool_idle_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| LabRagError::HttpError(e.to_string()))?;

        Ok(Self {
            provider: config.provider,
            model: config.model.clone(),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key,
            dimension: config.dimension,
            concurrency: config.concurrency.max(1),
            client,
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::new(&config.embeddings)
    }

    pub const fn provider(&self) -> EmbeddingProvider {
        self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Generate embedding for a single text
    pub async fn generate(&self, text: &str) -> Result<Vec<f32>> {
        let embedding = match self.provider {
            EmbeddingProvider::OpenAI | EmbeddingProvider::Groq => {
                let mut batch = self.generate_batch_openai(&[text]).await?;
                batch
                    .pop()
                    .ok_or_else(|| LabRagError::EmbeddingError("No embedding in response".to_string()))?
            }
            EmbeddingProvider::Ollama => self.generate_ollama(text).await?,
        };
        self.check_dimension(&embedding)?;
        Ok(embedding)
    }

    /// Generate embeddings for multiple texts, keeping input order
    pub async fn generate_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let embeddings = match self.provider {
            EmbeddingProvider::OpenAI | EmbeddingProvider::Groq => {
                let mut embeddings = Vec::with_capacity(texts.len());
                for chunk in texts.chunks(MAX_BATCH_SIZE) {
                    let inputs: Vec<&str> = chunk.iter().map(String::as_str).collect();
                    let vectors = self.generate_batch_openai(&inputs).await?;
                    if vectors.len() != inputs.len() {
                        return Err(LabRagError::EmbeddingError(format!(
                            "Expected {} embeddings, got {}",
                            inputs.len(),
                            vectors.len()
                        )));
                    }
                    embeddings.extend(vectors);
                }
                embeddings
            }
            EmbeddingProvider::Ollama => {
                // No batch endpoint; `buffered` keeps the results in input order
                let requests: Vec<_> = texts.iter().map(|text| self.generate_ollama(text)).collect();
                let results: Vec<Result<Vec<f32>>> = stream::iter(requests)
                    .buffered(self.concurrency)
                    .collect()
                    .await;
                results.into_iter().collect::<Result<Vec<_>>>()?
            }
        };

        for embedding in &embeddings {
            self.check_dimension(embedding)?;
        }
        Ok(embeddings)
    }

    fn check_dimension(&self, embedding: &[f32]) -> Result<()> {
        match self.dimension {
            Some(expected) if expected != embedding.len() => Err(LabRagError::EmbeddingError(
                format!(
                    "Embedding dimension mismatch: expected {expected}, got {}",
                    embedding.len()
                ),
            )),
            _ => Ok(()),
        }
    }

    /// Call an OpenAI-compatible `/embeddings` endpoint
    async fn generate_batch_openai(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| LabRagError::ConfigError("Embedding API key not provided".to_string()))?;

        #[derive(Serialize)]
        struct EmbeddingRequest<'a> {
            input: &'a [&'a str],
            model: &'a str,
        }

        #[derive(Deserialize)]
        struct EmbeddingResponse {
            data: Vec<EmbeddingData>,
        }

        #[derive(Deserialize)]
        struct EmbeddingData {
            #[serde(default)]
            index: Option<usize>,
            embedding: Vec<f32>,
        }

        let url = format!("{}/embeddings", self.endpoint);
        debug!("Calling {} embeddings API: {} items", self.provider, texts.len());

        let request = EmbeddingRequest {
            input: texts,
            model: &self.model,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| LabRagError::HttpError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(LabRagError::EmbeddingError(format!(
                "{} API error ({status}): {error_text}",
                self.provider
            )));
        }

        let mut result: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| LabRagError::EmbeddingError(format!("Failed to parse response: {e}")))?;

        // Servers may reorder entries; `index` restores the request order
        result.data.sort_by_key(|d| d.index.unwrap_or(0));
        Ok(result.data.into_iter().map(|d| d.embedding).collect())
    }

    /// Generate embedding using Ollama API
    async fn generate_ollama(&self, text: &str) -> Result<Vec<f32>> {
        #[derive(Serialize)]
        struct OllamaRequest<'a> {
            model: &'a str,
            prompt: &'a str,
        }

        #[derive(Deserialize)]
        struct OllamaResponse {
            embedding: Vec<f32>,
        }

        let url = format!("{}/api/embeddings", self.endpoint);
        debug!("Calling Ollama embeddings API: {}", url);

        let request = OllamaRequest {
            model: &self.model,
            prompt: text,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| LabRagError::HttpError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(LabRagError::EmbeddingError(format!(
                "Ollama API error ({status}): {error_text}"
            )));
        }

        let result: OllamaResponse = response
            .json()
            .await
            .map_err(|e| LabRagError::EmbeddingError(format!("Failed to parse response: {e}")))?;

        if result.embedding.is_empty() {
            return Err(LabRagError::EmbeddingError(
                "Ollama returned an empty embedding".to_string(),
            ));
        }
        Ok(result.embedding)
    }
}

#[async_trait]
impl Embedder for EmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.generate(text).await
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.generate_batch(texts).await
    }
}
