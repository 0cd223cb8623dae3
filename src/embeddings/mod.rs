//! Embeddings and the in-memory vector index
//!
//! Vectors come from one of the supported providers:
//! - OpenAI (text-embedding-3-small, text-embedding-ada-002, ...)
//! - Groq and other OpenAI-compatible endpoints
//! - Ollama (local models)
//!
//! The index is rebuilt for every analysis run and never persisted.
//!
//! # Examples
//!
//! ```rust,no_run
//! use labrag::config::AppConfig;
//! use labrag::embeddings::DistanceMetric;
//! use labrag::embeddings::Embedder;
//! use labrag::embeddings::EmbeddingClient;
//! use labrag::embeddings::VectorIndex;
//! use labrag::projection::RetrievalDocument;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load()?;
//!     let client = EmbeddingClient::from_config(&config)?;
//!     let documents: Vec<RetrievalDocument> = Vec::new();
//!
//!     let texts: Vec<String> = documents.iter().map(|d| d.text.clone()).collect();
//!     let vectors = client.embed_batch(&texts).await?;
//!     let index = VectorIndex::from_embeddings(documents, vectors, DistanceMetric::L2)?;
//!     let hits = index.search_text(&client, "high glucose", 6).await?;
//!     println!("{} matching reports", hits.len());
//!
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;

pub mod client;
pub mod index;

pub use client::EmbeddingClient;
pub use client::EmbeddingProvider;
pub use index::DistanceMetric;
pub use index::IndexHit;
pub use index::VectorIndex;

use crate::errors::Result;

/// Maximum number of inputs sent in one batch request
pub const MAX_BATCH_SIZE: usize = 100;

/// Turns text into vectors
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed several texts; the output order matches the input order
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }
}
