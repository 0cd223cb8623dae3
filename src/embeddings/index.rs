//! Flat in-memory nearest-neighbour index over retrieval documents

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use super::Embedder;
use crate::errors::LabRagError;
use crate::errors::Result;
use crate::projection::RetrievalDocument;

/// Distance used to rank documents; smaller is closer for both
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// Squared Euclidean distance
    #[default]
    L2,
    /// One minus cosine similarity
    Cosine,
}

impl DistanceMetric {
    #[must_use]
    pub fn distance(self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            Self::L2 => a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum(),
            Self::Cosine => 1.0 - cosine_similarity(a, b),
        }
    }
}

impl FromStr for DistanceMetric {
    type Err = LabRagError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "l2" => Ok(Self::L2),
            "cosine" => Ok(Self::Cosine),
            other => Err(LabRagError::InvalidInput(format!(
                "Unknown distance metric '{other}', expected l2 or cosine"
            ))),
        }
    }
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::L2 => write!(f, "l2"),
            Self::Cosine => write!(f, "cosine"),
        }
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// One search result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexHit {
    pub document: RetrievalDocument,
    pub distance: f32,
}

struct Entry {
    document: RetrievalDocument,
    vector: Vec<f32>,
}

/// Documents paired with their embeddings, searched exhaustively
pub struct VectorIndex {
    entries: Vec<Entry>,
    dimension: usize,
    metric: DistanceMetric,
}

impl VectorIndex {
    /// Index documents whose vectors are already known
    pub fn from_embeddings(
        documents: Vec<RetrievalDocument>,
        vectors: Vec<Vec<f32>>,
        metric: DistanceMetric,
    ) -> Result<Self> {
        if documents.len() != vectors.len() {
            return Err(LabRagError::EmbeddingError(format!(
                "Got {} embeddings for {} documents",
                vectors.len(),
                documents.len()
            )));
        }

        let dimension = vectors.first().map_or(0, Vec::len);
        if let Some(bad) = vectors.iter().find(|v| v.len() != dimension) {
            return Err(LabRagError::EmbeddingError(format!(
                "Inconsistent embedding dimensions: {dimension} and {}",
                bad.len()
            )));
        }
        if !vectors.is_empty() && dimension == 0 {
            return Err(LabRagError::EmbeddingError(
                "Embeddings must not be empty".to_string(),
            ));
        }

        let entries = documents
            .into_iter()
            .zip(vectors)
            .map(|(document, vector)| Entry { document, vector })
            .collect::<Vec<_>>();
        debug!(
            "Indexed {} documents ({} dimensions, {})",
            entries.len(),
            dimension,
            metric
        );

        Ok(Self {
            entries,
            dimension,
            metric,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub const fn dimension(&self) -> usize {
        self.dimension
    }

    pub const fn metric(&self) -> DistanceMetric {
        self.metric
    }

    /// The `k` nearest documents, closest first
    ///
    /// `k` is clamped to the number of documents. Equal distances keep
    /// insertion order.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<IndexHit>> {
        if self.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if query.len() != self.dimension {
            return Err(LabRagError::EmbeddingError(format!(
                "Query dimension {} does not match index dimension {}",
                query.len(),
                self.dimension
            )));
        }

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, entry)| (i, self.metric.distance(query, &entry.vector)))
            .collect();
        // Stable sort, so ties stay in insertion order
        scored.sort_by(|a, b| a.1.total_cmp(&b.1));

        Ok(scored
            .into_iter()
            .take(k.min(self.entries.len()))
            .map(|(i, distance)| IndexHit {
                document: self.entries[i].document.clone(),
                distance,
            })
            .collect())
    }

    /// Embed `query` and search with it
    pub async fn search_text(
        &self,
        embedder: &dyn Embedder,
        query: &str,
        k: usize,
    ) -> Result<Vec<IndexHit>> {
        if self.is_empty() {
            return Ok(Vec::new());
        }
        let vector = embedder.embed(query).await?;
        self.search(&vector, k)
    }
}
