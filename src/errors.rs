use thiserror::Error;

use crate::rag::AnalysisStage;

#[derive(Error, Debug)]
pub enum LabRagError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Report not found: id {0}")]
    NotFound(i64),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("HTTP error: {0}")]
    HttpError(String),

    #[error("Embedding error: {0}")]
    EmbeddingError(String),

    #[error("LLM error: {0}")]
    LlmError(String),

    #[error("Analysis failed while {stage}: {source}")]
    Pipeline {
        stage: AnalysisStage,
        #[source]
        source: Box<LabRagError>,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Custom(String),
}

impl LabRagError {
    /// Attach the analysis stage at which this error happened
    #[must_use]
    pub fn at_stage(self, stage: AnalysisStage) -> Self {
        match self {
            // Keep the innermost stage
            already @ Self::Pipeline { .. } => already,
            other => Self::Pipeline {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// Unwrap pipeline context and return the underlying error
    #[must_use]
    pub fn root(&self) -> &Self {
        match self {
            Self::Pipeline { source, .. } => source.root(),
            other => other,
        }
    }

    /// Store or model backend unreachable, misauthenticated or misbehaving
    #[must_use]
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self.root(),
            Self::Database(_) | Self::HttpError(_) | Self::EmbeddingError(_) | Self::LlmError(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, LabRagError>;
