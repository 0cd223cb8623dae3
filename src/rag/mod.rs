//! Retrieval-augmented analysis of blood-test reports
//!
//! One analysis run goes through these steps:
//! - fetch the selected reports from the store
//! - project them into text and embed them
//! - index the vectors and retrieve the nearest ones for the question
//! - hand the retrieved lines to the chat model
//!
//! # Examples
//!
//! ```rust,no_run
//! use labrag::config::AppConfig;
//! use labrag::rag::AnalysisOutcome;
//! use labrag::rag::AnalysisRequest;
//! use labrag::rag::AnalysisService;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load()?;
//!     let service = AnalysisService::from_config(&config)?;
//!
//!     match service.analyze(AnalysisRequest::all()).await? {
//!         AnalysisOutcome::NoRecords => println!("No records found"),
//!         AnalysisOutcome::Answered(response) => println!("{}", response.answer),
//!     }
//!
//!     Ok(())
//! }
//! ```

use std::fmt;

use serde::Serialize;

pub mod context;
pub mod pipeline;

pub use context::AssembledContext;
pub use context::ContextAssembler;
pub use pipeline::AnalysisOutcome;
pub use pipeline::AnalysisRequest;
pub use pipeline::AnalysisResponse;
pub use pipeline::AnalysisScope;
pub use pipeline::AnalysisService;
pub use pipeline::AnalysisSettings;

/// Where an analysis run currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStage {
    Idle,
    FetchingRecords,
    Projecting,
    Embedding,
    Indexing,
    Retrieving,
    Generating,
    Answered,
    Failed,
}

impl AnalysisStage {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Answered | Self::Failed)
    }
}

impl fmt::Display for AnalysisStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::FetchingRecords => "fetching records",
            Self::Projecting => "projecting",
            Self::Embedding => "embedding",
            Self::Indexing => "indexing",
            Self::Retrieving => "retrieving",
            Self::Generating => "generating",
            Self::Answered => "answered",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// A report line that was handed to the model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievedSource {
    pub report_id: i64,
    pub text: String,
    /// Distance to the question; absent in summary mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f32>,
}
