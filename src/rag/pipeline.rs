//! Analysis pipeline: Fetch -> Project -> Embed -> Index -> Retrieve -> Generate

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;
use tracing::info;
use tracing::warn;

use super::AnalysisStage;
use super::ContextAssembler;
use super::RetrievedSource;
use crate::config::AppConfig;
use crate::database::RecordStore;
use crate::database::ReportQuery;
use crate::database::ReportSource;
use crate::embeddings::DistanceMetric;
use crate::embeddings::Embedder;
use crate::embeddings::EmbeddingClient;
use crate::embeddings::VectorIndex;
use crate::errors::LabRagError;
use crate::errors::Result;
use crate::llm::prompts;
use crate::llm::GenerationClient;
use crate::llm::GenerationParams;
use crate::llm::LlmClient;
use crate::models::Report;
use crate::projection::project_all;
use crate::projection::project_timeline;

/// Tunables for analysis runs
#[derive(Debug, Clone)]
pub struct AnalysisSettings {
    pub top_k: usize,
    pub metric: DistanceMetric,
    pub max_context_chars: usize,
    pub summary_limit: usize,
    pub system_prompt: String,
    pub summary_prompt: String,
}

impl AnalysisSettings {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            top_k: config.retrieval.top_k,
            metric: config.retrieval.metric,
            max_context_chars: config.retrieval.max_context_chars,
            summary_limit: config.retrieval.summary_limit,
            ..Self::default()
        }
    }
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            top_k: 6,
            metric: DistanceMetric::L2,
            max_context_chars: 4000,
            summary_limit: 5,
            system_prompt: prompts::ANALYSIS_SYSTEM_PROMPT.to_string(),
            summary_prompt: prompts::SUMMARY_SYSTEM_PROMPT.to_string(),
        }
    }
}

/// Which reports an analysis looks at
#[derive(Debug, Clone)]
pub enum AnalysisScope {
    /// Every stored report
    All,
    /// Reports matching a query
    Filtered(ReportQuery),
    /// Reports the caller already holds, such as the last search result
    Provided(Vec<Report>),
}

#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub scope: AnalysisScope,
    /// Falls back to the default analysis question when absent or blank
    pub question: Option<String>,
    /// Falls back to the configured `top_k`
    pub top_k: Option<usize>,
}

impl AnalysisRequest {
    #[must_use]
    pub const fn new(scope: AnalysisScope) -> Self {
        Self {
            scope,
            question: None,
            top_k: None,
        }
    }

    #[must_use]
    pub const fn all() -> Self {
        Self::new(AnalysisScope::All)
    }

    #[must_use]
    pub const fn filtered(query: ReportQuery) -> Self {
        Self::new(AnalysisScope::Filtered(query))
    }

    #[must_use]
    pub const fn provided(reports: Vec<Report>) -> Self {
        Self::new(AnalysisScope::Provided(reports))
    }

    #[must_use]
    pub fn with_question(mut self, question: impl Into<String>) -> Self {
        self.question = Some(question.into());
        self
    }

    #[must_use]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = Some(top_k);
        self
    }
}

/// Result of one analysis run
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AnalysisOutcome {
    /// Nothing matched; no model was called
    NoRecords,
    Answered(AnalysisResponse),
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResponse {
    pub question: String,
    pub answer: String,
    pub sources: Vec<RetrievedSource>,
    /// Number of reports the run started from
    pub considered: usize,
}

impl AnalysisResponse {
    /// Get a formatted string representation
    #[must_use]
    pub fn format(&self) -> String {
        let mut output = String::new();
        output.push_str(&format!("Question: {}\n\n", self.question));
        output.push_str(&format!("Answer:\n{}\n\n", self.answer));
        output.push_str(&format!(
            "Sources ({} of {} reports):\n",
            self.sources.len(),
            self.considered
        ));

        for (idx, source) in self.sources.iter().enumerate() {
            match source.distance {
                Some(distance) => output.push_str(&format!(
                    "  {}. #{} (distance {:.4}) {}\n",
                    idx + 1,
                    source.report_id,
                    distance,
                    source.text
                )),
                None => output.push_str(&format!(
                    "  {}. #{} {}\n",
                    idx + 1,
                    source.report_id,
                    source.text
                )),
            }
        }

        output
    }
}

/// Logs stage transitions and tags failures with the stage they happened in
struct StageTracker {
    stage: AnalysisStage,
}

impl StageTracker {
    const fn start() -> Self {
        Self {
            stage: AnalysisStage::Idle,
        }
    }

    fn enter(&mut self, next: AnalysisStage) {
        debug!("Analysis stage: {} -> {}", self.stage, next);
        self.stage = next;
    }

    fn fail(&self, error: LabRagError) -> LabRagError {
        warn!(
            "Analysis stage: {} -> {} ({})",
            self.stage,
            AnalysisStage::Failed,
            error
        );
        error.at_stage(self.stage)
    }

    fn finish(&mut self) {
        self.enter(AnalysisStage::Answered);
    }
}

/// Runs analyses over stored reports
pub struct AnalysisService {
    source: Arc<dyn ReportSource>,
    embedder: Arc<dyn Embedder>,
    generator: GenerationClient,
    assembler: ContextAssembler,
    settings: AnalysisSettings,
}

impl AnalysisService {
    #[must_use]
    pub fn new(
        source: Arc<dyn ReportSource>,
        embedder: Arc<dyn Embedder>,
        generator: GenerationClient,
        settings: AnalysisSettings,
    ) -> Self {
        Self {
            source,
            embedder,
            generator,
            assembler: ContextAssembler::new(settings.max_context_chars),
            settings,
        }
    }

    /// Wire the store and both HTTP clients from configuration
    ///
    /// # Errors
    /// - Invalid database settings
    /// - Missing API keys for hosted providers
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let store = Arc::new(RecordStore::from_config(config)?);
        Self::with_source(config, store)
    }

    /// Like `from_config`, reusing an existing report source
    pub fn with_source(config: &AppConfig, source: Arc<dyn ReportSource>) -> Result<Self> {
        let embedder = Arc::new(EmbeddingClient::from_config(config)?);
        let chat = Arc::new(LlmClient::from_config(config)?);
        let generator = GenerationClient::new(chat, GenerationParams::from(&config.llm));

        Ok(Self::new(
            source,
            embedder,
            generator,
            AnalysisSettings::from_config(config),
        ))
    }

    #[must_use]
    pub const fn settings(&self) -> &AnalysisSettings {
        &self.settings
    }

    /// Retrieve the reports closest to the question and ask the model about them
    ///
    /// # Errors
    /// Any failure is returned as `LabRagError::Pipeline` naming the stage.
    pub async fn analyze(&self, request: AnalysisRequest) -> Result<AnalysisOutcome> {
        let question = request
            .question
            .filter(|q| !q.trim().is_empty())
            .unwrap_or_else(|| prompts::DEFAULT_ANALYSIS_QUERY.to_string());
        let top_k = request.top_k.unwrap_or(self.settings.top_k);
        if top_k == 0 {
            return Err(LabRagError::InvalidInput(
                "top_k must be at least 1".to_string(),
            ));
        }

        info!("Processing analysis: {}", question);
        let mut run = StageTracker::start();

        run.enter(AnalysisStage::FetchingRecords);
        let reports = match request.scope {
            AnalysisScope::All => self.source.fetch_reports(&ReportQuery::all()).await,
            AnalysisScope::Filtered(query) => self.source.fetch_reports(&query).await,
            AnalysisScope::Provided(reports) => Ok(reports),
        }
        .map_err(|e| run.fail(e))?;

        if reports.is_empty() {
            info!("No records selected for analysis");
            return Ok(AnalysisOutcome::NoRecords);
        }
        let considered = reports.len();

        run.enter(AnalysisStage::Projecting);
        let documents = project_all(&reports);

        run.enter(AnalysisStage::Embedding);
        let texts: Vec<String> = documents.iter().map(|d| d.text.clone()).collect();
        let vectors = self
            .embedder
            .embed_batch(&texts)
            .await
            .map_err(|e| run.fail(e))?;

        run.enter(AnalysisStage::Indexing);
        let index = VectorIndex::from_embeddings(documents, vectors, self.settings.metric)
            .map_err(|e| run.fail(e))?;

        run.enter(AnalysisStage::Retrieving);
        let mut hits = index
            .search_text(self.embedder.as_ref(), &question, top_k)
            .await
            .map_err(|e| run.fail(e))?;
        debug!("Retrieved {} of {} documents", hits.len(), index.len());

        run.enter(AnalysisStage::Generating);
        let context = self
            .assembler
            .assemble(hits.iter().map(|hit| hit.document.text.as_str()));
        if context.included < hits.len() {
            debug!(
                "Context budget kept {} of {} retrieved documents",
                context.included,
                hits.len()
            );
            hits.truncate(context.included);
        }
        let answer = self
            .generator
            .answer(&self.settings.system_prompt, &context.text, &question)
            .await
            .map_err(|e| run.fail(e))?;

        run.finish();
        info!("Analysis completed over {} reports", considered);

        Ok(AnalysisOutcome::Answered(AnalysisResponse {
            question,
            answer,
            sources: hits
                .into_iter()
                .map(|hit| RetrievedSource {
                    report_id: hit.document.report_id,
                    text: hit.document.text,
                    distance: Some(hit.distance),
                })
                .collect(),
            considered,
        }))
    }

    /// Summarize the newest reports without building an index
    ///
    /// # Errors
    /// Any failure is returned as `LabRagError::Pipeline` naming the stage.
    pub async fn summarize(&self, limit: Option<usize>) -> Result<AnalysisOutcome> {
        let limit = limit.unwrap_or(self.settings.summary_limit);
        if limit == 0 {
            return Err(LabRagError::InvalidInput(
                "summary limit must be at least 1".to_string(),
            ));
        }

        info!("Summarizing the {} newest reports", limit);
        let mut run = StageTracker::start();

        run.enter(AnalysisStage::FetchingRecords);
        let query = ReportQuery::all()
            .newest_first()
            .limit(i64::try_from(limit).unwrap_or(i64::MAX));
        let reports = self
            .source
            .fetch_reports(&query)
            .await
            .map_err(|e| run.fail(e))?;

        if reports.is_empty() {
            info!("No records to summarize");
            return Ok(AnalysisOutcome::NoRecords);
        }

        run.enter(AnalysisStage::Projecting);
        let timeline = timeline_by_patient(&reports);
        let request = prompts::build_summary_request(&timeline);

        run.enter(AnalysisStage::Generating);
        let answer = self
            .generator
            .answer(&self.settings.summary_prompt, "", &request)
            .await
            .map_err(|e| run.fail(e))?;

        run.finish();

        Ok(AnalysisOutcome::Answered(AnalysisResponse {
            question: request,
            answer,
            considered: reports.len(),
            sources: reports
                .iter()
                .map(|report| RetrievedSource {
                    report_id: report.id,
                    text: project_timeline(report),
                    distance: None,
                })
                .collect(),
        }))
    }
}

/// Group timeline lines under each patient, patients in first-seen order
fn timeline_by_patient(reports: &[Report]) -> String {
    let mut patients: Vec<(&str, Vec<String>)> = Vec::new();
    for report in reports {
        let line = project_timeline(report);
        match patients.iter_mut().find(|(name, _)| *name == report.name) {
            Some((_, lines)) => lines.push(line),
            None => patients.push((report.name.as_str(), vec![line])),
        }
    }

    patients
        .into_iter()
        .map(|(name, lines)| format!("Patient: {name}\n{}", lines.join("\n")))
        .collect::<Vec<_>>()
        .join("\n\n")
}
