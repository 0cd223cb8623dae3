//! Analysis pipeline tests with in-process fakes for the store and both models

use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Duration;
use chrono::TimeZone;
use chrono::Utc;
use labrag::database::NameMatch;
use labrag::database::ReportQuery;
use labrag::database::ReportSource;
use labrag::database::ResultOrder;
use labrag::embeddings::DistanceMetric;
use labrag::embeddings::Embedder;
use labrag::embeddings::VectorIndex;
use labrag::llm::prompts;
use labrag::llm::ChatMessage;
use labrag::llm::ChatModel;
use labrag::llm::ChatRole;
use labrag::llm::GenerationClient;
use labrag::llm::GenerationParams;
use labrag::models::Report;
use labrag::projection::project_all;
use labrag::rag::AnalysisOutcome;
use labrag::rag::AnalysisRequest;
use labrag::rag::AnalysisService;
use labrag::rag::AnalysisSettings;
use labrag::rag::AnalysisStage;
use labrag::LabRagError;
use labrag::Result;

const VOCABULARY: [&str; 8] = [
    "glucose",
    "sodium",
    "hemoglobin",
    "cholesterol",
    "high",
    "low",
    "normal",
    "potassium",
];

/// Bag-of-words over a fixed vocabulary, so nearness follows shared terms
struct KeywordEmbedder {
    calls: AtomicUsize,
    fail: bool,
}

impl KeywordEmbedder {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail: false,
        }
    }

    fn failing() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail: true,
        }
    }
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(LabRagError::EmbeddingError("embedding backend down".into()));
        }
        let lower = text.to_lowercase();
        Ok(VOCABULARY
            .iter()
            .map(|term| lower.matches(term).count() as f32)
            .collect())
    }
}

struct RecordingChat {
    reply: String,
    calls: AtomicUsize,
    seen: Mutex<Vec<ChatMessage>>,
    fail: bool,
}

impl RecordingChat {
    fn replying(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::replying("")
        }
    }

    fn system_prompt(&self) -> String {
        let seen = self.seen.lock().unwrap();
        seen.iter()
            .find(|m| m.role == ChatRole::System)
            .map(|m| m.content.clone())
            .unwrap_or_default()
    }

    fn user_message(&self) -> String {
        let seen = self.seen.lock().unwrap();
        seen.iter()
            .find(|m| m.role == ChatRole::User)
            .map(|m| m.content.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ChatModel for RecordingChat {
    async fn complete(&self, messages: &[ChatMessage], _params: &GenerationParams) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().extend_from_slice(messages);
        if self.fail {
            return Err(LabRagError::LlmError("429 rate limited".into()));
        }
        Ok(self.reply.clone())
    }
}

/// In-memory source that applies name filters, ordering and limits
struct MemorySource {
    reports: Vec<Report>,
    queries: Mutex<Vec<ReportQuery>>,
    fail: bool,
}

impl MemorySource {
    fn new(reports: Vec<Report>) -> Self {
        Self {
            reports,
            queries: Mutex::new(Vec::new()),
            fail: false,
        }
    }
}

#[async_trait]
impl ReportSource for MemorySource {
    async fn fetch_reports(&self, query: &ReportQuery) -> Result<Vec<Report>> {
        self.queries.lock().unwrap().push(query.clone());
        if self.fail {
            return Err(LabRagError::Database(sqlx::Error::PoolClosed));
        }

        let mut reports: Vec<Report> = self
            .reports
            .iter()
            .filter(|r| match &query.name {
                Some(filter) if filter.mode == NameMatch::Exact => r.name == filter.value,
                Some(filter) => r.name.contains(&filter.value),
                None => true,
            })
            .cloned()
            .collect();
        if query.order == ResultOrder::NewestFirst {
            reports.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
        }
        if let Some(limit) = query.limit {
            reports.truncate(usize::try_from(limit).unwrap_or(0));
        }
        Ok(reports)
    }
}

fn reports() -> Vec<Report> {
    let base = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
    let rows = [
        ("Jane Doe", "Glucose", 180.0, "mg/dL", "70-99", "High"),
        ("Jane Doe", "Sodium", 139.0, "mmol/L", "135-145", "Normal"),
        ("John Roe", "Hemoglobin", 10.2, "g/dL", "13.5-17.5", "Low"),
        ("John Roe", "Cholesterol", 180.0, "mg/dL", "<200", "Normal"),
        ("Ada Poe", "Potassium", 4.1, "mmol/L", "3.5-5.1", ""),
    ];
    rows.iter()
        .enumerate()
        .map(|(i, (name, test, result, unit, range, flag))| Report {
            id: i as i64 + 1,
            name: (*name).to_string(),
            test_name: (*test).to_string(),
            result: *result,
            unit: (*unit).to_string(),
            ref_range: (*range).to_string(),
            flag: (*flag).to_string(),
            timestamp: base + Duration::hours(i as i64),
        })
        .collect()
}

struct Harness {
    source: Arc<MemorySource>,
    embedder: Arc<KeywordEmbedder>,
    chat: Arc<RecordingChat>,
    service: AnalysisService,
}

fn harness_with(source: MemorySource, embedder: KeywordEmbedder, chat: RecordingChat) -> Harness {
    let _ = labrag::logging::init_simple_logging();
    let source = Arc::new(source);
    let embedder = Arc::new(embedder);
    let chat = Arc::new(chat);
    let service = AnalysisService::new(
        source.clone(),
        embedder.clone(),
        GenerationClient::new(chat.clone(), GenerationParams::default()),
        AnalysisSettings {
            top_k: 2,
            ..AnalysisSettings::default()
        },
    );
    Harness {
        source,
        embedder,
        chat,
        service,
    }
}

fn harness(reports: Vec<Report>) -> Harness {
    harness_with(
        MemorySource::new(reports),
        KeywordEmbedder::new(),
        RecordingChat::replying("Glucose is above the reference range."),
    )
}

fn answered(outcome: AnalysisOutcome) -> labrag::rag::AnalysisResponse {
    match outcome {
        AnalysisOutcome::Answered(response) => response,
        AnalysisOutcome::NoRecords => panic!("expected an answer"),
    }
}

#[tokio::test]
async fn test_empty_store_makes_no_model_calls() {
    let h = harness(Vec::new());

    let outcome = h.service.analyze(AnalysisRequest::all()).await.unwrap();
    assert!(matches!(outcome, AnalysisOutcome::NoRecords));

    let summary = h.service.summarize(None).await.unwrap();
    assert!(matches!(summary, AnalysisOutcome::NoRecords));

    assert_eq!(h.embedder.calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.chat.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_flagged_record_retrieved_with_flag_token() {
    let h = harness(reports());

    let response = answered(
        h.service
            .analyze(AnalysisRequest::all().with_question("Is my glucose high?"))
            .await
            .unwrap(),
    );

    let top = &response.sources[0];
    assert_eq!(top.report_id, 1);
    assert!(top.text.contains("Test: Glucose"));
    assert!(top.text.contains("Flag: High"));
    assert_eq!(response.considered, 5);
    assert_eq!(response.sources.len(), 2);

    // The retrieved lines reach the model inside the system prompt
    let system = h.chat.system_prompt();
    assert!(system.contains("Patient: Jane Doe | Test: Glucose | Result: 180 mg/dL"));
    assert!(system.contains("consulting a doctor"));
    assert_eq!(h.chat.user_message(), "Is my glucose high?");
}

#[tokio::test]
async fn test_default_question_used_when_blank() {
    let h = harness(reports());
    let response = answered(
        h.service
            .analyze(AnalysisRequest::all().with_question("   "))
            .await
            .unwrap(),
    );
    assert_eq!(response.question, prompts::DEFAULT_ANALYSIS_QUERY);
    assert_eq!(h.chat.user_message(), prompts::DEFAULT_ANALYSIS_QUERY);
}

#[tokio::test]
async fn test_top_k_larger_than_store_returns_each_once() {
    let h = harness(reports());
    let response = answered(
        h.service
            .analyze(AnalysisRequest::all().with_top_k(50))
            .await
            .unwrap(),
    );

    let mut ids: Vec<i64> = response.sources.iter().map(|s| s.report_id).collect();
    assert_eq!(ids.len(), 5);
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids, vec![1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn test_filtered_scope_passes_query_to_source() {
    let h = harness(reports());
    let query = ReportQuery::all().with_name("John Roe", NameMatch::Exact);

    let response = answered(
        h.service
            .analyze(AnalysisRequest::filtered(query.clone()))
            .await
            .unwrap(),
    );
    assert_eq!(response.considered, 2);
    assert!(response.sources.iter().all(|s| s.text.contains("John Roe")));
    assert_eq!(h.source.queries.lock().unwrap().as_slice(), &[query]);
}

#[tokio::test]
async fn test_provided_scope_skips_store() {
    let h = harness(reports());
    let subset: Vec<Report> = reports().into_iter().skip(2).take(1).collect();

    let response = answered(
        h.service
            .analyze(AnalysisRequest::provided(subset))
            .await
            .unwrap(),
    );
    assert_eq!(response.considered, 1);
    assert_eq!(response.sources[0].report_id, 3);
    assert!(h.source.queries.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_failures_name_their_stage() {
    let failing_source = MemorySource {
        fail: true,
        ..MemorySource::new(reports())
    };
    let h = harness_with(
        failing_source,
        KeywordEmbedder::new(),
        RecordingChat::replying("unused"),
    );
    let err = h.service.analyze(AnalysisRequest::all()).await.unwrap_err();
    assert!(matches!(
        err,
        LabRagError::Pipeline {
            stage: AnalysisStage::FetchingRecords,
            ..
        }
    ));
    assert!(err.is_connectivity());

    let h = harness_with(
        MemorySource::new(reports()),
        KeywordEmbedder::failing(),
        RecordingChat::replying("unused"),
    );
    let err = h.service.analyze(AnalysisRequest::all()).await.unwrap_err();
    assert!(matches!(
        err,
        LabRagError::Pipeline {
            stage: AnalysisStage::Embedding,
            ..
        }
    ));
    assert_eq!(h.chat.calls.load(Ordering::SeqCst), 0);

    let h = harness_with(
        MemorySource::new(reports()),
        KeywordEmbedder::new(),
        RecordingChat::failing(),
    );
    let err = h.service.analyze(AnalysisRequest::all()).await.unwrap_err();
    assert!(matches!(
        err,
        LabRagError::Pipeline {
            stage: AnalysisStage::Generating,
            ..
        }
    ));
    assert!(err.to_string().contains("generating"));
}

#[tokio::test]
async fn test_zero_top_k_rejected_before_fetching() {
    let h = harness(reports());
    let err = h
        .service
        .analyze(AnalysisRequest::all().with_top_k(0))
        .await
        .unwrap_err();
    assert!(matches!(err, LabRagError::InvalidInput(_)));
    assert!(h.source.queries.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_summary_uses_newest_records_without_index() {
    let h = harness(reports());

    let response = answered(h.service.summarize(Some(3)).await.unwrap());

    let queries = h.source.queries.lock().unwrap().clone();
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0].order, ResultOrder::NewestFirst);
    assert_eq!(queries[0].limit, Some(3));

    assert_eq!(
        response.sources.iter().map(|s| s.report_id).collect::<Vec<_>>(),
        vec![5, 4, 3]
    );
    assert!(response.sources.iter().all(|s| s.distance.is_none()));
    assert_eq!(h.embedder.calls.load(Ordering::SeqCst), 0);

    assert!(h.chat.system_prompt().starts_with("You are a medical report summarizer."));
    let user = h.chat.user_message();
    assert!(user.starts_with("Summarize these blood test results:\n"));
    assert!(user.contains("Patient: John Roe"));
    assert!(user.contains("Hemoglobin: 10.2 g/dL (Ref: 13.5-17.5, Flag: Low)"));
}

#[tokio::test]
async fn test_sources_limited_to_what_fit_in_context() {
    let base = reports();
    let many: Vec<Report> = (0..100)
        .map(|i| Report {
            id: i + 1,
            ..base[(i % 5) as usize].clone()
        })
        .collect();
    let h = harness(many);

    let response = answered(
        h.service
            .analyze(AnalysisRequest::all().with_top_k(100))
            .await
            .unwrap(),
    );

    let prompt = h.chat.system_prompt();
    assert_eq!(response.considered, 100);
    assert!(!response.sources.is_empty());
    assert!(response.sources.len() < 100);
    assert!(response
        .sources
        .iter()
        .all(|source| prompt.contains(&source.text)));

    let context_chars: usize = response
        .sources
        .iter()
        .map(|source| source.text.chars().count() + 1)
        .sum::<usize>()
        - 1;
    assert!(context_chars <= AnalysisSettings::default().max_context_chars);
}

#[tokio::test]
async fn test_cosine_index_over_embedded_documents() {
    let embedder = KeywordEmbedder::new();
    let documents = project_all(&reports());
    let texts: Vec<String> = documents.iter().map(|d| d.text.clone()).collect();
    let vectors = embedder.embed_batch(&texts).await.unwrap();

    let index = VectorIndex::from_embeddings(documents, vectors, DistanceMetric::Cosine).unwrap();
    assert_eq!(index.len(), 5);
    assert_eq!(index.dimension(), VOCABULARY.len());
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 5);

    let hits = index.search_text(&embedder, "low hemoglobin", 1).await.unwrap();
    assert_eq!(hits[0].document.report_id, 3);
}
