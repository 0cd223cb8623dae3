//! Report search handler

use super::analyze::print_outcome;
use crate::cli::commands::FilterArgs;
use crate::cli::output::*;
use crate::config::AppConfig;
use crate::database::RecordStore;
use crate::rag::AnalysisRequest;
use crate::rag::AnalysisService;
use crate::Result;

/// Search reports; with `analyze` the hits go straight to the model
pub async fn handle_search_command(
    config: &AppConfig,
    filter: FilterArgs,
    limit: Option<i64>,
    analyze: bool,
    question: Option<String>,
    verbose: bool,
) -> Result<()> {
    let store = RecordStore::from_config(config)?;
    let mut query = filter.to_query(config.end_boundary())?;
    if let Some(limit) = limit {
        query = query.limit(limit);
    }

    print_info("🔍 Searching reports...");
    let reports = store.search(&query).await?;
    print_report_table(&reports);

    if !analyze || reports.is_empty() {
        return Ok(());
    }

    println!("\n🤖 Analyzing {} reports...", reports.len());
    let service = AnalysisService::from_config(config)?;
    let mut request = AnalysisRequest::provided(reports);
    if let Some(question) = question {
        request = request.with_question(question);
    }
    let outcome = service.analyze(request).await?;
    print_outcome(&outcome, verbose);
    Ok(())
}
