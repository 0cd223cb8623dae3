//! Analysis and summary handlers

use crate::cli::commands::FilterArgs;
use crate::cli::output::*;
use crate::config::AppConfig;
use crate::rag::AnalysisOutcome;
use crate::rag::AnalysisRequest;
use crate::rag::AnalysisService;
use crate::Result;

pub async fn handle_analyze_command(
    config: &AppConfig,
    question: Option<String>,
    top_k: Option<usize>,
    filter: FilterArgs,
    verbose: bool,
) -> Result<()> {
    let service = AnalysisService::from_config(config)?;

    let mut request = if filter.is_empty() {
        AnalysisRequest::all()
    } else {
        AnalysisRequest::filtered(filter.to_query(config.end_boundary())?)
    };
    if let Some(question) = question {
        request = request.with_question(question);
    }
    if let Some(top_k) = top_k {
        request = request.with_top_k(top_k);
    }

    print_info(&format!(
        "🤖 Analyzing reports (top {} by {} distance)...",
        request.top_k.unwrap_or(service.settings().top_k),
        service.settings().metric
    ));
    let outcome = service.analyze(request).await?;
    print_outcome(&outcome, verbose);
    Ok(())
}

pub async fn handle_summarize_command(
    config: &AppConfig,
    limit: Option<usize>,
    verbose: bool,
) -> Result<()> {
    let service = AnalysisService::from_config(config)?;
    print_info(&format!(
        "📝 Summarizing the {} newest reports...",
        limit.unwrap_or(service.settings().summary_limit)
    ));
    let outcome = service.summarize(limit).await?;
    print_outcome(&outcome, verbose);
    Ok(())
}

pub(crate) fn print_outcome(outcome: &AnalysisOutcome, verbose: bool) {
    match outcome {
        AnalysisOutcome::NoRecords => print_warning("No records found"),
        AnalysisOutcome::Answered(response) => print_analysis(response, verbose),
    }
}
