//! Flattening reports into text for embedding and prompting
//!
//! Projection is one-way: field values are not escaped, so a value that
//! itself contains `" | "` cannot be told apart from a separator.

use chrono::DateTime;
use chrono::Utc;
use serde::Serialize;

use crate::models::Report;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Canonical single-line projection of a report
///
/// `Patient: <name> | Test: <test> | Result: <value> <unit> | Ref Range: <range> | Flag: <flag> | Date: <timestamp>`
#[must_use]
pub fn project(report: &Report) -> String {
    format!(
        "Patient: {} | Test: {} | Result: {} {} | Ref Range: {} | Flag: {} | Date: {}",
        report.name,
        report.test_name,
        report.result,
        report.unit,
        report.ref_range,
        report.flag,
        format_timestamp(&report.timestamp)
    )
}

/// Compact per-patient timeline line used by summary mode
#[must_use]
pub fn project_timeline(report: &Report) -> String {
    format!(
        "{} - {}: {} {} (Ref: {}, Flag: {})",
        format_timestamp(&report.timestamp),
        report.test_name,
        report.result,
        report.unit,
        report.ref_range,
        report.flag
    )
}

fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}

/// Text derived from one report for a single analysis run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RetrievalDocument {
    pub report_id: i64,
    pub text: String,
}

impl RetrievalDocument {
    #[must_use]
    pub fn from_report(report: &Report) -> Self {
        Self {
            report_id: report.id,
            text: project(report),
        }
    }
}

/// Project every report, preserving order
#[must_use]
pub fn project_all(reports: &[Report]) -> Vec<RetrievalDocument> {
    reports.iter().map(RetrievalDocument::from_report).collect()
}
