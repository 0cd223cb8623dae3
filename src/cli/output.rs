//! CLI output formatting utilities
//!
//! This module provides consistent output formatting for the `labrag` CLI

use crate::models::Report;
use crate::models::ReportStats;
use crate::rag::AnalysisResponse;

/// Safely truncate a string at character boundary (not byte boundary)
#[must_use]
pub fn truncate_str(s: &str, max_chars: usize) -> String {
    if s.chars().count() > max_chars {
        let truncated: String = s.chars().take(max_chars).collect();
        format!("{truncated}...")
    } else {
        s.to_string()
    }
}

/// One table row per report
#[must_use]
pub fn format_report_row(report: &Report) -> String {
    format!(
        "{:>6}  {:<20}  {:<18}  {:>10} {:<8}  {:<12}  {:<8}  {}",
        report.id,
        truncate_str(&report.name, 17),
        truncate_str(&report.test_name, 15),
        report.result,
        truncate_str(&report.unit, 8),
        truncate_str(&report.ref_range, 12),
        if report.is_flagged() {
            format!("⚠ {}", report.flag)
        } else {
            report.flag.clone()
        },
        report.timestamp.format("%Y-%m-%d %H:%M:%S")
    )
}

/// Print a table of reports, or a notice when there are none
pub fn print_report_table(reports: &[Report]) {
    if reports.is_empty() {
        print_info("No records found");
        return;
    }

    println!("Found {} reports:", reports.len());
    println!(
        "{:>6}  {:<20}  {:<18}  {:>10} {:<8}  {:<12}  {:<8}  {}",
        "ID", "Patient", "Test", "Result", "Unit", "Ref Range", "Flag", "Date"
    );
    println!("{}", "─".repeat(110));
    for report in reports {
        println!("{}", format_report_row(report));
    }
}

/// Print every field of one report
pub fn print_report_detail(report: &Report) {
    println!("📄 Report #{}", report.id);
    println!("  Patient:   {}", report.name);
    println!("  Test:      {}", report.test_name);
    println!("  Result:    {} {}", report.result, report.unit);
    println!("  Ref Range: {}", report.ref_range);
    println!("  Flag:      {}", report.flag);
    println!("  Date:      {}", report.timestamp.format("%Y-%m-%d %H:%M:%S"));
}

/// Print statistics
pub fn print_statistics(stats: &ReportStats) {
    println!("📊 LabRAG Statistics");
    println!("  Reports:        {}", stats.total_reports);
    println!("  Patients:       {}", stats.distinct_subjects);
    println!("  Flagged:        {}", stats.flagged_reports);
    match stats.latest_timestamp {
        Some(ts) => println!("  Latest report:  {}", ts.format("%Y-%m-%d %H:%M:%S")),
        None => println!("  Latest report:  -"),
    }
}

/// Print a model answer, with sources when verbose
pub fn print_analysis(response: &AnalysisResponse, verbose: bool) {
    println!("\n{}", "═".repeat(100));
    println!("📝 Answer:\n");
    println!("{}", response.answer);
    println!("\n{}", "═".repeat(100));

    if verbose {
        println!(
            "\n📚 Sources ({} of {} reports):",
            response.sources.len(),
            response.considered
        );
        for (idx, source) in response.sources.iter().enumerate() {
            match source.distance {
                Some(distance) => println!(
                    "  {}. #{} | distance {:.4} | {}",
                    idx + 1,
                    source.report_id,
                    distance,
                    source.text
                ),
                None => println!("  {}. #{} | {}", idx + 1, source.report_id, source.text),
            }
        }
    } else {
        println!("\n💡 Use --verbose to see source reports");
    }
    println!("\n⚕️  General information only. Consult a healthcare professional.");
}

/// Print colored output functions
pub fn print_info(msg: &str) {
    println!("ℹ️  {msg}");
}

pub fn print_success(msg: &str) {
    println!("✅ {msg}");
}

pub fn print_warning(msg: &str) {
    println!("⚠️  {msg}");
}

pub fn print_error(msg: &str) {
    eprintln!("❌ {msg}");
}

pub fn print_prompt(msg: &str) {
    print!("{msg}");
    // A failed flush only delays the prompt text
    let _ = std::io::Write::flush(&mut std::io::stdout());
}
