//! Prompt templates for analysis and summaries

/// Placeholder replaced by the retrieved report lines
pub const CONTEXT_PLACEHOLDER: &str = "{context}";

/// System prompt for retrieval-backed analysis
pub const ANALYSIS_SYSTEM_PROMPT: &str = "You are a helpful medical AI assistant analyzing blood test results.
Use only the following patient blood report excerpts to identify abnormal values (those marked with a flag or clearly outside the reference range) and give reasonable general recommendations.
If the excerpts do not contain the information needed, say so.
Do NOT give definitive medical advice. Always recommend consulting a doctor or other qualified healthcare professional.

{context}";

/// Question asked when the user supplies none
pub const DEFAULT_ANALYSIS_QUERY: &str =
    "Identify abnormal blood test reports and provide general recommendations.";

/// System prompt for summary mode
pub const SUMMARY_SYSTEM_PROMPT: &str = "You are a medical report summarizer.
Summarize the blood test results you are given per patient, point out values flagged as abnormal and keep the summary short.
Do NOT give definitive medical advice. Recommend consulting a doctor about anything abnormal.";

/// User message for summary mode
#[must_use]
pub fn build_summary_request(timeline: &str) -> String {
    format!("Summarize these blood test results:\n{timeline}")
}

/// Substitute the context into a system prompt
///
/// Templates without a placeholder get the context appended after a blank line.
#[must_use]
pub fn render_system_prompt(template: &str, context: &str) -> String {
    if template.contains(CONTEXT_PLACEHOLDER) {
        template.replace(CONTEXT_PLACEHOLDER, context)
    } else if context.is_empty() {
        template.to_string()
    } else {
        format!("{template}\n\n{context}")
    }
}
