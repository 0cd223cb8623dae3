//! CLI command handlers module
//!
//! This module is organized by functional domains:
//! - init: Schema creation and reset
//! - reports: Adding, changing, showing and listing reports
//! - search: Filtered search
//! - analyze: Model-backed analysis and summaries
//! - serve: API server
//! - info: Information display (stats, check, config)

pub mod analyze;
pub mod info;
pub mod init;
pub mod reports;
pub mod search;
pub mod serve;

// Re-export all public handlers
pub use analyze::*;
pub use info::*;
pub use init::*;
pub use reports::*;
pub use search::*;
pub use serve::*;

use crate::cli::output::print_prompt;

/// Ask a yes/no question on stdin; anything but y/yes is a no
pub(crate) fn confirm(question: &str) -> crate::Result<bool> {
    print_prompt(&format!("{question} (y/N) "));
    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}
