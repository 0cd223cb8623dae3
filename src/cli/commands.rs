//! CLI command definitions and argument parsing

use std::path::PathBuf;

use clap::Args;
use clap::Parser;
use clap::Subcommand;

use crate::database::parse_date_bound;
use crate::database::DateRange;
use crate::database::EndBoundary;
use crate::database::NameMatch;
use crate::database::ReportQuery;
use crate::LabRagError;
use crate::Result;

#[derive(Parser)]
#[command(name = "labrag")]
#[command(about = "LabRAG CLI tool for blood-test records and AI-assisted analysis")]
#[command(version)]
pub struct Cli {
    /// Enable verbose debug logging (default: info level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (default: config.toml, then config.example.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the report table and index
    Init {
        /// Also remove every stored report
        #[arg(long)]
        force: bool,
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Add a blood-test report
    Add {
        /// Patient name
        #[arg(long)]
        name: String,
        /// Test name, e.g. Glucose
        #[arg(long = "test")]
        test_name: String,
        /// Numeric result
        #[arg(long, allow_negative_numbers = true)]
        result: f64,
        #[arg(long, default_value = "")]
        unit: String,
        /// Reference range, e.g. 70-99
        #[arg(long, default_value = "")]
        ref_range: String,
        /// Flag, e.g. High, Low, Normal
        #[arg(long, default_value = "")]
        flag: String,
        /// Collection time; defaults to now
        #[arg(long)]
        at: Option<String>,
    },
    /// Change fields of a report
    Update {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long = "test")]
        test_name: Option<String>,
        #[arg(long, allow_negative_numbers = true)]
        result: Option<f64>,
        #[arg(long)]
        unit: Option<String>,
        #[arg(long)]
        ref_range: Option<String>,
        #[arg(long)]
        flag: Option<String>,
    },
    /// Delete a report
    Delete {
        id: i64,
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Show one report
    Show { id: i64 },
    /// List every report
    List {
        /// Newest reports first
        #[arg(long)]
        newest_first: bool,
        /// Maximum number of reports
        #[arg(short, long)]
        limit: Option<i64>,
    },
    /// Search reports by patient name and date range
    Search {
        #[command(flatten)]
        filter: FilterArgs,
        /// Maximum number of reports
        #[arg(short, long)]
        limit: Option<i64>,
        /// Analyze the reports found
        #[arg(long)]
        analyze: bool,
        /// Question for --analyze
        #[arg(short, long)]
        question: Option<String>,
    },
    /// Ask the model about stored reports
    Analyze {
        /// Question to ask (default: identify abnormal reports)
        #[arg(short, long)]
        question: Option<String>,
        /// Number of reports handed to the model
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Summarize the newest reports
    Summarize {
        /// Number of reports (default: retrieval.summary_limit)
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Show statistics
    Stats {
        /// Export statistics to JSON
        #[arg(short, long)]
        export: Option<PathBuf>,
    },
    /// Check database connectivity and model credentials
    Check,
    /// Start the JSON API server
    Serve {
        /// Host address (default: server.host)
        #[arg(long)]
        host: Option<String>,
        /// Port (default: server.port)
        #[arg(short, long)]
        port: Option<u16>,
        /// Enable CORS
        #[arg(long)]
        cors: bool,
    },
    /// Show current configuration
    Config,
}

/// Report selection shared by search and analyze
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Patient name
    #[arg(short, long)]
    pub name: Option<String>,
    /// Match the name as a substring instead of exactly
    #[arg(long)]
    pub contains: bool,
    /// Start of the date range (YYYY-MM-DD, YYYY-MM-DD HH:MM:SS or RFC 3339)
    #[arg(long)]
    pub start: Option<String>,
    /// End of the date range
    #[arg(long)]
    pub end: Option<String>,
    /// How the end is read: whole-day or exact (default: retrieval.end_boundary)
    #[arg(long)]
    pub end_boundary: Option<EndBoundary>,
    /// Newest reports first
    #[arg(long)]
    pub newest_first: bool,
}

impl FilterArgs {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.start.is_none() && self.end.is_none()
    }

    /// Build the store query; `start` and `end` go together
    pub fn to_query(&self, default_boundary: EndBoundary) -> Result<ReportQuery> {
        let mut query = ReportQuery::all();

        if let Some(name) = &self.name {
            let mode = if self.contains {
                NameMatch::Contains
            } else {
                NameMatch::Exact
            };
            query = query.with_name(name.trim(), mode);
        }

        match (&self.start, &self.end) {
            (Some(start), Some(end)) => {
                query = query.within(DateRange::new(
                    parse_date_bound(start)?,
                    parse_date_bound(end)?,
                    self.end_boundary.unwrap_or(default_boundary),
                )?);
            }
            (None, None) => {}
            _ => {
                return Err(LabRagError::InvalidInput(
                    "--start and --end must be given together".to_string(),
                ))
            }
        }

        if self.newest_first {
            query = query.newest_first();
        }

        query.validate()?;
        Ok(query)
    }
}
