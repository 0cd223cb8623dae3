//! CLI module for the `labrag` binary
//!
//! This module contains all CLI-related functionality including:
//! - Command line argument parsing
//! - Command handlers (organized by domain in handlers/ subdirectory)
//! - Output formatting

pub mod commands;
pub mod handlers;
pub mod output;

pub use commands::*;
pub use handlers::*;
pub use output::*;

use crate::config::AppConfig;
use crate::database::RecordStore;
use crate::models::NewReport;
use crate::models::ReportUpdate;
use crate::Result;

/// Dispatch a parsed command
pub async fn run(cli: Cli, config: &AppConfig) -> Result<()> {
    let verbose = cli.verbose;

    match cli.command {
        Commands::Init { force, yes } => {
            let store = RecordStore::from_config(config)?;
            handle_init_command(&store, force, yes).await
        }
        Commands::Add {
            name,
            test_name,
            result,
            unit,
            ref_range,
            flag,
            at,
        } => {
            let store = RecordStore::from_config(config)?;
            let report = NewReport {
                name,
                test_name,
                result,
                unit,
                ref_range,
                flag,
                timestamp: None,
            };
            handle_add_command(&store, report, at).await
        }
        Commands::Update {
            id,
            name,
            test_name,
            result,
            unit,
            ref_range,
            flag,
        } => {
            let store = RecordStore::from_config(config)?;
            let update = ReportUpdate {
                name,
                test_name,
                result,
                unit,
                ref_range,
                flag,
            };
            handle_update_command(&store, id, update).await
        }
        Commands::Delete { id, yes } => {
            let store = RecordStore::from_config(config)?;
            handle_delete_command(&store, id, yes).await
        }
        Commands::Show { id } => {
            let store = RecordStore::from_config(config)?;
            handle_show_command(&store, id).await
        }
        Commands::List {
            newest_first,
            limit,
        } => {
            let store = RecordStore::from_config(config)?;
            handle_list_command(&store, newest_first, limit).await
        }
        Commands::Search {
            filter,
            limit,
            analyze,
            question,
        } => handle_search_command(config, filter, limit, analyze, question, verbose).await,
        Commands::Analyze {
            question,
            top_k,
            filter,
        } => handle_analyze_command(config, question, top_k, filter, verbose).await,
        Commands::Summarize { limit } => handle_summarize_command(config, limit, verbose).await,
        Commands::Stats { export } => {
            let store = RecordStore::from_config(config)?;
            handle_stats_command(&store, export).await
        }
        Commands::Check => handle_check_command(config).await,
        Commands::Serve { host, port, cors } => handle_serve_api(config, host, port, cors).await,
        Commands::Config => handle_config_command(config).await,
    }
}
