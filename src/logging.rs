//! Logging configuration for LabRAG

use std::path::Path;

use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::{self};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;
use tracing_subscriber::Registry;

use crate::config::AppConfig;
use crate::Result;

const LOG_DIR: &str = "logs";
const LOG_FILE: &str = "labrag.log";

/// Level and file output resolved from the configuration and an optional override
fn resolve<'a>(config: Option<&'a AppConfig>, level_override: Option<&'a str>) -> (&'a str, bool) {
    let (level, file_output) = match config {
        Some(config) => (config.logging.level.as_str(), config.logging.file_output),
        None => ("info", true),
    };
    (level_override.unwrap_or(level), file_output)
}

/// Initialize logging with configuration
pub fn init_logging_with_config(config: Option<&AppConfig>) -> Result<()> {
    let (level, file_output) = resolve(config, None);

    let env_filter = if config.is_some() {
        EnvFilter::new(format!("{level},labrag={level}"))
    } else {
        // Fallback to environment variable or default
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,labrag=debug"))
    };

    install(env_filter, level, file_output)
}

/// Initialize logging with custom log level; file output still follows the configuration
pub fn init_logging_with_level(config: Option<&AppConfig>, level: &str) -> Result<()> {
    let (level, file_output) = resolve(config, Some(level));
    let env_filter = EnvFilter::new(format!("{level},labrag={level}"));
    install(env_filter, level, file_output)
}

/// Initialize simple logging for testing
pub fn init_simple_logging() -> Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_target(true)
        .with_max_level(tracing::Level::INFO)
        .with_test_writer()
        .try_init();
    Ok(())
}

fn install(env_filter: EnvFilter, level: &str, file_output: bool) -> Result<()> {
    let console_layer = fmt::layer()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(std::io::stderr);

    let file_layer = if file_output {
        let logs_dir = Path::new(LOG_DIR);
        if !logs_dir.exists() {
            std::fs::create_dir_all(logs_dir)?;
        }

        let file_appender = tracing_appender::rolling::daily(LOG_DIR, LOG_FILE);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        // The guard flushes on drop; logging lives for the whole process.
        std::mem::forget(guard);

        Some(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .with_writer(non_blocking)
                .with_ansi(false)
                .boxed(),
        )
    } else {
        None
    };

    Registry::default()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| crate::LabRagError::Custom(format!("Failed to initialize logging: {e}")))?;

    tracing::info!("Logging initialized with level: {}", level);
    if file_output {
        tracing::info!("Log files will be saved to: {}/{}.YYYY-MM-DD", LOG_DIR, LOG_FILE);
    }

    Ok(())
}
