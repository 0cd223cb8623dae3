//! Record store for blood-test reports
//!
//! Every operation opens its own TLS connection, runs a single statement and
//! closes the connection again, also when the statement failed. There is no
//! pool and no transaction spanning more than one statement.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::PgConnectOptions;
use sqlx::postgres::PgSslMode;
use sqlx::Connection;
use sqlx::PgConnection;
use tracing::debug;
use tracing::warn;

use crate::config::DatabaseConfig;
use crate::models::Report;
use crate::LabRagError;
use crate::Result;

mod query;
mod reports;
mod schema;

pub use query::parse_date_bound;
pub use query::DateRange;
pub use query::EndBoundary;
pub use query::NameFilter;
pub use query::NameMatch;
pub use query::ReportQuery;
pub use query::ResultOrder;
pub use query::REPORT_COLUMNS;

/// Anything the analysis pipeline can pull reports from
#[async_trait]
pub trait ReportSource: Send + Sync {
    async fn fetch_reports(&self, query: &ReportQuery) -> Result<Vec<Report>>;
}

/// Connection settings for the report table; connects lazily per call
#[derive(Debug, Clone)]
pub struct RecordStore {
    options: PgConnectOptions,
    connect_timeout: Duration,
}

impl RecordStore {
    /// Build the store from an explicit database configuration
    ///
    /// Nothing is opened here; an unreachable server only shows up on the
    /// first operation.
    pub fn new(config: &DatabaseConfig) -> Result<Self> {
        let ssl_mode: PgSslMode = config
            .ssl_mode
            .parse()
            .map_err(|e| LabRagError::ConfigError(format!("Invalid database.ssl_mode: {e}")))?;

        let mut options: PgConnectOptions = config
            .url
            .parse()
            .map_err(|e| LabRagError::ConfigError(format!("Invalid database.url: {e}")))?;

        options = options.ssl_mode(ssl_mode).application_name("labrag");

        if let Some(path) = &config.ssl_ca {
            options = options.ssl_root_cert(path);
        } else if let Some(pem) = &config.ssl_ca_pem {
            options = options.ssl_root_cert_from_pem(pem.as_bytes().to_vec());
        }

        Ok(Self {
            options,
            connect_timeout: Duration::from_secs(config.connect_timeout_secs),
        })
    }

    /// Create a store from the application configuration
    pub fn from_config(config: &crate::config::AppConfig) -> Result<Self> {
        Self::new(&config.database)
    }

    /// Connection options shared by every call
    #[must_use]
    pub const fn connect_options(&self) -> &PgConnectOptions {
        &self.options
    }

    /// Open a fresh connection for a single statement
    async fn connect(&self) -> Result<PgConnection> {
        debug!(
            "Opening connection to {}:{}",
            self.options.get_host(),
            self.options.get_port()
        );

        match tokio::time::timeout(self.connect_timeout, PgConnection::connect_with(&self.options))
            .await
        {
            Ok(conn) => Ok(conn?),
            Err(_) => Err(LabRagError::Database(sqlx::Error::Io(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                format!(
                    "connecting to the database timed out after {}s",
                    self.connect_timeout.as_secs()
                ),
            )))),
        }
    }
}

/// Close the connection unconditionally, then surface the statement outcome
async fn finish<T>(conn: PgConnection, outcome: std::result::Result<T, sqlx::Error>) -> Result<T> {
    if let Err(e) = conn.close().await {
        warn!("Failed to close database connection cleanly: {}", e);
    }
    Ok(outcome?)
}

#[async_trait]
impl ReportSource for RecordStore {
    async fn fetch_reports(&self, query: &ReportQuery) -> Result<Vec<Report>> {
        self.search(query).await
    }
}
