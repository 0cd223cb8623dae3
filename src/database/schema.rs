use tracing::info;

use super::finish;
use super::RecordStore;
use crate::Result;

const CREATE_REPORTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS blood_reports (
    id BIGSERIAL PRIMARY KEY,
    name TEXT NOT NULL,
    test_name TEXT NOT NULL,
    result DOUBLE PRECISION NOT NULL,
    unit TEXT NOT NULL DEFAULT '',
    ref_range TEXT NOT NULL DEFAULT '',
    flag TEXT NOT NULL DEFAULT '',
    timestamp TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
";

const CREATE_NAME_TIMESTAMP_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_blood_reports_name_timestamp
    ON blood_reports (name, timestamp)
";

impl RecordStore {
    /// Create the report table and its index if they do not exist
    pub async fn init_schema(&self) -> Result<()> {
        let mut conn = self.connect().await?;

        let outcome = async {
            sqlx::query(CREATE_REPORTS_TABLE).execute(&mut conn).await?;
            sqlx::query(CREATE_NAME_TIMESTAMP_INDEX)
                .execute(&mut conn)
                .await?;
            Ok::<_, sqlx::Error>(())
        }
        .await;
        finish(conn, outcome).await?;

        info!("Database schema initialized");
        Ok(())
    }

    /// Check whether the report table exists
    pub async fn is_schema_initialized(&self) -> Result<bool> {
        let mut conn = self.connect().await?;
        let outcome = sqlx::query_scalar::<_, bool>(
            r"
            SELECT EXISTS (
                SELECT FROM information_schema.tables
                WHERE table_schema = current_schema()
                AND table_name = 'blood_reports'
            )
            ",
        )
        .fetch_one(&mut conn)
        .await;
        finish(conn, outcome).await
    }

    /// Remove every report and restart id numbering; used by `init --force`
    pub async fn reset(&self) -> Result<()> {
        let mut conn = self.connect().await?;
        let outcome = sqlx::query("TRUNCATE blood_reports RESTART IDENTITY")
            .execute(&mut conn)
            .await;
        finish(conn, outcome).await?;

        info!("Report table truncated");
        Ok(())
    }
}
