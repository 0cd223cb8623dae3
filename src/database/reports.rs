use tracing::debug;
use tracing::info;

use super::finish;
use super::RecordStore;
use super::ReportQuery;
use super::ResultOrder;
use super::REPORT_COLUMNS;
use crate::models::NewReport;
use crate::models::Report;
use crate::models::ReportStats;
use crate::models::ReportUpdate;
use crate::LabRagError;
use crate::Result;

impl RecordStore {
    /// Insert a report; input is validated before any connection is opened
    pub async fn insert(&self, report: NewReport) -> Result<Report> {
        let report = report.normalized();
        report.validate()?;

        let sql = format!(
            "INSERT INTO blood_reports (name, test_name, result, unit, ref_range, flag, timestamp)
             VALUES ($1, $2, $3, $4, $5, $6, COALESCE($7, NOW()))
             RETURNING {REPORT_COLUMNS}"
        );

        let mut conn = self.connect().await?;
        let outcome = sqlx::query_as::<_, Report>(&sql)
            .bind(&report.name)
            .bind(&report.test_name)
            .bind(report.result)
            .bind(&report.unit)
            .bind(&report.ref_range)
            .bind(&report.flag)
            .bind(report.timestamp)
            .fetch_one(&mut conn)
            .await;
        let inserted = finish(conn, outcome).await?;

        info!(
            "Inserted report {} ({} / {})",
            inserted.id, inserted.name, inserted.test_name
        );
        Ok(inserted)
    }

    /// Get a report by id
    pub async fn get(&self, id: i64) -> Result<Option<Report>> {
        let sql = format!("SELECT {REPORT_COLUMNS} FROM blood_reports WHERE id = $1");

        let mut conn = self.connect().await?;
        let outcome = sqlx::query_as::<_, Report>(&sql)
            .bind(id)
            .fetch_optional(&mut conn)
            .await;
        finish(conn, outcome).await
    }

    /// Change the given columns of one report
    pub async fn update(&self, id: i64, update: ReportUpdate) -> Result<Report> {
        update.validate()?;

        let sql = format!(
            "UPDATE blood_reports SET
                name = COALESCE($2, name),
                test_name = COALESCE($3, test_name),
                result = COALESCE($4, result),
                unit = COALESCE($5, unit),
                ref_range = COALESCE($6, ref_range),
                flag = COALESCE($7, flag)
             WHERE id = $1
             RETURNING {REPORT_COLUMNS}"
        );

        let trimmed = |value: &Option<String>| value.as_deref().map(str::trim).map(str::to_string);

        let mut conn = self.connect().await?;
        let outcome = sqlx::query_as::<_, Report>(&sql)
            .bind(id)
            .bind(trimmed(&update.name))
            .bind(trimmed(&update.test_name))
            .bind(update.result)
            .bind(trimmed(&update.unit))
            .bind(trimmed(&update.ref_range))
            .bind(trimmed(&update.flag))
            .fetch_optional(&mut conn)
            .await;

        let updated = finish(conn, outcome).await?.ok_or(LabRagError::NotFound(id))?;
        info!("Updated report {}", id);
        Ok(updated)
    }

    /// Delete a report by id
    pub async fn delete(&self, id: i64) -> Result<()> {
        let mut conn = self.connect().await?;
        let outcome = sqlx::query("DELETE FROM blood_reports WHERE id = $1")
            .bind(id)
            .execute(&mut conn)
            .await;
        let done = finish(conn, outcome).await?;

        if done.rows_affected() == 0 {
            return Err(LabRagError::NotFound(id));
        }
        info!("Deleted report {}", id);
        Ok(())
    }

    /// Run a filtered selection
    pub async fn search(&self, query: &ReportQuery) -> Result<Vec<Report>> {
        query.validate()?;

        let mut builder = query.to_query_builder();
        debug!("Report search: {}", builder.sql());

        let mut conn = self.connect().await?;
        let outcome = builder
            .build_query_as::<Report>()
            .fetch_all(&mut conn)
            .await;
        let reports = finish(conn, outcome).await?;

        debug!("Report search returned {} rows", reports.len());
        Ok(reports)
    }

    /// Every report in the table
    pub async fn list_all(&self, order: ResultOrder) -> Result<Vec<Report>> {
        self.search(&ReportQuery::all().ordered(order)).await
    }

    /// Aggregate counts for the stats views
    pub async fn stats(&self) -> Result<ReportStats> {
        let mut conn = self.connect().await?;
        let outcome = sqlx::query_as::<_, ReportStats>(
            r"
            SELECT
                COUNT(*) AS total_reports,
                COUNT(DISTINCT name) AS distinct_subjects,
                COUNT(*) FILTER (
                    WHERE btrim(flag) <> '' AND lower(btrim(flag)) <> 'normal'
                ) AS flagged_reports,
                MAX(timestamp) AS latest_timestamp
            FROM blood_reports
            ",
        )
        .fetch_one(&mut conn)
        .await;
        finish(conn, outcome).await
    }

    /// Round-trip a trivial statement to prove credentials and TLS work
    pub async fn ping(&self) -> Result<()> {
        let mut conn = self.connect().await?;
        let outcome = sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&mut conn)
            .await;
        finish(conn, outcome).await?;
        Ok(())
    }
}
