//! Report management handlers

use super::confirm;
use crate::cli::output::*;
use crate::database::parse_date_bound;
use crate::database::RecordStore;
use crate::database::ReportQuery;
use crate::database::ResultOrder;
use crate::models::NewReport;
use crate::models::ReportUpdate;
use crate::LabRagError;
use crate::Result;

pub async fn handle_add_command(
    store: &RecordStore,
    mut report: NewReport,
    at: Option<String>,
) -> Result<()> {
    if let Some(at) = at {
        report.timestamp = Some(parse_date_bound(&at)?);
    }
    let created = store.insert(report).await?;
    print_success(&format!("Report #{} added", created.id));
    print_report_detail(&created);
    Ok(())
}

pub async fn handle_update_command(
    store: &RecordStore,
    id: i64,
    update: ReportUpdate,
) -> Result<()> {
    let updated = store.update(id, update).await?;
    print_success(&format!("Report #{id} updated"));
    print_report_detail(&updated);
    Ok(())
}

pub async fn handle_delete_command(store: &RecordStore, id: i64, yes: bool) -> Result<()> {
    if !yes && !confirm(&format!("Delete report #{id}?"))? {
        print_info("Delete cancelled");
        return Ok(());
    }
    store.delete(id).await?;
    print_success(&format!("Report #{id} deleted"));
    Ok(())
}

pub async fn handle_show_command(store: &RecordStore, id: i64) -> Result<()> {
    let report = store.get(id).await?.ok_or(LabRagError::NotFound(id))?;
    print_report_detail(&report);
    Ok(())
}

pub async fn handle_list_command(
    store: &RecordStore,
    newest_first: bool,
    limit: Option<i64>,
) -> Result<()> {
    let order = if newest_first {
        ResultOrder::NewestFirst
    } else {
        ResultOrder::Storage
    };

    let reports = match limit {
        Some(limit) => store.search(&ReportQuery::all().ordered(order).limit(limit)).await?,
        None => store.list_all(order).await?,
    };
    print_report_table(&reports);
    Ok(())
}
