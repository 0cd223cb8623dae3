//! Schema initialization and reset handlers

use super::confirm;
use crate::cli::output::print_info;
use crate::cli::output::print_success;
use crate::cli::output::print_warning;
use crate::database::RecordStore;
use crate::Result;

/// Handle schema initialization command
pub async fn handle_init_command(store: &RecordStore, force: bool, yes: bool) -> Result<()> {
    print_info("🗄️  Initializing LabRAG database...");
    store.init_schema().await?;
    print_success("Report table and index ready");

    if force {
        print_warning("--force removes EVERY stored report!");
        if !yes && !confirm("Are you sure you want to continue?")? {
            print_info("Reset cancelled");
            return Ok(());
        }
        store.reset().await?;
        print_success("All reports removed");
    }

    print_info("To add a report, run:");
    println!("   labrag add --name \"Jane Doe\" --test Glucose --result 180 --unit mg/dL --ref-range 70-99 --flag High");
    Ok(())
}
