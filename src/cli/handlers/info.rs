//! Information display handlers (stats, check, config)

use std::path::PathBuf;

use crate::cli::output::*;
use crate::config::resolve_api_key;
use crate::database::RecordStore;
use crate::embeddings::EmbeddingProvider;
use crate::llm::LlmProvider;
use crate::AppConfig;
use crate::Result;

pub async fn handle_stats_command(store: &RecordStore, export: Option<PathBuf>) -> Result<()> {
    let stats = store.stats().await?;
    print_statistics(&stats);

    if let Some(export_path) = export {
        let json = serde_json::to_string_pretty(&stats)?;
        std::fs::write(&export_path, json)?;
        print_success(&format!("Statistics exported to: {}", export_path.display()));
    }

    Ok(())
}

/// Verify the store answers and that model credentials are present
pub async fn handle_check_command(config: &AppConfig) -> Result<()> {
    let store = RecordStore::from_config(config)?;

    print_info("🗄️  Checking database...");
    store.ping().await?;
    print_success("Database reachable");
    if store.is_schema_initialized().await? {
        print_success("Report table present");
    } else {
        print_warning("Report table missing; run: labrag init");
    }

    let embeddings = &config.embeddings;
    if embeddings.provider == EmbeddingProvider::Ollama
        || resolve_api_key(embeddings.api_key.as_deref(), embeddings.api_key_env.as_deref())
            .is_some()
    {
        print_success(&format!(
            "Embeddings: {} / {}",
            embeddings.provider, embeddings.model
        ));
    } else {
        print_warning(&format!("Embeddings: no API key for {}", embeddings.provider));
    }

    let llm = &config.llm;
    if llm.provider == LlmProvider::Ollama
        || resolve_api_key(llm.api_key.as_deref(), llm.api_key_env.as_deref()).is_some()
    {
        print_success(&format!("LLM: {} / {}", llm.provider, llm.model));
    } else {
        print_warning(&format!("LLM: no API key for {}", llm.provider));
    }

    Ok(())
}

/// Print the configuration with secrets masked
pub async fn handle_config_command(config: &AppConfig) -> Result<()> {
    println!("📋 LabRAG Configuration:");
    println!();
    println!("{}", config.to_redacted_toml()?);
    Ok(())
}
