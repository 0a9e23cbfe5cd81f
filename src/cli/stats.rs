use anyhow::{anyhow, Result};
use serde_json::json;

use tessera::config::TesseraConfig;
use tessera::dispatch;

/// Display frame store statistics in the terminal.
pub async fn stats(config: &TesseraConfig, detailed: bool) -> Result<()> {
    let ctx = tessera::server::build_engine(config)?;

    let output = dispatch::call_tool(&ctx, "db_stats", json!({ "detailed": detailed }))
        .await
        .map_err(|e| anyhow!("{}: {}", e.code, e.message))?;

    println!("Frame Statistics");
    println!("{}", "=".repeat(40));
    println!("{}", output.joined_text());
    println!("Database: {}", config.resolved_db_path().display());
    Ok(())
}
