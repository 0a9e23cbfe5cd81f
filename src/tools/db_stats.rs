use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::engine::EngineContext;
use crate::error::ToolError;
use crate::frame::query::fetch_recent;
use crate::frame::stats::frame_stats;

use super::{parse_args, ToolOutput};

/// Parameters for the `db_stats` MCP tool.
#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct DbStatsParams {
    #[serde(default)]
    #[schemars(description = "If true, list up to 20 modules instead of 5")]
    pub detailed: Option<bool>,
}

pub(crate) async fn run(ctx: &EngineContext, args: Value) -> Result<ToolOutput, ToolError> {
    let params: DbStatsParams = parse_args(args)?;
    let top_n = if params.detailed.unwrap_or(false) { 20 } else { 5 };
    tracing::info!(top_n, "db_stats called");

    let fetch_bound = ctx.settings.fetch_bound;
    let stats = ctx
        .with_stores(move |store, images| {
            let total_frames = store.frame_count().map_err(ToolError::storage_read)?;
            let total_images = images.image_count().map_err(ToolError::storage_read)?;
            let sample = fetch_recent(store, fetch_bound)?;
            Ok(frame_stats(&sample, total_frames, total_images, top_n))
        })
        .await?;

    let mut lines = vec![
        format!("Frames: {}", stats.total_frames),
        format!("Images: {}", stats.total_images),
    ];
    if stats.sampled {
        lines.push(format!(
            "Breakdowns cover the newest {} frames",
            stats.sample_size
        ));
    }
    for (branch, count) in &stats.by_branch {
        lines.push(format!("  branch {branch}: {count}"));
    }
    for module in &stats.top_modules {
        lines.push(format!("  module {}: {}", module.module, module.frames));
    }
    if let (Some(oldest), Some(newest)) = (&stats.oldest_frame, &stats.newest_frame) {
        lines.push(format!("Range: {oldest} .. {newest}"));
    }
    ToolOutput::with_data(lines.join("\n"), &stats)
}
