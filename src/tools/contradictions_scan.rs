use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::engine::EngineContext;
use crate::error::ToolError;
use crate::frame::contradictions::scan;
use crate::frame::query::fetch_recent;

use super::{clamp_limit, non_blank, parse_args, ToolOutput};

const DEFAULT_SCAN_LIMIT: usize = 100;

/// Parameters for the `contradictions_scan` MCP tool.
#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct ContradictionsScanParams {
    #[serde(default)]
    #[schemars(description = "Only consider frames touching this module (aliases accepted)")]
    pub module: Option<String>,

    #[serde(default)]
    #[schemars(description = "How many recent frames to scan. Defaults to 100.")]
    pub limit: Option<usize>,
}

pub(crate) async fn run(ctx: &EngineContext, args: Value) -> Result<ToolOutput, ToolError> {
    let params: ContradictionsScanParams = parse_args(args)?;
    let window = clamp_limit(params.limit, DEFAULT_SCAN_LIMIT, ctx.settings.fetch_bound);
    let module = non_blank(params.module.as_deref()).map(|m| {
        ctx.policy()
            .and_then(|p| p.resolve(m))
            .unwrap_or(m)
            .to_string()
    });
    tracing::info!(window, module = ?module, "contradictions_scan called");

    let frames = ctx
        .with_store(move |store| fetch_recent(store, window))
        .await?;
    let found = scan(&frames, module.as_deref());

    let mut lines = vec![format!(
        "{} potential contradiction(s) across {} frames",
        found.len(),
        frames.len()
    )];
    lines.extend(found.iter().map(|c| {
        format!(
            "- {} vs {} on '{}' ({})",
            c.frame_a,
            c.frame_b,
            c.keyword,
            c.shared_modules.join(", ")
        )
    }));

    ToolOutput::with_data(
        lines.join("\n"),
        &json!({
            "scanned": frames.len(),
            "module": module,
            "count": found.len(),
            "contradictions": found,
        }),
    )
}
