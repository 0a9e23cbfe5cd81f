//! `frame_list` parameters and handler.
//!
//! Without filters the store's own cursor pagination is passed through untouched.
//! With any of `branch`, `module` or `since` the newest `query.fetch_bound` frames are
//! filtered in memory and pagination is switched off (`nextCursor: null`,
//! `hasMore: false`).

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::engine::EngineContext;
use crate::error::{ErrorCode, ToolError};
use crate::frame::query::{self, ListCriteria, DEFAULT_LIMIT};

use super::{clamp_limit, non_blank, parse_args, ToolOutput};

/// Parameters for the `frame_list` MCP tool.
#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct FrameListParams {
    #[serde(default)]
    #[schemars(description = "Only frames recorded on this branch")]
    pub branch: Option<String>,

    #[serde(default)]
    #[schemars(description = "Only frames whose module scope contains this module (aliases accepted)")]
    pub module: Option<String>,

    #[serde(default)]
    #[schemars(description = "Maximum number of frames to return. Defaults to 10.")]
    pub limit: Option<usize>,

    #[serde(default)]
    #[schemars(description = "Only frames created at or after this RFC 3339 instant")]
    pub since: Option<String>,

    #[serde(default)]
    #[schemars(description = "Cursor from a previous unfiltered page's page.nextCursor")]
    pub cursor: Option<String>,
}

fn parse_since(since: Option<&str>) -> Result<Option<DateTime<Utc>>, ToolError> {
    let Some(raw) = non_blank(since) else {
        return Ok(None);
    };
    DateTime::parse_from_rfc3339(raw)
        .map(|t| Some(t.with_timezone(&Utc)))
        .map_err(|e| {
            ToolError::domain(
                ErrorCode::ValidationInvalidFormat,
                format!("since must be an RFC 3339 timestamp: {e}"),
            )
            .with_context(json!({ "field": "since", "value": raw }))
        })
}

pub(crate) async fn run(ctx: &EngineContext, args: Value) -> Result<ToolOutput, ToolError> {
    let params: FrameListParams = parse_args(args)?;
    let since = parse_since(params.since.as_deref())?;

    // Frames store canonical ids, so an alias filter must be resolved first.
    let module = non_blank(params.module.as_deref()).map(|m| {
        ctx.policy()
            .and_then(|p| p.resolve(m))
            .unwrap_or(m)
            .to_string()
    });

    let criteria = ListCriteria {
        branch: non_blank(params.branch.as_deref()).map(str::to_string),
        module,
        since,
        limit: clamp_limit(params.limit, DEFAULT_LIMIT, ctx.settings.max_limit),
        cursor: non_blank(params.cursor.as_deref()).map(str::to_string),
    };
    tracing::info!(
        filtered = criteria.is_filtered(),
        limit = criteria.limit,
        "frame_list called"
    );

    let fetch_bound = ctx.settings.fetch_bound;
    let outcome = ctx
        .with_store(move |store| query::list_frames(store, &criteria, fetch_bound))
        .await?;

    let mut lines = vec![format!(
        "{} frame(s){}",
        outcome.frames.len(),
        if outcome.page.has_more {
            " (more available)"
        } else {
            ""
        }
    )];
    lines.extend(
        outcome
            .frames
            .iter()
            .map(|f| format!("- {} {} [{}] {}", f.timestamp, f.id, f.branch, f.summary_caption)),
    );

    let data = json!({
        "frames": outcome.frames,
        "page": outcome.page,
        "order": outcome.order,
    });
    ToolOutput::with_data(lines.join("\n"), &data)
}
