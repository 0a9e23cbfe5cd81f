use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::engine::EngineContext;
use crate::error::{ErrorCode, ToolError};
use crate::frame::query::fetch_recent;
use crate::frame::timeline::build_timeline;

use super::{clamp_limit, non_blank, parse_args, ToolOutput};

const DEFAULT_TIMELINE_LIMIT: usize = 20;

/// Parameters for the `timeline_show` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct TimelineShowParams {
    #[schemars(description = "Jira ticket id or branch name to follow")]
    pub ticket_or_branch: String,

    #[serde(default)]
    #[schemars(description = "Only frames at or after this RFC 3339 instant")]
    pub since: Option<String>,

    #[serde(default)]
    #[schemars(description = "Only frames at or before this RFC 3339 instant")]
    pub until: Option<String>,

    #[serde(default)]
    #[schemars(description = "Maximum number of entries (most recent kept). Defaults to 20.")]
    pub limit: Option<usize>,
}

fn parse_instant(field: &str, value: Option<&str>) -> Result<Option<DateTime<Utc>>, ToolError> {
    let Some(raw) = non_blank(value) else {
        return Ok(None);
    };
    DateTime::parse_from_rfc3339(raw)
        .map(|t| Some(t.with_timezone(&Utc)))
        .map_err(|_| {
            ToolError::domain(
                ErrorCode::ValidationInvalidFormat,
                format!("{field} must be an RFC 3339 timestamp"),
            )
            .with_context(json!({ "field": field, "value": raw }))
        })
}

pub(crate) async fn run(ctx: &EngineContext, args: Value) -> Result<ToolOutput, ToolError> {
    let params: TimelineShowParams = parse_args(args)?;
    let key = non_blank(Some(&params.ticket_or_branch))
        .ok_or_else(|| ToolError::required_field("ticket_or_branch"))?
        .to_string();
    let since = parse_instant("since", params.since.as_deref())?;
    let until = parse_instant("until", params.until.as_deref())?;
    let limit = clamp_limit(params.limit, DEFAULT_TIMELINE_LIMIT, ctx.settings.max_limit);
    tracing::info!(key = %key, limit, "timeline_show called");

    let fetch_bound = ctx.settings.fetch_bound;
    let frames = ctx
        .with_store(move |store| fetch_recent(store, fetch_bound))
        .await?;
    let timeline = build_timeline(frames, &key, since, until, limit);

    if timeline.entries.is_empty() {
        return Err(ToolError::guidance(
            ErrorCode::StorageNotFound,
            format!("No frames recorded for '{key}'"),
            [
                "Check the ticket id or branch name for typos",
                "Use frame_list to see which branches and tickets have frames",
            ],
        )
        .with_context(json!({ "ticket_or_branch": key, "hintId": "hint_timeline_empty" })));
    }

    let mut lines = vec![format!("Timeline for '{}' ({} entries)", key, timeline.entries.len())];
    for entry in &timeline.entries {
        let mut line = format!("- {} {}: {}", entry.timestamp, entry.frame_id, entry.summary_caption);
        if !entry.modules_added.is_empty() {
            line.push_str(&format!(" [+{}]", entry.modules_added.join(", +")));
        }
        if !entry.modules_removed.is_empty() {
            line.push_str(&format!(" [-{}]", entry.modules_removed.join(", -")));
        }
        if entry.blocker_count > 0 {
            line.push_str(&format!(" ({} blocker(s))", entry.blocker_count));
        }
        lines.push(line);
    }
    ToolOutput::with_data(lines.join("\n"), &timeline)
}
