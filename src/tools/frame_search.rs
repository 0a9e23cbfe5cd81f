//! `frame_search` parameters and handler.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::engine::EngineContext;
use crate::error::ToolError;
use crate::frame::query::{self, SearchCriteria, SearchStatus, DEFAULT_LIMIT};
use crate::frame::types::SearchMode;

use super::{clamp_limit, parse_args, ToolOutput};

/// Parameters for the `frame_search` MCP tool.
///
/// At least one of `reference_point`, `jira` or `branch` is required. When several are
/// given, full-text wins over `jira`, which wins over `branch`.
#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct FrameSearchParams {
    #[serde(default)]
    #[schemars(description = "Full-text query over reference point, summary and keywords")]
    pub reference_point: Option<String>,

    #[serde(default)]
    #[schemars(description = "Exact Jira ticket id")]
    pub jira: Option<String>,

    #[serde(default)]
    #[schemars(description = "Exact branch name")]
    pub branch: Option<String>,

    #[serde(default)]
    #[schemars(description = "Maximum number of frames to return. Defaults to 10.")]
    pub limit: Option<usize>,

    #[serde(default)]
    #[schemars(description = "'all' (every term must match, default) or 'any' (at least one term)")]
    pub mode: Option<SearchMode>,
}

pub(crate) async fn run(ctx: &EngineContext, args: Value) -> Result<ToolOutput, ToolError> {
    let params: FrameSearchParams = parse_args(args)?;
    let criteria = SearchCriteria {
        query: params.reference_point,
        mode: params.mode.unwrap_or_default(),
        jira: params.jira,
        branch: params.branch,
        limit: clamp_limit(params.limit, DEFAULT_LIMIT, ctx.settings.max_limit),
    };
    tracing::info!(
        strategy = %criteria.strategy(),
        limit = criteria.limit,
        "frame_search called"
    );

    let fetch_bound = ctx.settings.fetch_bound;
    let outcome = ctx
        .with_store(move |store| query::search_frames(store, &criteria, fetch_bound))
        .await?;

    let text = match outcome.metadata.status {
        SearchStatus::NoMatches => format!(
            "No frames matched ({} frames searched, strategy {})",
            outcome.metadata.total_frames, outcome.metadata.match_strategy
        ),
        SearchStatus::Success => {
            let mut lines = vec![format!(
                "Found {} frame(s) (strategy {})",
                outcome.metadata.match_count, outcome.metadata.match_strategy
            )];
            lines.extend(outcome.frames.iter().map(|f| {
                format!(
                    "- {} [{}] {}: {}",
                    f.id, f.branch, f.reference_point, f.summary_caption
                )
            }));
            lines.join("\n")
        }
    };

    let data = json!({
        "frames": outcome.frames,
        "metadata": outcome.metadata,
    });
    ToolOutput::with_data(text, &data)
}
