use chrono::Utc;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::engine::EngineContext;
use crate::error::{ErrorCode, ToolError};
use crate::frame::query::fetch_recent;
use crate::frame::turncost::{calculate, Period, TurnCostWeights};

use super::{parse_args, ToolOutput};

/// Parameters for the `turncost_calculate` MCP tool.
#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct TurncostParams {
    #[serde(default)]
    #[schemars(description = "Window: '24h', '7d' or '30d'. Defaults to '24h'.")]
    pub period: Option<String>,

    #[serde(default)]
    #[schemars(description = "Per-component weights; omitted components keep their defaults")]
    pub weights: Option<TurnCostWeights>,
}

pub(crate) async fn run(ctx: &EngineContext, args: Value) -> Result<ToolOutput, ToolError> {
    let params: TurncostParams = parse_args(args)?;
    let raw_period = params.period.as_deref().unwrap_or("24h");
    let period = Period::parse(raw_period).ok_or_else(|| {
        ToolError::domain(
            ErrorCode::ValidationInvalidFormat,
            format!("Unsupported period '{raw_period}'"),
        )
        .with_context(json!({ "field": "period", "accepted": ["24h", "7d", "30d"] }))
    })?;
    let weights = params.weights.unwrap_or_default();
    tracing::info!(period = period.as_str(), "turncost_calculate called");

    let fetch_bound = ctx.settings.fetch_bound;
    let frames = ctx
        .with_store(move |store| fetch_recent(store, fetch_bound))
        .await?;
    let cost = calculate(&frames, period, weights, Utc::now());

    let c = &cost.components;
    let text = format!(
        "Turn cost over {}: {:.1} ({} frames, {} blockers, {} merge blockers, {} failing tests, {} context switches)",
        cost.period,
        cost.total,
        c.frames,
        c.blockers,
        c.merge_blockers,
        c.failing_tests,
        c.context_switches
    );
    ToolOutput::with_data(text, &cost)
}
