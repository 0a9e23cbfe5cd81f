use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::engine::EngineContext;
use crate::error::{ErrorCode, ToolError};
use crate::policy::atlas::{compute_atlas, MAX_FOLD_RADIUS};
use crate::policy::validator::validate_module_ids;

use super::validation::{empty_module_scope, invalid_modules};
use super::{parse_args, ToolOutput};

/// Parameters for the `atlas_analyze` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct AtlasAnalyzeParams {
    #[schemars(description = "Seed module ids (aliases accepted)")]
    pub module_scope: Vec<String>,

    #[serde(default)]
    #[schemars(description = "How many caller hops to include around the seeds (0-5). Defaults to 1.")]
    pub fold_radius: Option<u8>,
}

pub(crate) async fn run(ctx: &EngineContext, args: Value) -> Result<ToolOutput, ToolError> {
    let params: AtlasAnalyzeParams = parse_args(args)?;
    let policy = ctx.require_policy()?;

    let fold_radius = params.fold_radius.unwrap_or(1);
    if fold_radius > MAX_FOLD_RADIUS {
        return Err(ToolError::domain(
            ErrorCode::ValidationInvalidFormat,
            format!("fold_radius must be between 0 and {MAX_FOLD_RADIUS}"),
        )
        .with_context(json!({ "field": "fold_radius", "max": MAX_FOLD_RADIUS })));
    }

    let seeds: Vec<String> = params
        .module_scope
        .iter()
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
        .collect();
    if seeds.is_empty() {
        return Err(empty_module_scope());
    }
    let validation = validate_module_ids(&seeds, policy);
    let Some(canonical) = validation.canonical.as_deref() else {
        return Err(invalid_modules(&validation));
    };

    tracing::info!(seeds = canonical.len(), fold_radius, "atlas_analyze called");
    let atlas = compute_atlas(policy, canonical, fold_radius);

    let mut lines = vec![format!(
        "Atlas around {} (radius {}): {} modules, {} edges",
        atlas.seed_modules.join(", "),
        atlas.fold_radius,
        atlas.modules.len(),
        atlas.edges.len()
    )];
    for edge in &atlas.edges {
        let arrow = if edge.allowed { "->" } else { "-x->" };
        lines.push(format!("- {} {} {}", edge.from, arrow, edge.to));
    }
    ToolOutput::with_data(lines.join("\n"), &atlas)
}
