use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::engine::{EngineContext, PolicyState};
use crate::error::{ErrorCode, ErrorMetadata, ToolError};

use super::{canonical_names, parse_args, ToolOutput, ALIASES};

/// Parameters for the `system_introspect` MCP tool (none).
#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct SystemIntrospectParams {}

pub(crate) async fn run(ctx: &EngineContext, args: Value) -> Result<ToolOutput, ToolError> {
    let _params: SystemIntrospectParams = parse_args(args)?;
    tracing::info!("system_introspect called");

    let frame_count = ctx
        .with_store(|store| store.frame_count().map_err(ToolError::storage_read))
        .await?;
    let branch = ctx.resolve_branch(None);

    let policy = match ctx.policy_state() {
        PolicyState::Loaded(policy) => json!({
            "loaded": true,
            "path": policy.source.as_ref().map(|p| p.display().to_string()),
            "module_count": policy.modules.len(),
        }),
        PolicyState::Missing(reason) | PolicyState::Invalid(reason) => json!({
            "loaded": false,
            "reason": reason,
            "module_count": 0,
        }),
    };
    let error_codes: BTreeMap<&str, ErrorMetadata> = ErrorCode::ALL
        .iter()
        .map(|code| (code.as_str(), code.metadata()))
        .collect();
    let aliases: BTreeMap<&str, &str> = ALIASES.iter().copied().collect();
    let tools = canonical_names();

    let text = format!(
        "{} {}: {} tools, {} frames, branch '{}', policy {}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        tools.len(),
        frame_count,
        branch,
        if ctx.policy().is_some() {
            "loaded"
        } else {
            "not loaded"
        }
    );

    ToolOutput::with_data(
        text,
        &json!({
            "server": {
                "name": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION"),
            },
            "tools": tools,
            "aliases": aliases,
            "errorCodes": error_codes,
            "policy": policy,
            "state": {
                "frame_count": frame_count,
                "branch": branch,
            },
            "capabilities": {
                "idempotency": true,
                "images": true,
                "fts_search": true,
                "single_flight": true,
                "fetch_bound": ctx.settings.fetch_bound,
            },
        }),
    )
}
