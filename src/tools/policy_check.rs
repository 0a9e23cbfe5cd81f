use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::engine::EngineContext;
use crate::error::ToolError;
use crate::policy::validator::validate_module_ids;

use super::{parse_args, ToolOutput};

/// Parameters for the `policy_check` MCP tool.
#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct PolicyCheckParams {
    #[serde(default)]
    #[schemars(description = "Module ids to check. Omit to get a summary of the loaded policy.")]
    pub modules: Option<Vec<String>>,
}

pub(crate) async fn run(ctx: &EngineContext, args: Value) -> Result<ToolOutput, ToolError> {
    let params: PolicyCheckParams = parse_args(args)?;
    let policy = ctx.require_policy()?;
    let source = policy.source.as_ref().map(|p| p.display().to_string());

    let Some(modules) = params.modules.filter(|m| !m.is_empty()) else {
        tracing::info!("policy_check called (summary)");
        let listed: Vec<Value> = policy
            .modules
            .iter()
            .map(|(id, rule)| {
                json!({
                    "id": id,
                    "description": rule.description,
                    "owns_paths": rule.owns_paths,
                })
            })
            .collect();
        let text = format!(
            "Policy {} defines {} modules and {} aliases",
            source.as_deref().unwrap_or("(in memory)"),
            policy.modules.len(),
            policy.aliases.len()
        );
        return ToolOutput::with_data(
            text,
            &json!({
                "path": source,
                "module_count": policy.modules.len(),
                "alias_count": policy.aliases.len(),
                "modules": listed,
                "aliases": policy.aliases,
            }),
        );
    };

    tracing::info!(modules = modules.len(), "policy_check called");
    let validation = validate_module_ids(&modules, policy);

    let mut lines = Vec::new();
    if validation.valid {
        lines.push(format!("All {} module id(s) are valid", modules.len()));
    } else {
        lines.push(format!("{} invalid module id(s)", validation.errors.len()));
    }
    for (alias, canonical) in &validation.resolved_aliases {
        lines.push(format!("- '{alias}' is an alias of '{canonical}'"));
    }
    for issue in &validation.errors {
        if issue.suggestions.is_empty() {
            lines.push(format!("- {}", issue.message));
        } else {
            lines.push(format!(
                "- {} (did you mean {}?)",
                issue.message,
                issue.suggestions.join(", ")
            ));
        }
    }

    ToolOutput::with_data(
        lines.join("\n"),
        &json!({
            "path": source,
            "valid": validation.valid,
            "canonical": validation.canonical,
            "resolved_aliases": validation.resolved_aliases,
            "errors": validation.errors,
        }),
    )
}
