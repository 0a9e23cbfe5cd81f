use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::engine::EngineContext;
use crate::error::ToolError;

use super::{aliases_for, catalog, non_blank, parse_args, resolve, unknown_tool, ToolOutput, ALIASES};

/// Parameters for the `help` MCP tool.
#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct HelpParams {
    #[serde(default)]
    #[schemars(description = "Tool name or deprecated alias to describe. Omit for an overview.")]
    pub tool: Option<String>,
}

pub(crate) async fn run(_ctx: &EngineContext, args: Value) -> Result<ToolOutput, ToolError> {
    let params: HelpParams = parse_args(args)?;

    let Some(name) = non_blank(params.tool.as_deref()) else {
        let tools: Vec<Value> = catalog()
            .iter()
            .map(|t| json!({ "name": t.name, "description": t.description }))
            .collect();
        let aliases: BTreeMap<&str, &str> = ALIASES.iter().copied().collect();

        let mut lines = vec!["Available tools:".to_string()];
        lines.extend(
            catalog()
                .iter()
                .map(|t| format!("- {}: {}", t.name, t.description)),
        );
        lines.push(String::new());
        lines.push("Deprecated aliases:".to_string());
        lines.extend(aliases.iter().map(|(alias, target)| format!("- {alias} -> {target}")));
        return ToolOutput::with_data(lines.join("\n"), &json!({ "tools": tools, "aliases": aliases }));
    };

    let resolved = resolve(name).ok_or_else(|| unknown_tool(name))?;
    let spec = resolved.spec;
    let example: Value = serde_json::from_str(spec.example)?;

    let mut text = format!("{}: {}\n\nExample:\n{}", spec.name, spec.description, spec.example);
    if let Some(alias) = resolved.alias {
        text = format!("'{alias}' is deprecated, use '{}'.\n\n{text}", spec.name);
    }
    ToolOutput::with_data(
        text,
        &json!({
            "tool": spec.name,
            "description": spec.description,
            "aliases": aliases_for(spec.name),
            "example": { "name": spec.name, "arguments": example },
            "inputSchema": spec.input_schema(),
        }),
    )
}
