//! Hint table. Error responses reference these ids through `context.hintId`.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::engine::EngineContext;
use crate::error::ToolError;

use super::{parse_args, ToolOutput};

#[derive(Debug, Clone, Serialize)]
pub struct Hint {
    pub id: &'static str,
    pub tool: &'static str,
    pub summary: &'static str,
    pub actions: &'static [&'static str],
}

pub static HINTS: &[Hint] = &[
    Hint {
        id: "hint_missing_search_param",
        tool: "frame_search",
        summary: "frame_search needs something to search by.",
        actions: &[
            "Pass reference_point for a full-text search",
            "Pass jira for an exact ticket match",
            "Pass branch for an exact branch match",
        ],
    },
    Hint {
        id: "hint_module_scope",
        tool: "frame_create",
        summary: "Every frame must be tagged with at least one module.",
        actions: &[
            "List the modules the work touches in module_scope",
            "Run policy_check to see the known module ids",
        ],
    },
    Hint {
        id: "hint_invalid_module",
        tool: "frame_create",
        summary: "A module id is not defined in the module policy.",
        actions: &[
            "Use one of the suggestions from the error",
            "Run policy_check with the ids to see which ones resolve",
            "Add the module to the policy file if it is new",
        ],
    },
    Hint {
        id: "hint_frame_not_found",
        tool: "frame_get",
        summary: "No frame has that id.",
        actions: &[
            "Search with frame_search",
            "Browse recent frames with frame_list",
        ],
    },
    Hint {
        id: "hint_policy_missing",
        tool: "policy_check",
        summary: "No module policy was found, so module ids are not checked.",
        actions: &[
            "Create .smartergpt/lex/lexmap.policy.json",
            "Set TESSERA_POLICY_PATH to an existing policy file",
        ],
    },
    Hint {
        id: "hint_timeline_empty",
        tool: "timeline_show",
        summary: "No frames were recorded for that ticket or branch.",
        actions: &[
            "Check the ticket id or branch name",
            "Use frame_list to see what has been recorded",
        ],
    },
];

pub fn find_hint(id: &str) -> Option<&'static Hint> {
    HINTS.iter().find(|h| h.id == id)
}

/// Parameters for the `hints_get` MCP tool.
#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct HintsGetParams {
    #[serde(default)]
    #[schemars(description = "Hint ids to expand. Omit to get every hint.")]
    pub hint_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
struct HintsResponse {
    hints: Vec<&'static Hint>,
    unknown: Vec<String>,
}

pub(crate) async fn run(_ctx: &EngineContext, args: Value) -> Result<ToolOutput, ToolError> {
    let params: HintsGetParams = parse_args(args)?;

    let response = if params.hint_ids.is_empty() {
        HintsResponse {
            hints: HINTS.iter().collect(),
            unknown: Vec::new(),
        }
    } else {
        let mut hints = Vec::new();
        let mut unknown = Vec::new();
        for id in params.hint_ids {
            match find_hint(&id) {
                Some(hint) => hints.push(hint),
                None => unknown.push(id),
            }
        }
        HintsResponse { hints, unknown }
    };

    let mut lines: Vec<String> = Vec::new();
    for hint in &response.hints {
        lines.push(format!("{} ({}): {}", hint.id, hint.tool, hint.summary));
        lines.extend(hint.actions.iter().map(|a| format!("  - {a}")));
    }
    if !response.unknown.is_empty() {
        lines.push(format!("Unknown hint ids: {}", response.unknown.join(", ")));
    }
    ToolOutput::with_data(lines.join("\n"), &response)
}
