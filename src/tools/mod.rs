//! Tool registry: the canonical catalog, the deprecated-alias table and the
//! per-tool handlers.
//!
//! Both tables are static data. [`check_registry`] verifies at engine construction
//! that every alias points at exactly one canonical tool and never shadows one.

pub mod atlas_analyze;
pub mod contradictions_scan;
pub mod db_stats;
pub mod frame_create;
pub mod frame_get;
pub mod frame_list;
pub mod frame_search;
pub mod frame_validate;
pub mod help;
pub mod hints_get;
pub mod policy_check;
pub mod system_introspect;
pub mod timeline_show;
pub mod turncost_calculate;
pub mod validation;

use std::collections::HashSet;

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::engine::EngineContext;
use crate::error::{ErrorCode, ToolError};

/// Handler selector for a canonical tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolId {
    FrameCreate,
    FrameValidate,
    FrameSearch,
    FrameGet,
    FrameList,
    PolicyCheck,
    TimelineShow,
    AtlasAnalyze,
    SystemIntrospect,
    HintsGet,
    Help,
    DbStats,
    TurncostCalculate,
    ContradictionsScan,
}

/// One entry of the canonical catalog.
pub struct ToolSpec {
    pub id: ToolId,
    pub name: &'static str,
    pub description: &'static str,
    /// JSON text of a representative `arguments` object, shown by `help`.
    pub example: &'static str,
    schema: fn() -> Map<String, Value>,
}

impl ToolSpec {
    pub fn input_schema(&self) -> Map<String, Value> {
        (self.schema)()
    }
}

fn schema_of<T: JsonSchema>() -> Map<String, Value> {
    match serde_json::to_value(schemars::schema_for!(T)) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

/// Canonical tools, in registration order. Listing sorts by name.
pub static TOOLS: &[ToolSpec] = &[
    ToolSpec {
        id: ToolId::FrameCreate,
        name: "frame_create",
        description: "Capture a work-context frame: what you were doing, where, and what comes next. Pass request_id to make retries idempotent.",
        example: r#"{"summary_caption":"Token refresh half done","reference_point":"auth token refresh","status_snapshot":{"next_action":"Wire refresh into the client"},"module_scope":["services/auth"],"jira":"AUTH-42","request_id":"req-1"}"#,
        schema: schema_of::<frame_create::FrameCreateParams>,
    },
    ToolSpec {
        id: ToolId::FrameValidate,
        name: "frame_validate",
        description: "Validate frame_create arguments (required fields, module ids, images) without storing anything.",
        example: r#"{"summary_caption":"Draft","reference_point":"auth token refresh","status_snapshot":{"next_action":"Review"},"module_scope":["services/auth"]}"#,
        schema: schema_of::<frame_create::FrameCreateParams>,
    },
    ToolSpec {
        id: ToolId::FrameSearch,
        name: "frame_search",
        description: "Search frames by reference-point text, Jira ticket, or branch. At least one of the three is required.",
        example: r#"{"reference_point":"token refresh","mode":"all","limit":5}"#,
        schema: schema_of::<frame_search::FrameSearchParams>,
    },
    ToolSpec {
        id: ToolId::FrameGet,
        name: "frame_get",
        description: "Fetch one frame by id.",
        example: r#"{"frame_id":"0192f3c4-7a1e-7c2d-9b1a-3f0e5d6c7b8a"}"#,
        schema: schema_of::<frame_get::FrameGetParams>,
    },
    ToolSpec {
        id: ToolId::FrameList,
        name: "frame_list",
        description: "List recent frames, newest first. Filtering by branch, module or since disables cursor pagination.",
        example: r#"{"limit":10}"#,
        schema: schema_of::<frame_list::FrameListParams>,
    },
    ToolSpec {
        id: ToolId::PolicyCheck,
        name: "policy_check",
        description: "Check module ids against the loaded module policy, or summarize the policy when no modules are given.",
        example: r#"{"modules":["services/auth","ui/login"]}"#,
        schema: schema_of::<policy_check::PolicyCheckParams>,
    },
    ToolSpec {
        id: ToolId::TimelineShow,
        name: "timeline_show",
        description: "Show the frames recorded for a Jira ticket or branch in chronological order, with module-scope changes.",
        example: r#"{"ticket_or_branch":"AUTH-42"}"#,
        schema: schema_of::<timeline_show::TimelineShowParams>,
    },
    ToolSpec {
        id: ToolId::AtlasAnalyze,
        name: "atlas_analyze",
        description: "Compute the policy-graph neighbourhood of a set of modules within a fold radius.",
        example: r#"{"module_scope":["services/auth"],"fold_radius":1}"#,
        schema: schema_of::<atlas_analyze::AtlasAnalyzeParams>,
    },
    ToolSpec {
        id: ToolId::SystemIntrospect,
        name: "system_introspect",
        description: "Report server version, tools, aliases, error codes, policy status and frame count.",
        example: r#"{}"#,
        schema: schema_of::<system_introspect::SystemIntrospectParams>,
    },
    ToolSpec {
        id: ToolId::HintsGet,
        name: "hints_get",
        description: "Expand hint ids (as found in error context.hintId) into recovery advice.",
        example: r#"{"hint_ids":["hint_missing_search_param"]}"#,
        schema: schema_of::<hints_get::HintsGetParams>,
    },
    ToolSpec {
        id: ToolId::Help,
        name: "help",
        description: "Describe one tool with an example call, or list every tool and deprecated alias.",
        example: r#"{"tool":"frame_search"}"#,
        schema: schema_of::<help::HelpParams>,
    },
    ToolSpec {
        id: ToolId::DbStats,
        name: "db_stats",
        description: "Frame store statistics: totals, frames per branch, most used modules, date range.",
        example: r#"{"detailed":true}"#,
        schema: schema_of::<db_stats::DbStatsParams>,
    },
    ToolSpec {
        id: ToolId::TurncostCalculate,
        name: "turncost_calculate",
        description: "Weighted coordination cost over recent frames (blockers, failing tests, context switches).",
        example: r#"{"period":"7d"}"#,
        schema: schema_of::<turncost_calculate::TurncostParams>,
    },
    ToolSpec {
        id: ToolId::ContradictionsScan,
        name: "contradictions_scan",
        description: "Find pairs of recent frames on the same module whose reference points disagree.",
        example: r#"{"module":"services/auth"}"#,
        schema: schema_of::<contradictions_scan::ContradictionsScanParams>,
    },
];

/// Deprecated name → canonical name.
pub static ALIASES: &[(&str, &str)] = &[
    ("remember", "frame_create"),
    ("lex_remember", "frame_create"),
    ("validate_remember", "frame_validate"),
    ("lex_validate_remember", "frame_validate"),
    ("recall", "frame_search"),
    ("lex_recall", "frame_search"),
    ("get_frame", "frame_get"),
    ("lex_get_frame", "frame_get"),
    ("list_frames", "frame_list"),
    ("lex_list_frames", "frame_list"),
    ("lex_policy_check", "policy_check"),
    ("timeline", "timeline_show"),
    ("lex_timeline", "timeline_show"),
    ("code_atlas", "atlas_analyze"),
    ("lex_code_atlas", "atlas_analyze"),
    ("introspect", "system_introspect"),
    ("lex_introspect", "system_introspect"),
    ("get_hints", "hints_get"),
    ("lex_help", "help"),
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("tool '{0}' is registered twice")]
    DuplicateTool(&'static str),
    #[error("alias '{0}' is declared twice")]
    DuplicateAlias(&'static str),
    #[error("alias '{alias}' targets unknown tool '{target}'")]
    DanglingAlias {
        alias: &'static str,
        target: &'static str,
    },
    #[error("alias '{0}' shadows a canonical tool name")]
    ShadowingAlias(&'static str),
}

/// Verify the static tables: unique names, every alias has exactly one canonical target.
pub fn check_registry() -> Result<(), RegistryError> {
    let mut names = HashSet::new();
    for spec in TOOLS {
        if !names.insert(spec.name) {
            return Err(RegistryError::DuplicateTool(spec.name));
        }
    }
    let mut aliases = HashSet::new();
    for &(alias, target) in ALIASES {
        if names.contains(alias) {
            return Err(RegistryError::ShadowingAlias(alias));
        }
        if !aliases.insert(alias) {
            return Err(RegistryError::DuplicateAlias(alias));
        }
        if !names.contains(target) {
            return Err(RegistryError::DanglingAlias { alias, target });
        }
    }
    Ok(())
}

/// A tool name after alias resolution.
#[derive(Clone, Copy)]
pub struct ResolvedTool {
    pub spec: &'static ToolSpec,
    /// The deprecated name used by the caller, if any.
    pub alias: Option<&'static str>,
}

pub fn find(name: &str) -> Option<&'static ToolSpec> {
    TOOLS.iter().find(|spec| spec.name == name)
}

/// Resolve a canonical name or deprecated alias.
pub fn resolve(name: &str) -> Option<ResolvedTool> {
    if let Some(spec) = find(name) {
        return Some(ResolvedTool { spec, alias: None });
    }
    let &(alias, target) = ALIASES.iter().find(|(alias, _)| *alias == name)?;
    find(target).map(|spec| ResolvedTool {
        spec,
        alias: Some(alias),
    })
}

/// Aliases that resolve to `canonical`, in table order.
pub fn aliases_for(canonical: &str) -> Vec<&'static str> {
    ALIASES
        .iter()
        .filter(|(_, target)| *target == canonical)
        .map(|(alias, _)| *alias)
        .collect()
}

/// Canonical tool names, sorted.
pub fn canonical_names() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = TOOLS.iter().map(|spec| spec.name).collect();
    names.sort_unstable();
    names
}

/// `tools/list` descriptor.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "inputSchema")]
    pub input_schema: Map<String, Value>,
}

/// The tool catalog sorted by name.
pub fn catalog() -> Vec<ToolDescriptor> {
    let mut tools: Vec<ToolDescriptor> = TOOLS
        .iter()
        .map(|spec| ToolDescriptor {
            name: spec.name,
            description: spec.description,
            input_schema: spec.input_schema(),
        })
        .collect();
    tools.sort_by(|a, b| a.name.cmp(b.name));
    tools
}

/// The error for a tool name that resolves to nothing.
pub fn unknown_tool(name: &str) -> ToolError {
    ToolError::domain(ErrorCode::InternalUnknownTool, format!("Unknown tool: {name}"))
        .with_context(json!({ "tool": name, "availableTools": canonical_names() }))
}

/// One text block of a tool result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextContent {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
}

/// Successful tool result: `{content:[{type:"text", text}], data?}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub content: Vec<TextContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ToolOutput {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![TextContent {
                kind: "text".into(),
                text: text.into(),
            }],
            data: None,
        }
    }

    pub fn with_data(text: impl Into<String>, data: &impl Serialize) -> Result<Self, ToolError> {
        let mut output = Self::text(text);
        output.data = Some(serde_json::to_value(data)?);
        Ok(output)
    }

    /// Concatenated text of every content block.
    pub fn joined_text(&self) -> String {
        self.content
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Deserialize tool arguments. `null` is treated as `{}`.
///
/// A missing required field maps to `VALIDATION_REQUIRED_FIELD`, any other shape
/// problem to `VALIDATION_INVALID_FORMAT`.
pub fn parse_args<T: DeserializeOwned>(args: Value) -> Result<T, ToolError> {
    let args = match args {
        Value::Null => Value::Object(Map::new()),
        other => other,
    };
    serde_json::from_value(args).map_err(|e| {
        let message = e.to_string();
        match missing_field_name(&message) {
            Some(field) => ToolError::required_field(field),
            None => ToolError::domain(
                ErrorCode::ValidationInvalidFormat,
                format!("Invalid arguments: {message}"),
            ),
        }
    })
}

fn missing_field_name(message: &str) -> Option<&str> {
    let rest = message.strip_prefix("missing field `")?;
    rest.split('`').next()
}

/// Trimmed, non-empty string argument.
pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Clamp a caller limit into `1..=max`, using `default` when absent.
pub(crate) fn clamp_limit(limit: Option<usize>, default: usize, max: usize) -> usize {
    limit.unwrap_or(default).clamp(1, max.max(1))
}

/// Run the canonical tool `spec` with raw `args`.
pub async fn run(
    ctx: &EngineContext,
    spec: &ToolSpec,
    args: Value,
) -> Result<ToolOutput, ToolError> {
    match spec.id {
        ToolId::FrameCreate => frame_create::run(ctx, args).await,
        ToolId::FrameValidate => frame_validate::run(ctx, args).await,
        ToolId::FrameSearch => frame_search::run(ctx, args).await,
        ToolId::FrameGet => frame_get::run(ctx, args).await,
        ToolId::FrameList => frame_list::run(ctx, args).await,
        ToolId::PolicyCheck => policy_check::run(ctx, args).await,
        ToolId::TimelineShow => timeline_show::run(ctx, args).await,
        ToolId::AtlasAnalyze => atlas_analyze::run(ctx, args).await,
        ToolId::SystemIntrospect => system_introspect::run(ctx, args).await,
        ToolId::HintsGet => hints_get::run(ctx, args).await,
        ToolId::Help => help::run(ctx, args).await,
        ToolId::DbStats => db_stats::run(ctx, args).await,
        ToolId::TurncostCalculate => turncost_calculate::run(ctx, args).await,
        ToolId::ContradictionsScan => contradictions_scan::run(ctx, args).await,
    }
}
