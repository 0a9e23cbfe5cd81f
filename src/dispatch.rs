//! Transport-free protocol entry point: `handle(ctx, method, params) -> Response`.
//!
//! Serves `initialize`, `tools/list` and `tools/call`. Tool names go through the alias
//! table first; every handler error is mapped to its wire form here and nowhere else.

use serde::Serialize;
use serde_json::{json, Value};

use crate::engine::EngineContext;
use crate::error::{to_wire, ErrorCode, ToolError, WireError};
use crate::tools::{self, ToolOutput};

/// MCP protocol revision reported in the handshake.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorEnvelope {
    pub error: WireError,
}

/// A protocol response: either a result object or `{error: {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Response {
    Result(Value),
    Error(ErrorEnvelope),
}

impl Response {
    pub fn error(error: WireError) -> Self {
        Self::Error(ErrorEnvelope { error })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    pub fn result(&self) -> Option<&Value> {
        match self {
            Self::Result(value) => Some(value),
            Self::Error(_) => None,
        }
    }

    pub fn wire_error(&self) -> Option<&WireError> {
        match self {
            Self::Error(envelope) => Some(&envelope.error),
            Self::Result(_) => None,
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Fixed handshake returned by `initialize`.
pub fn initialize_result() -> Value {
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": {
            "tools": { "listChanged": false },
        },
        "serverInfo": {
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
        },
    })
}

/// Handle one protocol request.
pub async fn handle(ctx: &EngineContext, method: &str, params: Value) -> Response {
    match method {
        "initialize" => Response::Result(initialize_result()),
        "tools/list" => match serde_json::to_value(tools::catalog()) {
            Ok(list) => Response::Result(json!({ "tools": list })),
            Err(e) => Response::error(to_wire(&ToolError::from(e))),
        },
        "tools/call" => {
            let Some(name) = params.get("name").and_then(Value::as_str) else {
                return Response::error(to_wire(&ToolError::required_field("name")));
            };
            let args = params.get("arguments").cloned().unwrap_or(Value::Null);
            match call_tool(ctx, name, args).await {
                Ok(output) => match serde_json::to_value(&output) {
                    Ok(value) => Response::Result(value),
                    Err(e) => Response::error(to_wire(&ToolError::from(e))),
                },
                Err(error) => Response::error(error),
            }
        }
        other => {
            tracing::warn!(method = %other, "unknown method");
            Response::error(to_wire(
                &ToolError::domain(
                    ErrorCode::InternalUnknownMethod,
                    format!("Unknown method: {other}"),
                )
                .with_context(json!({
                    "method": other,
                    "availableTools": tools::canonical_names(),
                })),
            ))
        }
    }
}

/// Resolve `name` (canonical or deprecated alias) and run the tool.
pub async fn call_tool(
    ctx: &EngineContext,
    name: &str,
    args: Value,
) -> Result<ToolOutput, WireError> {
    let Some(resolved) = tools::resolve(name) else {
        tracing::warn!(tool = %name, "unknown tool");
        return Err(to_wire(&tools::unknown_tool(name)));
    };
    if let Some(alias) = resolved.alias {
        ctx.note_deprecated_alias(alias, resolved.spec.name);
    }

    tracing::debug!(tool = %resolved.spec.name, "dispatching tool call");
    match tools::run(ctx, resolved.spec, args).await {
        Ok(output) => Ok(output),
        Err(err) => {
            let wire = to_wire(&err);
            tracing::info!(tool = %resolved.spec.name, code = %wire.code, "tool call failed");
            Err(wire)
        }
    }
}
