//! `frame_validate`: the `frame_create` checks without the write.

use serde::Serialize;
use serde_json::Value;

use crate::engine::EngineContext;
use crate::error::{to_wire, ToolError, WireError};

use super::frame_create::FrameCreateParams;
use super::{parse_args, validation, ToolOutput};

#[derive(Debug, Serialize)]
struct ValidationResult {
    valid: bool,
    errors: Vec<WireError>,
    warnings: Vec<String>,
    canonical_module_scope: Vec<String>,
}

pub(crate) async fn run(ctx: &EngineContext, args: Value) -> Result<ToolOutput, ToolError> {
    let result = match parse_args::<FrameCreateParams>(args) {
        Ok(params) => {
            let report = validation::collect(&params, ctx.policy());
            ValidationResult {
                valid: report.is_valid(),
                errors: report.errors.iter().map(to_wire).collect(),
                warnings: report.warnings,
                canonical_module_scope: report.module_scope,
            }
        }
        // Shape errors are reported, not raised.
        Err(err) => ValidationResult {
            valid: false,
            errors: vec![to_wire(&err)],
            warnings: Vec::new(),
            canonical_module_scope: Vec::new(),
        },
    };

    let text = if result.valid {
        format!(
            "Frame is valid. Module scope: {}",
            result.canonical_module_scope.join(", ")
        )
    } else {
        let lines: Vec<String> = result
            .errors
            .iter()
            .map(|e| format!("- {}: {}", e.code, e.message))
            .collect();
        format!("Frame is invalid:\n{}", lines.join("\n"))
    };
    ToolOutput::with_data(text, &result)
}
