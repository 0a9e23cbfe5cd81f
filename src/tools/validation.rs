//! Frame argument validation shared by `frame_create` and `frame_validate`.
//!
//! Checks run in a fixed order: summary, reference point, next action, module scope
//! presence, images, then module resolution against the policy. Nothing here touches
//! the store.

use serde_json::json;

use crate::error::{ErrorCode, ToolError};
use crate::frame::types::{ImageAttachment, ALLOWED_IMAGE_TYPES};
use crate::policy::validator::{validate_module_ids, ModuleValidation};
use crate::policy::Policy;

use super::frame_create::FrameCreateParams;

/// Result of running every check.
#[derive(Debug, Default)]
pub struct Report {
    pub errors: Vec<ToolError>,
    pub warnings: Vec<String>,
    /// Canonical module scope. Empty when module resolution failed.
    pub module_scope: Vec<String>,
}

impl Report {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Arguments that passed every check.
#[derive(Debug)]
pub struct Checked {
    pub module_scope: Vec<String>,
    pub warnings: Vec<String>,
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Run every check and collect all problems.
pub fn collect(params: &FrameCreateParams, policy: Option<&Policy>) -> Report {
    let mut report = Report::default();

    if is_blank(&params.summary_caption) {
        report.errors.push(ToolError::required_field("summary_caption"));
    }
    if is_blank(&params.reference_point) {
        report.errors.push(ToolError::required_field("reference_point"));
    }
    if is_blank(&params.status_snapshot.next_action) {
        report
            .errors
            .push(ToolError::required_field("status_snapshot.next_action"));
    }

    let requested: Vec<String> = params
        .module_scope
        .iter()
        .map(|m| m.trim())
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .collect();
    if requested.is_empty() {
        report.errors.push(empty_module_scope());
    }

    for (index, image) in params.images.iter().flatten().enumerate() {
        if let Err(err) = check_image(index, image) {
            report.errors.push(err);
        }
    }

    if requested.is_empty() {
        return report;
    }

    match policy {
        Some(policy) => {
            let validation = validate_module_ids(&requested, policy);
            for (alias, canonical) in &validation.resolved_aliases {
                report
                    .warnings
                    .push(format!("Module alias '{alias}' resolved to '{canonical}'"));
            }
            match validation.canonical.clone() {
                Some(canonical) => report.module_scope = canonical,
                None => report.errors.push(invalid_modules(&validation)),
            }
        }
        None => {
            report
                .warnings
                .push("No module policy loaded; module scope stored unchecked".to_string());
            let mut unique: Vec<String> = Vec::with_capacity(requested.len());
            for module in requested {
                if !unique.contains(&module) {
                    unique.push(module);
                }
            }
            report.module_scope = unique;
        }
    }
    report
}

/// Run every check and return the first problem, if any.
pub fn validate(params: &FrameCreateParams, policy: Option<&Policy>) -> Result<Checked, ToolError> {
    let report = collect(params, policy);
    match report.errors.into_iter().next() {
        Some(err) => Err(err),
        None => Ok(Checked {
            module_scope: report.module_scope,
            warnings: report.warnings,
        }),
    }
}

pub fn empty_module_scope() -> ToolError {
    ToolError::guidance(
        ErrorCode::ValidationEmptyModuleScope,
        "module_scope must contain at least one module id",
        [
            "Add the module(s) this work touches, e.g. [\"services/auth\"]",
            "Run policy_check without arguments to list known modules",
        ],
    )
    .with_context(json!({ "field": "module_scope", "hintId": "hint_module_scope" }))
}

/// The error for module ids the policy does not know, with typo suggestions.
pub fn invalid_modules(validation: &ModuleValidation) -> ToolError {
    let invalid: Vec<&str> = validation.errors.iter().map(|e| e.module.as_str()).collect();
    let mut next_actions: Vec<String> = validation
        .errors
        .iter()
        .filter(|e| !e.suggestions.is_empty())
        .map(|e| {
            let quoted: Vec<String> = e.suggestions.iter().map(|s| format!("'{s}'")).collect();
            format!("Replace '{}' with {}", e.module, quoted.join(" or "))
        })
        .collect();
    next_actions.push("Run policy_check without arguments to list known modules".to_string());

    ToolError::guidance(
        ErrorCode::ValidationInvalidModuleId,
        format!("Unknown module id(s): {}", invalid.join(", ")),
        next_actions,
    )
    .with_context(json!({
        "invalid": validation.errors,
        "hintId": "hint_invalid_module",
    }))
}

fn check_image(index: usize, image: &ImageAttachment) -> Result<(), ToolError> {
    if is_blank(&image.data) {
        return Err(ToolError::domain(
            ErrorCode::ValidationInvalidImage,
            format!("Image {index} has no data"),
        )
        .with_context(json!({ "index": index })));
    }
    if !ALLOWED_IMAGE_TYPES.contains(&image.mime_type.as_str()) {
        return Err(ToolError::domain(
            ErrorCode::ValidationInvalidImage,
            format!("Image {index} has unsupported type '{}'", image.mime_type),
        )
        .with_context(json!({
            "index": index,
            "mime_type": image.mime_type,
            "allowed": ALLOWED_IMAGE_TYPES,
        })));
    }
    Ok(())
}
