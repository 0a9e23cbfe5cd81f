//! Error taxonomy and the wire-error mapper.
//!
//! Every failure a tool handler can produce is a [`ToolError`]. The dispatcher is the
//! only place that turns one into a [`WireError`] via [`to_wire`]; handlers never
//! format wire errors themselves.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::frame::store::StoreError;

/// Top-level grouping for error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    Validation,
    Storage,
    Policy,
    Internal,
}

/// Fixed metadata attached to each [`ErrorCode`], surfaced by `system_introspect`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ErrorMetadata {
    pub category: ErrorCategory,
    pub retryable: bool,
}

/// Stable error codes. Serialized as `SCREAMING_SNAKE_CASE` strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationRequiredField,
    ValidationInvalidFormat,
    ValidationEmptyModuleScope,
    ValidationInvalidModuleId,
    ValidationMissingSearchParameter,
    ValidationInvalidImage,
    StorageReadFailed,
    StorageWriteFailed,
    StorageNotFound,
    StorageImageFailed,
    PolicyNotFound,
    PolicyInvalid,
    InternalUnknownMethod,
    InternalUnknownTool,
    InternalError,
}

impl ErrorCode {
    pub const ALL: &'static [ErrorCode] = &[
        Self::ValidationRequiredField,
        Self::ValidationInvalidFormat,
        Self::ValidationEmptyModuleScope,
        Self::ValidationInvalidModuleId,
        Self::ValidationMissingSearchParameter,
        Self::ValidationInvalidImage,
        Self::StorageReadFailed,
        Self::StorageWriteFailed,
        Self::StorageNotFound,
        Self::StorageImageFailed,
        Self::PolicyNotFound,
        Self::PolicyInvalid,
        Self::InternalUnknownMethod,
        Self::InternalUnknownTool,
        Self::InternalError,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ValidationRequiredField => "VALIDATION_REQUIRED_FIELD",
            Self::ValidationInvalidFormat => "VALIDATION_INVALID_FORMAT",
            Self::ValidationEmptyModuleScope => "VALIDATION_EMPTY_MODULE_SCOPE",
            Self::ValidationInvalidModuleId => "VALIDATION_INVALID_MODULE_ID",
            Self::ValidationMissingSearchParameter => "VALIDATION_MISSING_SEARCH_PARAMETER",
            Self::ValidationInvalidImage => "VALIDATION_INVALID_IMAGE",
            Self::StorageReadFailed => "STORAGE_READ_FAILED",
            Self::StorageWriteFailed => "STORAGE_WRITE_FAILED",
            Self::StorageNotFound => "STORAGE_NOT_FOUND",
            Self::StorageImageFailed => "STORAGE_IMAGE_FAILED",
            Self::PolicyNotFound => "POLICY_NOT_FOUND",
            Self::PolicyInvalid => "POLICY_INVALID",
            Self::InternalUnknownMethod => "INTERNAL_UNKNOWN_METHOD",
            Self::InternalUnknownTool => "INTERNAL_UNKNOWN_TOOL",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    pub fn metadata(&self) -> ErrorMetadata {
        use ErrorCategory::*;
        let (category, retryable) = match self {
            Self::ValidationRequiredField
            | Self::ValidationInvalidFormat
            | Self::ValidationEmptyModuleScope
            | Self::ValidationInvalidModuleId
            | Self::ValidationMissingSearchParameter
            | Self::ValidationInvalidImage => (Validation, false),
            Self::StorageReadFailed | Self::StorageNotFound => (Storage, false),
            // Transient write failures are worth a retry with the same request_id.
            Self::StorageWriteFailed | Self::StorageImageFailed => (Storage, true),
            Self::PolicyNotFound | Self::PolicyInvalid => (Policy, false),
            Self::InternalUnknownMethod | Self::InternalUnknownTool | Self::InternalError => {
                (Internal, false)
            }
        };
        ErrorMetadata {
            category,
            retryable,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The error every tool handler returns.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// A structured domain error: code, message and optional context.
    #[error("{code}: {message}")]
    Domain {
        code: ErrorCode,
        message: String,
        context: Option<Value>,
    },
    /// A recoverable error that tells the caller what to try next.
    #[error("{code}: {message}")]
    Guidance {
        code: ErrorCode,
        message: String,
        context: Option<Value>,
        next_actions: Vec<String>,
    },
    /// Anything else. Only the generic internal code and message reach the wire.
    #[error(transparent)]
    Unmapped(#[from] anyhow::Error),
}

impl ToolError {
    pub fn domain(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Domain {
            code,
            message: message.into(),
            context: None,
        }
    }

    pub fn guidance<I, S>(code: ErrorCode, message: impl Into<String>, next_actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Guidance {
            code,
            message: message.into(),
            context: None,
            next_actions: next_actions.into_iter().map(Into::into).collect(),
        }
    }

    /// Attach (or replace) the context object. No-op for [`ToolError::Unmapped`].
    pub fn with_context(mut self, value: Value) -> Self {
        match &mut self {
            Self::Domain { context, .. } | Self::Guidance { context, .. } => {
                *context = Some(value);
            }
            Self::Unmapped(_) => {}
        }
        self
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Domain { code, .. } | Self::Guidance { code, .. } => *code,
            Self::Unmapped(_) => ErrorCode::InternalError,
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::Domain { message, .. } | Self::Guidance { message, .. } => message.clone(),
            Self::Unmapped(_) => INTERNAL_MESSAGE.to_string(),
        }
    }

    /// A store read failed. The driver error is logged, not surfaced.
    pub fn storage_read(err: StoreError) -> Self {
        if let StoreError::InvalidCursor(cursor) = &err {
            return Self::domain(
                ErrorCode::ValidationInvalidFormat,
                format!("Invalid pagination cursor: {cursor}"),
            )
            .with_context(serde_json::json!({ "field": "cursor" }));
        }
        tracing::error!(error = %err, "frame store read failed");
        Self::domain(ErrorCode::StorageReadFailed, "Failed to read from the frame store")
    }

    /// A store write failed. The driver error is logged, not surfaced.
    pub fn storage_write(err: StoreError) -> Self {
        tracing::error!(error = %err, "frame store write failed");
        Self::domain(ErrorCode::StorageWriteFailed, "Failed to write to the frame store")
    }

    pub fn required_field(field: &str) -> Self {
        Self::domain(
            ErrorCode::ValidationRequiredField,
            format!("Missing required field: {field}"),
        )
        .with_context(serde_json::json!({ "field": field }))
    }
}

impl From<serde_json::Error> for ToolError {
    fn from(err: serde_json::Error) -> Self {
        Self::Unmapped(err.into())
    }
}

const INTERNAL_MESSAGE: &str = "Internal error: the operation could not be completed";

/// Wire shape of an error: `{code, message, context?, nextActions?}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireError {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
    #[serde(
        rename = "nextActions",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub next_actions: Option<Vec<String>>,
}

/// Map a handler error to its wire form.
///
/// [`ToolError::Unmapped`] keeps its detail in the log only; the caller sees the
/// generic internal code and message.
pub fn to_wire(err: &ToolError) -> WireError {
    match err {
        ToolError::Domain {
            code,
            message,
            context,
        } => WireError {
            code: code.as_str().to_string(),
            message: message.clone(),
            context: context.clone(),
            next_actions: None,
        },
        ToolError::Guidance {
            code,
            message,
            context,
            next_actions,
        } => WireError {
            code: code.as_str().to_string(),
            message: message.clone(),
            context: context.clone(),
            next_actions: Some(next_actions.clone()),
        },
        ToolError::Unmapped(inner) => {
            tracing::error!(error = ?inner, "unmapped internal error");
            WireError {
                code: ErrorCode::InternalError.as_str().to_string(),
                message: INTERNAL_MESSAGE.to_string(),
                context: None,
                next_actions: None,
            }
        }
    }
}
