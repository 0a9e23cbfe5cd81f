//! Frame data model.
//!
//! A [`Frame`] is an immutable-once-created snapshot of an agent's work context.
//! [`SearchMode`] and [`MatchStrategy`] describe how queries are run and satisfied.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize, Serializer};

/// A persisted work-context snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// UUID v7, generated at creation time.
    pub id: String,
    /// RFC 3339 creation instant (UTC, microsecond precision).
    pub timestamp: String,
    /// Branch the work happened on, or `"unknown"`.
    pub branch: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jira: Option<String>,
    /// Canonical module ids. Aliases are resolved before a frame is built.
    pub module_scope: Vec<String>,
    pub summary_caption: String,
    /// Free-text anchor; the primary full-text search subject.
    pub reference_point: String,
    pub status_snapshot: StatusSnapshot,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Vec<String>>,
    /// Weak back-reference to an atlas frame. Never dereferenced by the engine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub atlas_frame_id: Option<String>,
    #[serde(default)]
    pub image_ids: Vec<String>,
}

impl Frame {
    pub fn has_module(&self, module: &str) -> bool {
        self.module_scope.iter().any(|m| m == module)
    }

    /// Parsed creation time, if the stored timestamp is valid RFC 3339.
    pub fn created_at(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        chrono::DateTime::parse_from_rfc3339(&self.timestamp)
            .ok()
            .map(|t| t.with_timezone(&chrono::Utc))
    }
}

/// Where the work stands at the moment the frame was captured.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StatusSnapshot {
    #[schemars(description = "The next concrete action to take when resuming")]
    pub next_action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(description = "Things blocking progress")]
    pub blockers: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(description = "Things blocking the merge")]
    pub merge_blockers: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(description = "Names of failing tests")]
    pub tests_failing: Option<Vec<String>>,
}

/// An image supplied with `frame_create`. `data` is stored as given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ImageAttachment {
    #[schemars(description = "Encoded image payload (e.g. base64)")]
    pub data: String,
    #[schemars(description = "MIME type: image/png, image/jpeg, image/gif or image/webp")]
    pub mime_type: String,
}

/// MIME types accepted for image attachments.
pub const ALLOWED_IMAGE_TYPES: &[&str] = &["image/png", "image/jpeg", "image/gif", "image/webp"];

/// How full-text terms combine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// Every term must match.
    #[default]
    All,
    /// At least one term must match.
    Any,
}

impl SearchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Any => "any",
        }
    }
}

/// Which search path satisfied a query. Observability only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStrategy {
    Fts,
    FtsOr,
    FilterJira,
    FilterBranch,
    None,
}

impl MatchStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fts => "fts",
            Self::FtsOr => "fts:or",
            Self::FilterJira => "filter:jira",
            Self::FilterBranch => "filter:branch",
            Self::None => "none",
        }
    }
}

impl std::fmt::Display for MatchStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for MatchStrategy {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}
