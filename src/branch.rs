//! Branch recorded on new frames.
//!
//! Precedence: explicit argument, configured default, `.git/HEAD` under a configured
//! repository root, then `"unknown"`. The working directory is never consulted.

use std::path::Path;

pub const UNKNOWN_BRANCH: &str = "unknown";

pub fn resolve_branch(
    explicit: Option<&str>,
    default_branch: Option<&str>,
    repo_root: Option<&Path>,
) -> String {
    if let Some(branch) = explicit.map(str::trim).filter(|b| !b.is_empty()) {
        return branch.to_string();
    }
    if let Some(branch) = default_branch.map(str::trim).filter(|b| !b.is_empty()) {
        return branch.to_string();
    }
    repo_root
        .and_then(read_head_branch)
        .unwrap_or_else(|| UNKNOWN_BRANCH.to_string())
}

/// Branch named by `<root>/.git/HEAD`; `"detached"` for a bare commit hash.
fn read_head_branch(root: &Path) -> Option<String> {
    let head = std::fs::read_to_string(root.join(".git").join("HEAD")).ok()?;
    let head = head.trim();
    match head.strip_prefix("ref: ") {
        Some(reference) => Some(
            reference
                .strip_prefix("refs/heads/")
                .unwrap_or(reference)
                .to_string(),
        ),
        None if !head.is_empty() => Some("detached".to_string()),
        None => None,
    }
}
