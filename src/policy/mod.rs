//! Module policy: the set of canonical module ids, their aliases, and the caller
//! rules between them.
//!
//! A missing or unreadable policy is not fatal to the server: the engine falls back
//! to unchecked mode where module scopes are stored verbatim.

pub mod atlas;
pub mod validator;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Relative locations searched when no explicit policy path is configured.
pub const DEFAULT_POLICY_LOCATIONS: &[&str] =
    &[".smartergpt/lex/lexmap.policy.json", "lexmap.policy.json"];

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("policy file not found: {0}")]
    NotFound(String),
    #[error("failed to read policy {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid policy {path}: {reason}")]
    Invalid { path: PathBuf, reason: String },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub owns_paths: Vec<String>,
    #[serde(default)]
    pub allowed_callers: Vec<String>,
    #[serde(default)]
    pub forbidden_callers: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    pub modules: BTreeMap<String, ModuleRule>,
    /// Alias → canonical module id.
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
    /// Where the policy was loaded from, if it came from disk.
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

impl Policy {
    /// Parse and check a policy document.
    pub fn from_json(json: &str, path: &Path) -> Result<Self, PolicyError> {
        let mut policy: Policy = serde_json::from_str(json).map_err(|e| PolicyError::Invalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        policy.check().map_err(|reason| PolicyError::Invalid {
            path: path.to_path_buf(),
            reason,
        })?;
        policy.source = Some(path.to_path_buf());
        Ok(policy)
    }

    fn check(&self) -> Result<(), String> {
        if let Some(empty) = self.modules.keys().find(|id| id.trim().is_empty()) {
            return Err(format!("module id {empty:?} is empty"));
        }
        for (alias, target) in &self.aliases {
            if !self.modules.contains_key(target) {
                return Err(format!("alias '{alias}' points to unknown module '{target}'"));
            }
            if self.modules.contains_key(alias) {
                return Err(format!("alias '{alias}' shadows a canonical module id"));
            }
        }
        Ok(())
    }

    pub fn is_canonical(&self, id: &str) -> bool {
        self.modules.contains_key(id)
    }

    /// Canonical id for `id`, following at most one alias hop.
    pub fn resolve(&self, id: &str) -> Option<&str> {
        if let Some((key, _)) = self.modules.get_key_value(id) {
            return Some(key.as_str());
        }
        self.aliases.get(id).map(String::as_str)
    }

    pub fn module_ids(&self) -> impl Iterator<Item = &str> {
        self.modules.keys().map(String::as_str)
    }
}

/// Load a policy from `path`, or search [`DEFAULT_POLICY_LOCATIONS`] under the
/// working directory.
pub fn load_policy(path: Option<&Path>) -> Result<Policy, PolicyError> {
    let candidates: Vec<PathBuf> = match path {
        Some(p) => vec![p.to_path_buf()],
        None => DEFAULT_POLICY_LOCATIONS.iter().map(PathBuf::from).collect(),
    };

    let Some(found) = candidates.iter().find(|p| p.is_file()) else {
        let tried = candidates
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        return Err(PolicyError::NotFound(tried));
    };

    let contents = std::fs::read_to_string(found).map_err(|source| PolicyError::Io {
        path: found.clone(),
        source,
    })?;
    let policy = Policy::from_json(&contents, found)?;
    tracing::info!(
        path = %found.display(),
        modules = policy.modules.len(),
        aliases = policy.aliases.len(),
        "policy loaded"
    );
    Ok(policy)
}
