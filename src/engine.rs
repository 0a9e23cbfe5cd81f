//! Engine context: everything a dispatch needs, passed explicitly.
//!
//! [`EngineSettings`] is derived from [`TesseraConfig`] once; handlers read settings,
//! the policy, the stores and the idempotency cache from the [`EngineContext`] they
//! are given and never from the process environment.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde_json::json;

use crate::config::TesseraConfig;
use crate::error::{ErrorCode, ToolError};
use crate::frame::query::DEFAULT_FETCH_BOUND;
use crate::frame::store::{FrameStore, ImageStore};
use crate::idempotency::{IdempotencyCache, DEFAULT_TTL};
use crate::policy::{load_policy, Policy, PolicyError};
use crate::tools::{self, RegistryError, ToolOutput};

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub policy_path: Option<PathBuf>,
    pub debug: bool,
    pub default_branch: Option<String>,
    pub repo_root: Option<PathBuf>,
    pub idempotency_ttl: Duration,
    pub fetch_bound: usize,
    pub max_limit: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            policy_path: None,
            debug: false,
            default_branch: None,
            repo_root: None,
            idempotency_ttl: DEFAULT_TTL,
            fetch_bound: DEFAULT_FETCH_BOUND,
            max_limit: 100,
        }
    }
}

impl EngineSettings {
    pub fn from_config(config: &TesseraConfig) -> Self {
        Self {
            policy_path: config
                .policy
                .path
                .as_deref()
                .map(crate::config::expand_tilde),
            debug: config.server.debug,
            default_branch: config.repository.default_branch.clone(),
            repo_root: config
                .repository
                .root
                .as_deref()
                .map(crate::config::expand_tilde),
            idempotency_ttl: Duration::from_secs(
                config.idempotency.ttl_hours.saturating_mul(60 * 60),
            ),
            fetch_bound: config.query.fetch_bound.max(1),
            max_limit: config.query.max_limit.max(1),
        }
    }
}

/// Outcome of loading the module policy at startup.
#[derive(Debug, Clone)]
pub enum PolicyState {
    Loaded(Arc<Policy>),
    /// No policy file was found; module scopes are accepted verbatim.
    Missing(String),
    /// A policy file exists but could not be used.
    Invalid(String),
}

impl From<PolicyError> for PolicyState {
    fn from(err: PolicyError) -> Self {
        match err {
            PolicyError::NotFound(_) => Self::Missing(err.to_string()),
            PolicyError::Io { .. } | PolicyError::Invalid { .. } => Self::Invalid(err.to_string()),
        }
    }
}

pub struct EngineContext {
    pub settings: EngineSettings,
    pub store: Arc<dyn FrameStore>,
    pub images: Arc<dyn ImageStore>,
    policy: PolicyState,
    pub cache: IdempotencyCache<ToolOutput>,
    warned_aliases: Mutex<HashSet<String>>,
}

impl EngineContext {
    /// Build a context with an explicit policy (`None` = unchecked mode).
    ///
    /// Fails if the static tool/alias tables are inconsistent.
    pub fn new(
        settings: EngineSettings,
        store: Arc<dyn FrameStore>,
        images: Arc<dyn ImageStore>,
        policy: Option<Policy>,
    ) -> Result<Self, RegistryError> {
        let state = match policy {
            Some(policy) => PolicyState::Loaded(Arc::new(policy)),
            None => PolicyState::Missing("no policy configured".into()),
        };
        Self::with_policy_state(settings, store, images, state)
    }

    pub fn with_policy_state(
        settings: EngineSettings,
        store: Arc<dyn FrameStore>,
        images: Arc<dyn ImageStore>,
        policy: PolicyState,
    ) -> Result<Self, RegistryError> {
        tools::check_registry()?;
        let cache = IdempotencyCache::with_ttl(settings.idempotency_ttl);
        Ok(Self {
            settings,
            store,
            images,
            policy,
            cache,
            warned_aliases: Mutex::new(HashSet::new()),
        })
    }

    /// Build a context, loading the policy from the configured location. A policy
    /// that cannot be loaded degrades to unchecked mode.
    pub fn load(
        settings: EngineSettings,
        store: Arc<dyn FrameStore>,
        images: Arc<dyn ImageStore>,
    ) -> Result<Self, RegistryError> {
        let policy = match load_policy(settings.policy_path.as_deref()) {
            Ok(policy) => PolicyState::Loaded(Arc::new(policy)),
            Err(e) => {
                tracing::warn!(error = %e, "no policy loaded, module scope will not be validated");
                PolicyState::from(e)
            }
        };
        Self::with_policy_state(settings, store, images, policy)
    }

    /// The loaded policy, or `None` in unchecked mode.
    pub fn policy(&self) -> Option<&Policy> {
        match &self.policy {
            PolicyState::Loaded(policy) => Some(policy.as_ref()),
            PolicyState::Missing(_) | PolicyState::Invalid(_) => None,
        }
    }

    pub fn policy_state(&self) -> &PolicyState {
        &self.policy
    }

    /// The loaded policy, or the error a policy-dependent tool should return.
    pub fn require_policy(&self) -> Result<&Policy, ToolError> {
        match &self.policy {
            PolicyState::Loaded(policy) => Ok(policy.as_ref()),
            PolicyState::Missing(reason) => Err(ToolError::guidance(
                ErrorCode::PolicyNotFound,
                "No module policy is loaded",
                [
                    "Create .smartergpt/lex/lexmap.policy.json in the working directory",
                    "Point TESSERA_POLICY_PATH at an existing policy file",
                ],
            )
            .with_context(json!({ "reason": reason, "hintId": "hint_policy_missing" }))),
            PolicyState::Invalid(reason) => Err(ToolError::domain(
                ErrorCode::PolicyInvalid,
                "The module policy could not be loaded",
            )
            .with_context(json!({ "reason": reason }))),
        }
    }

    pub fn resolve_branch(&self, explicit: Option<&str>) -> String {
        crate::branch::resolve_branch(
            explicit,
            self.settings.default_branch.as_deref(),
            self.settings.repo_root.as_deref(),
        )
    }

    /// Log a deprecation warning the first time `alias` is used on this engine.
    /// Returns `true` if this call emitted the warning.
    pub fn note_deprecated_alias(&self, alias: &str, canonical: &str) -> bool {
        let mut warned = self
            .warned_aliases
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let first = warned.insert(alias.to_string());
        if first {
            tracing::warn!(
                alias = %alias,
                canonical = %canonical,
                "tool name '{alias}' is deprecated, use '{canonical}'"
            );
        }
        first
    }

    /// Run `f` against the frame store on the blocking pool.
    pub async fn with_store<T, F>(&self, f: F) -> Result<T, ToolError>
    where
        F: FnOnce(&dyn FrameStore) -> Result<T, ToolError> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || f(store.as_ref()))
            .await
            .map_err(|e| ToolError::Unmapped(anyhow::anyhow!("store task failed: {e}")))?
    }

    /// Run `f` against the frame and image stores on the blocking pool.
    pub async fn with_stores<T, F>(&self, f: F) -> Result<T, ToolError>
    where
        F: FnOnce(&dyn FrameStore, &dyn ImageStore) -> Result<T, ToolError> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        let images = Arc::clone(&self.images);
        tokio::task::spawn_blocking(move || f(store.as_ref(), images.as_ref()))
            .await
            .map_err(|e| ToolError::Unmapped(anyhow::anyhow!("store task failed: {e}")))?
    }
}
