use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct TesseraConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub policy: PolicyConfig,
    pub repository: RepositoryConfig,
    pub idempotency: IdempotencyConfig,
    pub query: QueryConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub log_level: String,
    pub debug: bool,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct PolicyConfig {
    /// Explicit policy file. When unset the loader searches the working directory.
    pub path: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct RepositoryConfig {
    /// Repository root used to read the current branch from `.git/HEAD`.
    pub root: Option<String>,
    /// Branch recorded on frames when the caller does not pass one.
    pub default_branch: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct IdempotencyConfig {
    pub ttl_hours: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct QueryConfig {
    /// Records fetched before client-side jira/branch/module filtering.
    /// Matches beyond this bound are not visible to filtered queries.
    pub fetch_bound: usize,
    /// Upper bound accepted for the `limit` argument.
    pub max_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
            debug: false,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let db_path = default_tessera_dir()
            .join("frames.db")
            .to_string_lossy()
            .into_owned();
        Self { db_path }
    }
}

impl Default for IdempotencyConfig {
    fn default() -> Self {
        Self { ttl_hours: 24 }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            fetch_bound: crate::frame::query::DEFAULT_FETCH_BOUND,
            max_limit: 100,
        }
    }
}

/// Returns `~/.tessera/`, or `./.tessera/` when no home directory is known.
pub fn default_tessera_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".tessera")
}

/// Returns the default config file path: `~/.tessera/config.toml`
pub fn default_config_path() -> PathBuf {
    default_tessera_dir().join("config.toml")
}

impl TesseraConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            TesseraConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides.
    ///
    /// `TESSERA_DB`, `TESSERA_POLICY_PATH`, `TESSERA_DEFAULT_BRANCH`,
    /// `TESSERA_REPO_ROOT`, `TESSERA_LOG_LEVEL`, `TESSERA_DEBUG`.
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("TESSERA_DB") {
            self.storage.db_path = val;
        }
        if let Ok(val) = std::env::var("TESSERA_POLICY_PATH") {
            self.policy.path = Some(val);
        }
        if let Ok(val) = std::env::var("TESSERA_DEFAULT_BRANCH") {
            self.repository.default_branch = Some(val);
        }
        if let Ok(val) = std::env::var("TESSERA_REPO_ROOT") {
            self.repository.root = Some(val);
        }
        if let Ok(val) = std::env::var("TESSERA_LOG_LEVEL") {
            self.server.log_level = val;
        }
        if let Ok(val) = std::env::var("TESSERA_DEBUG") {
            self.server.debug = matches!(val.as_str(), "1" | "true" | "yes");
        }
    }

    /// Effective tracing filter. The debug flag wins over the configured level.
    pub fn log_filter(&self) -> &str {
        if self.server.debug {
            "debug"
        } else {
            &self.server.log_level
        }
    }

    /// Resolve the database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
