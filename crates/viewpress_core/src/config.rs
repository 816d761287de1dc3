//! Runtime configuration for hosts embedding the core.
//!
//! # Responsibility
//! - Describe where the document store lives and how logging is set up.
//! - Load settings from JSON and apply `VIEWPRESS_*` environment overrides.
//!
//! # Invariants
//! - Every field has a default; an empty JSON object is a valid config.
//! - A missing `database_path` selects an in-memory store.

use crate::logging::{default_log_level, init_logging, LoggingError};
use crate::service::category_service::normalize_browse_limit;
use crate::store::{SqliteDocumentStore, StoreResult};
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const ENV_DB_PATH: &str = "VIEWPRESS_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "VIEWPRESS_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "VIEWPRESS_LOG_DIR";

const DEFAULT_EXCERPT_CHARS: usize = 100;

#[derive(Debug)]
pub enum ConfigError {
    Parse(serde_json::Error),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "invalid configuration: {err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoreConfig {
    /// SQLite file holding the documents; `None` keeps them in memory.
    pub database_path: Option<PathBuf>,
    pub log_level: String,
    /// Absolute directory for rolling log files; `None` disables file logs.
    pub log_dir: Option<String>,
    /// Browse window size before normalization.
    pub browse_limit: Option<u32>,
    /// Maximum excerpt length in post summaries.
    pub excerpt_chars: usize,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            log_level: default_log_level().to_string(),
            log_dir: None,
            browse_limit: None,
            excerpt_chars: DEFAULT_EXCERPT_CHARS,
        }
    }
}

impl CoreConfig {
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(text).map_err(ConfigError::Parse)
    }

    /// Defaults overridden by the process environment.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides(|name| std::env::var(name).ok())
    }

    /// Applies non-blank `VIEWPRESS_*` values returned by `lookup`.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        if let Some(path) = lookup(ENV_DB_PATH) {
            self.database_path = Some(PathBuf::from(path));
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            self.log_level = level;
        }
        if let Some(dir) = lookup(ENV_LOG_DIR) {
            self.log_dir = Some(dir);
        }
        self
    }

    /// Opens the configured document store, applying migrations.
    pub fn open_store(&self) -> StoreResult<SqliteDocumentStore> {
        match self.database_path.as_ref() {
            Some(path) => SqliteDocumentStore::open(path),
            None => SqliteDocumentStore::open_in_memory(),
        }
    }

    /// Starts file logging when `log_dir` is set; returns whether it did.
    pub fn init_logging(&self) -> Result<bool, LoggingError> {
        match self.log_dir.as_deref() {
            Some(dir) => init_logging(&self.log_level, dir).map(|()| true),
            None => Ok(false),
        }
    }

    pub fn effective_browse_limit(&self) -> u32 {
        normalize_browse_limit(self.browse_limit)
    }
}
