//! Runtime configuration for a dashboard client.
//!
//! # Responsibility
//! - Select the persistence backend and name its storage slot.
//! - Carry logging settings for `init_logging`.
//!
//! # Invariants
//! - Identifiers (storage key, collection, document) match their patterns.
//! - A validated config can always be turned into a controller, given a
//!   remote store when `backend == remote`.

use crate::logging::default_log_level;
use crate::store::local_store::DEFAULT_STORAGE_KEY;
use crate::sync::remote_store::{SlotRef, DEFAULT_COLLECTION, DEFAULT_DOCUMENT};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

static STORAGE_KEY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-z0-9_]{0,63}$").expect("valid storage key regex"));
static SLOT_SEGMENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_\-]{1,128}$").expect("valid slot segment regex"));
static PROJECT_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-z0-9\-]{4,61}[a-z0-9]$").expect("valid project id regex"));

const SUPPORTED_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Persistence backend driving the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Local-only persisted slot.
    #[default]
    Local,
    /// Cloud document sync.
    Remote,
}

/// Address of the remote dashboard document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RemoteSlotConfig {
    /// Remote project identifier, when the store needs one.
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default = "default_collection")]
    pub collection: String,
    #[serde(default = "default_document")]
    pub document: String,
}

impl Default for RemoteSlotConfig {
    fn default() -> Self {
        Self {
            project_id: None,
            collection: default_collection(),
            document: default_document(),
        }
    }
}

impl RemoteSlotConfig {
    pub fn slot(&self) -> SlotRef {
        SlotRef::new(self.collection.as_str(), self.document.as_str())
    }
}

/// Top-level client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DashboardConfig {
    #[serde(default)]
    pub backend: BackendKind,
    #[serde(default = "default_storage_key")]
    pub storage_key: String,
    /// SQLite file for the local slot; in-memory when absent.
    #[serde(default)]
    pub database_path: Option<PathBuf>,
    #[serde(default)]
    pub remote: RemoteSlotConfig,
    #[serde(default)]
    pub log_level: Option<String>,
    /// Absolute directory for rolling log files.
    #[serde(default)]
    pub log_dir: Option<String>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            storage_key: default_storage_key(),
            database_path: None,
            remote: RemoteSlotConfig::default(),
            log_level: None,
            log_dir: None,
        }
    }
}

impl DashboardConfig {
    /// Parses and validates a JSON config document.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(raw).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Log level to hand to `init_logging`.
    pub fn effective_log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or(default_log_level())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !STORAGE_KEY_RE.is_match(&self.storage_key) {
            return Err(ConfigError::InvalidStorageKey(self.storage_key.clone()));
        }
        if !SLOT_SEGMENT_RE.is_match(&self.remote.collection) {
            return Err(ConfigError::InvalidSlotSegment {
                field: "remote.collection",
                value: self.remote.collection.clone(),
            });
        }
        if !SLOT_SEGMENT_RE.is_match(&self.remote.document) {
            return Err(ConfigError::InvalidSlotSegment {
                field: "remote.document",
                value: self.remote.document.clone(),
            });
        }
        if let Some(project_id) = &self.remote.project_id {
            if !PROJECT_ID_RE.is_match(project_id) {
                return Err(ConfigError::InvalidProjectId(project_id.clone()));
            }
        }
        if let Some(level) = &self.log_level {
            let normalized = level.trim().to_ascii_lowercase();
            if !SUPPORTED_LOG_LEVELS.contains(&normalized.as_str()) && normalized != "warning" {
                return Err(ConfigError::InvalidLogLevel(level.clone()));
            }
        }
        if let Some(log_dir) = &self.log_dir {
            if log_dir.trim().is_empty() {
                return Err(ConfigError::EmptyLogDir);
            }
        }
        Ok(())
    }
}

/// Configuration load/validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Parse(String),
    InvalidStorageKey(String),
    InvalidSlotSegment { field: &'static str, value: String },
    InvalidProjectId(String),
    InvalidLogLevel(String),
    EmptyLogDir,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(message) => write!(f, "config is not valid JSON: {message}"),
            Self::InvalidStorageKey(value) => write!(f, "storage_key is invalid: {value}"),
            Self::InvalidSlotSegment { field, value } => write!(f, "{field} is invalid: {value}"),
            Self::InvalidProjectId(value) => write!(f, "remote.project_id is invalid: {value}"),
            Self::InvalidLogLevel(value) => write!(
                f,
                "unsupported log level `{value}`; expected trace|debug|info|warn|error"
            ),
            Self::EmptyLogDir => write!(f, "log_dir cannot be empty"),
        }
    }
}

impl Error for ConfigError {}

fn default_storage_key() -> String {
    DEFAULT_STORAGE_KEY.to_string()
}

fn default_collection() -> String {
    DEFAULT_COLLECTION.to_string()
}

fn default_document() -> String {
    DEFAULT_DOCUMENT.to_string()
}
