// crates/clinvara-config/src/config.rs
// ============================================================================
// Module: Clinvara Configuration
// Description: Configuration loading and validation for Clinvara.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: clinvara-core, clinvara-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Every section has defaults, so an empty file is a valid in-memory setup.
//! Missing files, unknown keys, and out-of-range values fail closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use clinvara_core::CriteriaLimits;
use clinvara_core::EngineConfig;
use clinvara_store_sqlite::SqliteStoreConfig;
use clinvara_store_sqlite::SqliteStoreMode;
use clinvara_store_sqlite::SqliteSyncMode;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "clinvara.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "CLINVARA_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Default maximum criteria tree depth.
pub(crate) const DEFAULT_MAX_CRITERIA_DEPTH: usize = 32;
/// Upper bound for `engine.max_criteria_depth`.
pub(crate) const MAX_CRITERIA_DEPTH_LIMIT: usize = 256;
/// Default maximum criteria node count.
pub(crate) const DEFAULT_MAX_CRITERIA_NODES: usize = 1024;
/// Upper bound for `engine.max_criteria_nodes`.
pub(crate) const MAX_CRITERIA_NODES_LIMIT: usize = 65_536;
/// Default batch worker count.
pub(crate) const DEFAULT_BATCH_WORKERS: usize = 4;
/// Upper bound for `engine.batch_workers`.
pub(crate) const MAX_BATCH_WORKERS: usize = 256;
/// Default store busy timeout in milliseconds.
pub(crate) const DEFAULT_STORE_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Upper bound for `store.busy_timeout_ms`.
pub(crate) const MAX_STORE_BUSY_TIMEOUT_MS: u64 = 60_000;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Clinvara configuration (`clinvara.toml`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClinvaraConfig {
    /// Engine limits and batch settings.
    #[serde(default)]
    pub engine: EngineSection,
    /// Store backend configuration.
    #[serde(default)]
    pub store: StoreSection,
    /// Structured event sink configuration.
    #[serde(default)]
    pub events: EventsSection,
}

impl ClinvaraConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// Resolution order: `path`, then `CLINVARA_CONFIG`, then
    /// `./clinvara.toml`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| {
            ConfigError::Io(format!("{}: {err}", resolved.display()))
        })?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml_str(content)
    }

    /// Parses and validates configuration text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.engine.validate()?;
        self.store.validate()?;
        self.events.validate()?;
        Ok(())
    }
}

// ============================================================================
// SECTION: Engine Section
// ============================================================================

/// `[engine]` settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineSection {
    /// Maximum nesting depth of a criteria tree.
    #[serde(default = "default_max_criteria_depth")]
    pub max_criteria_depth: usize,
    /// Maximum node count across both criteria trees.
    #[serde(default = "default_max_criteria_nodes")]
    pub max_criteria_nodes: usize,
    /// Worker threads for batch re-evaluation.
    #[serde(default = "default_batch_workers")]
    pub batch_workers: usize,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            max_criteria_depth: DEFAULT_MAX_CRITERIA_DEPTH,
            max_criteria_nodes: DEFAULT_MAX_CRITERIA_NODES,
            batch_workers: DEFAULT_BATCH_WORKERS,
        }
    }
}

impl EngineSection {
    /// Validates engine limits.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_range(
            "engine.max_criteria_depth",
            self.max_criteria_depth,
            MAX_CRITERIA_DEPTH_LIMIT,
        )?;
        validate_range(
            "engine.max_criteria_nodes",
            self.max_criteria_nodes,
            MAX_CRITERIA_NODES_LIMIT,
        )?;
        validate_range("engine.batch_workers", self.batch_workers, MAX_BATCH_WORKERS)
    }

    /// Builds the engine configuration for these settings.
    #[must_use]
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            limits: CriteriaLimits {
                max_depth: self.max_criteria_depth,
                max_nodes: self.max_criteria_nodes,
            },
            batch_workers: self.batch_workers,
            ..EngineConfig::default()
        }
    }
}

/// Returns the default criteria depth limit.
const fn default_max_criteria_depth() -> usize {
    DEFAULT_MAX_CRITERIA_DEPTH
}

/// Returns the default criteria node limit.
const fn default_max_criteria_nodes() -> usize {
    DEFAULT_MAX_CRITERIA_NODES
}

/// Returns the default batch worker count.
const fn default_batch_workers() -> usize {
    DEFAULT_BATCH_WORKERS
}

// ============================================================================
// SECTION: Store Section
// ============================================================================

/// `[store]` settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreSection {
    /// Store backend type.
    #[serde(rename = "type", default)]
    pub store_type: StoreType,
    /// `SQLite` database path when using the sqlite backend.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_store_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` synchronous mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            store_type: StoreType::default(),
            path: None,
            busy_timeout_ms: DEFAULT_STORE_BUSY_TIMEOUT_MS,
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

impl StoreSection {
    /// Validates store configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match self.store_type {
            StoreType::Memory => {
                if self.path.is_some() {
                    return Err(ConfigError::Invalid(
                        "memory store must not set path".to_string(),
                    ));
                }
                Ok(())
            }
            StoreType::Sqlite => {
                let path = self.path.as_ref().ok_or_else(|| {
                    ConfigError::Invalid("sqlite store requires path".to_string())
                })?;
                validate_file_path("store.path", path)?;
                if self.busy_timeout_ms > MAX_STORE_BUSY_TIMEOUT_MS {
                    return Err(ConfigError::Invalid(format!(
                        "store.busy_timeout_ms must be at most {MAX_STORE_BUSY_TIMEOUT_MS}"
                    )));
                }
                Ok(())
            }
        }
    }

    /// Returns the `SQLite` settings when the sqlite backend is selected.
    #[must_use]
    pub fn sqlite_config(&self) -> Option<SqliteStoreConfig> {
        match (self.store_type, &self.path) {
            (StoreType::Sqlite, Some(path)) => Some(SqliteStoreConfig {
                path: path.clone(),
                busy_timeout_ms: self.busy_timeout_ms,
                journal_mode: self.journal_mode,
                sync_mode: self.sync_mode,
            }),
            _ => None,
        }
    }
}

/// Store backend type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreType {
    /// Use the in-memory stores (state ends with the process).
    #[default]
    Memory,
    /// Use the `SQLite`-backed durable store.
    Sqlite,
}

/// Returns the default busy timeout for store connections.
const fn default_store_busy_timeout_ms() -> u64 {
    DEFAULT_STORE_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Events Section
// ============================================================================

/// `[events]` settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EventsSection {
    /// Event sink type.
    #[serde(default)]
    pub sink: EventSinkType,
    /// Output path for the file sink.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl EventsSection {
    /// Validates event sink configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match self.sink {
            EventSinkType::None | EventSinkType::Stderr => {
                if self.path.is_some() {
                    return Err(ConfigError::Invalid(
                        "events.path is only valid with the file sink".to_string(),
                    ));
                }
                Ok(())
            }
            EventSinkType::File => {
                let path = self.path.as_ref().ok_or_else(|| {
                    ConfigError::Invalid("file event sink requires events.path".to_string())
                })?;
                validate_file_path("events.path", path)
            }
        }
    }
}

/// Event sink type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EventSinkType {
    /// Discard events.
    #[default]
    None,
    /// JSON lines on stderr.
    Stderr,
    /// JSON lines appended to a file.
    File,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a configured file path against length constraints.
fn validate_file_path(field: &str, path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.trim().is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Validates that `value` lies in `1..=max`.
fn validate_range(field: &str, value: usize, max: usize) -> Result<(), ConfigError> {
    if value == 0 || value > max {
        return Err(ConfigError::Invalid(format!("{field} must be between 1 and {max}")));
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test fixtures use explicit asserts and unwraps for clarity."
    )]

    use super::*;

    // ============================================================================
    // SECTION: Engine Section
    // ============================================================================

    #[test]
    fn engine_section_accepts_default() {
        assert!(EngineSection::default().validate().is_ok());
    }

    #[test]
    fn engine_section_rejects_zero_depth() {
        let section = EngineSection {
            max_criteria_depth: 0,
            ..EngineSection::default()
        };
        let err = section.validate().unwrap_err();
        assert!(err.to_string().contains("engine.max_criteria_depth"));
    }

    #[test]
    fn engine_section_accepts_limits_at_max() {
        let section = EngineSection {
            max_criteria_depth: MAX_CRITERIA_DEPTH_LIMIT,
            max_criteria_nodes: MAX_CRITERIA_NODES_LIMIT,
            batch_workers: MAX_BATCH_WORKERS,
        };
        assert!(section.validate().is_ok());
    }

    #[test]
    fn engine_section_rejects_nodes_above_max() {
        let section = EngineSection {
            max_criteria_nodes: MAX_CRITERIA_NODES_LIMIT + 1,
            ..EngineSection::default()
        };
        let err = section.validate().unwrap_err();
        assert!(err.to_string().contains("engine.max_criteria_nodes"));
    }

    #[test]
    fn engine_section_rejects_zero_workers() {
        let section = EngineSection {
            batch_workers: 0,
            ..EngineSection::default()
        };
        assert!(section.validate().unwrap_err().to_string().contains("engine.batch_workers"));
    }

    #[test]
    fn engine_section_maps_to_engine_config() {
        let section = EngineSection {
            max_criteria_depth: 6,
            max_criteria_nodes: 40,
            batch_workers: 2,
        };
        let config = section.engine_config();
        assert_eq!(config.limits.max_depth, 6);
        assert_eq!(config.limits.max_nodes, 40);
        assert_eq!(config.batch_workers, 2);
        assert_eq!(config.system_actor, EngineConfig::default().system_actor);
    }

    // ============================================================================
    // SECTION: Store Section
    // ============================================================================

    #[test]
    fn memory_store_rejects_path() {
        let section = StoreSection {
            path: Some(PathBuf::from("screening.db")),
            ..StoreSection::default()
        };
        assert!(section.validate().unwrap_err().to_string().contains("must not set path"));
        assert!(section.sqlite_config().is_none());
    }

    #[test]
    fn sqlite_store_requires_path() {
        let section = StoreSection {
            store_type: StoreType::Sqlite,
            ..StoreSection::default()
        };
        assert!(section.validate().unwrap_err().to_string().contains("requires path"));
    }

    #[test]
    fn sqlite_store_rejects_long_busy_timeout() {
        let section = StoreSection {
            store_type: StoreType::Sqlite,
            path: Some(PathBuf::from("screening.db")),
            busy_timeout_ms: MAX_STORE_BUSY_TIMEOUT_MS + 1,
            ..StoreSection::default()
        };
        assert!(section.validate().unwrap_err().to_string().contains("busy_timeout_ms"));
    }

    #[test]
    fn sqlite_store_builds_store_config() {
        let section = StoreSection {
            store_type: StoreType::Sqlite,
            path: Some(PathBuf::from("data/screening.db")),
            busy_timeout_ms: 750,
            journal_mode: SqliteStoreMode::Delete,
            sync_mode: SqliteSyncMode::Normal,
        };
        assert!(section.validate().is_ok());
        let config = section.sqlite_config().unwrap();
        assert_eq!(config.path, PathBuf::from("data/screening.db"));
        assert_eq!(config.busy_timeout_ms, 750);
        assert_eq!(config.journal_mode, SqliteStoreMode::Delete);
        assert_eq!(config.sync_mode, SqliteSyncMode::Normal);
    }

    // ============================================================================
    // SECTION: Events Section
    // ============================================================================

    #[test]
    fn file_sink_requires_path() {
        let section = EventsSection {
            sink: EventSinkType::File,
            path: None,
        };
        assert!(section.validate().unwrap_err().to_string().contains("events.path"));
    }

    #[test]
    fn stderr_sink_rejects_path() {
        let section = EventsSection {
            sink: EventSinkType::Stderr,
            path: Some(PathBuf::from("events.jsonl")),
        };
        assert!(section.validate().is_err());
    }

    #[test]
    fn file_sink_rejects_blank_path() {
        let section = EventsSection {
            sink: EventSinkType::File,
            path: Some(PathBuf::from("  ")),
        };
        assert!(section.validate().unwrap_err().to_string().contains("non-empty"));
    }
}
