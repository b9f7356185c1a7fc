// crates/ticket-id-config/src/config.rs
// ============================================================================
// Module: Ticket ID Configuration
// Description: Configuration loading and validation for ticket issuing.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: ticket-id-core, ticket-id-store-sqlite, serde, thiserror, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Missing or invalid configuration fails closed. The `[store]` section maps
//! onto [`SqliteStoreConfig`] and the `[allocation]` section onto
//! [`AllocationPolicy`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;
use ticket_id_core::AllocationPolicy;
use ticket_id_core::TicketIssuer;
use ticket_id_store_sqlite::SqliteStoreConfig;
use ticket_id_store_sqlite::SqliteTicketStore;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "ticket-id.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "TICKET_ID_CONFIG";
/// Maximum configuration file size in bytes.
pub const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Upper bound for `allocation.max_attempts`.
pub const MAX_ALLOCATION_ATTEMPTS: u32 = 32;
/// Upper bound for `allocation.retry_backoff_ms`.
pub const MAX_RETRY_BACKOFF_MS: u64 = 10_000;
/// Upper bound for `allocation.timeout_ms` and `store.busy_timeout_ms`.
pub const MAX_TIMEOUT_MS: u64 = 600_000;

// ============================================================================
// SECTION: Config
// ============================================================================

/// Ticket issuing configuration.
///
/// # Invariants
/// - `store.path` is non-empty and within path length limits.
/// - `allocation` values are within the documented ranges once
///   [`TicketIdConfig::validate`] succeeds.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TicketIdConfig {
    /// `SQLite` store settings.
    pub store: SqliteStoreConfig,
    /// Sequence allocation retry policy.
    #[serde(default)]
    pub allocation: AllocationPolicy,
}

impl TicketIdConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// The path is taken from `path`, then `TICKET_ID_CONFIG`, then
    /// `ticket-id.toml` in the working directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml(content)
    }

    /// Parses and validates configuration text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML and
    /// [`ConfigError::Invalid`] when validation fails.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a value is out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_store(&self.store)?;
        validate_allocation(&self.allocation)
    }

    /// Opens the configured store and returns an issuer over it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when validation fails and
    /// [`ConfigError::Store`] when the store cannot be opened.
    pub fn open_issuer(&self) -> Result<TicketIssuer<SqliteTicketStore>, ConfigError> {
        self.validate()?;
        let store = SqliteTicketStore::new(self.store.clone())
            .map_err(|err| ConfigError::Store(err.to_string()))?;
        Ok(TicketIssuer::new(store, self.allocation))
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
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
    /// The configured store could not be opened.
    #[error("config store error: {0}")]
    Store(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from the argument or environment defaults.
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
    if path.to_string_lossy().len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        if component.as_os_str().to_string_lossy().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates the `[store]` section.
fn validate_store(store: &SqliteStoreConfig) -> Result<(), ConfigError> {
    let path = store.path.to_string_lossy();
    let trimmed = path.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid("store.path must be non-empty".to_string()));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("store.path exceeds max length".to_string()));
    }
    for component in Path::new(trimmed).components() {
        if component.as_os_str().to_string_lossy().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("store.path path component too long".to_string()));
        }
    }
    if store.busy_timeout_ms > MAX_TIMEOUT_MS {
        return Err(ConfigError::Invalid(format!(
            "store.busy_timeout_ms must be at most {MAX_TIMEOUT_MS}"
        )));
    }
    Ok(())
}

/// Validates the `[allocation]` section.
fn validate_allocation(policy: &AllocationPolicy) -> Result<(), ConfigError> {
    if !(1 ..= MAX_ALLOCATION_ATTEMPTS).contains(&policy.max_attempts) {
        return Err(ConfigError::Invalid(format!(
            "allocation.max_attempts must be between 1 and {MAX_ALLOCATION_ATTEMPTS}"
        )));
    }
    if policy.retry_backoff_ms > MAX_RETRY_BACKOFF_MS {
        return Err(ConfigError::Invalid(format!(
            "allocation.retry_backoff_ms must be at most {MAX_RETRY_BACKOFF_MS}"
        )));
    }
    if !(1 ..= MAX_TIMEOUT_MS).contains(&policy.timeout_ms) {
        return Err(ConfigError::Invalid(format!(
            "allocation.timeout_ms must be between 1 and {MAX_TIMEOUT_MS}"
        )));
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
