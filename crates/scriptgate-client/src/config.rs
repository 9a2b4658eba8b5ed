// crates/scriptgate-client/src/config.rs
// ============================================================================
// Module: Script Gate Client Configuration
// Description: TOML configuration file loading, validation, and persistence.
// Purpose: Resolve the server, identity, and key settings for the pipeline.
// Dependencies: serde, thiserror, toml
// ============================================================================

//! ## Overview
//! [`ClientConfig`] is the local TOML configuration: server base URL, default
//! username, private-key path, and optional API credentials. Loading is
//! strict and fail-closed: unknown fields, oversized files, non-UTF-8 bytes,
//! and overlong paths are all rejected.
//! Invariants:
//! - The config path resolves from an explicit argument, then the
//!   `SCRIPTGATE_CONFIG` environment variable, then the home directory.
//! - Saved files carry owner-only permissions on Unix.
//! - API credentials are all-or-nothing: a client id without a secret (or
//!   the reverse) fails validation.
//!
//! Security posture: the config file is untrusted input; parsing fails
//! closed and the private key itself is never read here.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::transport::Credentials;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default config file name under the config directory.
pub const DEFAULT_CONFIG_NAME: &str = "scriptgate.toml";

/// Environment variable overriding the config file path.
pub const CONFIG_ENV_VAR: &str = "SCRIPTGATE_CONFIG";

/// Maximum accepted config file size in bytes.
const MAX_CONFIG_FILE_SIZE: u64 = 1_048_576;

/// Maximum accepted config path length in bytes.
const MAX_CONFIG_PATH_LEN: usize = 4_096;

/// Maximum accepted length of a single path component in bytes.
const MAX_PATH_COMPONENT_LEN: usize = 255;

// ============================================================================
// SECTION: Configuration Model
// ============================================================================

/// Local client configuration.
///
/// # Invariants
/// - `server` is required and non-empty after validation.
/// - `client_id` and `client_secret` are present together or not at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    /// Base URL of the script host.
    pub server: String,
    /// Default script owner used when a query names only a script.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Path to the RSA private key used for key unwrapping.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_path: Option<PathBuf>,
    /// API client identifier for authenticated fetches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    /// API client secret for authenticated fetches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
}

impl ClientConfig {
    /// Creates a config with only a server URL set.
    #[must_use]
    pub const fn new(server: String) -> Self {
        Self {
            server,
            username: None,
            key_path: None,
            client_id: None,
            client_secret: None,
        }
    }

    /// Loads and validates the config from `path`, the `SCRIPTGATE_CONFIG`
    /// environment variable, or the default home location, in that order.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the path cannot be resolved, the file
    /// violates a load guard, the TOML is invalid, or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = resolve_path(path)?;
        validate_path(&path)?;
        let metadata = fs::metadata(&path)
            .map_err(|err| ConfigError::Io(format!("cannot stat config file: {err}")))?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let bytes = fs::read(&path)
            .map_err(|err| ConfigError::Io(format!("cannot read config file: {err}")))?;
        let text = String::from_utf8(bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let config: Self =
            toml::from_str(&text).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes and writes the config, creating parent directories and
    /// restricting the file to owner-only permissions on Unix.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when validation fails, the path cannot be
    /// resolved, or the file cannot be written.
    pub fn save(&self, path: Option<&Path>) -> Result<PathBuf, ConfigError> {
        self.validate()?;
        let path = resolve_path(path)?;
        validate_path(&path)?;
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .map_err(|err| ConfigError::Io(format!("cannot create config dir: {err}")))?;
        }
        let text = toml::to_string_pretty(self)
            .map_err(|err| ConfigError::Parse(err.to_string()))?;
        fs::write(&path, text)
            .map_err(|err| ConfigError::Io(format!("cannot write config file: {err}")))?;
        restrict_permissions(&path)?;
        Ok(path)
    }

    /// Checks the structural invariants of the config.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the server URL is empty or the
    /// API credential pair is incomplete.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.trim().is_empty() {
            return Err(ConfigError::Invalid("server url must not be empty".to_string()));
        }
        if self.client_id.is_some() != self.client_secret.is_some() {
            return Err(ConfigError::Invalid(
                "client_id and client_secret must be set together".to_string(),
            ));
        }
        Ok(())
    }

    /// Derives transport credentials from the configured credential pair.
    #[must_use]
    pub fn credentials(&self) -> Credentials {
        match (self.client_id.as_deref(), self.client_secret.as_deref()) {
            (Some(client_id), Some(client_secret)) => Credentials::Basic {
                client_id: client_id.to_string(),
                client_secret: client_secret.to_string(),
            },
            _ => Credentials::Anonymous,
        }
    }
}

// ============================================================================
// SECTION: Path Resolution
// ============================================================================

/// Resolves the effective config path from the argument, environment, or
/// home-directory default.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Some(value) = std::env::var_os(CONFIG_ENV_VAR) {
        return Ok(PathBuf::from(value));
    }
    let home = std::env::var_os("HOME")
        .ok_or_else(|| ConfigError::Invalid("cannot resolve home directory".to_string()))?;
    let mut path = PathBuf::from(home);
    path.push(".config");
    path.push("scriptgate");
    path.push(DEFAULT_CONFIG_NAME);
    Ok(path)
}

/// Rejects overlong paths before any filesystem access.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    if path.as_os_str().len() > MAX_CONFIG_PATH_LEN {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        if component.as_os_str().len() > MAX_PATH_COMPONENT_LEN {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Restricts the config file to owner read/write on Unix.
#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
        .map_err(|err| ConfigError::Io(format!("cannot set config permissions: {err}")))
}

/// Permission restriction is a no-op on non-Unix targets.
#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
///
/// # Invariants
/// - Messages never include config field values beyond what the caller
///   already supplied.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Filesystem failure while reading or writing the config.
    #[error("config io failure: {0}")]
    Io(String),
    /// The TOML could not be parsed or serialized.
    #[error("config parse failure: {0}")]
    Parse(String),
    /// A load guard or structural invariant was violated.
    #[error("invalid config: {0}")]
    Invalid(String),
}
