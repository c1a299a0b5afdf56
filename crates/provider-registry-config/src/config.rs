// crates/provider-registry-config/src/config.rs
// ============================================================================
// Module: Provider Registry Configuration
// Description: Configuration loading and validation for the provider registry.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: provider-registry-core, provider-registry-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! The path is taken from the caller, then from `PROVIDER_REGISTRY_CONFIG`,
//! then defaults to `provider-registry.toml`. Unknown fields and invalid
//! values fail closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use provider_registry_core::AuditInterceptor;
use provider_registry_core::FileAuditSink;
use provider_registry_core::IdentityProviderService;
use provider_registry_core::StderrAuditSink;
use provider_registry_store_sqlite::SqliteProviderStore;
use provider_registry_store_sqlite::SqliteStoreConfig;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "provider-registry.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "PROVIDER_REGISTRY_CONFIG";
/// Maximum configuration file size in bytes.
pub const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;

// ============================================================================
// SECTION: Config Model
// ============================================================================

/// Top-level provider registry configuration.
///
/// # Invariants
/// - `store` is always present; there is no implicit database location.
/// - [`RegistryConfig::validate`] has passed for values returned by
///   [`RegistryConfig::load`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistryConfig {
    /// Relational store settings.
    pub store: SqliteStoreConfig,
    /// Audit sink settings.
    #[serde(default)]
    pub audit: AuditConfig,
}

/// Audit sink selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditSinkKind {
    /// Auditing disabled.
    #[default]
    None,
    /// JSON lines on stderr.
    Stderr,
    /// JSON lines appended to a file.
    File,
}

/// Audit configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuditConfig {
    /// Selected sink.
    #[serde(default)]
    pub sink: AuditSinkKind,
    /// Log file path, required for the `file` sink only.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl AuditConfig {
    /// Validates sink/path consistency.
    fn validate(&self) -> Result<(), ConfigError> {
        match (self.sink, &self.path) {
            (AuditSinkKind::File, None) => {
                Err(ConfigError::Invalid("file audit sink requires path".to_string()))
            }
            (AuditSinkKind::File, Some(path)) => validate_path(path, "audit path"),
            (_, Some(_)) => {
                Err(ConfigError::Invalid("audit path is only valid for the file sink".to_string()))
            }
            (_, None) => Ok(()),
        }
    }
}

impl RegistryConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path, env::var(CONFIG_ENV_VAR).ok())?;
        validate_path(&resolved, "config path")?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        let config = Self::from_bytes(&bytes)?;
        tracing::info!(path = %resolved.display(), "loaded provider registry config");
        Ok(config)
    }

    /// Parses and validates configuration from raw file contents.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the contents are oversized, not UTF-8,
    /// malformed, or invalid.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ConfigError> {
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when any section is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.store.validate().map_err(|err| ConfigError::Invalid(format!("store: {err}")))?;
        self.audit.validate()
    }

    /// Builds the configured audit interceptor, if auditing is enabled.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the audit section is invalid or the log
    /// file cannot be opened.
    pub fn build_audit_interceptor(&self) -> Result<Option<AuditInterceptor>, ConfigError> {
        self.audit.validate()?;
        match (self.audit.sink, &self.audit.path) {
            (AuditSinkKind::None, _) => Ok(None),
            (AuditSinkKind::Stderr, _) => {
                Ok(Some(AuditInterceptor::new(Arc::new(StderrAuditSink))))
            }
            (AuditSinkKind::File, Some(path)) => {
                let sink =
                    FileAuditSink::new(path).map_err(|err| ConfigError::Io(err.to_string()))?;
                Ok(Some(AuditInterceptor::new(Arc::new(sink))))
            }
            (AuditSinkKind::File, None) => {
                Err(ConfigError::Invalid("file audit sink requires path".to_string()))
            }
        }
    }

    /// Opens the store and returns a service with auditing registered.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when validation fails, the store cannot be
    /// opened, or the audit sink cannot be created.
    pub fn open_service(
        &self,
    ) -> Result<IdentityProviderService<SqliteProviderStore>, ConfigError> {
        self.validate()?;
        let audit = self.build_audit_interceptor()?;
        let store = SqliteProviderStore::open(self.store.clone())
            .map_err(|err| ConfigError::Io(err.to_string()))?;
        let mut service = IdentityProviderService::new(store);
        if let Some(audit) = audit {
            service.register_interceptor(Arc::new(audit));
        }
        Ok(service)
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// I/O failure while reading configuration or opening resources.
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

/// Resolves the config path from the caller, the environment, or the default.
fn resolve_path(path: Option<&Path>, env_path: Option<String>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Some(env_path) = env_path {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates a path against length limits; `label` prefixes error messages.
fn validate_path(path: &Path, label: &str) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.trim().is_empty() {
        return Err(ConfigError::Invalid(format!("{label} must be non-empty")));
    }
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{label} exceeds max length")));
    }
    for component in path.components() {
        if component.as_os_str().to_string_lossy().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{label} component too long")));
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Test-only assertions are permitted.")]
mod tests {
    use std::path::Path;
    use std::path::PathBuf;

    use super::DEFAULT_CONFIG_NAME;
    use super::resolve_path;

    #[test]
    fn explicit_path_wins_over_environment() {
        let resolved =
            resolve_path(Some(Path::new("explicit.toml")), Some("env.toml".to_string())).unwrap();
        assert_eq!(resolved, PathBuf::from("explicit.toml"));
    }

    #[test]
    fn environment_is_used_before_default() {
        let resolved = resolve_path(None, Some("env.toml".to_string())).unwrap();
        assert_eq!(resolved, PathBuf::from("env.toml"));
        assert_eq!(resolve_path(None, None).unwrap(), PathBuf::from(DEFAULT_CONFIG_NAME));
    }

    #[test]
    fn overlong_environment_path_is_rejected() {
        assert!(resolve_path(None, Some("a".repeat(5000))).is_err());
    }
}
