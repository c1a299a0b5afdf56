// crates/provider-registry-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Provider Store
// Description: Durable provider stores backed by SQLite.
// Purpose: Apply per-section updates transactionally and serve lookups.
// Dependencies: provider-registry-core, rusqlite, serde, thiserror, tracing
// ============================================================================

//! ## Overview
//! [`SqliteProviderStore`] implements [`IdentityProviderStore`] and
//! [`ServiceProviderStore`]. Writes go through a single write connection in
//! `IMMEDIATE` transactions, one transaction per operation, so each section
//! update is all-or-nothing. Reads are served from a small round-robin pool of
//! connections and load every section of an aggregate inside one read
//! transaction. Stored rows are untrusted: aggregates are rebuilt through the
//! core builders and rejected as corrupt when an invariant no longer holds.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use provider_registry_core::AuthenticationConfig;
use provider_registry_core::IdentityProvider;
use provider_registry_core::IdentityProviderId;
use provider_registry_core::IdentityProviderStore;
use provider_registry_core::Metadata;
use provider_registry_core::PropertyMap;
use provider_registry_core::PropertyScope;
use provider_registry_core::PropertyValue;
use provider_registry_core::ProviderKind;
use provider_registry_core::ProvisioningConfig;
use provider_registry_core::RegistryError;
use provider_registry_core::ServiceProvider;
use provider_registry_core::ServiceProviderId;
use provider_registry_core::ServiceProviderStore;
use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::Transaction;
use rusqlite::TransactionBehavior;
use rusqlite::params;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::schema::initialize_schema;
use crate::sections;
use crate::sections::from_sql_int;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Default number of read connections.
const DEFAULT_READ_POOL_SIZE: usize = 4;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `journal_mode` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode.
    Delete,
}

impl SqliteStoreMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `synchronous` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` provider store.
///
/// # Invariants
/// - `path` must resolve to a file path (not a directory).
/// - `busy_timeout_ms` is interpreted as milliseconds.
/// - `read_pool_size` must be greater than zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
    /// Number of read connections used for lookups.
    #[serde(default = "default_read_pool_size")]
    pub read_pool_size: usize,
}

impl SqliteStoreConfig {
    /// Creates a configuration with defaults for `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
            read_pool_size: DEFAULT_READ_POOL_SIZE,
        }
    }

    /// Checks limits and path safety without touching the filesystem.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::Invalid`] when a limit is out of range or
    /// the path is unsafe.
    pub fn validate(&self) -> Result<(), SqliteStoreError> {
        validate_runtime_limits(self)?;
        validate_store_path(&self.path)
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

/// Returns the default read connection pool size.
const fn default_read_pool_size() -> usize {
    DEFAULT_READ_POOL_SIZE
}

/// Validates runtime limits in the store configuration.
fn validate_runtime_limits(config: &SqliteStoreConfig) -> Result<(), SqliteStoreError> {
    if config.read_pool_size == 0 {
        return Err(SqliteStoreError::Invalid(
            "read_pool_size must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` store errors.
///
/// # Invariants
/// - Variants are stable for classification; messages are diagnostic only.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Stored rows no longer form a valid aggregate.
    #[error("sqlite store corruption: {0}")]
    Corrupt(String),
    /// Store schema version mismatch.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid configuration or input data.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
}

impl From<SqliteStoreError> for RegistryError {
    fn from(error: SqliteStoreError) -> Self {
        Self::data_access("sqlite provider store", error)
    }
}

/// Wraps an engine error.
pub(crate) fn db_error(err: rusqlite::Error) -> SqliteStoreError {
    SqliteStoreError::Db(err.to_string())
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// SQLite-backed identity provider and service provider store.
///
/// # Invariants
/// - Every write runs in one `IMMEDIATE` transaction on the write connection.
/// - Aggregate reads run inside one read transaction.
#[derive(Debug)]
pub struct SqliteProviderStore {
    /// Store configuration.
    config: SqliteStoreConfig,
    /// Connection used for every write.
    write_connection: Mutex<Connection>,
    /// Connections used for reads.
    read_connections: Vec<Mutex<Connection>>,
    /// Round-robin cursor into the read pool.
    read_cursor: AtomicUsize,
}

impl SqliteProviderStore {
    /// Opens (or creates) the store at the configured path.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the configuration is invalid, the
    /// database cannot be opened, or its schema version is unsupported.
    pub fn open(config: SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        config.validate()?;
        ensure_parent_dir(&config.path)?;
        let mut write_connection = open_connection(&config)?;
        initialize_schema(&mut write_connection)?;
        let read_connections = (0 .. config.read_pool_size)
            .map(|_| open_connection(&config).map(Mutex::new))
            .collect::<Result<Vec<_>, _>>()?;
        tracing::info!(
            path = %config.path.display(),
            read_pool_size = config.read_pool_size,
            "opened sqlite provider store"
        );
        Ok(Self {
            config,
            write_connection: Mutex::new(write_connection),
            read_connections,
            read_cursor: AtomicUsize::new(0),
        })
    }

    /// Returns the store configuration.
    #[must_use]
    pub const fn config(&self) -> &SqliteStoreConfig {
        &self.config
    }

    /// Closes every connection, reporting the first failure.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when a connection cannot be closed cleanly.
    pub fn close(self) -> Result<(), SqliteStoreError> {
        let Self {
            config,
            write_connection,
            read_connections,
            ..
        } = self;
        for connection in read_connections {
            close_connection(connection)?;
        }
        close_connection(write_connection)?;
        tracing::info!(path = %config.path.display(), "closed sqlite provider store");
        Ok(())
    }

    /// Verifies that a read connection answers queries.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the database is unreachable.
    pub fn check_connection(&self) -> Result<(), SqliteStoreError> {
        let guard = self
            .read_connection()
            .lock()
            .map_err(|_| SqliteStoreError::Io("sqlite read mutex poisoned".to_string()))?;
        guard.query_row("SELECT 1", [], |row| row.get::<_, i64>(0)).map_err(db_error)?;
        Ok(())
    }

    /// Returns the next read connection in round-robin order.
    fn read_connection(&self) -> &Mutex<Connection> {
        let len = self.read_connections.len();
        let index = self.read_cursor.fetch_add(1, Ordering::Relaxed) % len;
        &self.read_connections[index]
    }

    /// Runs `op` inside a read transaction on a pooled connection.
    ///
    /// Data access failures are tagged with `operation` and `target`.
    fn read<T>(
        &self,
        operation: &'static str,
        target: &dyn fmt::Display,
        op: impl FnOnce(&Connection) -> Result<T, RegistryError>,
    ) -> Result<T, RegistryError> {
        let run = || -> Result<T, RegistryError> {
            let mut guard = self
                .read_connection()
                .lock()
                .map_err(|_| SqliteStoreError::Io("sqlite read mutex poisoned".to_string()))?;
            let tx = guard.transaction().map_err(db_error)?;
            let value = op(&tx)?;
            tx.commit().map_err(db_error)?;
            Ok(value)
        };
        run().map_err(|err| err.in_context(operation, target))
    }

    /// Runs `op` inside an `IMMEDIATE` transaction; any error rolls back.
    ///
    /// Data access failures are tagged with `operation` and `target`.
    fn write<T>(
        &self,
        operation: &'static str,
        target: &dyn fmt::Display,
        op: impl FnOnce(&Transaction<'_>) -> Result<T, RegistryError>,
    ) -> Result<T, RegistryError> {
        let run = || -> Result<T, RegistryError> {
            let mut guard = self
                .write_connection
                .lock()
                .map_err(|_| SqliteStoreError::Io("sqlite write mutex poisoned".to_string()))?;
            let tx = guard
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .map_err(db_error)?;
            let value = op(&tx)?;
            tx.commit().map_err(db_error)?;
            Ok(value)
        };
        run().map_err(|err| err.in_context(operation, target))
    }
}

/// Maps an identifier onto its rowid.
///
/// Rowids are signed 64-bit, so larger identifiers cannot name a stored row.
fn stored_row(id: u64) -> Option<i64> {
    i64::try_from(id).ok()
}

/// Resolves the rowid of a provider that a write addresses.
fn idp_write_row(id: IdentityProviderId) -> Result<i64, RegistryError> {
    stored_row(id.get()).ok_or_else(|| RegistryError::idp_not_found(id))
}

/// Resolves the rowid of an application that a write addresses.
fn sp_write_row(id: ServiceProviderId) -> Result<i64, RegistryError> {
    stored_row(id.get()).ok_or_else(|| RegistryError::sp_not_found(id))
}

/// Fails with not-found unless the provider row exists.
fn require_idp(conn: &Connection, id: IdentityProviderId) -> Result<i64, RegistryError> {
    let row = idp_write_row(id)?;
    if !sections::idp_exists(conn, row)? {
        return Err(RegistryError::idp_not_found(id));
    }
    Ok(row)
}

/// Converts a rowid into an identity provider id.
fn idp_id_from_row(row: i64) -> Result<IdentityProviderId, SqliteStoreError> {
    IdentityProviderId::from_raw(from_sql_int(row)?)
        .ok_or_else(|| SqliteStoreError::Corrupt("identity provider id 0".to_string()))
}

/// Converts a rowid into a service provider id.
fn sp_id_from_row(row: i64) -> Result<ServiceProviderId, SqliteStoreError> {
    ServiceProviderId::from_raw(from_sql_int(row)?)
        .ok_or_else(|| SqliteStoreError::Corrupt("service provider id 0".to_string()))
}

/// Formats an identity provider target for error context.
fn idp_target(reference: impl fmt::Display) -> String {
    format!("identity provider '{reference}'")
}

/// Formats a service provider target for error context.
fn sp_target(reference: impl fmt::Display) -> String {
    format!("service provider '{reference}'")
}

// ============================================================================
// SECTION: Identity Provider Store
// ============================================================================

impl IdentityProviderStore for SqliteProviderStore {
    fn list_identity_providers(&self) -> Result<Vec<String>, RegistryError> {
        self.read("list_identity_providers", &"identity providers", |conn| {
            Ok(sections::list_idp_names(conn, false)?)
        })
    }

    fn list_enabled_identity_providers(&self) -> Result<Vec<String>, RegistryError> {
        self.read("list_enabled_identity_providers", &"identity providers", |conn| {
            Ok(sections::list_idp_names(conn, true)?)
        })
    }

    fn create_identity_provider(
        &self,
        provider: &IdentityProvider,
    ) -> Result<IdentityProviderId, RegistryError> {
        let target = idp_target(provider.name());
        let id = self.write("create_identity_provider", &target, |tx| {
            let row = sections::insert_idp_row(tx, provider)?;
            sections::write_all_sections(tx, row, provider)?;
            Ok(idp_id_from_row(row)?)
        })?;
        tracing::debug!(id = id.get(), name = provider.name(), "stored identity provider");
        Ok(id)
    }

    fn get_identity_provider(
        &self,
        id: IdentityProviderId,
    ) -> Result<Option<IdentityProvider>, RegistryError> {
        let Some(row) = stored_row(id.get()) else {
            return Ok(None);
        };
        self.read("get_identity_provider", &idp_target(id), |conn| {
            Ok(sections::load_idp(conn, row)?)
        })
    }

    fn get_identity_provider_by_name(
        &self,
        name: &str,
    ) -> Result<Option<IdentityProvider>, RegistryError> {
        self.read("get_identity_provider", &idp_target(name), |conn| {
            match sections::idp_id_by_name(conn, name)? {
                Some(row) => Ok(sections::load_idp(conn, row)?),
                None => Ok(None),
            }
        })
    }

    fn resolve_identity_provider_id(
        &self,
        name: &str,
    ) -> Result<Option<IdentityProviderId>, RegistryError> {
        self.read("resolve_identity_provider_id", &idp_target(name), |conn| {
            let row = sections::idp_id_by_name(conn, name)?;
            Ok(row.map(idp_id_from_row).transpose()?)
        })
    }

    fn find_identity_provider_by_property(
        &self,
        scope: PropertyScope,
        key: &str,
        value: &PropertyValue,
    ) -> Result<Option<IdentityProvider>, RegistryError> {
        let target = format!("identity provider with {} property '{key}'", scope.as_str());
        self.read("get_identity_provider_by_property", &target, |conn| {
            let rows = sections::idp_ids_by_property(conn, scope, key, value)?;
            if rows.len() > 1 {
                tracing::warn!(
                    scope = scope.as_str(),
                    key,
                    matches = rows.len(),
                    "property lookup matched several identity providers; using lowest id"
                );
            }
            match rows.first() {
                Some(row) => Ok(sections::load_idp(conn, *row)?),
                None => {
                    tracing::debug!(scope = scope.as_str(), key, "property lookup matched nothing");
                    Ok(None)
                }
            }
        })
    }

    fn update_identity_provider(&self, provider: &IdentityProvider) -> Result<(), RegistryError> {
        let id = provider.id().ok_or_else(|| {
            RegistryError::Validation("identity provider has not been created".to_string())
        })?;
        let row = idp_write_row(id)?;
        self.write("update_identity_provider", &idp_target(id), |tx| {
            if !sections::update_idp_row(tx, row, provider)? {
                return Err(RegistryError::idp_not_found(id));
            }
            sections::write_all_sections(tx, row, provider)?;
            Ok(())
        })
    }

    fn delete_identity_provider(&self, id: IdentityProviderId) -> Result<(), RegistryError> {
        let row = idp_write_row(id)?;
        self.write("delete_identity_provider", &idp_target(id), |tx| {
            let removed =
                tx.execute("DELETE FROM idp WHERE id = ?1", params![row]).map_err(db_error)?;
            if removed == 0 {
                return Err(RegistryError::idp_not_found(id));
            }
            Ok(())
        })
    }

    fn set_identity_provider_enabled(
        &self,
        id: IdentityProviderId,
        enabled: bool,
    ) -> Result<(), RegistryError> {
        let row = idp_write_row(id)?;
        let operation =
            if enabled { "enable_identity_provider" } else { "disable_identity_provider" };
        self.write(operation, &idp_target(id), |tx| {
            let changed = tx
                .execute("UPDATE idp SET is_enabled = ?1 WHERE id = ?2", params![enabled, row])
                .map_err(db_error)?;
            if changed == 0 {
                return Err(RegistryError::idp_not_found(id));
            }
            Ok(())
        })
    }

    fn update_metadata(
        &self,
        id: IdentityProviderId,
        metadata: &Metadata,
    ) -> Result<(), RegistryError> {
        let row = idp_write_row(id)?;
        self.write("update_idp_metadata", &idp_target(id), |tx| {
            let stored_name =
                sections::idp_name(tx, row)?.ok_or_else(|| RegistryError::idp_not_found(id))?;
            ProviderKind::for_name(&stored_name).check_metadata(metadata)?;
            sections::replace_metadata(tx, row, metadata)
        })
    }

    fn update_authentication_config(
        &self,
        id: IdentityProviderId,
        config: &AuthenticationConfig,
    ) -> Result<(), RegistryError> {
        config.validate()?;
        self.write("update_idp_authentication_config", &idp_target(id), |tx| {
            let row = require_idp(tx, id)?;
            let section = Some(config).filter(|config| !config.is_empty());
            Ok(sections::write_authentication(tx, row, section)?)
        })
    }

    fn update_provisioning_config(
        &self,
        id: IdentityProviderId,
        config: &ProvisioningConfig,
    ) -> Result<(), RegistryError> {
        config.validate()?;
        self.write("update_idp_provisioning_config", &idp_target(id), |tx| {
            let row = require_idp(tx, id)?;
            Ok(sections::write_provisioning(tx, row, config)?)
        })
    }

    fn merge_properties(
        &self,
        id: IdentityProviderId,
        delta: &PropertyMap,
    ) -> Result<(), RegistryError> {
        self.write("update_idp_properties", &idp_target(id), |tx| {
            let row = require_idp(tx, id)?;
            Ok(sections::merge_properties(tx, row, delta)?)
        })
    }

    fn readiness(&self) -> Result<(), RegistryError> {
        self.check_connection()
            .map_err(|err| RegistryError::from(err).in_context("readiness", &"sqlite store"))
    }
}

// ============================================================================
// SECTION: Service Provider Store
// ============================================================================

impl ServiceProviderStore for SqliteProviderStore {
    fn create_service_provider(
        &self,
        provider: &ServiceProvider,
    ) -> Result<ServiceProviderId, RegistryError> {
        self.write("create_service_provider", &sp_target(provider.name()), |tx| {
            let row = sections::insert_sp_row(tx, provider)?;
            Ok(sp_id_from_row(row)?)
        })
    }

    fn get_service_provider(
        &self,
        id: ServiceProviderId,
    ) -> Result<Option<ServiceProvider>, RegistryError> {
        let Some(row) = stored_row(id.get()) else {
            return Ok(None);
        };
        self.read("get_service_provider", &sp_target(id), |conn| Ok(sections::load_sp(conn, row)?))
    }

    fn get_service_provider_by_name(
        &self,
        name: &str,
    ) -> Result<Option<ServiceProvider>, RegistryError> {
        self.read("get_service_provider", &sp_target(name), |conn| {
            match sections::sp_id_by_name(conn, name)? {
                Some(row) => Ok(sections::load_sp(conn, row)?),
                None => Ok(None),
            }
        })
    }

    fn resolve_service_provider_id(
        &self,
        name: &str,
    ) -> Result<Option<ServiceProviderId>, RegistryError> {
        self.read("resolve_service_provider_id", &sp_target(name), |conn| {
            let row = sections::sp_id_by_name(conn, name)?;
            Ok(row.map(sp_id_from_row).transpose()?)
        })
    }

    fn list_service_providers(&self) -> Result<Vec<String>, RegistryError> {
        self.read("list_service_providers", &"service providers", |conn| {
            Ok(sections::list_sp_names(conn, false)?)
        })
    }

    fn list_enabled_service_providers(&self) -> Result<Vec<String>, RegistryError> {
        self.read("list_enabled_service_providers", &"service providers", |conn| {
            Ok(sections::list_sp_names(conn, true)?)
        })
    }

    fn update_service_provider(&self, provider: &ServiceProvider) -> Result<(), RegistryError> {
        let id = provider.id().ok_or_else(|| {
            RegistryError::Validation("service provider has not been created".to_string())
        })?;
        let row = sp_write_row(id)?;
        self.write("update_service_provider", &sp_target(id), |tx| {
            if !sections::update_sp_row(tx, row, provider)? {
                return Err(RegistryError::sp_not_found(id));
            }
            Ok(())
        })
    }

    fn delete_service_provider(&self, id: ServiceProviderId) -> Result<(), RegistryError> {
        let row = sp_write_row(id)?;
        self.write("delete_service_provider", &sp_target(id), |tx| {
            let removed =
                tx.execute("DELETE FROM sp WHERE id = ?1", params![row]).map_err(db_error)?;
            if removed == 0 {
                return Err(RegistryError::sp_not_found(id));
            }
            Ok(())
        })
    }

    fn set_service_provider_enabled(
        &self,
        id: ServiceProviderId,
        enabled: bool,
    ) -> Result<(), RegistryError> {
        let row = sp_write_row(id)?;
        let operation =
            if enabled { "enable_service_provider" } else { "disable_service_provider" };
        self.write(operation, &sp_target(id), |tx| {
            let changed = tx
                .execute("UPDATE sp SET is_enabled = ?1 WHERE id = ?2", params![enabled, row])
                .map_err(db_error)?;
            if changed == 0 {
                return Err(RegistryError::sp_not_found(id));
            }
            Ok(())
        })
    }
}

// ============================================================================
// SECTION: Connection Helpers
// ============================================================================

/// Ensures the parent directory for the database exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteStoreError::Io("store path missing parent directory".to_string()));
    };
    std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

/// Validates store paths for safety limits.
fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    if path.as_os_str().is_empty() {
        return Err(SqliteStoreError::Invalid("store path must not be empty".to_string()));
    }
    if path.display().to_string().len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds length limit".to_string()));
    }
    if path
        .components()
        .any(|component| component.as_os_str().to_string_lossy().len() > MAX_PATH_COMPONENT_LENGTH)
    {
        return Err(SqliteStoreError::Invalid(
            "store path contains an overlong component".to_string(),
        ));
    }
    if path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens an `SQLite` connection with secure defaults.
fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags).map_err(db_error)?;
    apply_pragmas(&connection, config)?;
    Ok(connection)
}

/// Applies the pragmas every connection needs.
fn apply_pragmas(
    connection: &Connection,
    config: &SqliteStoreConfig,
) -> Result<(), SqliteStoreError> {
    connection.execute_batch("PRAGMA foreign_keys = ON;").map_err(db_error)?;
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(db_error)?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))
        .map_err(db_error)?;
    connection.busy_timeout(Duration::from_millis(config.busy_timeout_ms)).map_err(db_error)?;
    Ok(())
}

/// Closes one pooled connection.
fn close_connection(connection: Mutex<Connection>) -> Result<(), SqliteStoreError> {
    let connection = connection
        .into_inner()
        .map_err(|_| SqliteStoreError::Io("sqlite connection mutex poisoned".to_string()))?;
    connection.close().map_err(|(_, err)| db_error(err))
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Test-only assertions are permitted.")]
mod tests {
    use std::path::PathBuf;

    use super::SqliteStoreConfig;
    use super::SqliteStoreError;
    use super::validate_store_path;

    #[test]
    fn zero_read_pool_is_rejected() {
        let mut config = SqliteStoreConfig::new("store.db");
        config.read_pool_size = 0;
        assert!(matches!(config.validate(), Err(SqliteStoreError::Invalid(_))));
    }

    #[test]
    fn overlong_component_is_rejected() {
        let path = PathBuf::from("a".repeat(300));
        assert!(matches!(validate_store_path(&path), Err(SqliteStoreError::Invalid(_))));
    }

    #[test]
    fn empty_path_is_rejected() {
        assert!(validate_store_path(&PathBuf::new()).is_err());
    }

    #[test]
    fn config_defaults_apply_when_fields_are_omitted() {
        let config: SqliteStoreConfig = serde_json::from_str(r#"{"path":"x.db"}"#).unwrap();
        assert_eq!(config, SqliteStoreConfig::new("x.db"));
    }
}
