// crates/provider-registry-store-sqlite/src/schema.rs
// ============================================================================
// Module: SQLite Provider Schema
// Description: Table layout and schema version management.
// Purpose: Create the provider tables once and refuse unknown versions.
// Dependencies: rusqlite, tracing
// ============================================================================

//! ## Overview
//! Every identity provider section lives in its own table keyed by the
//! provider id, so a section update only rewrites the rows it owns. Flags are
//! `INTEGER` columns constrained to `0`/`1`. Ids are `AUTOINCREMENT` and are
//! never reused after a delete. Child rows cascade on provider deletion.

// ============================================================================
// SECTION: Imports
// ============================================================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::params;

use crate::store::SqliteStoreError;
use crate::store::db_error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// `SQLite` schema version for the provider store.
pub(crate) const SCHEMA_VERSION: i64 = 1;

/// Tables and indexes for schema version 1.
const SCHEMA_V1: &str = "
CREATE TABLE IF NOT EXISTS idp (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    display_name TEXT,
    description TEXT,
    home_realm_id TEXT,
    is_federation_hub INTEGER NOT NULL DEFAULT 0 CHECK (is_federation_hub IN (0, 1)),
    claim_dialect_id INTEGER,
    is_local_claim_dialect INTEGER NOT NULL DEFAULT 0 CHECK (is_local_claim_dialect IN (0, 1)),
    is_enabled INTEGER NOT NULL DEFAULT 1 CHECK (is_enabled IN (0, 1))
);
CREATE TABLE IF NOT EXISTS idp_certificate (
    idp_id INTEGER NOT NULL REFERENCES idp(id) ON DELETE CASCADE,
    alias TEXT NOT NULL,
    certificate TEXT NOT NULL,
    PRIMARY KEY (idp_id, alias)
);
CREATE TABLE IF NOT EXISTS idp_role_mapping (
    idp_id INTEGER NOT NULL REFERENCES idp(id) ON DELETE CASCADE,
    local_role_id INTEGER NOT NULL,
    external_role TEXT NOT NULL,
    PRIMARY KEY (idp_id, local_role_id)
);
CREATE TABLE IF NOT EXISTS idp_property (
    idp_id INTEGER NOT NULL REFERENCES idp(id) ON DELETE CASCADE,
    property_key TEXT NOT NULL,
    property_value TEXT NOT NULL,
    PRIMARY KEY (idp_id, property_key)
);
CREATE INDEX IF NOT EXISTS idx_idp_property_lookup
    ON idp_property (property_key, property_value);
CREATE TABLE IF NOT EXISTS idp_requested_claim (
    idp_id INTEGER NOT NULL REFERENCES idp(id) ON DELETE CASCADE,
    claim_uri TEXT NOT NULL,
    PRIMARY KEY (idp_id, claim_uri)
);
CREATE TABLE IF NOT EXISTS idp_authenticator (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    idp_id INTEGER NOT NULL REFERENCES idp(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    is_enabled INTEGER NOT NULL DEFAULT 0 CHECK (is_enabled IN (0, 1)),
    UNIQUE (idp_id, name)
);
CREATE TABLE IF NOT EXISTS idp_authenticator_property (
    authenticator_id INTEGER NOT NULL REFERENCES idp_authenticator(id) ON DELETE CASCADE,
    property_key TEXT NOT NULL,
    property_value TEXT NOT NULL,
    PRIMARY KEY (authenticator_id, property_key)
);
CREATE INDEX IF NOT EXISTS idx_idp_authenticator_property_lookup
    ON idp_authenticator_property (property_key, property_value);
CREATE TABLE IF NOT EXISTS idp_provisioning_claim (
    idp_id INTEGER NOT NULL REFERENCES idp(id) ON DELETE CASCADE,
    claim_uri TEXT NOT NULL,
    default_value TEXT,
    PRIMARY KEY (idp_id, claim_uri)
);
CREATE TABLE IF NOT EXISTS idp_provisioning_role (
    idp_id INTEGER NOT NULL REFERENCES idp(id) ON DELETE CASCADE,
    role_name TEXT NOT NULL,
    PRIMARY KEY (idp_id, role_name)
);
CREATE TABLE IF NOT EXISTS idp_jit_provisioning_idp (
    idp_id INTEGER NOT NULL REFERENCES idp(id) ON DELETE CASCADE,
    provisioning_idp TEXT NOT NULL,
    PRIMARY KEY (idp_id, provisioning_idp)
);
CREATE TABLE IF NOT EXISTS idp_provisioner (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    idp_id INTEGER NOT NULL REFERENCES idp(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    is_enabled INTEGER NOT NULL DEFAULT 1 CHECK (is_enabled IN (0, 1)),
    UNIQUE (idp_id, name)
);
CREATE TABLE IF NOT EXISTS idp_provisioner_property (
    provisioner_id INTEGER NOT NULL REFERENCES idp_provisioner(id) ON DELETE CASCADE,
    property_key TEXT NOT NULL,
    property_value TEXT NOT NULL,
    PRIMARY KEY (provisioner_id, property_key)
);
CREATE INDEX IF NOT EXISTS idx_idp_provisioner_property_lookup
    ON idp_provisioner_property (property_key, property_value);
CREATE TABLE IF NOT EXISTS sp (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    display_name TEXT,
    description TEXT,
    is_enabled INTEGER NOT NULL DEFAULT 1 CHECK (is_enabled IN (0, 1)),
    config_json TEXT NOT NULL
);
";

// ============================================================================
// SECTION: Initialization
// ============================================================================

/// Initializes the schema or validates the existing version.
///
/// # Errors
///
/// Returns [`SqliteStoreError::VersionMismatch`] when the database carries a
/// version this build does not understand.
pub(crate) fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction().map_err(db_error)?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(db_error)?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()
        .map_err(db_error)?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
                .map_err(db_error)?;
            tx.execute_batch(SCHEMA_V1).map_err(db_error)?;
            tracing::info!(version = SCHEMA_VERSION, "initialized provider store schema");
        }
        Some(SCHEMA_VERSION) => {}
        Some(value) => {
            return Err(SqliteStoreError::VersionMismatch(format!(
                "unsupported schema version: {value}"
            )));
        }
    }
    tx.commit().map_err(db_error)?;
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Test-only assertions are permitted.")]
mod tests {
    use rusqlite::Connection;

    use super::SCHEMA_VERSION;
    use super::initialize_schema;

    #[test]
    fn initialization_is_repeatable() {
        let mut connection = Connection::open_in_memory().unwrap();
        initialize_schema(&mut connection).unwrap();
        initialize_schema(&mut connection).unwrap();
        let rows: i64 = connection
            .query_row("SELECT COUNT(*) FROM store_meta", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 1);
        let version: i64 =
            connection.query_row("SELECT version FROM store_meta", [], |row| row.get(0)).unwrap();
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[test]
    fn flag_columns_reject_non_boolean_values() {
        let mut connection = Connection::open_in_memory().unwrap();
        initialize_schema(&mut connection).unwrap();
        let result = connection.execute(
            "INSERT INTO idp (name, is_enabled) VALUES ('broken', 2)",
            [],
        );
        assert!(result.is_err());
    }
}
