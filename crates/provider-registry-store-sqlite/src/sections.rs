// crates/provider-registry-store-sqlite/src/sections.rs
// ============================================================================
// Module: SQLite Section Rows
// Description: Row-level reads and writes for each provider section.
// Purpose: Keep every section's SQL in one place so updates stay granular.
// Dependencies: provider-registry-core, rusqlite, serde_json, tracing
// ============================================================================

//! ## Overview
//! Each identity provider section maps to its own set of rows. Writers here
//! replace exactly one section and never touch rows owned by another one;
//! callers wrap them in a transaction. Readers rebuild aggregates through the
//! public builders so a row set that violates an invariant surfaces as
//! [`SqliteStoreError::Corrupt`] instead of an unchecked value.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use provider_registry_core::AuthenticationConfig;
use provider_registry_core::AuthenticatorConfig;
use provider_registry_core::ClaimConfig;
use provider_registry_core::IdentityProvider;
use provider_registry_core::IdentityProviderId;
use provider_registry_core::Metadata;
use provider_registry_core::ModelError;
use provider_registry_core::PropertyMap;
use provider_registry_core::PropertyScope;
use provider_registry_core::PropertyValue;
use provider_registry_core::ProviderVariant;
use provider_registry_core::ProvisionerConfig;
use provider_registry_core::ProvisioningClaim;
use provider_registry_core::ProvisioningConfig;
use provider_registry_core::RegistryError;
use provider_registry_core::ServiceProvider;
use provider_registry_core::ServiceProviderId;
use provider_registry_core::ServiceProviderSections;
use provider_registry_core::canonical_property_text;
use rusqlite::Connection;
use rusqlite::ErrorCode;
use rusqlite::OptionalExtension;
use rusqlite::Params;
use rusqlite::params;

use crate::store::SqliteStoreError;
use crate::store::db_error;

// ============================================================================
// SECTION: Conversions
// ============================================================================

/// Converts an unsigned value into an `SQLite` integer.
pub(crate) fn to_sql_int(value: u64) -> Result<i64, SqliteStoreError> {
    i64::try_from(value).map_err(|_| {
        SqliteStoreError::Invalid(format!("value {value} exceeds sqlite integer range"))
    })
}

/// Converts a stored `SQLite` integer back into an unsigned value.
pub(crate) fn from_sql_int(value: i64) -> Result<u64, SqliteStoreError> {
    u64::try_from(value)
        .map_err(|_| SqliteStoreError::Corrupt(format!("negative stored value: {value}")))
}

/// Encodes a property value as canonical JSON text.
fn encode_property(value: &PropertyValue) -> Result<String, SqliteStoreError> {
    canonical_property_text(value).map_err(|err| SqliteStoreError::Invalid(err.to_string()))
}

/// Decodes a stored property value.
fn decode_property(key: &str, text: &str) -> Result<PropertyValue, SqliteStoreError> {
    serde_json::from_str(text).map_err(|err| {
        SqliteStoreError::Corrupt(format!("property '{key}' holds invalid json: {err}"))
    })
}

/// Returns true when `err` is a UNIQUE constraint violation.
pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == ErrorCode::ConstraintViolation
                && failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

/// Maps a provider row write error, turning name collisions into conflicts.
fn idp_write_error(name: &str, err: rusqlite::Error) -> RegistryError {
    if is_unique_violation(&err) {
        RegistryError::duplicate_identity_provider(name)
    } else {
        db_error(err).into()
    }
}

/// Maps an application row write error, turning name collisions into conflicts.
fn sp_write_error(name: &str, err: rusqlite::Error) -> RegistryError {
    if is_unique_violation(&err) {
        RegistryError::duplicate_service_provider(name)
    } else {
        db_error(err).into()
    }
}

// ============================================================================
// SECTION: Provider Rows
// ============================================================================

/// Column values of the `idp` row derived from an aggregate.
struct IdpRow<'a> {
    /// Metadata section.
    metadata: &'a Metadata,
    /// Home realm (federated only).
    home_realm_id: Option<&'a str>,
    /// Federation hub flag (federated only).
    federation_hub: bool,
    /// Enabled flag.
    enabled: bool,
}

/// Returns the claim dialect columns of a metadata section.
fn claim_columns(metadata: &Metadata) -> Result<(Option<i64>, bool), SqliteStoreError> {
    match metadata.claim_config() {
        Some(claim) => Ok((Some(to_sql_int(claim.dialect_id())?), claim.is_local_dialect())),
        None => Ok((None, false)),
    }
}

impl<'a> IdpRow<'a> {
    /// Extracts the row columns from an aggregate.
    fn from_provider(provider: &'a IdentityProvider) -> Self {
        let (home_realm_id, federation_hub) = match provider.variant() {
            ProviderVariant::Resident => (None, false),
            ProviderVariant::Federated(settings) => {
                (settings.home_realm_id(), settings.is_federation_hub())
            }
        };
        Self {
            metadata: provider.metadata(),
            home_realm_id,
            federation_hub,
            enabled: provider.is_enabled(),
        }
    }
}

/// Inserts the `idp` row and returns the assigned rowid.
pub(crate) fn insert_idp_row(
    conn: &Connection,
    provider: &IdentityProvider,
) -> Result<i64, RegistryError> {
    let row = IdpRow::from_provider(provider);
    let (dialect_id, local_dialect) = claim_columns(row.metadata)?;
    conn.execute(
        "INSERT INTO idp (name, display_name, description, home_realm_id, is_federation_hub,
             claim_dialect_id, is_local_claim_dialect, is_enabled)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            row.metadata.name(),
            row.metadata.display_label(),
            row.metadata.description(),
            row.home_realm_id,
            row.federation_hub,
            dialect_id,
            local_dialect,
            row.enabled,
        ],
    )
    .map_err(|err| idp_write_error(provider.name(), err))?;
    Ok(conn.last_insert_rowid())
}

/// Rewrites every column of an existing `idp` row. Returns false when absent.
pub(crate) fn update_idp_row(
    conn: &Connection,
    id: i64,
    provider: &IdentityProvider,
) -> Result<bool, RegistryError> {
    let row = IdpRow::from_provider(provider);
    let (dialect_id, local_dialect) = claim_columns(row.metadata)?;
    let changed = conn
        .execute(
            "UPDATE idp SET name = ?1, display_name = ?2, description = ?3, home_realm_id = ?4,
                 is_federation_hub = ?5, claim_dialect_id = ?6, is_local_claim_dialect = ?7,
                 is_enabled = ?8
             WHERE id = ?9",
            params![
                row.metadata.name(),
                row.metadata.display_label(),
                row.metadata.description(),
                row.home_realm_id,
                row.federation_hub,
                dialect_id,
                local_dialect,
                row.enabled,
                id,
            ],
        )
        .map_err(|err| idp_write_error(provider.name(), err))?;
    Ok(changed > 0)
}

/// Rewrites the metadata columns and metadata child rows of a provider.
pub(crate) fn replace_metadata(
    conn: &Connection,
    id: i64,
    metadata: &Metadata,
) -> Result<(), RegistryError> {
    let (dialect_id, local_dialect) = claim_columns(metadata)?;
    conn.execute(
        "UPDATE idp SET name = ?1, display_name = ?2, description = ?3, claim_dialect_id = ?4,
             is_local_claim_dialect = ?5
         WHERE id = ?6",
        params![
            metadata.name(),
            metadata.display_label(),
            metadata.description(),
            dialect_id,
            local_dialect,
            id,
        ],
    )
    .map_err(|err| idp_write_error(metadata.name(), err))?;
    write_metadata_children(conn, id, metadata)?;
    Ok(())
}

/// Replaces the certificate and role-mapping rows of a provider.
pub(crate) fn write_metadata_children(
    conn: &Connection,
    id: i64,
    metadata: &Metadata,
) -> Result<(), SqliteStoreError> {
    conn.execute("DELETE FROM idp_certificate WHERE idp_id = ?1", params![id])
        .map_err(db_error)?;
    for (alias, certificate) in metadata.certificates() {
        conn.execute(
            "INSERT INTO idp_certificate (idp_id, alias, certificate) VALUES (?1, ?2, ?3)",
            params![id, alias, certificate],
        )
        .map_err(db_error)?;
    }
    conn.execute("DELETE FROM idp_role_mapping WHERE idp_id = ?1", params![id])
        .map_err(db_error)?;
    for (local_role_id, external_role) in metadata.role_config().mappings() {
        conn.execute(
            "INSERT INTO idp_role_mapping (idp_id, local_role_id, external_role)
             VALUES (?1, ?2, ?3)",
            params![id, to_sql_int(*local_role_id)?, external_role],
        )
        .map_err(db_error)?;
    }
    Ok(())
}

/// Replaces the requested-claim and authenticator rows of a provider.
pub(crate) fn write_authentication(
    conn: &Connection,
    id: i64,
    authentication: Option<&AuthenticationConfig>,
) -> Result<(), SqliteStoreError> {
    conn.execute("DELETE FROM idp_requested_claim WHERE idp_id = ?1", params![id])
        .map_err(db_error)?;
    conn.execute("DELETE FROM idp_authenticator WHERE idp_id = ?1", params![id])
        .map_err(db_error)?;
    let Some(authentication) = authentication else {
        return Ok(());
    };
    for claim in authentication.requested_claims() {
        conn.execute(
            "INSERT INTO idp_requested_claim (idp_id, claim_uri) VALUES (?1, ?2)",
            params![id, claim],
        )
        .map_err(db_error)?;
    }
    for authenticator in authentication.authenticators() {
        conn.execute(
            "INSERT INTO idp_authenticator (idp_id, name, is_enabled) VALUES (?1, ?2, ?3)",
            params![id, authenticator.name(), authenticator.is_enabled()],
        )
        .map_err(db_error)?;
        let authenticator_id = conn.last_insert_rowid();
        write_child_properties(
            conn,
            "INSERT INTO idp_authenticator_property
                 (authenticator_id, property_key, property_value) VALUES (?1, ?2, ?3)",
            authenticator_id,
            authenticator.properties(),
        )?;
    }
    Ok(())
}

/// Replaces the provisioning rows of a provider.
pub(crate) fn write_provisioning(
    conn: &Connection,
    id: i64,
    provisioning: &ProvisioningConfig,
) -> Result<(), SqliteStoreError> {
    for table in [
        "idp_jit_provisioning_idp",
        "idp_provisioning_claim",
        "idp_provisioning_role",
        "idp_provisioner",
    ] {
        conn.execute(&format!("DELETE FROM {table} WHERE idp_id = ?1"), params![id])
            .map_err(db_error)?;
    }
    for idp in provisioning.jit_provisioning().provisioning_idps() {
        conn.execute(
            "INSERT INTO idp_jit_provisioning_idp (idp_id, provisioning_idp) VALUES (?1, ?2)",
            params![id, idp],
        )
        .map_err(db_error)?;
    }
    for claim in provisioning.claims() {
        conn.execute(
            "INSERT INTO idp_provisioning_claim (idp_id, claim_uri, default_value)
             VALUES (?1, ?2, ?3)",
            params![id, claim.claim_uri(), claim.default_value()],
        )
        .map_err(db_error)?;
    }
    for role in provisioning.roles() {
        conn.execute(
            "INSERT INTO idp_provisioning_role (idp_id, role_name) VALUES (?1, ?2)",
            params![id, role],
        )
        .map_err(db_error)?;
    }
    for provisioner in provisioning.provisioners() {
        conn.execute(
            "INSERT INTO idp_provisioner (idp_id, name, is_enabled) VALUES (?1, ?2, ?3)",
            params![id, provisioner.name(), provisioner.is_enabled()],
        )
        .map_err(db_error)?;
        let provisioner_id = conn.last_insert_rowid();
        write_child_properties(
            conn,
            "INSERT INTO idp_provisioner_property
                 (provisioner_id, property_key, property_value) VALUES (?1, ?2, ?3)",
            provisioner_id,
            provisioner.properties(),
        )?;
    }
    Ok(())
}

/// Inserts properties for an authenticator or provisioner row.
fn write_child_properties(
    conn: &Connection,
    sql: &str,
    owner_id: i64,
    properties: &PropertyMap,
) -> Result<(), SqliteStoreError> {
    let mut statement = conn.prepare_cached(sql).map_err(db_error)?;
    for (key, value) in properties {
        statement.execute(params![owner_id, key, encode_property(value)?]).map_err(db_error)?;
    }
    Ok(())
}

/// Replaces every provider-level property row.
pub(crate) fn write_properties(
    conn: &Connection,
    id: i64,
    properties: &PropertyMap,
) -> Result<(), SqliteStoreError> {
    conn.execute("DELETE FROM idp_property WHERE idp_id = ?1", params![id]).map_err(db_error)?;
    merge_properties(conn, id, properties)
}

/// Upserts provider-level properties; keys absent from `delta` are untouched.
///
/// Blank keys and `null` values are skipped, matching the aggregate builder.
pub(crate) fn merge_properties(
    conn: &Connection,
    id: i64,
    delta: &PropertyMap,
) -> Result<(), SqliteStoreError> {
    let mut statement = conn
        .prepare_cached(
            "INSERT INTO idp_property (idp_id, property_key, property_value) VALUES (?1, ?2, ?3)
             ON CONFLICT (idp_id, property_key)
             DO UPDATE SET property_value = excluded.property_value",
        )
        .map_err(db_error)?;
    for (key, value) in delta {
        if key.trim().is_empty() || value.is_null() {
            continue;
        }
        statement.execute(params![id, key, encode_property(value)?]).map_err(db_error)?;
    }
    Ok(())
}

/// Writes every section of a freshly inserted or fully replaced provider.
pub(crate) fn write_all_sections(
    conn: &Connection,
    id: i64,
    provider: &IdentityProvider,
) -> Result<(), SqliteStoreError> {
    write_metadata_children(conn, id, provider.metadata())?;
    write_authentication(conn, id, provider.authentication())?;
    write_provisioning(conn, id, provider.provisioning())?;
    write_properties(conn, id, provider.properties())
}

// ============================================================================
// SECTION: Provider Reads
// ============================================================================

/// Returns true when a provider row with `id` exists.
pub(crate) fn idp_exists(conn: &Connection, id: i64) -> Result<bool, SqliteStoreError> {
    conn.query_row("SELECT 1 FROM idp WHERE id = ?1", params![id], |_| Ok(()))
        .optional()
        .map(|row| row.is_some())
        .map_err(db_error)
}

/// Returns the stored name of provider `id`, the variant discriminator.
pub(crate) fn idp_name(conn: &Connection, id: i64) -> Result<Option<String>, SqliteStoreError> {
    conn.query_row("SELECT name FROM idp WHERE id = ?1", params![id], |row| row.get(0))
        .optional()
        .map_err(db_error)
}

/// Resolves a provider name to its rowid.
pub(crate) fn idp_id_by_name(
    conn: &Connection,
    name: &str,
) -> Result<Option<i64>, SqliteStoreError> {
    conn.query_row("SELECT id FROM idp WHERE name = ?1", params![name], |row| row.get(0))
        .optional()
        .map_err(db_error)
}

/// Returns provider names ordered by id, optionally only enabled ones.
pub(crate) fn list_idp_names(
    conn: &Connection,
    enabled_only: bool,
) -> Result<Vec<String>, SqliteStoreError> {
    if enabled_only {
        query_names(conn, "SELECT name FROM idp WHERE is_enabled = ?1 ORDER BY id", params![true])
    } else {
        query_names(conn, "SELECT name FROM idp ORDER BY id", [])
    }
}

/// Runs a single-column name query.
fn query_names<P: Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> Result<Vec<String>, SqliteStoreError> {
    let mut statement = conn.prepare_cached(sql).map_err(db_error)?;
    let rows = statement.query_map(params, |row| row.get(0)).map_err(db_error)?;
    rows.collect::<Result<Vec<String>, _>>().map_err(db_error)
}

/// Returns ids of providers whose property in `scope` equals `value`, ascending.
pub(crate) fn idp_ids_by_property(
    conn: &Connection,
    scope: PropertyScope,
    key: &str,
    value: &PropertyValue,
) -> Result<Vec<i64>, SqliteStoreError> {
    let sql = match scope {
        PropertyScope::Provider => {
            "SELECT DISTINCT idp_id FROM idp_property
             WHERE property_key = ?1 AND property_value = ?2 ORDER BY idp_id"
        }
        PropertyScope::Authenticator => {
            "SELECT DISTINCT a.idp_id FROM idp_authenticator_property p
             JOIN idp_authenticator a ON a.id = p.authenticator_id
             WHERE p.property_key = ?1 AND p.property_value = ?2 ORDER BY a.idp_id"
        }
        PropertyScope::Provisioner => {
            "SELECT DISTINCT v.idp_id FROM idp_provisioner_property p
             JOIN idp_provisioner v ON v.id = p.provisioner_id
             WHERE p.property_key = ?1 AND p.property_value = ?2 ORDER BY v.idp_id"
        }
    };
    let text = encode_property(value)?;
    let mut statement = conn.prepare_cached(sql).map_err(db_error)?;
    let rows = statement.query_map(params![key, text], |row| row.get(0)).map_err(db_error)?;
    rows.collect::<Result<Vec<i64>, _>>().map_err(db_error)
}

/// Columns of the `idp` row.
struct StoredIdp {
    /// Provider name.
    name: String,
    /// Display label.
    display_name: Option<String>,
    /// Description.
    description: Option<String>,
    /// Home realm.
    home_realm_id: Option<String>,
    /// Federation hub flag.
    federation_hub: bool,
    /// Claim dialect id.
    claim_dialect_id: Option<i64>,
    /// Local dialect flag.
    local_claim_dialect: bool,
    /// Enabled flag.
    enabled: bool,
}

/// Loads and rebuilds a provider aggregate. Returns `None` when absent.
///
/// # Errors
///
/// Returns [`SqliteStoreError::Corrupt`] when stored rows no longer form a
/// valid aggregate.
pub(crate) fn load_idp(
    conn: &Connection,
    id: i64,
) -> Result<Option<IdentityProvider>, SqliteStoreError> {
    let stored = conn
        .query_row(
            "SELECT name, display_name, description, home_realm_id, is_federation_hub,
                 claim_dialect_id, is_local_claim_dialect, is_enabled
             FROM idp WHERE id = ?1",
            params![id],
            |row| {
                Ok(StoredIdp {
                    name: row.get(0)?,
                    display_name: row.get(1)?,
                    description: row.get(2)?,
                    home_realm_id: row.get(3)?,
                    federation_hub: row.get(4)?,
                    claim_dialect_id: row.get(5)?,
                    local_claim_dialect: row.get(6)?,
                    enabled: row.get(7)?,
                })
            },
        )
        .optional()
        .map_err(db_error)?;
    let Some(stored) = stored else {
        return Ok(None);
    };

    let mut builder = IdentityProvider::builder(stored.name)
        .set_enabled(stored.enabled)
        .set_certificates(load_pairs(
            conn,
            "SELECT alias, certificate FROM idp_certificate WHERE idp_id = ?1",
            id,
        )?)
        .set_role_mappings(load_role_mappings(conn, id)?)
        .set_provisioning(&load_provisioning(conn, id)?)
        .set_properties(load_properties(
            conn,
            "SELECT property_key, property_value FROM idp_property WHERE idp_id = ?1",
            id,
        )?);
    if let Some(label) = stored.display_name {
        builder = builder.set_display_label(label);
    }
    if let Some(description) = stored.description {
        builder = builder.set_description(description);
    }
    if let Some(dialect_id) = stored.claim_dialect_id {
        builder = builder.set_claim_config(
            ClaimConfig::new(from_sql_int(dialect_id)?)
                .with_local_dialect(stored.local_claim_dialect),
        );
    }
    if let Some(realm) = stored.home_realm_id {
        builder = builder.set_home_realm_id(realm);
    }
    if stored.federation_hub {
        builder = builder.set_federation_hub(true);
    }
    if let Some(authentication) = load_authentication(conn, id)? {
        builder = builder.set_authentication(&authentication);
    }

    let provider = builder.build().map_err(|err| {
        SqliteStoreError::Corrupt(format!("stored identity provider {id} is invalid: {err}"))
    })?;
    let raw = from_sql_int(id)?;
    let provider_id = IdentityProviderId::from_raw(raw)
        .ok_or_else(|| SqliteStoreError::Corrupt("identity provider id 0".to_string()))?;
    Ok(Some(provider.with_id(provider_id)))
}

/// Loads a two-column string map.
fn load_pairs(
    conn: &Connection,
    sql: &str,
    id: i64,
) -> Result<BTreeMap<String, String>, SqliteStoreError> {
    let mut statement = conn.prepare_cached(sql).map_err(db_error)?;
    let rows =
        statement.query_map(params![id], |row| Ok((row.get(0)?, row.get(1)?))).map_err(db_error)?;
    rows.collect::<Result<BTreeMap<_, _>, _>>().map_err(db_error)
}

/// Loads single-column string rows.
fn load_strings(conn: &Connection, sql: &str, id: i64) -> Result<Vec<String>, SqliteStoreError> {
    let mut statement = conn.prepare_cached(sql).map_err(db_error)?;
    let rows = statement.query_map(params![id], |row| row.get(0)).map_err(db_error)?;
    rows.collect::<Result<Vec<String>, _>>().map_err(db_error)
}

/// Loads the local-role to external-role mappings.
fn load_role_mappings(
    conn: &Connection,
    id: i64,
) -> Result<BTreeMap<u64, String>, SqliteStoreError> {
    let mut statement = conn
        .prepare_cached(
            "SELECT local_role_id, external_role FROM idp_role_mapping WHERE idp_id = ?1",
        )
        .map_err(db_error)?;
    let rows = statement
        .query_map(params![id], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))
        .map_err(db_error)?;
    let mut mappings = BTreeMap::new();
    for row in rows {
        let (local_role_id, external_role) = row.map_err(db_error)?;
        mappings.insert(from_sql_int(local_role_id)?, external_role);
    }
    Ok(mappings)
}

/// Loads a property map from a key/value query.
fn load_properties(conn: &Connection, sql: &str, id: i64) -> Result<PropertyMap, SqliteStoreError> {
    let mut properties = PropertyMap::new();
    for (key, text) in load_pairs(conn, sql, id)? {
        let value = decode_property(&key, &text)?;
        properties.insert(key, value);
    }
    Ok(properties)
}

/// Loads the authentication section, or `None` when it has no rows.
fn load_authentication(
    conn: &Connection,
    id: i64,
) -> Result<Option<AuthenticationConfig>, SqliteStoreError> {
    let claims = load_strings(
        conn,
        "SELECT claim_uri FROM idp_requested_claim WHERE idp_id = ?1",
        id,
    )?;
    let mut statement = conn
        .prepare_cached(
            "SELECT id, name, is_enabled FROM idp_authenticator WHERE idp_id = ?1 ORDER BY id",
        )
        .map_err(db_error)?;
    let rows = statement
        .query_map(params![id], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?, row.get::<_, bool>(2)?))
        })
        .map_err(db_error)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(db_error)?;
    if claims.is_empty() && rows.is_empty() {
        return Ok(None);
    }
    let mut builder = AuthenticationConfig::builder().set_requested_claims(claims);
    for (authenticator_id, name, enabled) in rows {
        let properties = load_properties(
            conn,
            "SELECT property_key, property_value FROM idp_authenticator_property
             WHERE authenticator_id = ?1",
            authenticator_id,
        )?;
        let authenticator = AuthenticatorConfig::builder(name)
            .set_enabled(enabled)
            .set_properties(properties)
            .build()
            .map_err(|err| SqliteStoreError::Corrupt(err.to_string()))?;
        builder = builder.add_authenticator(authenticator);
    }
    builder.build().map(Some).map_err(|err| SqliteStoreError::Corrupt(err.to_string()))
}

/// Loads the provisioning section.
fn load_provisioning(conn: &Connection, id: i64) -> Result<ProvisioningConfig, SqliteStoreError> {
    let corrupt = |err: ModelError| SqliteStoreError::Corrupt(err.to_string());
    let idps = load_strings(
        conn,
        "SELECT provisioning_idp FROM idp_jit_provisioning_idp WHERE idp_id = ?1",
        id,
    )?;
    let roles =
        load_strings(conn, "SELECT role_name FROM idp_provisioning_role WHERE idp_id = ?1", id)?;
    let mut builder = ProvisioningConfig::builder().set_provisioning_idps(idps).set_roles(roles);

    let mut statement = conn
        .prepare_cached(
            "SELECT claim_uri, default_value FROM idp_provisioning_claim WHERE idp_id = ?1",
        )
        .map_err(db_error)?;
    let claims = statement
        .query_map(params![id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?))
        })
        .map_err(db_error)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(db_error)?;
    for (claim_uri, default_value) in claims {
        let mut claim = ProvisioningClaim::new(claim_uri).map_err(corrupt)?;
        if let Some(default_value) = default_value {
            claim = claim.with_default_value(default_value);
        }
        builder = builder.add_claim(claim);
    }

    let mut statement = conn
        .prepare_cached(
            "SELECT id, name, is_enabled FROM idp_provisioner WHERE idp_id = ?1 ORDER BY id",
        )
        .map_err(db_error)?;
    let provisioners = statement
        .query_map(params![id], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?, row.get::<_, bool>(2)?))
        })
        .map_err(db_error)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(db_error)?;
    for (provisioner_id, name, enabled) in provisioners {
        let properties = load_properties(
            conn,
            "SELECT property_key, property_value FROM idp_provisioner_property
             WHERE provisioner_id = ?1",
            provisioner_id,
        )?;
        let provisioner = ProvisionerConfig::builder(name)
            .set_enabled(enabled)
            .set_properties(properties)
            .build()
            .map_err(corrupt)?;
        builder = builder.add_provisioner(provisioner);
    }
    builder.build().map_err(corrupt)
}

// ============================================================================
// SECTION: Service Provider Rows
// ============================================================================

/// Serializes the nested sections of an application.
fn encode_sections(provider: &ServiceProvider) -> Result<String, SqliteStoreError> {
    serde_json::to_string(provider.sections())
        .map_err(|err| SqliteStoreError::Invalid(err.to_string()))
}

/// Inserts an `sp` row and returns the assigned rowid.
pub(crate) fn insert_sp_row(
    conn: &Connection,
    provider: &ServiceProvider,
) -> Result<i64, RegistryError> {
    let config_json = encode_sections(provider)?;
    conn.execute(
        "INSERT INTO sp (name, display_name, description, is_enabled, config_json)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            provider.name(),
            provider.display_label(),
            provider.description(),
            provider.is_enabled(),
            config_json,
        ],
    )
    .map_err(|err| sp_write_error(provider.name(), err))?;
    Ok(conn.last_insert_rowid())
}

/// Rewrites an `sp` row. Returns false when absent.
pub(crate) fn update_sp_row(
    conn: &Connection,
    id: i64,
    provider: &ServiceProvider,
) -> Result<bool, RegistryError> {
    let config_json = encode_sections(provider)?;
    let changed = conn
        .execute(
            "UPDATE sp SET name = ?1, display_name = ?2, description = ?3, is_enabled = ?4,
                 config_json = ?5
             WHERE id = ?6",
            params![
                provider.name(),
                provider.display_label(),
                provider.description(),
                provider.is_enabled(),
                config_json,
                id,
            ],
        )
        .map_err(|err| sp_write_error(provider.name(), err))?;
    Ok(changed > 0)
}

/// Resolves an application name to its rowid.
pub(crate) fn sp_id_by_name(
    conn: &Connection,
    name: &str,
) -> Result<Option<i64>, SqliteStoreError> {
    conn.query_row("SELECT id FROM sp WHERE name = ?1", params![name], |row| row.get(0))
        .optional()
        .map_err(db_error)
}

/// Returns application names ordered by id, optionally only enabled ones.
pub(crate) fn list_sp_names(
    conn: &Connection,
    enabled_only: bool,
) -> Result<Vec<String>, SqliteStoreError> {
    if enabled_only {
        query_names(conn, "SELECT name FROM sp WHERE is_enabled = ?1 ORDER BY id", params![true])
    } else {
        query_names(conn, "SELECT name FROM sp ORDER BY id", [])
    }
}

/// Loads and rebuilds an application. Returns `None` when absent.
pub(crate) fn load_sp(
    conn: &Connection,
    id: i64,
) -> Result<Option<ServiceProvider>, SqliteStoreError> {
    let row = conn
        .query_row(
            "SELECT name, display_name, description, is_enabled, config_json FROM sp WHERE id = ?1",
            params![id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, bool>(3)?,
                    row.get::<_, String>(4)?,
                ))
            },
        )
        .optional()
        .map_err(db_error)?;
    let Some((name, display_name, description, enabled, config_json)) = row else {
        return Ok(None);
    };
    let sections: ServiceProviderSections = serde_json::from_str(&config_json).map_err(|err| {
        SqliteStoreError::Corrupt(format!("service provider {id} config is invalid: {err}"))
    })?;
    let mut builder = ServiceProvider::builder(name).set_enabled(enabled).set_sections(sections);
    if let Some(label) = display_name {
        builder = builder.set_display_label(label);
    }
    if let Some(description) = description {
        builder = builder.set_description(description);
    }
    let provider = builder.build().map_err(|err| {
        SqliteStoreError::Corrupt(format!("stored service provider {id} is invalid: {err}"))
    })?;
    let provider_id = ServiceProviderId::from_raw(from_sql_int(id)?)
        .ok_or_else(|| SqliteStoreError::Corrupt("service provider id 0".to_string()))?;
    Ok(Some(provider.with_id(provider_id)))
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Test-only assertions are permitted.")]
mod tests {
    use provider_registry_core::IdentityProvider;
    use rusqlite::Connection;
    use serde_json::json;

    use super::insert_idp_row;
    use super::is_unique_violation;
    use super::load_idp;
    use super::merge_properties;
    use super::to_sql_int;
    use super::write_all_sections;
    use crate::schema::initialize_schema;

    fn connection() -> Connection {
        let mut connection = Connection::open_in_memory().unwrap();
        connection.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        initialize_schema(&mut connection).unwrap();
        connection
    }

    #[test]
    fn ids_beyond_sqlite_range_are_rejected() {
        assert!(to_sql_int(u64::MAX).is_err());
        assert_eq!(to_sql_int(7).unwrap(), 7);
    }

    #[test]
    fn duplicate_name_is_a_unique_violation() {
        let conn = connection();
        conn.execute("INSERT INTO idp (name) VALUES ('dup')", []).unwrap();
        let err = conn.execute("INSERT INTO idp (name) VALUES ('dup')", []).unwrap_err();
        assert!(is_unique_violation(&err));
    }

    #[test]
    fn merge_skips_null_values_and_blank_keys() {
        let conn = connection();
        let provider =
            IdentityProvider::builder("idp1").add_property("a", json!(1)).build().unwrap();
        let id = insert_idp_row(&conn, &provider).unwrap();
        write_all_sections(&conn, id, &provider).unwrap();
        let delta = [
            ("a".to_string(), json!(null)),
            (" ".to_string(), json!("x")),
            ("b".to_string(), json!({"k": true})),
        ]
        .into_iter()
        .collect();
        merge_properties(&conn, id, &delta).unwrap();
        let loaded = load_idp(&conn, id).unwrap().unwrap();
        assert_eq!(loaded.properties().get("a"), Some(&json!(1)));
        assert_eq!(loaded.properties().get("b"), Some(&json!({"k": true})));
        assert_eq!(loaded.properties().len(), 2);
    }

    #[test]
    fn corrupt_property_json_is_reported() {
        let conn = connection();
        let provider = IdentityProvider::builder("idp1").build().unwrap();
        let id = insert_idp_row(&conn, &provider).unwrap();
        conn.execute(
            "INSERT INTO idp_property (idp_id, property_key, property_value) VALUES (?1, 'k', '{')",
            [id],
        )
        .unwrap();
        let err = load_idp(&conn, id).unwrap_err();
        assert!(err.to_string().contains("corruption"));
    }
}
