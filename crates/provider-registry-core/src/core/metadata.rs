// crates/provider-registry-core/src/core/metadata.rs
// ============================================================================
// Module: Provider Metadata
// Description: Identity section of an identity provider aggregate.
// Purpose: Hold the name, labels, certificate references, and claim/role config.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! [`Metadata`] is the one mandatory section of every identity provider. It
//! carries the unique name plus references to externally managed material:
//! certificates are stored as alias to thumbprint pairs only, and the claim
//! dialect is referenced by id. Role mappings translate local role ids into
//! the external role names asserted by the provider.
//!
//! Values are frozen by [`MetadataBuilder::build`], which is the single place
//! the section is validated.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Serialize;

use crate::core::error::ModelError;
use crate::core::error::require_non_blank;
use crate::core::error::require_reference_id;

// ============================================================================
// SECTION: Claim and Role Config
// ============================================================================

/// Claim dialect reference for a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClaimConfig {
    /// Claim dialect identifier (owned by the claim management component).
    dialect_id: u64,
    /// Whether the provider asserts claims in the local dialect.
    local_dialect: bool,
}

impl ClaimConfig {
    /// Creates a claim config referencing an external dialect.
    #[must_use]
    pub const fn new(dialect_id: u64) -> Self {
        Self {
            dialect_id,
            local_dialect: false,
        }
    }

    /// Marks whether the dialect is the platform's local dialect.
    #[must_use]
    pub const fn with_local_dialect(mut self, local_dialect: bool) -> Self {
        self.local_dialect = local_dialect;
        self
    }

    /// Returns the dialect identifier.
    #[must_use]
    pub const fn dialect_id(&self) -> u64 {
        self.dialect_id
    }

    /// Returns true when claims use the local dialect.
    #[must_use]
    pub const fn is_local_dialect(&self) -> bool {
        self.local_dialect
    }
}

/// Mapping from local role ids to external role names.
///
/// # Invariants
/// - Keys are unique; several local roles may map to the same external role.
/// - External role names are never blank.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RoleConfig {
    /// Local role id to external role name.
    mappings: BTreeMap<u64, String>,
}

impl RoleConfig {
    /// Returns the role mappings.
    #[must_use]
    pub const fn mappings(&self) -> &BTreeMap<u64, String> {
        &self.mappings
    }

    /// Returns the external role mapped to a local role, if any.
    #[must_use]
    pub fn external_role(&self, local_role_id: u64) -> Option<&str> {
        self.mappings.get(&local_role_id).map(String::as_str)
    }

    /// Returns every local role id mapped to `external_role`.
    #[must_use]
    pub fn local_roles_for(&self, external_role: &str) -> Vec<u64> {
        self.mappings
            .iter()
            .filter(|(_, external)| external.as_str() == external_role)
            .map(|(local, _)| *local)
            .collect()
    }

    /// Returns true when no mappings are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}

// ============================================================================
// SECTION: Metadata
// ============================================================================

/// Identity section of an identity provider.
///
/// # Invariants
/// - `name` is non-blank.
/// - Certificate aliases and thumbprints are non-blank; aliases are unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Metadata {
    /// Unique provider name.
    name: String,
    /// Optional human-facing label.
    display_label: Option<String>,
    /// Optional free-text description.
    description: Option<String>,
    /// Certificate alias to thumbprint.
    certificates: BTreeMap<String, String>,
    /// Optional claim dialect reference.
    claim_config: Option<ClaimConfig>,
    /// Role mappings.
    role_config: RoleConfig,
}

impl Metadata {
    /// Starts a metadata builder for `name`.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> MetadataBuilder {
        MetadataBuilder::new(name)
    }

    /// Returns the provider name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the display label.
    #[must_use]
    pub fn display_label(&self) -> Option<&str> {
        self.display_label.as_deref()
    }

    /// Returns the description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns certificate alias to thumbprint mappings.
    #[must_use]
    pub const fn certificates(&self) -> &BTreeMap<String, String> {
        &self.certificates
    }

    /// Returns the claim dialect reference.
    #[must_use]
    pub const fn claim_config(&self) -> Option<&ClaimConfig> {
        self.claim_config.as_ref()
    }

    /// Returns the role mappings.
    #[must_use]
    pub const fn role_config(&self) -> &RoleConfig {
        &self.role_config
    }

    /// Re-checks the section invariants.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Validation`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ModelError> {
        require_non_blank("metadata.name", &self.name)?;
        for (alias, thumbprint) in &self.certificates {
            require_non_blank("metadata.certificates.alias", alias)?;
            require_non_blank("metadata.certificates.thumbprint", thumbprint)?;
        }
        if let Some(claim) = &self.claim_config {
            require_reference_id("metadata.claim_config.dialect_id", claim.dialect_id)?;
        }
        for (local_role_id, external) in &self.role_config.mappings {
            require_reference_id("metadata.role_config.local_role_id", *local_role_id)?;
            require_non_blank("metadata.role_config.external_role", external)?;
        }
        Ok(())
    }

    /// Returns a builder seeded with this section's values.
    #[must_use]
    pub fn to_builder(&self) -> MetadataBuilder {
        MetadataBuilder {
            name: self.name.clone(),
            display_label: self.display_label.clone(),
            description: self.description.clone(),
            certificates: self.certificates.clone(),
            claim_config: self.claim_config,
            role_mappings: self.role_config.mappings.clone(),
        }
    }
}

/// Builder for [`Metadata`].
///
/// `set_*` replaces the current value unless the input is empty; `add_*`
/// merges into the current value.
#[derive(Debug, Clone)]
#[must_use]
pub struct MetadataBuilder {
    /// Provider name.
    name: String,
    /// Display label.
    display_label: Option<String>,
    /// Description.
    description: Option<String>,
    /// Certificate alias to thumbprint.
    certificates: BTreeMap<String, String>,
    /// Claim dialect reference.
    claim_config: Option<ClaimConfig>,
    /// Local role id to external role name.
    role_mappings: BTreeMap<u64, String>,
}

impl MetadataBuilder {
    /// Creates a builder for `name`. The name is validated at build time.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_label: None,
            description: None,
            certificates: BTreeMap::new(),
            claim_config: None,
            role_mappings: BTreeMap::new(),
        }
    }

    /// Replaces the provider name.
    pub fn set_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the display label.
    pub fn set_display_label(mut self, label: impl Into<String>) -> Self {
        self.display_label = Some(label.into());
        self
    }

    /// Sets the description.
    pub fn set_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Replaces all certificates unless `certificates` is empty.
    pub fn set_certificates(mut self, certificates: BTreeMap<String, String>) -> Self {
        if !certificates.is_empty() {
            self.certificates = certificates;
        }
        self
    }

    /// Adds one certificate reference; blank aliases or thumbprints are ignored.
    pub fn add_certificate(
        mut self,
        alias: impl Into<String>,
        thumbprint: impl Into<String>,
    ) -> Self {
        let alias = alias.into();
        let thumbprint = thumbprint.into();
        if !alias.trim().is_empty() && !thumbprint.trim().is_empty() {
            self.certificates.insert(alias, thumbprint);
        }
        self
    }

    /// Merges certificate references.
    pub fn add_certificates(mut self, certificates: BTreeMap<String, String>) -> Self {
        for (alias, thumbprint) in certificates {
            self = self.add_certificate(alias, thumbprint);
        }
        self
    }

    /// Sets the claim dialect reference.
    pub const fn set_claim_config(mut self, claim_config: ClaimConfig) -> Self {
        self.claim_config = Some(claim_config);
        self
    }

    /// Sets the claim dialect by id (non-local dialect).
    pub const fn set_dialect_id(self, dialect_id: u64) -> Self {
        self.set_claim_config(ClaimConfig::new(dialect_id))
    }

    /// Replaces all role mappings unless `mappings` is empty.
    pub fn set_role_mappings(mut self, mappings: BTreeMap<u64, String>) -> Self {
        if !mappings.is_empty() {
            self.role_mappings = mappings;
        }
        self
    }

    /// Maps a local role id to an external role name.
    pub fn add_role_mapping(
        mut self,
        local_role_id: u64,
        external_role: impl Into<String>,
    ) -> Self {
        self.role_mappings.insert(local_role_id, external_role.into());
        self
    }

    /// Merges role mappings.
    pub fn add_role_mappings(mut self, mappings: BTreeMap<u64, String>) -> Self {
        self.role_mappings.extend(mappings);
        self
    }

    /// Returns the name currently held by the builder.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Validates and freezes the section.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Validation`] when the name is blank or a
    /// certificate or role mapping is malformed.
    pub fn build(self) -> Result<Metadata, ModelError> {
        let metadata = Metadata {
            name: self.name,
            display_label: self.display_label,
            description: self.description,
            certificates: self.certificates,
            claim_config: self.claim_config,
            role_config: RoleConfig {
                mappings: self.role_mappings,
            },
        };
        metadata.validate()?;
        Ok(metadata)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Test-only assertions are permitted.")]
mod tests {
    use std::collections::BTreeMap;

    use super::ClaimConfig;
    use super::Metadata;
    use crate::core::error::MAX_REFERENCE_ID;
    use crate::core::error::ModelError;

    #[test]
    fn blank_name_is_rejected_with_field() {
        let err = Metadata::builder("   ").build().unwrap_err();
        assert!(matches!(err, ModelError::Validation { field: "metadata.name", .. }));
    }

    #[test]
    fn set_certificates_with_empty_map_keeps_existing() {
        let metadata = Metadata::builder("idp")
            .add_certificate("signing", "AB:CD")
            .set_certificates(BTreeMap::new())
            .build()
            .unwrap();
        assert_eq!(metadata.certificates().get("signing").map(String::as_str), Some("AB:CD"));
    }

    #[test]
    fn role_mappings_are_many_to_one() {
        let metadata = Metadata::builder("idp")
            .add_role_mapping(1, "admin")
            .add_role_mapping(2, "admin")
            .add_role_mapping(3, "viewer")
            .build()
            .unwrap();
        assert_eq!(metadata.role_config().local_roles_for("admin"), vec![1, 2]);
        assert_eq!(metadata.role_config().external_role(3), Some("viewer"));
    }

    #[test]
    fn blank_external_role_is_rejected() {
        let err = Metadata::builder("idp").add_role_mapping(7, " ").build().unwrap_err();
        assert!(matches!(
            err,
            ModelError::Validation { field: "metadata.role_config.external_role", .. }
        ));
    }

    #[test]
    fn reference_ids_beyond_storage_range_are_rejected() {
        let err = Metadata::builder("idp").add_role_mapping(u64::MAX, "admin").build().unwrap_err();
        assert!(matches!(
            err,
            ModelError::Validation { field: "metadata.role_config.local_role_id", .. }
        ));

        let err = Metadata::builder("idp")
            .set_claim_config(ClaimConfig::new(MAX_REFERENCE_ID + 1))
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            ModelError::Validation { field: "metadata.claim_config.dialect_id", .. }
        ));

        Metadata::builder("idp").add_role_mapping(MAX_REFERENCE_ID, "admin").build().unwrap();
    }
}
