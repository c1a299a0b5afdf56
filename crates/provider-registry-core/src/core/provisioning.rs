// crates/provider-registry-core/src/core/provisioning.rs
// ============================================================================
// Module: Provisioning Config
// Description: Outbound provisioners, provisioning claims/roles, and JIT targets.
// Purpose: Provide the immutable provisioning section and its builders.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! The provisioning section describes how users reach external systems:
//! outbound provisioners keyed by connector name, the claims pushed during
//! provisioning, the roles whose holders trigger outbound provisioning, and
//! the identity providers that trigger just-in-time provisioning on first
//! federated login. An empty section is valid and is the default.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::Serialize;

use crate::core::error::ModelError;
use crate::core::error::require_non_blank;
use crate::core::properties::PropertyMap;
use crate::core::properties::PropertyValue;
use crate::core::properties::merge_properties;
use crate::core::properties::put_property;
use crate::core::properties::replace_properties;

// ============================================================================
// SECTION: Leaf Values
// ============================================================================

/// Identity providers whose logins trigger just-in-time provisioning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JitProvisioningConfig {
    /// Target identity provider names.
    provisioning_idps: BTreeSet<String>,
}

impl JitProvisioningConfig {
    /// Returns the provider names that trigger JIT provisioning.
    #[must_use]
    pub const fn provisioning_idps(&self) -> &BTreeSet<String> {
        &self.provisioning_idps
    }

    /// Returns true when JIT provisioning is triggered by `idp_name`.
    #[must_use]
    pub fn is_triggered_by(&self, idp_name: &str) -> bool {
        self.provisioning_idps.contains(idp_name)
    }
}

/// Claim pushed to external systems during provisioning.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct ProvisioningClaim {
    /// Claim URI (key).
    claim_uri: String,
    /// Value used when the subject has no value for the claim.
    default_value: Option<String>,
}

impl ProvisioningClaim {
    /// Creates a provisioning claim without a default value.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Validation`] when `claim_uri` is blank.
    pub fn new(claim_uri: impl Into<String>) -> Result<Self, ModelError> {
        let claim_uri = claim_uri.into();
        require_non_blank("provisioning.claims.claim_uri", &claim_uri)?;
        Ok(Self {
            claim_uri,
            default_value: None,
        })
    }

    /// Attaches a default value.
    #[must_use]
    pub fn with_default_value(mut self, default_value: impl Into<String>) -> Self {
        self.default_value = Some(default_value.into());
        self
    }

    /// Returns the claim URI.
    #[must_use]
    pub fn claim_uri(&self) -> &str {
        &self.claim_uri
    }

    /// Returns the default value.
    #[must_use]
    pub fn default_value(&self) -> Option<&str> {
        self.default_value.as_deref()
    }
}

/// Outbound provisioning connector configuration.
///
/// # Invariants
/// - `name` is non-blank and is the provisioner's key within a section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvisionerConfig {
    /// Connector name (key).
    name: String,
    /// Whether the provisioner is enabled.
    enabled: bool,
    /// Connector properties.
    properties: PropertyMap,
}

impl ProvisionerConfig {
    /// Starts a builder for the connector `name`.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> ProvisionerConfigBuilder {
        ProvisionerConfigBuilder::new(name)
    }

    /// Returns the connector name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns whether the provisioner is enabled.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Returns the connector properties.
    #[must_use]
    pub const fn properties(&self) -> &PropertyMap {
        &self.properties
    }
}

/// Builder for [`ProvisionerConfig`].
#[derive(Debug, Clone)]
#[must_use]
pub struct ProvisionerConfigBuilder {
    /// Connector name.
    name: String,
    /// Enabled flag.
    enabled: bool,
    /// Connector properties.
    properties: PropertyMap,
}

impl ProvisionerConfigBuilder {
    /// Creates an enabled provisioner builder.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            properties: PropertyMap::new(),
        }
    }

    /// Sets the enabled flag.
    pub const fn set_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Replaces all properties unless `properties` is empty.
    pub fn set_properties(mut self, properties: PropertyMap) -> Self {
        replace_properties(&mut self.properties, properties);
        self
    }

    /// Adds one property; blank keys and null values are ignored.
    pub fn add_property(mut self, key: impl Into<String>, value: PropertyValue) -> Self {
        put_property(&mut self.properties, key, value);
        self
    }

    /// Merges properties.
    pub fn add_properties(mut self, properties: PropertyMap) -> Self {
        merge_properties(&mut self.properties, properties);
        self
    }

    /// Validates and freezes the provisioner.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Validation`] when the name is blank.
    pub fn build(self) -> Result<ProvisionerConfig, ModelError> {
        require_non_blank("provisioner.name", &self.name)?;
        Ok(ProvisionerConfig {
            name: self.name,
            enabled: self.enabled,
            properties: self.properties,
        })
    }
}

// ============================================================================
// SECTION: Provisioning Config
// ============================================================================

/// Provisioning section of an identity provider.
///
/// # Invariants
/// - Claims are unique by URI, provisioners by name, roles and JIT targets
///   by value; none of the keys are blank.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProvisioningConfig {
    /// JIT provisioning targets.
    jit: JitProvisioningConfig,
    /// Provisioning claims keyed by URI.
    claims: BTreeMap<String, ProvisioningClaim>,
    /// Roles that trigger outbound provisioning.
    roles: BTreeSet<String>,
    /// Provisioners keyed by connector name.
    provisioners: BTreeMap<String, ProvisionerConfig>,
}

impl ProvisioningConfig {
    /// Starts an empty provisioning builder.
    #[must_use]
    pub fn builder() -> ProvisioningConfigBuilder {
        ProvisioningConfigBuilder::default()
    }

    /// Returns the JIT provisioning config.
    #[must_use]
    pub const fn jit_provisioning(&self) -> &JitProvisioningConfig {
        &self.jit
    }

    /// Returns the provisioning claims ordered by URI.
    pub fn claims(&self) -> impl Iterator<Item = &ProvisioningClaim> {
        self.claims.values()
    }

    /// Returns the roles that trigger outbound provisioning.
    #[must_use]
    pub const fn roles(&self) -> &BTreeSet<String> {
        &self.roles
    }

    /// Returns the provisioners ordered by name.
    pub fn provisioners(&self) -> impl Iterator<Item = &ProvisionerConfig> {
        self.provisioners.values()
    }

    /// Returns the provisioner named `name`.
    #[must_use]
    pub fn provisioner(&self, name: &str) -> Option<&ProvisionerConfig> {
        self.provisioners.get(name)
    }

    /// Returns true when nothing is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.jit.provisioning_idps.is_empty()
            && self.claims.is_empty()
            && self.roles.is_empty()
            && self.provisioners.is_empty()
    }

    /// Re-checks the section invariants.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Validation`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ModelError> {
        for idp in &self.jit.provisioning_idps {
            require_non_blank("provisioning.jit.provisioning_idps", idp)?;
        }
        for role in &self.roles {
            require_non_blank("provisioning.roles", role)?;
        }
        for (key, provisioner) in &self.provisioners {
            if key != &provisioner.name {
                return Err(ModelError::invalid(
                    "provisioner.name",
                    format!("provisioner keyed as '{key}' is named '{}'", provisioner.name),
                ));
            }
        }
        Ok(())
    }

    /// Returns a builder seeded with this section's values.
    #[must_use]
    pub fn to_builder(&self) -> ProvisioningConfigBuilder {
        ProvisioningConfigBuilder {
            provisioning_idps: self.jit.provisioning_idps.clone(),
            claims: self.claims.clone(),
            roles: self.roles.clone(),
            provisioners: self.provisioners.clone(),
        }
    }
}

/// Builder for [`ProvisioningConfig`].
#[derive(Debug, Clone, Default)]
#[must_use]
pub struct ProvisioningConfigBuilder {
    /// JIT provisioning targets.
    provisioning_idps: BTreeSet<String>,
    /// Provisioning claims keyed by URI.
    claims: BTreeMap<String, ProvisioningClaim>,
    /// Roles that trigger outbound provisioning.
    roles: BTreeSet<String>,
    /// Provisioners keyed by connector name.
    provisioners: BTreeMap<String, ProvisionerConfig>,
}

impl ProvisioningConfigBuilder {
    /// Replaces the JIT targets unless `idps` is empty.
    pub fn set_provisioning_idps<I, S>(mut self, idps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let idps: BTreeSet<String> = idps.into_iter().map(Into::into).collect();
        if !idps.is_empty() {
            self.provisioning_idps = idps;
        }
        self
    }

    /// Adds one JIT target.
    pub fn add_provisioning_idp(mut self, idp: impl Into<String>) -> Self {
        self.provisioning_idps.insert(idp.into());
        self
    }

    /// Merges JIT targets.
    pub fn add_provisioning_idps<I, S>(mut self, idps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.provisioning_idps.extend(idps.into_iter().map(Into::into));
        self
    }

    /// Replaces the provisioning claims unless `claims` is empty.
    pub fn set_claims<I>(mut self, claims: I) -> Self
    where
        I: IntoIterator<Item = ProvisioningClaim>,
    {
        let claims: BTreeMap<String, ProvisioningClaim> =
            claims.into_iter().map(|claim| (claim.claim_uri.clone(), claim)).collect();
        if !claims.is_empty() {
            self.claims = claims;
        }
        self
    }

    /// Adds one provisioning claim, replacing any with the same URI.
    pub fn add_claim(mut self, claim: ProvisioningClaim) -> Self {
        self.claims.insert(claim.claim_uri.clone(), claim);
        self
    }

    /// Merges provisioning claims by URI.
    pub fn add_claims<I>(mut self, claims: I) -> Self
    where
        I: IntoIterator<Item = ProvisioningClaim>,
    {
        for claim in claims {
            self = self.add_claim(claim);
        }
        self
    }

    /// Replaces the provisioning roles unless `roles` is empty.
    pub fn set_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let roles: BTreeSet<String> = roles.into_iter().map(Into::into).collect();
        if !roles.is_empty() {
            self.roles = roles;
        }
        self
    }

    /// Adds one provisioning role.
    pub fn add_role(mut self, role: impl Into<String>) -> Self {
        self.roles.insert(role.into());
        self
    }

    /// Merges provisioning roles.
    pub fn add_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles.extend(roles.into_iter().map(Into::into));
        self
    }

    /// Replaces the provisioners unless `provisioners` is empty.
    pub fn set_provisioners<I>(mut self, provisioners: I) -> Self
    where
        I: IntoIterator<Item = ProvisionerConfig>,
    {
        let provisioners: BTreeMap<String, ProvisionerConfig> = provisioners
            .into_iter()
            .map(|provisioner| (provisioner.name.clone(), provisioner))
            .collect();
        if !provisioners.is_empty() {
            self.provisioners = provisioners;
        }
        self
    }

    /// Adds one provisioner, replacing any with the same name.
    pub fn add_provisioner(mut self, provisioner: ProvisionerConfig) -> Self {
        self.provisioners.insert(provisioner.name.clone(), provisioner);
        self
    }

    /// Merges provisioners by name.
    pub fn add_provisioners<I>(mut self, provisioners: I) -> Self
    where
        I: IntoIterator<Item = ProvisionerConfig>,
    {
        for provisioner in provisioners {
            self = self.add_provisioner(provisioner);
        }
        self
    }

    /// Validates and freezes the section.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Validation`] when a JIT target or role is blank.
    pub fn build(self) -> Result<ProvisioningConfig, ModelError> {
        let config = ProvisioningConfig {
            jit: JitProvisioningConfig {
                provisioning_idps: self.provisioning_idps,
            },
            claims: self.claims,
            roles: self.roles,
            provisioners: self.provisioners,
        };
        config.validate()?;
        Ok(config)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Test-only assertions are permitted.")]
mod tests {
    use super::ProvisionerConfig;
    use super::ProvisioningClaim;
    use super::ProvisioningConfig;

    #[test]
    fn empty_section_is_valid_and_default() {
        let config = ProvisioningConfig::builder().build().unwrap();
        assert!(config.is_empty());
        assert_eq!(config, ProvisioningConfig::default());
    }

    #[test]
    fn claims_deduplicate_by_uri() {
        let config = ProvisioningConfig::builder()
            .add_claim(ProvisioningClaim::new("urn:email").unwrap())
            .add_claim(ProvisioningClaim::new("urn:email").unwrap().with_default_value("none"))
            .build()
            .unwrap();
        let claims: Vec<_> = config.claims().collect();
        assert_eq!(claims.len(), 1);
        assert_eq!(claims[0].default_value(), Some("none"));
    }

    #[test]
    fn set_provisioners_with_empty_input_keeps_existing() {
        let config = ProvisioningConfig::builder()
            .add_provisioner(ProvisionerConfig::builder("scim").build().unwrap())
            .set_provisioners(Vec::new())
            .build()
            .unwrap();
        assert!(config.provisioner("scim").is_some());
    }

    #[test]
    fn jit_targets_are_reported() {
        let config =
            ProvisioningConfig::builder().add_provisioning_idp("partner").build().unwrap();
        assert!(config.jit_provisioning().is_triggered_by("partner"));
        assert!(!config.jit_provisioning().is_triggered_by("other"));
    }

    #[test]
    fn blank_role_is_rejected() {
        assert!(ProvisioningConfig::builder().add_role("").build().is_err());
    }
}
