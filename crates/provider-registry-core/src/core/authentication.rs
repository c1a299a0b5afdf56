// crates/provider-registry-core/src/core/authentication.rs
// ============================================================================
// Module: Authentication Config
// Description: Requested claims and authenticator list of an identity provider.
// Purpose: Provide the immutable authentication section and its builders.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! The authentication section lists the claim URIs requested from the
//! provider and the authenticators it exposes. Both collections are sets:
//! claim URIs deduplicate by value and authenticators by name, with the
//! last added authenticator for a name winning.

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
// SECTION: Authenticator Config
// ============================================================================

/// One authenticator exposed by an identity provider.
///
/// # Invariants
/// - `name` is non-blank and is the authenticator's key within a section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthenticatorConfig {
    /// Authenticator name (key).
    name: String,
    /// Whether the authenticator is enabled.
    enabled: bool,
    /// Authenticator properties.
    properties: PropertyMap,
}

impl AuthenticatorConfig {
    /// Starts a builder for the authenticator `name`.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> AuthenticatorConfigBuilder {
        AuthenticatorConfigBuilder::new(name)
    }

    /// Returns the authenticator name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns whether the authenticator is enabled.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Returns the authenticator properties.
    #[must_use]
    pub const fn properties(&self) -> &PropertyMap {
        &self.properties
    }
}

/// Builder for [`AuthenticatorConfig`].
#[derive(Debug, Clone)]
#[must_use]
pub struct AuthenticatorConfigBuilder {
    /// Authenticator name.
    name: String,
    /// Enabled flag.
    enabled: bool,
    /// Authenticator properties.
    properties: PropertyMap,
}

impl AuthenticatorConfigBuilder {
    /// Creates a disabled authenticator builder.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: false,
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

    /// Validates and freezes the authenticator.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Validation`] when the name is blank.
    pub fn build(self) -> Result<AuthenticatorConfig, ModelError> {
        require_non_blank("authenticator.name", &self.name)?;
        Ok(AuthenticatorConfig {
            name: self.name,
            enabled: self.enabled,
            properties: self.properties,
        })
    }
}

// ============================================================================
// SECTION: Authentication Config
// ============================================================================

/// Authentication section of an identity provider.
///
/// # Invariants
/// - Requested claims are unique, non-blank URIs.
/// - Authenticators are unique by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AuthenticationConfig {
    /// Requested claim URIs.
    requested_claims: BTreeSet<String>,
    /// Authenticators keyed by name.
    authenticators: BTreeMap<String, AuthenticatorConfig>,
}

impl AuthenticationConfig {
    /// Starts an empty authentication builder.
    #[must_use]
    pub fn builder() -> AuthenticationConfigBuilder {
        AuthenticationConfigBuilder::default()
    }

    /// Returns the requested claim URIs.
    #[must_use]
    pub const fn requested_claims(&self) -> &BTreeSet<String> {
        &self.requested_claims
    }

    /// Returns the authenticators ordered by name.
    pub fn authenticators(&self) -> impl Iterator<Item = &AuthenticatorConfig> {
        self.authenticators.values()
    }

    /// Returns the authenticator named `name`.
    #[must_use]
    pub fn authenticator(&self, name: &str) -> Option<&AuthenticatorConfig> {
        self.authenticators.get(name)
    }

    /// Returns the number of authenticators.
    #[must_use]
    pub fn authenticator_count(&self) -> usize {
        self.authenticators.len()
    }

    /// Returns true when no claims and no authenticators are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.requested_claims.is_empty() && self.authenticators.is_empty()
    }

    /// Re-checks the section invariants.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Validation`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ModelError> {
        for claim in &self.requested_claims {
            require_non_blank("authentication.requested_claims", claim)?;
        }
        for (key, authenticator) in &self.authenticators {
            require_non_blank("authenticator.name", key)?;
            if key != &authenticator.name {
                return Err(ModelError::invalid(
                    "authenticator.name",
                    format!("authenticator keyed as '{key}' is named '{}'", authenticator.name),
                ));
            }
        }
        Ok(())
    }

    /// Returns a builder seeded with this section's values.
    #[must_use]
    pub fn to_builder(&self) -> AuthenticationConfigBuilder {
        AuthenticationConfigBuilder {
            requested_claims: self.requested_claims.clone(),
            authenticators: self.authenticators.clone(),
        }
    }
}

/// Builder for [`AuthenticationConfig`].
#[derive(Debug, Clone, Default)]
#[must_use]
pub struct AuthenticationConfigBuilder {
    /// Requested claim URIs.
    requested_claims: BTreeSet<String>,
    /// Authenticators keyed by name.
    authenticators: BTreeMap<String, AuthenticatorConfig>,
}

impl AuthenticationConfigBuilder {
    /// Replaces the requested claims unless `claims` is empty.
    pub fn set_requested_claims<I, S>(mut self, claims: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let claims: BTreeSet<String> = claims.into_iter().map(Into::into).collect();
        if !claims.is_empty() {
            self.requested_claims = claims;
        }
        self
    }

    /// Adds one requested claim URI.
    pub fn add_requested_claim(mut self, claim: impl Into<String>) -> Self {
        self.requested_claims.insert(claim.into());
        self
    }

    /// Merges requested claim URIs.
    pub fn add_requested_claims<I, S>(mut self, claims: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.requested_claims.extend(claims.into_iter().map(Into::into));
        self
    }

    /// Replaces the authenticators unless `authenticators` is empty.
    pub fn set_authenticators<I>(mut self, authenticators: I) -> Self
    where
        I: IntoIterator<Item = AuthenticatorConfig>,
    {
        let authenticators: BTreeMap<String, AuthenticatorConfig> = authenticators
            .into_iter()
            .map(|authenticator| (authenticator.name.clone(), authenticator))
            .collect();
        if !authenticators.is_empty() {
            self.authenticators = authenticators;
        }
        self
    }

    /// Adds one authenticator, replacing any with the same name.
    pub fn add_authenticator(mut self, authenticator: AuthenticatorConfig) -> Self {
        self.authenticators.insert(authenticator.name.clone(), authenticator);
        self
    }

    /// Merges authenticators by name.
    pub fn add_authenticators<I>(mut self, authenticators: I) -> Self
    where
        I: IntoIterator<Item = AuthenticatorConfig>,
    {
        for authenticator in authenticators {
            self = self.add_authenticator(authenticator);
        }
        self
    }

    /// Validates and freezes the section.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Validation`] when a requested claim is blank.
    pub fn build(self) -> Result<AuthenticationConfig, ModelError> {
        let config = AuthenticationConfig {
            requested_claims: self.requested_claims,
            authenticators: self.authenticators,
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
    use serde_json::json;

    use super::AuthenticationConfig;
    use super::AuthenticatorConfig;

    #[test]
    fn authenticators_deduplicate_by_name() {
        let first = AuthenticatorConfig::builder("basic").set_enabled(false).build().unwrap();
        let second = AuthenticatorConfig::builder("basic")
            .set_enabled(true)
            .add_property("realm", json!("corp"))
            .build()
            .unwrap();
        let config = AuthenticationConfig::builder()
            .add_authenticator(first)
            .add_authenticator(second)
            .build()
            .unwrap();
        assert_eq!(config.authenticator_count(), 1);
        let stored = config.authenticator("basic").unwrap();
        assert!(stored.is_enabled());
        assert_eq!(stored.properties().get("realm"), Some(&json!("corp")));
    }

    #[test]
    fn set_requested_claims_with_empty_input_keeps_existing() {
        let config = AuthenticationConfig::builder()
            .add_requested_claim("http://claims/email")
            .set_requested_claims(Vec::<String>::new())
            .build()
            .unwrap();
        assert!(config.requested_claims().contains("http://claims/email"));
    }

    #[test]
    fn blank_requested_claim_is_rejected() {
        assert!(AuthenticationConfig::builder().add_requested_claim(" ").build().is_err());
    }

    #[test]
    fn blank_authenticator_name_is_rejected() {
        assert!(AuthenticatorConfig::builder("").build().is_err());
    }
}
