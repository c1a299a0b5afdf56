// crates/provider-registry-core/src/core/identity_provider.rs
// ============================================================================
// Module: Identity Provider Aggregate
// Description: Resident/Federated identity provider aggregate and its builder.
// Purpose: Compose the configuration sections into one validated aggregate.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! An [`IdentityProvider`] is the aggregate root of one provider
//! configuration. It owns exactly one [`Metadata`] section, an optional
//! [`AuthenticationConfig`], a [`ProvisioningConfig`] (empty by default), and
//! free-form extension properties.
//!
//! The Resident and Federated variants share that shape and differ only in
//! the [`ProviderVariant`] tag. The resident provider is identified by the
//! reserved name [`RESIDENT_IDP_NAME`]; every other name denotes a federated
//! provider. [`ProviderKind::for_name`] is the single discriminator used both
//! when building aggregates and when mapping persisted rows.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::core::authentication::AuthenticationConfig;
use crate::core::authentication::AuthenticationConfigBuilder;
use crate::core::authentication::AuthenticatorConfig;
use crate::core::error::ModelError;
use crate::core::error::require_non_blank;
use crate::core::identifiers::IdentityProviderId;
use crate::core::metadata::ClaimConfig;
use crate::core::metadata::Metadata;
use crate::core::metadata::MetadataBuilder;
use crate::core::properties::PropertyMap;
use crate::core::properties::PropertyValue;
use crate::core::properties::merge_properties;
use crate::core::properties::put_property;
use crate::core::properties::replace_properties;
use crate::core::provisioning::ProvisionerConfig;
use crate::core::provisioning::ProvisioningClaim;
use crate::core::provisioning::ProvisioningConfig;
use crate::core::provisioning::ProvisioningConfigBuilder;

// ============================================================================
// SECTION: Variant Resolution
// ============================================================================

/// Reserved name of the resident identity provider.
pub const RESIDENT_IDP_NAME: &str = "LOCAL";

/// Identity provider variant discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// The platform's own identity provider.
    Resident,
    /// An external provider trusted via federation.
    Federated,
}

impl ProviderKind {
    /// Resolves the variant implied by a provider name.
    #[must_use]
    pub fn for_name(name: &str) -> Self {
        if name == RESIDENT_IDP_NAME { Self::Resident } else { Self::Federated }
    }

    /// Checks a metadata section on its own against this variant.
    ///
    /// Used by section updates, which must not re-validate other sections.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Validation`] when the section is malformed or its
    /// name contradicts the variant.
    pub fn check_metadata(self, metadata: &Metadata) -> Result<(), ModelError> {
        metadata.validate()?;
        check_variant_name(self, metadata.name())
    }

    /// Returns the stable label for the variant.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Resident => "resident",
            Self::Federated => "federated",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Federation-only settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FederatedSettings {
    /// Home realm identifier used for realm discovery.
    home_realm_id: Option<String>,
    /// Whether the provider acts as a federation hub.
    federation_hub: bool,
}

impl FederatedSettings {
    /// Returns the home realm identifier.
    #[must_use]
    pub fn home_realm_id(&self) -> Option<&str> {
        self.home_realm_id.as_deref()
    }

    /// Returns true when the provider is a federation hub.
    #[must_use]
    pub const fn is_federation_hub(&self) -> bool {
        self.federation_hub
    }
}

/// Variant tag carried by every aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProviderVariant {
    /// Resident provider (no federation settings).
    Resident,
    /// Federated provider with its federation settings.
    Federated(FederatedSettings),
}

impl ProviderVariant {
    /// Returns the discriminator for this variant.
    #[must_use]
    pub const fn kind(&self) -> ProviderKind {
        match self {
            Self::Resident => ProviderKind::Resident,
            Self::Federated(_) => ProviderKind::Federated,
        }
    }
}

// ============================================================================
// SECTION: Aggregate
// ============================================================================

/// Identity provider aggregate root.
///
/// # Invariants
/// - `metadata.name` is non-blank; it equals [`RESIDENT_IDP_NAME`] exactly
///   when the variant is [`ProviderVariant::Resident`].
/// - `id` is `None` until the store assigns one, then never changes.
/// - An empty authentication section is represented as `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentityProvider {
    /// Store-assigned identifier (`None` while unsaved).
    id: Option<IdentityProviderId>,
    /// Enabled flag.
    enabled: bool,
    /// Identity section.
    metadata: Metadata,
    /// Authentication section.
    authentication: Option<AuthenticationConfig>,
    /// Provisioning section.
    provisioning: ProvisioningConfig,
    /// Extension properties.
    properties: PropertyMap,
    /// Resident/Federated tag.
    variant: ProviderVariant,
}

impl IdentityProvider {
    /// Starts a builder for the resident provider.
    #[must_use]
    pub fn resident() -> IdentityProviderBuilder {
        IdentityProviderBuilder::new(ProviderKind::Resident, RESIDENT_IDP_NAME)
    }

    /// Starts a builder for a federated provider named `name`.
    #[must_use]
    pub fn federated(name: impl Into<String>) -> IdentityProviderBuilder {
        IdentityProviderBuilder::new(ProviderKind::Federated, name)
    }

    /// Starts a builder whose variant is resolved from `name`.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> IdentityProviderBuilder {
        let name = name.into();
        IdentityProviderBuilder::new(ProviderKind::for_name(&name), name)
    }

    /// Returns the store-assigned identifier.
    #[must_use]
    pub const fn id(&self) -> Option<IdentityProviderId> {
        self.id
    }

    /// Returns true when the aggregate has not been persisted.
    #[must_use]
    pub const fn is_unsaved(&self) -> bool {
        self.id.is_none()
    }

    /// Returns the provider name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.metadata.name()
    }

    /// Returns the enabled flag.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Returns the identity section.
    #[must_use]
    pub const fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Returns the authentication section.
    #[must_use]
    pub const fn authentication(&self) -> Option<&AuthenticationConfig> {
        self.authentication.as_ref()
    }

    /// Returns the provisioning section.
    #[must_use]
    pub const fn provisioning(&self) -> &ProvisioningConfig {
        &self.provisioning
    }

    /// Returns the extension properties.
    #[must_use]
    pub const fn properties(&self) -> &PropertyMap {
        &self.properties
    }

    /// Returns the variant tag.
    #[must_use]
    pub const fn variant(&self) -> &ProviderVariant {
        &self.variant
    }

    /// Returns the variant discriminator.
    #[must_use]
    pub const fn kind(&self) -> ProviderKind {
        self.variant.kind()
    }

    /// Returns a resident view of this provider.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::TypeMismatch`] when the provider is federated.
    pub fn as_resident(&self) -> Result<ResidentIdentityProvider<'_>, ModelError> {
        match &self.variant {
            ProviderVariant::Resident => Ok(ResidentIdentityProvider {
                provider: self,
            }),
            ProviderVariant::Federated(_) => Err(ModelError::TypeMismatch {
                expected: ProviderKind::Resident,
                actual: ProviderKind::Federated,
            }),
        }
    }

    /// Returns a federated view of this provider.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::TypeMismatch`] when the provider is resident.
    pub fn as_federated(&self) -> Result<FederatedIdentityProvider<'_>, ModelError> {
        match &self.variant {
            ProviderVariant::Federated(settings) => Ok(FederatedIdentityProvider {
                provider: self,
                settings,
            }),
            ProviderVariant::Resident => Err(ModelError::TypeMismatch {
                expected: ProviderKind::Federated,
                actual: ProviderKind::Resident,
            }),
        }
    }

    /// Returns this aggregate stamped with a store-assigned identifier.
    #[must_use]
    pub fn with_id(mut self, id: IdentityProviderId) -> Self {
        self.id = Some(id);
        self
    }

    /// Returns this aggregate with the given enabled flag.
    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Returns this aggregate with the metadata section replaced.
    ///
    /// Only the incoming section is checked; the other sections are carried
    /// over untouched.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Validation`] when the section is malformed or its
    /// name contradicts the variant.
    pub fn with_metadata(mut self, metadata: Metadata) -> Result<Self, ModelError> {
        self.kind().check_metadata(&metadata)?;
        self.metadata = metadata;
        Ok(self)
    }

    /// Returns this aggregate with the authentication section replaced.
    ///
    /// An empty section is stored as absent.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Validation`] when the section is malformed.
    pub fn with_authentication(
        mut self,
        authentication: AuthenticationConfig,
    ) -> Result<Self, ModelError> {
        authentication.validate()?;
        self.authentication = Some(authentication).filter(|config| !config.is_empty());
        Ok(self)
    }

    /// Returns this aggregate with the provisioning section replaced.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Validation`] when the section is malformed.
    pub fn with_provisioning(
        mut self,
        provisioning: ProvisioningConfig,
    ) -> Result<Self, ModelError> {
        provisioning.validate()?;
        self.provisioning = provisioning;
        Ok(self)
    }

    /// Returns this aggregate with `delta` merged into its properties.
    ///
    /// Keys absent from `delta` are kept; blank keys and `null` values are
    /// skipped.
    #[must_use]
    pub fn with_merged_properties(mut self, delta: PropertyMap) -> Self {
        merge_properties(&mut self.properties, delta);
        self
    }

    /// Re-checks every aggregate invariant.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Validation`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ModelError> {
        self.metadata.validate()?;
        check_variant_name(self.variant.kind(), self.metadata.name())?;
        if let Some(authentication) = &self.authentication {
            authentication.validate()?;
        }
        self.provisioning.validate()?;
        if let ProviderVariant::Federated(settings) = &self.variant
            && let Some(realm) = &settings.home_realm_id
        {
            require_non_blank("home_realm_id", realm)?;
        }
        Ok(())
    }

    /// Returns a builder seeded with this aggregate's sections.
    ///
    /// The identifier is not carried over; use [`IdentityProvider::with_id`]
    /// on the rebuilt value.
    #[must_use]
    pub fn to_builder(&self) -> IdentityProviderBuilder {
        let (home_realm_id, federation_hub) = match &self.variant {
            ProviderVariant::Resident => (None, false),
            ProviderVariant::Federated(settings) => {
                (settings.home_realm_id.clone(), settings.federation_hub)
            }
        };
        IdentityProviderBuilder {
            kind: self.variant.kind(),
            enabled: self.enabled,
            metadata: self.metadata.to_builder(),
            authentication: self.authentication.as_ref().map(AuthenticationConfig::to_builder),
            provisioning: self.provisioning.to_builder(),
            properties: self.properties.clone(),
            home_realm_id,
            federation_hub,
        }
    }
}

/// Resident view returned by [`IdentityProvider::as_resident`].
#[derive(Debug, Clone, Copy)]
pub struct ResidentIdentityProvider<'a> {
    /// Underlying aggregate.
    provider: &'a IdentityProvider,
}

impl<'a> ResidentIdentityProvider<'a> {
    /// Returns the underlying aggregate.
    #[must_use]
    pub const fn provider(&self) -> &'a IdentityProvider {
        self.provider
    }

    /// Returns the resident provider's identity section.
    #[must_use]
    pub const fn metadata(&self) -> &'a Metadata {
        &self.provider.metadata
    }
}

/// Federated view returned by [`IdentityProvider::as_federated`].
#[derive(Debug, Clone, Copy)]
pub struct FederatedIdentityProvider<'a> {
    /// Underlying aggregate.
    provider: &'a IdentityProvider,
    /// Federation settings.
    settings: &'a FederatedSettings,
}

impl<'a> FederatedIdentityProvider<'a> {
    /// Returns the underlying aggregate.
    #[must_use]
    pub const fn provider(&self) -> &'a IdentityProvider {
        self.provider
    }

    /// Returns the home realm identifier.
    #[must_use]
    pub fn home_realm_id(&self) -> Option<&'a str> {
        self.settings.home_realm_id.as_deref()
    }

    /// Returns true when the provider is a federation hub.
    #[must_use]
    pub const fn is_federation_hub(&self) -> bool {
        self.settings.federation_hub
    }
}

/// Rejects names that contradict the variant.
fn check_variant_name(kind: ProviderKind, name: &str) -> Result<(), ModelError> {
    match (kind, ProviderKind::for_name(name)) {
        (ProviderKind::Resident, ProviderKind::Federated) => Err(ModelError::invalid(
            "metadata.name",
            format!("resident identity provider must be named '{RESIDENT_IDP_NAME}'"),
        )),
        (ProviderKind::Federated, ProviderKind::Resident) => Err(ModelError::invalid(
            "metadata.name",
            format!("'{RESIDENT_IDP_NAME}' is reserved for the resident identity provider"),
        )),
        _ => Ok(()),
    }
}

// ============================================================================
// SECTION: Builder
// ============================================================================

/// Builder for [`IdentityProvider`].
///
/// Section-level setters delegate to the nested section builders, so callers
/// can compose a full aggregate without addressing section boundaries.
#[derive(Debug, Clone)]
#[must_use]
pub struct IdentityProviderBuilder {
    /// Requested variant.
    kind: ProviderKind,
    /// Enabled flag.
    enabled: bool,
    /// Identity section builder.
    metadata: MetadataBuilder,
    /// Authentication section builder, created on first use.
    authentication: Option<AuthenticationConfigBuilder>,
    /// Provisioning section builder.
    provisioning: ProvisioningConfigBuilder,
    /// Extension properties.
    properties: PropertyMap,
    /// Home realm identifier (federated only).
    home_realm_id: Option<String>,
    /// Federation hub flag (federated only).
    federation_hub: bool,
}

impl IdentityProviderBuilder {
    /// Creates an enabled builder for the given variant and name.
    fn new(kind: ProviderKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            enabled: true,
            metadata: MetadataBuilder::new(name),
            authentication: None,
            provisioning: ProvisioningConfigBuilder::default(),
            properties: PropertyMap::new(),
            home_realm_id: None,
            federation_hub: false,
        }
    }

    /// Sets the enabled flag.
    pub const fn set_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    // ------------------------------------------------------------------------
    // Metadata
    // ------------------------------------------------------------------------

    /// Replaces the whole identity section.
    pub fn set_metadata(mut self, metadata: &Metadata) -> Self {
        self.metadata = metadata.to_builder();
        self
    }

    /// Replaces the provider name.
    pub fn set_name(mut self, name: impl Into<String>) -> Self {
        self.metadata = self.metadata.set_name(name);
        self
    }

    /// Sets the display label.
    pub fn set_display_label(mut self, label: impl Into<String>) -> Self {
        self.metadata = self.metadata.set_display_label(label);
        self
    }

    /// Sets the description.
    pub fn set_description(mut self, description: impl Into<String>) -> Self {
        self.metadata = self.metadata.set_description(description);
        self
    }

    /// Replaces the certificate references unless `certificates` is empty.
    pub fn set_certificates(mut self, certificates: BTreeMap<String, String>) -> Self {
        self.metadata = self.metadata.set_certificates(certificates);
        self
    }

    /// Adds a certificate reference.
    pub fn add_certificate(
        mut self,
        alias: impl Into<String>,
        thumbprint: impl Into<String>,
    ) -> Self {
        self.metadata = self.metadata.add_certificate(alias, thumbprint);
        self
    }

    /// Sets the claim dialect reference.
    pub fn set_claim_config(mut self, claim_config: ClaimConfig) -> Self {
        self.metadata = self.metadata.set_claim_config(claim_config);
        self
    }

    /// Replaces the role mappings unless `mappings` is empty.
    pub fn set_role_mappings(mut self, mappings: BTreeMap<u64, String>) -> Self {
        self.metadata = self.metadata.set_role_mappings(mappings);
        self
    }

    /// Maps a local role id to an external role name.
    pub fn add_role_mapping(
        mut self,
        local_role_id: u64,
        external_role: impl Into<String>,
    ) -> Self {
        self.metadata = self.metadata.add_role_mapping(local_role_id, external_role);
        self
    }

    // ------------------------------------------------------------------------
    // Federation
    // ------------------------------------------------------------------------

    /// Sets the home realm identifier (federated providers only).
    pub fn set_home_realm_id(mut self, home_realm_id: impl Into<String>) -> Self {
        self.home_realm_id = Some(home_realm_id.into());
        self
    }

    /// Sets the federation hub flag (federated providers only).
    pub const fn set_federation_hub(mut self, federation_hub: bool) -> Self {
        self.federation_hub = federation_hub;
        self
    }

    // ------------------------------------------------------------------------
    // Authentication
    // ------------------------------------------------------------------------

    /// Replaces the whole authentication section.
    pub fn set_authentication(mut self, authentication: &AuthenticationConfig) -> Self {
        self.authentication = Some(authentication.to_builder());
        self
    }

    /// Applies `update` to the authentication builder, creating it if needed.
    fn with_authentication(
        mut self,
        update: impl FnOnce(AuthenticationConfigBuilder) -> AuthenticationConfigBuilder,
    ) -> Self {
        let current = self.authentication.take().unwrap_or_default();
        self.authentication = Some(update(current));
        self
    }

    /// Adds a requested claim URI.
    pub fn add_requested_claim(self, claim: impl Into<String>) -> Self {
        self.with_authentication(|builder| builder.add_requested_claim(claim))
    }

    /// Merges requested claim URIs.
    pub fn add_requested_claims<I, S>(self, claims: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.with_authentication(|builder| builder.add_requested_claims(claims))
    }

    /// Adds an authenticator, replacing any with the same name.
    pub fn add_authenticator(self, authenticator: AuthenticatorConfig) -> Self {
        self.with_authentication(|builder| builder.add_authenticator(authenticator))
    }

    /// Merges authenticators by name.
    pub fn add_authenticators<I>(self, authenticators: I) -> Self
    where
        I: IntoIterator<Item = AuthenticatorConfig>,
    {
        self.with_authentication(|builder| builder.add_authenticators(authenticators))
    }

    // ------------------------------------------------------------------------
    // Provisioning
    // ------------------------------------------------------------------------

    /// Replaces the whole provisioning section.
    pub fn set_provisioning(mut self, provisioning: &ProvisioningConfig) -> Self {
        self.provisioning = provisioning.to_builder();
        self
    }

    /// Adds a provisioner, replacing any with the same name.
    pub fn add_provisioner(mut self, provisioner: ProvisionerConfig) -> Self {
        self.provisioning = self.provisioning.add_provisioner(provisioner);
        self
    }

    /// Adds a provisioning claim.
    pub fn add_provisioning_claim(mut self, claim: ProvisioningClaim) -> Self {
        self.provisioning = self.provisioning.add_claim(claim);
        self
    }

    /// Adds a role that triggers outbound provisioning.
    pub fn add_provisioning_role(mut self, role: impl Into<String>) -> Self {
        self.provisioning = self.provisioning.add_role(role);
        self
    }

    /// Adds a provider name that triggers JIT provisioning.
    pub fn add_jit_provisioning_idp(mut self, idp: impl Into<String>) -> Self {
        self.provisioning = self.provisioning.add_provisioning_idp(idp);
        self
    }

    // ------------------------------------------------------------------------
    // Properties
    // ------------------------------------------------------------------------

    /// Replaces the extension properties unless `properties` is empty.
    pub fn set_properties(mut self, properties: PropertyMap) -> Self {
        replace_properties(&mut self.properties, properties);
        self
    }

    /// Adds one extension property; blank keys and null values are ignored.
    pub fn add_property(mut self, key: impl Into<String>, value: PropertyValue) -> Self {
        put_property(&mut self.properties, key, value);
        self
    }

    /// Merges extension properties.
    pub fn add_properties(mut self, properties: PropertyMap) -> Self {
        merge_properties(&mut self.properties, properties);
        self
    }

    /// Validates and freezes the aggregate.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Validation`] naming the offending field when a
    /// section is malformed, the name contradicts the variant, or federation
    /// settings are supplied for the resident provider.
    pub fn build(self) -> Result<IdentityProvider, ModelError> {
        let metadata = self.metadata.build()?;
        let authentication = match self.authentication {
            Some(builder) => Some(builder.build()?).filter(|config| !config.is_empty()),
            None => None,
        };
        let provisioning = self.provisioning.build()?;
        let variant = match self.kind {
            ProviderKind::Resident => {
                if self.home_realm_id.is_some() {
                    return Err(ModelError::invalid(
                        "home_realm_id",
                        "resident identity provider has no home realm",
                    ));
                }
                if self.federation_hub {
                    return Err(ModelError::invalid(
                        "federation_hub",
                        "resident identity provider cannot be a federation hub",
                    ));
                }
                ProviderVariant::Resident
            }
            ProviderKind::Federated => ProviderVariant::Federated(FederatedSettings {
                home_realm_id: self.home_realm_id,
                federation_hub: self.federation_hub,
            }),
        };
        let provider = IdentityProvider {
            id: None,
            enabled: self.enabled,
            metadata,
            authentication,
            provisioning,
            properties: self.properties,
            variant,
        };
        provider.validate()?;
        Ok(provider)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
