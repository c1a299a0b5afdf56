// crates/provider-registry-core/src/core/service_provider.rs
// ============================================================================
// Module: Service Provider Aggregate
// Description: Application (relying party) configuration aggregate.
// Purpose: Compose inbound, step-based authentication, provisioning, claim,
//          and permission sections into one validated aggregate.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`ServiceProvider`] describes one application that relies on the
//! platform for authentication. Its identity columns (name, label,
//! description, enabled flag) are addressable on their own; the nested
//! sections travel together as [`ServiceProviderSections`], a serializable
//! record the store persists as one canonical JSON document.
//!
//! Leaf records are plain structs with public fields. They are validated
//! once, by [`ServiceProviderBuilder::build`]; values decoded from storage
//! pass through the same builder.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;

use crate::core::error::ModelError;
use crate::core::error::require_non_blank;
use crate::core::identifiers::ServiceProviderId;
use crate::core::properties::PropertyMap;
use crate::core::properties::PropertyValue;
use crate::core::properties::merge_properties;
use crate::core::properties::put_property;

// ============================================================================
// SECTION: Inbound Authentication
// ============================================================================

/// Inbound protocol binding (for example an OAuth client or SAML issuer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundAuthenticationRequestConfig {
    /// Protocol-specific key (client id, issuer).
    pub inbound_auth_key: String,
    /// Protocol type, e.g. `oauth2` or `samlsso`.
    pub inbound_auth_type: String,
    /// Configuration type used by admin tooling.
    #[serde(default)]
    pub inbound_config_type: Option<String>,
    /// Human-facing name.
    #[serde(default)]
    pub friendly_name: Option<String>,
    /// Protocol properties.
    #[serde(default)]
    pub properties: PropertyMap,
}

impl InboundAuthenticationRequestConfig {
    /// Creates an inbound binding without optional fields.
    #[must_use]
    pub fn new(inbound_auth_key: impl Into<String>, inbound_auth_type: impl Into<String>) -> Self {
        Self {
            inbound_auth_key: inbound_auth_key.into(),
            inbound_auth_type: inbound_auth_type.into(),
            inbound_config_type: None,
            friendly_name: None,
            properties: PropertyMap::new(),
        }
    }

    /// Checks the binding's required fields.
    fn validate(&self) -> Result<(), ModelError> {
        require_non_blank("inbound_authentication.inbound_auth_key", &self.inbound_auth_key)?;
        require_non_blank("inbound_authentication.inbound_auth_type", &self.inbound_auth_type)
    }
}

// ============================================================================
// SECTION: Local and Outbound Authentication
// ============================================================================

/// How a step decides between request-path and interactive authentication.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthStrategy {
    /// Only request-path authenticators are attempted.
    RequestPathOnly,
    /// The login page is always shown.
    #[default]
    ShowAuthPage,
    /// Request-path authenticators first, otherwise the login page.
    RequestPathOrShowAuth,
    /// The login page is shown only after request-path authentication fails.
    ShowAuthWhenRequestPathFails,
}

/// Local authenticator used in an authentication step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalAuthenticatorConfig {
    /// Authenticator name.
    pub name: String,
    /// Display name.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Whether the authenticator is enabled.
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    /// Authenticator properties.
    #[serde(default)]
    pub properties: PropertyMap,
}

impl LocalAuthenticatorConfig {
    /// Creates an enabled local authenticator reference.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: None,
            enabled: true,
            properties: PropertyMap::new(),
        }
    }
}

/// One stage of a multi-step login flow.
///
/// # Invariants
/// - At least one local authenticator or federated provider is configured.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticationStep {
    /// Step strategy.
    #[serde(default)]
    pub strategy: AuthStrategy,
    /// Local authenticators offered in this step.
    #[serde(default)]
    pub local_authenticators: Vec<LocalAuthenticatorConfig>,
    /// Federated identity providers offered in this step, by name.
    #[serde(default)]
    pub federated_idps: Vec<String>,
}

impl AuthenticationStep {
    /// Creates an empty step with the given strategy.
    #[must_use]
    pub const fn new(strategy: AuthStrategy) -> Self {
        Self {
            strategy,
            local_authenticators: Vec::new(),
            federated_idps: Vec::new(),
        }
    }

    /// Adds a local authenticator.
    #[must_use]
    pub fn with_local_authenticator(mut self, authenticator: LocalAuthenticatorConfig) -> Self {
        self.local_authenticators.push(authenticator);
        self
    }

    /// Adds a federated identity provider by name.
    #[must_use]
    pub fn with_federated_idp(mut self, idp_name: impl Into<String>) -> Self {
        self.federated_idps.push(idp_name.into());
        self
    }

    /// Checks the step invariants.
    fn validate(&self) -> Result<(), ModelError> {
        if self.local_authenticators.is_empty() && self.federated_idps.is_empty() {
            return Err(ModelError::invalid(
                "local_and_outbound.steps",
                "each step needs a local authenticator or a federated identity provider",
            ));
        }
        for authenticator in &self.local_authenticators {
            require_non_blank(
                "local_and_outbound.steps.local_authenticators.name",
                &authenticator.name,
            )?;
        }
        for idp in &self.federated_idps {
            require_non_blank("local_and_outbound.steps.federated_idps", idp)?;
        }
        Ok(())
    }
}

/// Ordered login steps plus subject handling flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalAndOutboundAuthenticationConfig {
    /// Steps in execution order.
    #[serde(default)]
    pub steps: Vec<AuthenticationStep>,
    /// Whether the authenticated provider names are sent to the application.
    #[serde(default)]
    pub send_authenticated_idps: bool,
    /// Whether the user store domain is kept in local subject identifiers.
    #[serde(default)]
    pub use_domain_in_local_subject_identifier: bool,
    /// Whether the local subject identifier is used instead of the asserted one.
    #[serde(default = "enabled_by_default")]
    pub use_local_subject_identifier: bool,
}

impl Default for LocalAndOutboundAuthenticationConfig {
    fn default() -> Self {
        Self {
            steps: Vec::new(),
            send_authenticated_idps: false,
            use_domain_in_local_subject_identifier: false,
            use_local_subject_identifier: true,
        }
    }
}

// ============================================================================
// SECTION: Provisioning, Claims, Permissions
// ============================================================================

/// Outbound provisioning for users of the application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundProvisioningConfig {
    /// Identity providers users are provisioned to, by name.
    #[serde(default)]
    pub provisioning_idps: BTreeSet<String>,
    /// Roles whose holders are provisioned.
    #[serde(default)]
    pub provision_by_roles: BTreeSet<String>,
}

/// Claim handling for the application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationClaimConfig {
    /// Whether claims are expressed in the local dialect.
    #[serde(default)]
    pub local_claim_dialect: bool,
    /// Claim URI carrying the subject's roles.
    #[serde(default)]
    pub role_claim_uri: Option<String>,
    /// Claim URIs requested by the application.
    #[serde(default)]
    pub requested_claims: BTreeSet<String>,
    /// Application claim URI to local claim URI.
    #[serde(default)]
    pub claim_mappings: BTreeMap<String, String>,
}

/// Permissions and role mappings defined for the application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionAndRoleConfig {
    /// Application permission paths.
    #[serde(default)]
    pub permissions: BTreeSet<String>,
    /// Local role name to application role name.
    #[serde(default)]
    pub role_mappings: BTreeMap<String, String>,
}

/// Serde default for flags that start enabled.
const fn enabled_by_default() -> bool {
    true
}

// ============================================================================
// SECTION: Sections Record
// ============================================================================

/// Nested sections of a service provider, persisted together.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceProviderSections {
    /// Inbound protocol bindings.
    #[serde(default)]
    pub inbound_authentication: Vec<InboundAuthenticationRequestConfig>,
    /// Login steps and subject flags.
    #[serde(default)]
    pub local_and_outbound: LocalAndOutboundAuthenticationConfig,
    /// Outbound provisioning.
    #[serde(default)]
    pub provisioning: OutboundProvisioningConfig,
    /// Claim handling.
    #[serde(default)]
    pub claim_config: ApplicationClaimConfig,
    /// Permissions and role mappings.
    #[serde(default)]
    pub permission_and_role: PermissionAndRoleConfig,
    /// Extension properties.
    #[serde(default)]
    pub properties: PropertyMap,
}

impl ServiceProviderSections {
    /// Checks every section's invariants.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Validation`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ModelError> {
        let mut bindings = BTreeSet::new();
        for inbound in &self.inbound_authentication {
            inbound.validate()?;
            let binding = (inbound.inbound_auth_type.as_str(), inbound.inbound_auth_key.as_str());
            if !bindings.insert(binding) {
                return Err(ModelError::invalid(
                    "inbound_authentication",
                    format!(
                        "duplicate {} binding '{}'",
                        inbound.inbound_auth_type, inbound.inbound_auth_key
                    ),
                ));
            }
        }
        for step in &self.local_and_outbound.steps {
            step.validate()?;
        }
        for idp in &self.provisioning.provisioning_idps {
            require_non_blank("provisioning.provisioning_idps", idp)?;
        }
        if let Some(uri) = &self.claim_config.role_claim_uri {
            require_non_blank("claim_config.role_claim_uri", uri)?;
        }
        for permission in &self.permission_and_role.permissions {
            require_non_blank("permission_and_role.permissions", permission)?;
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Aggregate
// ============================================================================

/// Service provider aggregate root.
///
/// # Invariants
/// - `name` is non-blank; global uniqueness is enforced by the store.
/// - `id` is `None` until the store assigns one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceProvider {
    /// Store-assigned identifier.
    id: Option<ServiceProviderId>,
    /// Unique application name.
    name: String,
    /// Display label.
    display_label: Option<String>,
    /// Description.
    description: Option<String>,
    /// Enabled flag.
    enabled: bool,
    /// Nested sections.
    sections: ServiceProviderSections,
}

impl ServiceProvider {
    /// Starts a builder for the application `name`.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> ServiceProviderBuilder {
        ServiceProviderBuilder::new(name)
    }

    /// Returns the store-assigned identifier.
    #[must_use]
    pub const fn id(&self) -> Option<ServiceProviderId> {
        self.id
    }

    /// Returns the application name.
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

    /// Returns the enabled flag.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Returns the nested sections.
    #[must_use]
    pub const fn sections(&self) -> &ServiceProviderSections {
        &self.sections
    }

    /// Returns the inbound protocol bindings.
    #[must_use]
    pub fn inbound_authentication(&self) -> &[InboundAuthenticationRequestConfig] {
        &self.sections.inbound_authentication
    }

    /// Returns the login steps and subject flags.
    #[must_use]
    pub const fn local_and_outbound(&self) -> &LocalAndOutboundAuthenticationConfig {
        &self.sections.local_and_outbound
    }

    /// Returns the extension properties.
    #[must_use]
    pub const fn properties(&self) -> &PropertyMap {
        &self.sections.properties
    }

    /// Returns this aggregate stamped with a store-assigned identifier.
    #[must_use]
    pub fn with_id(mut self, id: ServiceProviderId) -> Self {
        self.id = Some(id);
        self
    }

    /// Returns this aggregate with the given enabled flag.
    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Re-checks every aggregate invariant.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Validation`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ModelError> {
        require_non_blank("name", &self.name)?;
        self.sections.validate()
    }

    /// Returns a builder seeded with this aggregate's values.
    #[must_use]
    pub fn to_builder(&self) -> ServiceProviderBuilder {
        ServiceProviderBuilder {
            name: self.name.clone(),
            display_label: self.display_label.clone(),
            description: self.description.clone(),
            enabled: self.enabled,
            sections: self.sections.clone(),
        }
    }
}

/// Builder for [`ServiceProvider`].
#[derive(Debug, Clone)]
#[must_use]
pub struct ServiceProviderBuilder {
    /// Application name.
    name: String,
    /// Display label.
    display_label: Option<String>,
    /// Description.
    description: Option<String>,
    /// Enabled flag.
    enabled: bool,
    /// Nested sections.
    sections: ServiceProviderSections,
}

impl ServiceProviderBuilder {
    /// Creates an enabled builder for `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_label: None,
            description: None,
            enabled: true,
            sections: ServiceProviderSections::default(),
        }
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

    /// Sets the enabled flag.
    pub const fn set_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Replaces every nested section.
    pub fn set_sections(mut self, sections: ServiceProviderSections) -> Self {
        self.sections = sections;
        self
    }

    /// Adds an inbound protocol binding.
    pub fn add_inbound_authentication(
        mut self,
        config: InboundAuthenticationRequestConfig,
    ) -> Self {
        self.sections.inbound_authentication.push(config);
        self
    }

    /// Appends a login step.
    pub fn add_authentication_step(mut self, step: AuthenticationStep) -> Self {
        self.sections.local_and_outbound.steps.push(step);
        self
    }

    /// Replaces the login steps and subject flags.
    pub fn set_local_and_outbound(mut self, config: LocalAndOutboundAuthenticationConfig) -> Self {
        self.sections.local_and_outbound = config;
        self
    }

    /// Replaces the outbound provisioning section.
    pub fn set_provisioning(mut self, config: OutboundProvisioningConfig) -> Self {
        self.sections.provisioning = config;
        self
    }

    /// Replaces the claim section.
    pub fn set_claim_config(mut self, config: ApplicationClaimConfig) -> Self {
        self.sections.claim_config = config;
        self
    }

    /// Replaces the permission and role section.
    pub fn set_permission_and_role(mut self, config: PermissionAndRoleConfig) -> Self {
        self.sections.permission_and_role = config;
        self
    }

    /// Adds one extension property; blank keys and null values are ignored.
    pub fn add_property(mut self, key: impl Into<String>, value: PropertyValue) -> Self {
        put_property(&mut self.sections.properties, key, value);
        self
    }

    /// Merges extension properties.
    pub fn add_properties(mut self, properties: PropertyMap) -> Self {
        merge_properties(&mut self.sections.properties, properties);
        self
    }

    /// Validates and freezes the aggregate.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Validation`] naming the offending field.
    pub fn build(self) -> Result<ServiceProvider, ModelError> {
        let provider = ServiceProvider {
            id: None,
            name: self.name,
            display_label: self.display_label,
            description: self.description,
            enabled: self.enabled,
            sections: self.sections,
        };
        provider.validate()?;
        Ok(provider)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
