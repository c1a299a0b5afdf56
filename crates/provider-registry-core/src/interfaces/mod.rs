// crates/provider-registry-core/src/interfaces/mod.rs
// ============================================================================
// Module: Provider Registry Interfaces
// Description: Backend-agnostic store contracts and the registry error taxonomy.
// Purpose: Define the persistence surface used by the provider service.
// Dependencies: crate::core, thiserror
// ============================================================================

//! ## Overview
//! Stores persist identity provider and service provider aggregates. Every
//! section update is its own transaction: implementations apply all row
//! changes of one section or none of them, and never touch other sections.
//! Lookups that find nothing return `Ok(None)`; failures are always typed
//! [`RegistryError`] values and never collapse into an empty result.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::error::Error as StdError;
use std::fmt;

use thiserror::Error;

use crate::core::AuthenticationConfig;
use crate::core::IdentityProvider;
use crate::core::IdentityProviderId;
use crate::core::Metadata;
use crate::core::ModelError;
use crate::core::PropertyMap;
use crate::core::PropertyScope;
use crate::core::PropertyValue;
use crate::core::ProviderKind;
use crate::core::ProvisioningConfig;
use crate::core::ServiceProvider;
use crate::core::ServiceProviderId;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Boxed low-level cause carried by [`RegistryError::DataAccess`].
pub type BoxedCause = Box<dyn StdError + Send + Sync + 'static>;

/// Registry errors surfaced by stores and the provider service.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Malformed input rejected before any store access.
    #[error("validation failed: {0}")]
    Validation(String),
    /// The referenced entity does not exist.
    #[error("{entity} not found: {reference}")]
    NotFound {
        /// Entity kind, e.g. `identity provider`.
        entity: &'static str,
        /// Reference that failed to resolve.
        reference: String,
    },
    /// Uniqueness or cardinality violation.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Store-level failure wrapping the original cause.
    #[error("data access error: {message}")]
    DataAccess {
        /// Operation context.
        message: String,
        /// Original cause.
        #[source]
        source: BoxedCause,
    },
}

impl RegistryError {
    /// Builds a not-found error for an identity provider reference.
    #[must_use]
    pub fn idp_not_found(reference: impl fmt::Display) -> Self {
        Self::NotFound {
            entity: "identity provider",
            reference: reference.to_string(),
        }
    }

    /// Builds a not-found error for a service provider reference.
    #[must_use]
    pub fn sp_not_found(reference: impl fmt::Display) -> Self {
        Self::NotFound {
            entity: "service provider",
            reference: reference.to_string(),
        }
    }

    /// Builds the conflict error for a taken identity provider name.
    ///
    /// The resident provider owns the reserved name, so a collision on it
    /// is reported as a second resident provider.
    #[must_use]
    pub fn duplicate_identity_provider(name: &str) -> Self {
        if ProviderKind::for_name(name) == ProviderKind::Resident {
            Self::Conflict("resident identity provider already exists".to_string())
        } else {
            Self::Conflict(format!("identity provider '{name}' already exists"))
        }
    }

    /// Builds the conflict error for a taken service provider name.
    #[must_use]
    pub fn duplicate_service_provider(name: &str) -> Self {
        Self::Conflict(format!("service provider '{name}' already exists"))
    }

    /// Wraps a low-level failure with operation context.
    #[must_use]
    pub fn data_access(message: impl Into<String>, source: impl Into<BoxedCause>) -> Self {
        Self::DataAccess {
            message: message.into(),
            source: source.into(),
        }
    }

    /// Tags a data access failure with the operation and target it hit.
    ///
    /// Other kinds already name their entity and pass through unchanged.
    #[must_use]
    pub fn in_context(self, operation: &str, target: impl fmt::Display) -> Self {
        match self {
            Self::DataAccess {
                message,
                source,
            } => Self::DataAccess {
                message: format!("{operation} on {target}: {message}"),
                source,
            },
            other => other,
        }
    }

    /// Returns true for [`RegistryError::NotFound`].
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns a stable label for the error kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound { .. } => "not_found",
            Self::Conflict(_) => "conflict",
            Self::DataAccess { .. } => "data_access",
        }
    }
}

impl From<ModelError> for RegistryError {
    fn from(error: ModelError) -> Self {
        Self::Validation(error.to_string())
    }
}

// ============================================================================
// SECTION: Identity Provider Store
// ============================================================================

/// Persistence contract for identity provider aggregates.
///
/// # Invariants
/// - Listing order is id ascending and stable for one store state.
/// - Each `update_*` call touches exactly one section and is atomic.
/// - `set_identity_provider_enabled` changes only the enabled flag.
pub trait IdentityProviderStore: Send + Sync {
    /// Returns every provider name, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DataAccess`] when the store fails.
    fn list_identity_providers(&self) -> Result<Vec<String>, RegistryError>;

    /// Returns the names of enabled providers, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DataAccess`] when the store fails.
    fn list_enabled_identity_providers(&self) -> Result<Vec<String>, RegistryError>;

    /// Persists a new provider and returns its assigned identifier.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Conflict`] when the name is taken or a
    /// resident provider already exists.
    fn create_identity_provider(
        &self,
        provider: &IdentityProvider,
    ) -> Result<IdentityProviderId, RegistryError>;

    /// Loads a provider by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DataAccess`] when the store fails.
    fn get_identity_provider(
        &self,
        id: IdentityProviderId,
    ) -> Result<Option<IdentityProvider>, RegistryError>;

    /// Loads a provider by unique name.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DataAccess`] when the store fails.
    fn get_identity_provider_by_name(
        &self,
        name: &str,
    ) -> Result<Option<IdentityProvider>, RegistryError>;

    /// Resolves a provider name to its identifier.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DataAccess`] when the store fails.
    fn resolve_identity_provider_id(
        &self,
        name: &str,
    ) -> Result<Option<IdentityProviderId>, RegistryError>;

    /// Finds the provider whose property in `scope` equals `value`.
    ///
    /// When several providers match, the one with the lowest id is returned.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DataAccess`] when the store fails.
    fn find_identity_provider_by_property(
        &self,
        scope: PropertyScope,
        key: &str,
        value: &PropertyValue,
    ) -> Result<Option<IdentityProvider>, RegistryError>;

    /// Replaces every section of an existing provider.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Validation`] when the aggregate is unsaved,
    /// [`RegistryError::NotFound`] when the id does not exist.
    fn update_identity_provider(&self, provider: &IdentityProvider) -> Result<(), RegistryError>;

    /// Deletes a provider and all of its sections.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] when the id does not exist.
    fn delete_identity_provider(&self, id: IdentityProviderId) -> Result<(), RegistryError>;

    /// Sets the enabled flag without touching any section.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] when the id does not exist.
    fn set_identity_provider_enabled(
        &self,
        id: IdentityProviderId,
        enabled: bool,
    ) -> Result<(), RegistryError>;

    /// Replaces the metadata section.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] when the id does not exist,
    /// [`RegistryError::Validation`] when the new name contradicts the
    /// provider variant, [`RegistryError::Conflict`] on a name collision.
    fn update_metadata(
        &self,
        id: IdentityProviderId,
        metadata: &Metadata,
    ) -> Result<(), RegistryError>;

    /// Replaces the authentication section atomically.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] when the id does not exist.
    fn update_authentication_config(
        &self,
        id: IdentityProviderId,
        config: &AuthenticationConfig,
    ) -> Result<(), RegistryError>;

    /// Replaces the provisioning section atomically.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] when the id does not exist.
    fn update_provisioning_config(
        &self,
        id: IdentityProviderId,
        config: &ProvisioningConfig,
    ) -> Result<(), RegistryError>;

    /// Merges `delta` into the stored properties; other keys are untouched.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] when the id does not exist.
    fn merge_properties(
        &self,
        id: IdentityProviderId,
        delta: &PropertyMap,
    ) -> Result<(), RegistryError>;

    /// Checks that the store is reachable.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DataAccess`] when the store is unavailable.
    fn readiness(&self) -> Result<(), RegistryError> {
        Ok(())
    }
}

// ============================================================================
// SECTION: Service Provider Store
// ============================================================================

/// Persistence contract for service provider aggregates.
pub trait ServiceProviderStore: Send + Sync {
    /// Persists a new application and returns its assigned identifier.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Conflict`] when the name is taken.
    fn create_service_provider(
        &self,
        provider: &ServiceProvider,
    ) -> Result<ServiceProviderId, RegistryError>;

    /// Loads an application by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DataAccess`] when the store fails.
    fn get_service_provider(
        &self,
        id: ServiceProviderId,
    ) -> Result<Option<ServiceProvider>, RegistryError>;

    /// Loads an application by unique name.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DataAccess`] when the store fails.
    fn get_service_provider_by_name(
        &self,
        name: &str,
    ) -> Result<Option<ServiceProvider>, RegistryError>;

    /// Resolves an application name to its identifier.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DataAccess`] when the store fails.
    fn resolve_service_provider_id(
        &self,
        name: &str,
    ) -> Result<Option<ServiceProviderId>, RegistryError>;

    /// Returns every application name, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DataAccess`] when the store fails.
    fn list_service_providers(&self) -> Result<Vec<String>, RegistryError>;

    /// Returns the names of enabled applications, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DataAccess`] when the store fails.
    fn list_enabled_service_providers(&self) -> Result<Vec<String>, RegistryError>;

    /// Replaces an existing application.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Validation`] when the aggregate is unsaved,
    /// [`RegistryError::NotFound`] when the id does not exist.
    fn update_service_provider(&self, provider: &ServiceProvider) -> Result<(), RegistryError>;

    /// Deletes an application.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] when the id does not exist.
    fn delete_service_provider(&self, id: ServiceProviderId) -> Result<(), RegistryError>;

    /// Sets the enabled flag only.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] when the id does not exist.
    fn set_service_provider_enabled(
        &self,
        id: ServiceProviderId,
        enabled: bool,
    ) -> Result<(), RegistryError>;
}
