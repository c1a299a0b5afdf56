// crates/provider-registry-core/src/runtime/service.rs
// ============================================================================
// Module: Provider Service
// Description: Service facade over an injected provider store.
// Purpose: Resolve id|name references, validate input, and run interceptors.
// Dependencies: crate::{core, interfaces, runtime::interceptor}, tracing
// ============================================================================

//! ## Overview
//! [`IdentityProviderService`] is the operation surface used by admin
//! consoles, authentication engines, and federation modules. The store is
//! injected at construction and owned by the service; there is no ambient
//! registration. Every operation runs the registered interceptors before and
//! after the store call and returns the store's typed result unchanged.
//!
//! Administrative reads fail with [`RegistryError::NotFound`] when the
//! target does not exist. Authentication-time callers use
//! [`IdentityProviderService::find_identity_provider`], which maps not-found
//! to `None` and propagates every other failure.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use crate::core::AuthenticationConfig;
use crate::core::IdentityProvider;
use crate::core::IdentityProviderId;
use crate::core::Metadata;
use crate::core::PropertyMap;
use crate::core::PropertyScope;
use crate::core::PropertyValue;
use crate::core::ProviderRef;
use crate::core::ProvisioningConfig;
use crate::core::ServiceProvider;
use crate::core::ServiceProviderId;
use crate::core::ServiceProviderRef;
use crate::interfaces::IdentityProviderStore;
use crate::interfaces::RegistryError;
use crate::interfaces::ServiceProviderStore;
use crate::runtime::interceptor::InterceptorChain;
use crate::runtime::interceptor::OperationOutcome;
use crate::runtime::interceptor::ProviderInterceptor;
use crate::runtime::interceptor::ProviderOperation;

// ============================================================================
// SECTION: Outcome Mapping
// ============================================================================

/// Maps an operation's success value to the outcome shown to `after` hooks.
trait Observed {
    /// Returns the outcome view of the value.
    fn outcome(&self) -> OperationOutcome<'_>;
}

impl Observed for () {
    fn outcome(&self) -> OperationOutcome<'_> {
        OperationOutcome::Completed
    }
}

impl Observed for Vec<String> {
    fn outcome(&self) -> OperationOutcome<'_> {
        OperationOutcome::Names(self)
    }
}

impl Observed for IdentityProviderId {
    fn outcome(&self) -> OperationOutcome<'_> {
        OperationOutcome::IdentityProviderCreated(*self)
    }
}

impl Observed for IdentityProvider {
    fn outcome(&self) -> OperationOutcome<'_> {
        OperationOutcome::IdentityProvider(Some(self))
    }
}

impl Observed for Option<IdentityProvider> {
    fn outcome(&self) -> OperationOutcome<'_> {
        OperationOutcome::IdentityProvider(self.as_ref())
    }
}

impl Observed for ServiceProviderId {
    fn outcome(&self) -> OperationOutcome<'_> {
        OperationOutcome::ServiceProviderCreated(*self)
    }
}

impl Observed for ServiceProvider {
    fn outcome(&self) -> OperationOutcome<'_> {
        OperationOutcome::ServiceProvider(Some(self))
    }
}

// ============================================================================
// SECTION: Service
// ============================================================================

/// Provider registry service over an injected store.
#[derive(Debug)]
pub struct IdentityProviderService<S> {
    /// Backing store.
    store: S,
    /// Registered interceptors.
    interceptors: InterceptorChain,
}

impl<S> IdentityProviderService<S> {
    /// Creates a service over `store` with no interceptors.
    #[must_use]
    pub fn new(store: S) -> Self {
        Self {
            store,
            interceptors: InterceptorChain::new(),
        }
    }

    /// Appends an interceptor; interceptors run in registration order.
    pub fn register_interceptor(&mut self, interceptor: Arc<dyn ProviderInterceptor>) {
        self.interceptors.register(interceptor);
    }

    /// Returns the backing store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Consumes the service and returns the store for shutdown.
    #[must_use]
    pub fn into_store(self) -> S {
        self.store
    }

    /// Runs `call` between the interceptor hooks.
    fn observe<T: Observed>(
        &self,
        operation: &ProviderOperation<'_>,
        call: impl FnOnce() -> Result<T, RegistryError>,
    ) -> Result<T, RegistryError> {
        self.interceptors.before(operation);
        let result = call();
        match &result {
            Ok(value) => self.interceptors.after(operation, &value.outcome()),
            Err(err) => {
                tracing::debug!(operation = operation.name(), error = %err, "operation failed");
                self.interceptors.after(operation, &OperationOutcome::Failed(err));
            }
        }
        result
    }
}

impl<S: IdentityProviderStore> IdentityProviderService<S> {
    /// Returns every identity provider name, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DataAccess`] when the store fails.
    pub fn list_identity_providers(&self) -> Result<Vec<String>, RegistryError> {
        self.observe(&ProviderOperation::ListIdentityProviders, || {
            self.store.list_identity_providers()
        })
    }

    /// Returns enabled identity provider names, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DataAccess`] when the store fails.
    pub fn list_enabled_identity_providers(&self) -> Result<Vec<String>, RegistryError> {
        self.observe(&ProviderOperation::ListEnabledIdentityProviders, || {
            self.store.list_enabled_identity_providers()
        })
    }

    /// Persists an unsaved identity provider and returns its id.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Validation`] when the aggregate already has an
    /// id, [`RegistryError::Conflict`] when the name is taken or a resident
    /// provider already exists.
    pub fn create_identity_provider(
        &self,
        provider: &IdentityProvider,
    ) -> Result<IdentityProviderId, RegistryError> {
        self.observe(&ProviderOperation::CreateIdentityProvider { provider }, || {
            if let Some(id) = provider.id() {
                return Err(RegistryError::Validation(format!(
                    "identity provider '{}' is already persisted with id {id}",
                    provider.name()
                )));
            }
            provider.validate()?;
            let id = self.store.create_identity_provider(provider)?;
            tracing::info!(idp = provider.name(), id = id.get(), "identity provider created");
            Ok(id)
        })
    }

    /// Loads an identity provider by id or name.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] when the reference resolves to nothing.
    pub fn get_identity_provider(
        &self,
        target: &ProviderRef,
    ) -> Result<IdentityProvider, RegistryError> {
        self.observe(&ProviderOperation::GetIdentityProvider { target }, || {
            self.load(target)?.ok_or_else(|| RegistryError::idp_not_found(target))
        })
    }

    /// Loads an identity provider for authentication-time callers.
    ///
    /// A missing provider is `Ok(None)`, meaning "proceed without it".
    ///
    /// # Errors
    ///
    /// Returns every failure other than not-found.
    pub fn find_identity_provider(
        &self,
        target: &ProviderRef,
    ) -> Result<Option<IdentityProvider>, RegistryError> {
        match self.get_identity_provider(target) {
            Ok(provider) => Ok(Some(provider)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Finds the identity provider with a matching provider-level property.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DataAccess`] when the store fails.
    pub fn get_identity_provider_by_property(
        &self,
        key: &str,
        value: &PropertyValue,
    ) -> Result<Option<IdentityProvider>, RegistryError> {
        self.lookup_by_property(PropertyScope::Provider, key, value)
    }

    /// Finds the identity provider with a matching authenticator property.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DataAccess`] when the store fails.
    pub fn get_identity_provider_by_authenticator_property(
        &self,
        key: &str,
        value: &PropertyValue,
    ) -> Result<Option<IdentityProvider>, RegistryError> {
        self.lookup_by_property(PropertyScope::Authenticator, key, value)
    }

    /// Finds the identity provider with a matching provisioner property.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DataAccess`] when the store fails.
    pub fn get_identity_provider_by_provisioner_property(
        &self,
        key: &str,
        value: &PropertyValue,
    ) -> Result<Option<IdentityProvider>, RegistryError> {
        self.lookup_by_property(PropertyScope::Provisioner, key, value)
    }

    /// Replaces every section of a persisted identity provider.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Validation`] when the aggregate is unsaved,
    /// [`RegistryError::NotFound`] when its id does not exist,
    /// [`RegistryError::Conflict`] on a name collision.
    pub fn update_identity_provider(
        &self,
        provider: &IdentityProvider,
    ) -> Result<(), RegistryError> {
        self.observe(&ProviderOperation::UpdateIdentityProvider { provider }, || {
            if provider.is_unsaved() {
                return Err(RegistryError::Validation(format!(
                    "identity provider '{}' has not been created",
                    provider.name()
                )));
            }
            provider.validate()?;
            self.store.update_identity_provider(provider)
        })
    }

    /// Deletes an identity provider by id or name.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] when the reference resolves to nothing.
    pub fn delete_identity_provider(&self, target: &ProviderRef) -> Result<(), RegistryError> {
        self.observe(&ProviderOperation::DeleteIdentityProvider { target }, || {
            let id = self.resolve(target)?;
            self.store.delete_identity_provider(id)?;
            tracing::info!(idp = %target, "identity provider deleted");
            Ok(())
        })
    }

    /// Enables an identity provider; no section is touched.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] when the reference resolves to nothing.
    pub fn enable_identity_provider(&self, target: &ProviderRef) -> Result<(), RegistryError> {
        self.observe(&ProviderOperation::EnableIdentityProvider { target }, || {
            self.store.set_identity_provider_enabled(self.resolve(target)?, true)
        })
    }

    /// Disables an identity provider; configuration is kept.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] when the reference resolves to nothing.
    pub fn disable_identity_provider(&self, target: &ProviderRef) -> Result<(), RegistryError> {
        self.observe(&ProviderOperation::DisableIdentityProvider { target }, || {
            self.store.set_identity_provider_enabled(self.resolve(target)?, false)
        })
    }

    /// Replaces the metadata section.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Validation`] for a malformed section or a
    /// name that contradicts the provider variant, [`RegistryError::NotFound`]
    /// when the target does not exist, [`RegistryError::Conflict`] when the
    /// new name is taken.
    pub fn update_idp_metadata(
        &self,
        target: &ProviderRef,
        metadata: &Metadata,
    ) -> Result<(), RegistryError> {
        self.observe(&ProviderOperation::UpdateMetadata { target, metadata }, || {
            metadata.validate()?;
            self.store.update_metadata(self.resolve(target)?, metadata)
        })
    }

    /// Replaces the authentication section atomically.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Validation`] for a malformed section,
    /// [`RegistryError::NotFound`] when the target does not exist.
    pub fn update_idp_authentication_config(
        &self,
        target: &ProviderRef,
        config: &AuthenticationConfig,
    ) -> Result<(), RegistryError> {
        self.observe(&ProviderOperation::UpdateAuthenticationConfig { target, config }, || {
            config.validate()?;
            self.store.update_authentication_config(self.resolve(target)?, config)
        })
    }

    /// Replaces the provisioning section atomically.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Validation`] for a malformed section,
    /// [`RegistryError::NotFound`] when the target does not exist.
    pub fn update_idp_provisioning_config(
        &self,
        target: &ProviderRef,
        config: &ProvisioningConfig,
    ) -> Result<(), RegistryError> {
        self.observe(&ProviderOperation::UpdateProvisioningConfig { target, config }, || {
            config.validate()?;
            self.store.update_provisioning_config(self.resolve(target)?, config)
        })
    }

    /// Merges `delta` into the stored extension properties.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] when the target does not exist.
    pub fn update_idp_properties(
        &self,
        target: &ProviderRef,
        delta: &PropertyMap,
    ) -> Result<(), RegistryError> {
        self.observe(&ProviderOperation::UpdateProperties { target, delta }, || {
            self.store.merge_properties(self.resolve(target)?, delta)
        })
    }

    /// Checks that the backing store is reachable.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DataAccess`] when the store is unavailable.
    pub fn readiness(&self) -> Result<(), RegistryError> {
        self.store.readiness()
    }

    /// Resolves a reference to a stored identifier.
    fn resolve(&self, target: &ProviderRef) -> Result<IdentityProviderId, RegistryError> {
        match target {
            ProviderRef::Id(id) => Ok(*id),
            ProviderRef::Name(name) => self
                .store
                .resolve_identity_provider_id(name)?
                .ok_or_else(|| RegistryError::idp_not_found(target)),
        }
    }

    /// Loads a provider by reference without mapping misses to errors.
    fn load(&self, target: &ProviderRef) -> Result<Option<IdentityProvider>, RegistryError> {
        let provider = match target {
            ProviderRef::Id(id) => self.store.get_identity_provider(*id)?,
            ProviderRef::Name(name) => self.store.get_identity_provider_by_name(name)?,
        };
        if provider.is_none() {
            tracing::debug!(idp = %target, "identity provider lookup missed");
        }
        Ok(provider)
    }

    /// Runs a scoped property-equality lookup.
    fn lookup_by_property(
        &self,
        scope: PropertyScope,
        key: &str,
        value: &PropertyValue,
    ) -> Result<Option<IdentityProvider>, RegistryError> {
        self.observe(&ProviderOperation::GetIdentityProviderByProperty { scope, key, value }, || {
            self.store.find_identity_provider_by_property(scope, key, value)
        })
    }
}

impl<S: ServiceProviderStore> IdentityProviderService<S> {
    /// Persists an unsaved service provider and returns its id.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Validation`] when the aggregate already has an
    /// id, [`RegistryError::Conflict`] when the name is taken.
    pub fn create_service_provider(
        &self,
        provider: &ServiceProvider,
    ) -> Result<ServiceProviderId, RegistryError> {
        self.observe(&ProviderOperation::CreateServiceProvider { provider }, || {
            if let Some(id) = provider.id() {
                return Err(RegistryError::Validation(format!(
                    "service provider '{}' is already persisted with id {id}",
                    provider.name()
                )));
            }
            provider.validate()?;
            self.store.create_service_provider(provider)
        })
    }

    /// Loads a service provider by id or name.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] when the reference resolves to nothing.
    pub fn get_service_provider(
        &self,
        target: &ServiceProviderRef,
    ) -> Result<ServiceProvider, RegistryError> {
        self.observe(&ProviderOperation::GetServiceProvider { target }, || {
            let provider = match target {
                ServiceProviderRef::Id(id) => self.store.get_service_provider(*id)?,
                ServiceProviderRef::Name(name) => self.store.get_service_provider_by_name(name)?,
            };
            provider.ok_or_else(|| RegistryError::sp_not_found(target))
        })
    }

    /// Returns every service provider name, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DataAccess`] when the store fails.
    pub fn list_service_providers(&self) -> Result<Vec<String>, RegistryError> {
        self.observe(&ProviderOperation::ListServiceProviders, || {
            self.store.list_service_providers()
        })
    }

    /// Returns enabled service provider names, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DataAccess`] when the store fails.
    pub fn list_enabled_service_providers(&self) -> Result<Vec<String>, RegistryError> {
        self.observe(&ProviderOperation::ListEnabledServiceProviders, || {
            self.store.list_enabled_service_providers()
        })
    }

    /// Replaces a persisted service provider.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Validation`] when the aggregate is unsaved,
    /// [`RegistryError::NotFound`] when its id does not exist.
    pub fn update_service_provider(&self, provider: &ServiceProvider) -> Result<(), RegistryError> {
        self.observe(&ProviderOperation::UpdateServiceProvider { provider }, || {
            provider.validate()?;
            self.store.update_service_provider(provider)
        })
    }

    /// Deletes a service provider by id or name.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] when the reference resolves to nothing.
    pub fn delete_service_provider(
        &self,
        target: &ServiceProviderRef,
    ) -> Result<(), RegistryError> {
        self.observe(&ProviderOperation::DeleteServiceProvider { target }, || {
            self.store.delete_service_provider(self.resolve_sp(target)?)
        })
    }

    /// Enables a service provider.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] when the reference resolves to nothing.
    pub fn enable_service_provider(
        &self,
        target: &ServiceProviderRef,
    ) -> Result<(), RegistryError> {
        self.observe(&ProviderOperation::EnableServiceProvider { target }, || {
            self.store.set_service_provider_enabled(self.resolve_sp(target)?, true)
        })
    }

    /// Disables a service provider; configuration is kept.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] when the reference resolves to nothing.
    pub fn disable_service_provider(
        &self,
        target: &ServiceProviderRef,
    ) -> Result<(), RegistryError> {
        self.observe(&ProviderOperation::DisableServiceProvider { target }, || {
            self.store.set_service_provider_enabled(self.resolve_sp(target)?, false)
        })
    }

    /// Resolves a service provider reference to a stored identifier.
    fn resolve_sp(&self, target: &ServiceProviderRef) -> Result<ServiceProviderId, RegistryError> {
        match target {
            ServiceProviderRef::Id(id) => Ok(*id),
            ServiceProviderRef::Name(name) => self
                .store
                .resolve_service_provider_id(name)?
                .ok_or_else(|| RegistryError::sp_not_found(target)),
        }
    }
}
