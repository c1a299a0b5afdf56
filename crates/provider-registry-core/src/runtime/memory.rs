// crates/provider-registry-core/src/runtime/memory.rs
// ============================================================================
// Module: In-Memory Provider Store
// Description: Mutex-guarded store for tests and local demos.
// Purpose: Provide the store contracts without external dependencies.
// Dependencies: crate::{core, interfaces}, tracing
// ============================================================================

//! ## Overview
//! This module provides an in-memory implementation of
//! [`IdentityProviderStore`] and [`ServiceProviderStore`] with the same
//! observable semantics as the relational store: ids start at 1 and are never
//! reused, names are unique per entity type, listings are ordered by id, and
//! section updates rebuild the aggregate through its builder so invariants
//! are re-checked. It is not intended for production use.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use crate::core::AuthenticationConfig;
use crate::core::IdentityProvider;
use crate::core::IdentityProviderId;
use crate::core::Metadata;
use crate::core::PropertyMap;
use crate::core::PropertyScope;
use crate::core::PropertyValue;
use crate::core::ProvisioningConfig;
use crate::core::ServiceProvider;
use crate::core::ServiceProviderId;
use crate::interfaces::IdentityProviderStore;
use crate::interfaces::RegistryError;
use crate::interfaces::ServiceProviderStore;

// ============================================================================
// SECTION: State
// ============================================================================

/// Mutable state behind the store mutex.
#[derive(Debug, Default)]
struct MemoryState {
    /// Last identity provider id issued.
    last_idp_id: u64,
    /// Identity providers keyed by raw id.
    idps: BTreeMap<u64, IdentityProvider>,
    /// Last service provider id issued.
    last_sp_id: u64,
    /// Service providers keyed by raw id.
    sps: BTreeMap<u64, ServiceProvider>,
}

impl MemoryState {
    /// Returns the raw id of the identity provider named `name`.
    fn idp_id_by_name(&self, name: &str) -> Option<u64> {
        self.idps.iter().find(|(_, idp)| idp.name() == name).map(|(id, _)| *id)
    }

    /// Returns the raw id of the service provider named `name`.
    fn sp_id_by_name(&self, name: &str) -> Option<u64> {
        self.sps.iter().find(|(_, sp)| sp.name() == name).map(|(id, _)| *id)
    }

    /// Rejects a name already used by another identity provider.
    fn check_idp_name(&self, name: &str, owner: Option<u64>) -> Result<(), RegistryError> {
        match self.idp_id_by_name(name) {
            Some(existing) if Some(existing) != owner => {
                Err(RegistryError::duplicate_identity_provider(name))
            }
            _ => Ok(()),
        }
    }

    /// Replaces a stored identity provider with `update`'s result.
    fn replace_idp(
        &mut self,
        id: IdentityProviderId,
        update: impl FnOnce(&IdentityProvider) -> Result<IdentityProvider, RegistryError>,
    ) -> Result<(), RegistryError> {
        let current =
            self.idps.get(&id.get()).ok_or_else(|| RegistryError::idp_not_found(id))?;
        let next = update(current)?.with_id(id);
        self.check_idp_name(next.name(), Some(id.get()))?;
        self.idps.insert(id.get(), next);
        Ok(())
    }
}

// ============================================================================
// SECTION: In-Memory Store
// ============================================================================

/// In-memory provider store for tests and examples.
#[derive(Debug, Default, Clone)]
pub struct InMemoryProviderStore {
    /// Store state protected by a mutex.
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryProviderStore {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the state, mapping poisoning to a data access error.
    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, RegistryError> {
        self.state.lock().map_err(|_| {
            RegistryError::data_access("in-memory provider store", "store mutex poisoned")
        })
    }
}

impl IdentityProviderStore for InMemoryProviderStore {
    fn list_identity_providers(&self) -> Result<Vec<String>, RegistryError> {
        let state = self.lock()?;
        Ok(state.idps.values().map(|idp| idp.name().to_string()).collect())
    }

    fn list_enabled_identity_providers(&self) -> Result<Vec<String>, RegistryError> {
        let state = self.lock()?;
        Ok(state
            .idps
            .values()
            .filter(|idp| idp.is_enabled())
            .map(|idp| idp.name().to_string())
            .collect())
    }

    fn create_identity_provider(
        &self,
        provider: &IdentityProvider,
    ) -> Result<IdentityProviderId, RegistryError> {
        let mut state = self.lock()?;
        state.check_idp_name(provider.name(), None)?;
        let raw = state.last_idp_id + 1;
        let id = IdentityProviderId::from_raw(raw).ok_or_else(|| {
            RegistryError::data_access("identity provider id allocation", "id space exhausted")
        })?;
        state.last_idp_id = raw;
        state.idps.insert(raw, provider.clone().with_id(id));
        Ok(id)
    }

    fn get_identity_provider(
        &self,
        id: IdentityProviderId,
    ) -> Result<Option<IdentityProvider>, RegistryError> {
        Ok(self.lock()?.idps.get(&id.get()).cloned())
    }

    fn get_identity_provider_by_name(
        &self,
        name: &str,
    ) -> Result<Option<IdentityProvider>, RegistryError> {
        let state = self.lock()?;
        Ok(state.idp_id_by_name(name).and_then(|id| state.idps.get(&id)).cloned())
    }

    fn resolve_identity_provider_id(
        &self,
        name: &str,
    ) -> Result<Option<IdentityProviderId>, RegistryError> {
        Ok(self.lock()?.idp_id_by_name(name).and_then(IdentityProviderId::from_raw))
    }

    fn find_identity_provider_by_property(
        &self,
        scope: PropertyScope,
        key: &str,
        value: &PropertyValue,
    ) -> Result<Option<IdentityProvider>, RegistryError> {
        let state = self.lock()?;
        let matches: Vec<&IdentityProvider> =
            state.idps.values().filter(|idp| has_property(idp, scope, key, value)).collect();
        if matches.len() > 1 {
            tracing::warn!(
                scope = scope.as_str(),
                key,
                matches = matches.len(),
                "property lookup matched several identity providers; using lowest id"
            );
        }
        Ok(matches.first().map(|idp| (*idp).clone()))
    }

    fn update_identity_provider(&self, provider: &IdentityProvider) -> Result<(), RegistryError> {
        let id = provider.id().ok_or_else(|| {
            RegistryError::Validation("identity provider has not been created".to_string())
        })?;
        self.lock()?.replace_idp(id, |_| Ok(provider.clone()))
    }

    fn delete_identity_provider(&self, id: IdentityProviderId) -> Result<(), RegistryError> {
        self.lock()?
            .idps
            .remove(&id.get())
            .map(|_| ())
            .ok_or_else(|| RegistryError::idp_not_found(id))
    }

    fn set_identity_provider_enabled(
        &self,
        id: IdentityProviderId,
        enabled: bool,
    ) -> Result<(), RegistryError> {
        self.lock()?.replace_idp(id, |current| Ok(current.clone().with_enabled(enabled)))
    }

    fn update_metadata(
        &self,
        id: IdentityProviderId,
        metadata: &Metadata,
    ) -> Result<(), RegistryError> {
        self.lock()?
            .replace_idp(id, |current| Ok(current.clone().with_metadata(metadata.clone())?))
    }

    fn update_authentication_config(
        &self,
        id: IdentityProviderId,
        config: &AuthenticationConfig,
    ) -> Result<(), RegistryError> {
        self.lock()?
            .replace_idp(id, |current| Ok(current.clone().with_authentication(config.clone())?))
    }

    fn update_provisioning_config(
        &self,
        id: IdentityProviderId,
        config: &ProvisioningConfig,
    ) -> Result<(), RegistryError> {
        self.lock()?
            .replace_idp(id, |current| Ok(current.clone().with_provisioning(config.clone())?))
    }

    fn merge_properties(
        &self,
        id: IdentityProviderId,
        delta: &PropertyMap,
    ) -> Result<(), RegistryError> {
        self.lock()?.replace_idp(id, |current| {
            Ok(current.clone().with_merged_properties(delta.clone()))
        })
    }
}

/// Returns true when `idp` carries `key == value` in the scoped section.
fn has_property(
    idp: &IdentityProvider,
    scope: PropertyScope,
    key: &str,
    value: &PropertyValue,
) -> bool {
    match scope {
        PropertyScope::Provider => idp.properties().get(key) == Some(value),
        PropertyScope::Authenticator => idp.authentication().is_some_and(|authentication| {
            authentication
                .authenticators()
                .any(|authenticator| authenticator.properties().get(key) == Some(value))
        }),
        PropertyScope::Provisioner => idp
            .provisioning()
            .provisioners()
            .any(|provisioner| provisioner.properties().get(key) == Some(value)),
    }
}

impl ServiceProviderStore for InMemoryProviderStore {
    fn create_service_provider(
        &self,
        provider: &ServiceProvider,
    ) -> Result<ServiceProviderId, RegistryError> {
        let mut state = self.lock()?;
        if state.sp_id_by_name(provider.name()).is_some() {
            return Err(RegistryError::duplicate_service_provider(provider.name()));
        }
        let raw = state.last_sp_id + 1;
        let id = ServiceProviderId::from_raw(raw).ok_or_else(|| {
            RegistryError::data_access("service provider id allocation", "id space exhausted")
        })?;
        state.last_sp_id = raw;
        state.sps.insert(raw, provider.clone().with_id(id));
        Ok(id)
    }

    fn get_service_provider(
        &self,
        id: ServiceProviderId,
    ) -> Result<Option<ServiceProvider>, RegistryError> {
        Ok(self.lock()?.sps.get(&id.get()).cloned())
    }

    fn get_service_provider_by_name(
        &self,
        name: &str,
    ) -> Result<Option<ServiceProvider>, RegistryError> {
        let state = self.lock()?;
        Ok(state.sp_id_by_name(name).and_then(|id| state.sps.get(&id)).cloned())
    }

    fn resolve_service_provider_id(
        &self,
        name: &str,
    ) -> Result<Option<ServiceProviderId>, RegistryError> {
        Ok(self.lock()?.sp_id_by_name(name).and_then(ServiceProviderId::from_raw))
    }

    fn list_service_providers(&self) -> Result<Vec<String>, RegistryError> {
        Ok(self.lock()?.sps.values().map(|sp| sp.name().to_string()).collect())
    }

    fn list_enabled_service_providers(&self) -> Result<Vec<String>, RegistryError> {
        Ok(self
            .lock()?
            .sps
            .values()
            .filter(|sp| sp.is_enabled())
            .map(|sp| sp.name().to_string())
            .collect())
    }

    fn update_service_provider(&self, provider: &ServiceProvider) -> Result<(), RegistryError> {
        let id = provider.id().ok_or_else(|| {
            RegistryError::Validation("service provider has not been created".to_string())
        })?;
        let mut state = self.lock()?;
        if !state.sps.contains_key(&id.get()) {
            return Err(RegistryError::sp_not_found(id));
        }
        if let Some(owner) = state.sp_id_by_name(provider.name())
            && owner != id.get()
        {
            return Err(RegistryError::duplicate_service_provider(provider.name()));
        }
        state.sps.insert(id.get(), provider.clone());
        Ok(())
    }

    fn delete_service_provider(&self, id: ServiceProviderId) -> Result<(), RegistryError> {
        self.lock()?
            .sps
            .remove(&id.get())
            .map(|_| ())
            .ok_or_else(|| RegistryError::sp_not_found(id))
    }

    fn set_service_provider_enabled(
        &self,
        id: ServiceProviderId,
        enabled: bool,
    ) -> Result<(), RegistryError> {
        let mut state = self.lock()?;
        let current = state.sps.remove(&id.get()).ok_or_else(|| RegistryError::sp_not_found(id))?;
        state.sps.insert(id.get(), current.with_enabled(enabled));
        Ok(())
    }
}
