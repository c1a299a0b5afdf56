// crates/provider-registry-core/src/runtime/interceptor.rs
// ============================================================================
// Module: Operation Interceptors
// Description: Ordered observer callbacks invoked around service operations.
// Purpose: Let deployments observe every registry operation without altering it.
// Dependencies: crate::{core, interfaces}, thiserror, tracing
// ============================================================================

//! ## Overview
//! Interceptors are registered explicitly on the provider service and run in
//! registration order. `before` sees the operation and its arguments; `after`
//! additionally sees the outcome. An interceptor failure is logged and the
//! remaining interceptors still run; the primary operation is never aborted
//! or altered by an interceptor.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

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
use crate::interfaces::RegistryError;

// ============================================================================
// SECTION: Operations
// ============================================================================

/// Service operation observed by interceptors, with borrowed arguments.
#[derive(Debug, Clone, Copy)]
pub enum ProviderOperation<'a> {
    /// List all identity provider names.
    ListIdentityProviders,
    /// List enabled identity provider names.
    ListEnabledIdentityProviders,
    /// Create an identity provider.
    CreateIdentityProvider {
        /// Aggregate to persist.
        provider: &'a IdentityProvider,
    },
    /// Load an identity provider by id or name.
    GetIdentityProvider {
        /// Target reference.
        target: &'a ProviderRef,
    },
    /// Look up an identity provider by property equality.
    GetIdentityProviderByProperty {
        /// Section whose properties are inspected.
        scope: PropertyScope,
        /// Property key.
        key: &'a str,
        /// Expected value.
        value: &'a PropertyValue,
    },
    /// Replace a whole identity provider.
    UpdateIdentityProvider {
        /// Replacement aggregate.
        provider: &'a IdentityProvider,
    },
    /// Delete an identity provider.
    DeleteIdentityProvider {
        /// Target reference.
        target: &'a ProviderRef,
    },
    /// Enable an identity provider.
    EnableIdentityProvider {
        /// Target reference.
        target: &'a ProviderRef,
    },
    /// Disable an identity provider.
    DisableIdentityProvider {
        /// Target reference.
        target: &'a ProviderRef,
    },
    /// Replace the metadata section.
    UpdateMetadata {
        /// Target reference.
        target: &'a ProviderRef,
        /// Replacement section.
        metadata: &'a Metadata,
    },
    /// Replace the authentication section.
    UpdateAuthenticationConfig {
        /// Target reference.
        target: &'a ProviderRef,
        /// Replacement section.
        config: &'a AuthenticationConfig,
    },
    /// Replace the provisioning section.
    UpdateProvisioningConfig {
        /// Target reference.
        target: &'a ProviderRef,
        /// Replacement section.
        config: &'a ProvisioningConfig,
    },
    /// Merge extension properties.
    UpdateProperties {
        /// Target reference.
        target: &'a ProviderRef,
        /// Properties to merge.
        delta: &'a PropertyMap,
    },
    /// Create a service provider.
    CreateServiceProvider {
        /// Aggregate to persist.
        provider: &'a ServiceProvider,
    },
    /// Load a service provider by id or name.
    GetServiceProvider {
        /// Target reference.
        target: &'a ServiceProviderRef,
    },
    /// List all service provider names.
    ListServiceProviders,
    /// List enabled service provider names.
    ListEnabledServiceProviders,
    /// Replace a whole service provider.
    UpdateServiceProvider {
        /// Replacement aggregate.
        provider: &'a ServiceProvider,
    },
    /// Delete a service provider.
    DeleteServiceProvider {
        /// Target reference.
        target: &'a ServiceProviderRef,
    },
    /// Enable a service provider.
    EnableServiceProvider {
        /// Target reference.
        target: &'a ServiceProviderRef,
    },
    /// Disable a service provider.
    DisableServiceProvider {
        /// Target reference.
        target: &'a ServiceProviderRef,
    },
}

impl ProviderOperation<'_> {
    /// Returns a stable operation label.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::ListIdentityProviders => "list_identity_providers",
            Self::ListEnabledIdentityProviders => "list_enabled_identity_providers",
            Self::CreateIdentityProvider { .. } => "create_identity_provider",
            Self::GetIdentityProvider { .. } => "get_identity_provider",
            Self::GetIdentityProviderByProperty { .. } => "get_identity_provider_by_property",
            Self::UpdateIdentityProvider { .. } => "update_identity_provider",
            Self::DeleteIdentityProvider { .. } => "delete_identity_provider",
            Self::EnableIdentityProvider { .. } => "enable_identity_provider",
            Self::DisableIdentityProvider { .. } => "disable_identity_provider",
            Self::UpdateMetadata { .. } => "update_idp_metadata",
            Self::UpdateAuthenticationConfig { .. } => "update_idp_authentication_config",
            Self::UpdateProvisioningConfig { .. } => "update_idp_provisioning_config",
            Self::UpdateProperties { .. } => "update_idp_properties",
            Self::CreateServiceProvider { .. } => "create_service_provider",
            Self::GetServiceProvider { .. } => "get_service_provider",
            Self::ListServiceProviders => "list_service_providers",
            Self::ListEnabledServiceProviders => "list_enabled_service_providers",
            Self::UpdateServiceProvider { .. } => "update_service_provider",
            Self::DeleteServiceProvider { .. } => "delete_service_provider",
            Self::EnableServiceProvider { .. } => "enable_service_provider",
            Self::DisableServiceProvider { .. } => "disable_service_provider",
        }
    }

    /// Returns a printable description of the addressed entity, if any.
    #[must_use]
    pub fn target(&self) -> Option<String> {
        match self {
            Self::ListIdentityProviders
            | Self::ListEnabledIdentityProviders
            | Self::ListServiceProviders
            | Self::ListEnabledServiceProviders => None,
            Self::CreateIdentityProvider { provider }
            | Self::UpdateIdentityProvider { provider } => {
                Some(format!("name '{}'", provider.name()))
            }
            Self::CreateServiceProvider { provider } | Self::UpdateServiceProvider { provider } => {
                Some(format!("name '{}'", provider.name()))
            }
            Self::GetIdentityProviderByProperty { scope, key, .. } => {
                Some(format!("{scope} property '{key}'"))
            }
            Self::GetIdentityProvider { target }
            | Self::DeleteIdentityProvider { target }
            | Self::EnableIdentityProvider { target }
            | Self::DisableIdentityProvider { target }
            | Self::UpdateMetadata { target, .. }
            | Self::UpdateAuthenticationConfig { target, .. }
            | Self::UpdateProvisioningConfig { target, .. }
            | Self::UpdateProperties { target, .. } => Some(target.to_string()),
            Self::GetServiceProvider { target }
            | Self::DeleteServiceProvider { target }
            | Self::EnableServiceProvider { target }
            | Self::DisableServiceProvider { target } => Some(target.to_string()),
        }
    }
}

/// Result of an operation as seen by `after` hooks.
#[derive(Debug, Clone, Copy)]
pub enum OperationOutcome<'a> {
    /// Provider names returned by a listing.
    Names(&'a [String]),
    /// Identifier assigned to a new identity provider.
    IdentityProviderCreated(IdentityProviderId),
    /// Identity provider returned by a lookup (`None` when nothing matched).
    IdentityProvider(Option<&'a IdentityProvider>),
    /// Identifier assigned to a new service provider.
    ServiceProviderCreated(ServiceProviderId),
    /// Service provider returned by a lookup.
    ServiceProvider(Option<&'a ServiceProvider>),
    /// A write completed.
    Completed,
    /// The operation failed.
    Failed(&'a RegistryError),
}

impl OperationOutcome<'_> {
    /// Returns `success` or `failure`.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Failed(_) => "failure",
            _ => "success",
        }
    }

    /// Returns the error kind label for failed operations.
    #[must_use]
    pub const fn error_kind(&self) -> Option<&'static str> {
        match self {
            Self::Failed(error) => Some(error.kind()),
            _ => None,
        }
    }
}

// ============================================================================
// SECTION: Interceptor Trait
// ============================================================================

/// Interceptor failure. Logged by the chain, never propagated.
#[derive(Debug, Error)]
#[error("interceptor {interceptor} failed: {message}")]
pub struct InterceptorError {
    /// Name of the failing interceptor.
    pub interceptor: String,
    /// Failure description.
    pub message: String,
}

impl InterceptorError {
    /// Creates an interceptor error.
    #[must_use]
    pub fn new(interceptor: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            interceptor: interceptor.into(),
            message: message.into(),
        }
    }
}

/// Observer invoked around every service operation.
pub trait ProviderInterceptor: Send + Sync {
    /// Returns a name used in diagnostics.
    fn name(&self) -> &str;

    /// Runs before the operation.
    ///
    /// # Errors
    ///
    /// Returns [`InterceptorError`] when the hook fails; the failure is logged.
    fn before(&self, _operation: &ProviderOperation<'_>) -> Result<(), InterceptorError> {
        Ok(())
    }

    /// Runs after the operation with its outcome.
    ///
    /// # Errors
    ///
    /// Returns [`InterceptorError`] when the hook fails; the failure is logged.
    fn after(
        &self,
        _operation: &ProviderOperation<'_>,
        _outcome: &OperationOutcome<'_>,
    ) -> Result<(), InterceptorError> {
        Ok(())
    }
}

// ============================================================================
// SECTION: Interceptor Chain
// ============================================================================

/// Ordered list of registered interceptors.
#[derive(Clone, Default)]
pub struct InterceptorChain {
    /// Interceptors in registration order.
    interceptors: Vec<Arc<dyn ProviderInterceptor>>,
}

impl InterceptorChain {
    /// Creates an empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an interceptor.
    pub fn register(&mut self, interceptor: Arc<dyn ProviderInterceptor>) {
        self.interceptors.push(interceptor);
    }

    /// Returns the number of registered interceptors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    /// Returns true when no interceptor is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    /// Invokes every `before` hook, logging failures.
    pub fn before(&self, operation: &ProviderOperation<'_>) {
        for interceptor in &self.interceptors {
            if let Err(err) = interceptor.before(operation) {
                tracing::warn!(
                    interceptor = interceptor.name(),
                    operation = operation.name(),
                    error = %err,
                    "pre-operation interceptor failed"
                );
            }
        }
    }

    /// Invokes every `after` hook, logging failures.
    pub fn after(&self, operation: &ProviderOperation<'_>, outcome: &OperationOutcome<'_>) {
        for interceptor in &self.interceptors {
            if let Err(err) = interceptor.after(operation, outcome) {
                tracing::warn!(
                    interceptor = interceptor.name(),
                    operation = operation.name(),
                    error = %err,
                    "post-operation interceptor failed"
                );
            }
        }
    }
}

impl fmt::Debug for InterceptorChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.interceptors.iter().map(|i| i.name()).collect();
        f.debug_struct("InterceptorChain").field("interceptors", &names).finish()
    }
}
