// crates/provider-registry-core/src/core/mod.rs
// ============================================================================
// Module: Provider Registry Core Types
// Description: Configuration value types and provider aggregates.
// Purpose: Provide validated, immutable configuration for identity and service providers.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Core types describe identity provider and service provider configuration.
//! Leaf sections are frozen by their builders and composed into aggregates;
//! mutation always means building a new value. Stores and the service layer
//! consume these types without re-validating them.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod authentication;
pub mod error;
pub mod identifiers;
pub mod identity_provider;
pub mod metadata;
pub mod properties;
pub mod provisioning;
pub mod service_provider;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use authentication::AuthenticationConfig;
pub use authentication::AuthenticationConfigBuilder;
pub use authentication::AuthenticatorConfig;
pub use authentication::AuthenticatorConfigBuilder;
pub use error::MAX_REFERENCE_ID;
pub use error::ModelError;
pub use identifiers::IdentityProviderId;
pub use identifiers::ProviderRef;
pub use identifiers::ServiceProviderId;
pub use identifiers::ServiceProviderRef;
pub use identity_provider::FederatedIdentityProvider;
pub use identity_provider::FederatedSettings;
pub use identity_provider::IdentityProvider;
pub use identity_provider::IdentityProviderBuilder;
pub use identity_provider::ProviderKind;
pub use identity_provider::ProviderVariant;
pub use identity_provider::RESIDENT_IDP_NAME;
pub use identity_provider::ResidentIdentityProvider;
pub use metadata::ClaimConfig;
pub use metadata::Metadata;
pub use metadata::MetadataBuilder;
pub use metadata::RoleConfig;
pub use properties::PropertyMap;
pub use properties::PropertyScope;
pub use properties::PropertyValue;
pub use properties::canonical_property_text;
pub use provisioning::JitProvisioningConfig;
pub use provisioning::ProvisionerConfig;
pub use provisioning::ProvisionerConfigBuilder;
pub use provisioning::ProvisioningClaim;
pub use provisioning::ProvisioningConfig;
pub use provisioning::ProvisioningConfigBuilder;
pub use service_provider::ApplicationClaimConfig;
pub use service_provider::AuthStrategy;
pub use service_provider::AuthenticationStep;
pub use service_provider::InboundAuthenticationRequestConfig;
pub use service_provider::LocalAndOutboundAuthenticationConfig;
pub use service_provider::LocalAuthenticatorConfig;
pub use service_provider::OutboundProvisioningConfig;
pub use service_provider::PermissionAndRoleConfig;
pub use service_provider::ServiceProvider;
pub use service_provider::ServiceProviderBuilder;
pub use service_provider::ServiceProviderSections;
