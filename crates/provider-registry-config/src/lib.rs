// crates/provider-registry-config/src/lib.rs
// ============================================================================
// Module: Provider Registry Config Library
// Description: Configuration model and loading for the provider registry.
// Purpose: Single source of truth for provider-registry.toml semantics.
// Dependencies: provider-registry-core, provider-registry-store-sqlite, toml
// ============================================================================

//! ## Overview
//! `provider-registry-config` loads the registry's TOML configuration, checks
//! it fail-closed, and turns it into a ready [`IdentityProviderService`]
//! backed by the `SQLite` store with the configured audit sink registered.
//!
//! [`IdentityProviderService`]: provider_registry_core::IdentityProviderService

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
