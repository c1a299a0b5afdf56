// crates/provider-registry-core/src/core/identifiers.rs
// ============================================================================
// Module: Provider Registry Identifiers
// Description: Store-assigned identifiers for provider aggregates.
// Purpose: Provide strongly typed, serializable identifiers with stable wire forms.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Identifiers are assigned by the store when an aggregate is first persisted
//! and never change afterwards. Numeric identifiers enforce non-zero, 1-based
//! invariants at construction boundaries, so "unsaved" is expressed as
//! `Option::None` on the aggregate rather than a zero sentinel.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::num::NonZeroU64;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

/// Identity provider identifier assigned by the store.
///
/// # Invariants
/// - Always >= 1 (non-zero, 1-based).
/// - Never reassigned or reused once issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityProviderId(NonZeroU64);

impl IdentityProviderId {
    /// Creates a new identity provider identifier from a non-zero value.
    #[must_use]
    pub const fn new(id: NonZeroU64) -> Self {
        Self(id)
    }

    /// Creates an identifier from a raw value (returns `None` if zero).
    #[must_use]
    pub fn from_raw(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(Self)
    }

    /// Returns the raw identifier value (always >= 1).
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for IdentityProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.get().fmt(f)
    }
}

/// Service provider identifier assigned by the store.
///
/// # Invariants
/// - Always >= 1 (non-zero, 1-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceProviderId(NonZeroU64);

impl ServiceProviderId {
    /// Creates a new service provider identifier from a non-zero value.
    #[must_use]
    pub const fn new(id: NonZeroU64) -> Self {
        Self(id)
    }

    /// Creates an identifier from a raw value (returns `None` if zero).
    #[must_use]
    pub fn from_raw(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(Self)
    }

    /// Returns the raw identifier value (always >= 1).
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for ServiceProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.get().fmt(f)
    }
}

// ============================================================================
// SECTION: References
// ============================================================================

/// Addresses an identity provider either by store id or by unique name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderRef {
    /// Store-assigned identifier.
    Id(IdentityProviderId),
    /// Unique provider name.
    Name(String),
}

impl From<IdentityProviderId> for ProviderRef {
    fn from(value: IdentityProviderId) -> Self {
        Self::Id(value)
    }
}

impl From<&str> for ProviderRef {
    fn from(value: &str) -> Self {
        Self::Name(value.to_string())
    }
}

impl From<String> for ProviderRef {
    fn from(value: String) -> Self {
        Self::Name(value)
    }
}

impl fmt::Display for ProviderRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "id {id}"),
            Self::Name(name) => write!(f, "name '{name}'"),
        }
    }
}

/// Addresses a service provider either by store id or by unique name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceProviderRef {
    /// Store-assigned identifier.
    Id(ServiceProviderId),
    /// Unique application name.
    Name(String),
}

impl From<ServiceProviderId> for ServiceProviderRef {
    fn from(value: ServiceProviderId) -> Self {
        Self::Id(value)
    }
}

impl From<&str> for ServiceProviderRef {
    fn from(value: &str) -> Self {
        Self::Name(value.to_string())
    }
}

impl fmt::Display for ServiceProviderRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "id {id}"),
            Self::Name(name) => write!(f, "name '{name}'"),
        }
    }
}
