// crates/provider-registry-core/src/core/error.rs
// ============================================================================
// Module: Provider Registry Model Errors
// Description: Construction-time validation failures for configuration values.
// Purpose: Report the offending field whenever a value cannot be frozen.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! Every configuration value is validated once, when it is built. Failures
//! name the field that was rejected so administrative callers can surface a
//! precise message. Variant mismatches raised by the resolver share this
//! error type.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::identity_provider::ProviderKind;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration model errors.
///
/// # Invariants
/// - `Validation::field` is the dotted path of the rejected field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// A field failed structural validation.
    #[error("invalid {field}: {message}")]
    Validation {
        /// Dotted path of the rejected field.
        field: &'static str,
        /// Human-readable reason.
        message: String,
    },
    /// A variant-specific view was requested for the other variant.
    #[error("identity provider type mismatch: expected {expected}, found {actual}")]
    TypeMismatch {
        /// Variant the caller asked for.
        expected: ProviderKind,
        /// Variant the aggregate actually is.
        actual: ProviderKind,
    },
}

impl ModelError {
    /// Builds a validation error for `field`.
    pub(crate) fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Largest external reference id the registry accepts (signed 64-bit range).
pub const MAX_REFERENCE_ID: u64 = i64::MAX.unsigned_abs();

/// Rejects reference ids beyond [`MAX_REFERENCE_ID`].
pub(crate) fn require_reference_id(field: &'static str, value: u64) -> Result<(), ModelError> {
    if value > MAX_REFERENCE_ID {
        return Err(ModelError::invalid(field, format!("{value} exceeds {MAX_REFERENCE_ID}")));
    }
    Ok(())
}

/// Rejects empty or whitespace-only values.
pub(crate) fn require_non_blank(field: &'static str, value: &str) -> Result<(), ModelError> {
    if value.trim().is_empty() {
        return Err(ModelError::invalid(field, "must not be blank"));
    }
    Ok(())
}
