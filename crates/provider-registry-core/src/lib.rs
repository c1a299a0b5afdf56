// crates/provider-registry-core/src/lib.rs
// ============================================================================
// Module: Provider Registry Core Library
// Description: Public API surface for the provider registry core.
// Purpose: Expose configuration types, store interfaces, and runtime helpers.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Provider registry core models identity provider and service provider
//! configuration as immutable, builder-composed aggregates and defines the
//! granular persistence contract: each configuration section is replaced on
//! its own, atomically, without rewriting the others. Storage backends
//! implement the interfaces; the service facade adds id|name resolution and
//! interceptor hooks.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::BoxedCause;
pub use interfaces::IdentityProviderStore;
pub use interfaces::RegistryError;
pub use interfaces::ServiceProviderStore;
pub use runtime::AuditInterceptor;
pub use runtime::FileAuditSink;
pub use runtime::IdentityProviderService;
pub use runtime::InMemoryProviderStore;
pub use runtime::InterceptorChain;
pub use runtime::InterceptorError;
pub use runtime::NoopAuditSink;
pub use runtime::OperationOutcome;
pub use runtime::ProviderAuditEvent;
pub use runtime::ProviderAuditSink;
pub use runtime::ProviderInterceptor;
pub use runtime::ProviderOperation;
pub use runtime::StderrAuditSink;
