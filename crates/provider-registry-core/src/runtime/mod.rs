// crates/provider-registry-core/src/runtime/mod.rs
// ============================================================================
// Module: Provider Registry Runtime
// Description: Service facade, interceptor chain, audit sinks, in-memory store.
// Purpose: Execute registry operations against an injected store.
// Dependencies: crate::{core, interfaces}, serde_json, tracing
// ============================================================================

//! ## Overview
//! Runtime modules wrap a store in the provider service, run registered
//! interceptors around every operation, and provide the audit interceptor
//! and an in-memory store for tests and demos.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod audit;
pub mod interceptor;
pub mod memory;
pub mod service;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::AuditInterceptor;
pub use audit::FileAuditSink;
pub use audit::NoopAuditSink;
pub use audit::ProviderAuditEvent;
pub use audit::ProviderAuditSink;
pub use audit::StderrAuditSink;
pub use interceptor::InterceptorChain;
pub use interceptor::InterceptorError;
pub use interceptor::OperationOutcome;
pub use interceptor::ProviderInterceptor;
pub use interceptor::ProviderOperation;
pub use memory::InMemoryProviderStore;
pub use service::IdentityProviderService;
