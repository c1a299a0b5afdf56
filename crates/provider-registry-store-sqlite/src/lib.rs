// crates/provider-registry-store-sqlite/src/lib.rs
// ============================================================================
// Module: SQLite Provider Store
// Description: Relational IdentityProviderStore and ServiceProviderStore.
// Purpose: Provide durable, per-section persistence for provider aggregates.
// Dependencies: provider-registry-core, rusqlite
// ============================================================================

//! ## Overview
//! This crate persists identity provider aggregates across one table per
//! section so that metadata, authentication, provisioning, and property
//! updates each run in their own transaction without rewriting the other
//! sections. Service providers are stored as one row with their nested
//! sections in a canonical JSON column.

// ============================================================================
// SECTION: Modules
// ============================================================================

mod schema;
mod sections;
pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::SqliteProviderStore;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteStoreMode;
pub use store::SqliteSyncMode;
