// crates/provider-registry-store-sqlite/tests/proptest_store.rs
// ============================================================================
// Module: SQLite Provider Store Property-Based Tests
// Description: Property tests for idempotent and isolated section writes.
// Purpose: Check storage state against generated section payloads.
// ============================================================================

//! Property-based tests for the relational provider store.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use proptest::prelude::*;
use provider_registry_core::IdentityProvider;
use provider_registry_core::IdentityProviderStore;
use provider_registry_core::Metadata;
use provider_registry_core::PropertyMap;
use provider_registry_store_sqlite::SqliteProviderStore;
use provider_registry_store_sqlite::SqliteStoreConfig;
use serde_json::json;
use tempfile::TempDir;

fn open_store(dir: &TempDir) -> SqliteProviderStore {
    let mut config = SqliteStoreConfig::new(dir.path().join("providers.db"));
    config.read_pool_size = 1;
    SqliteProviderStore::open(config).unwrap()
}

fn metadata_strategy() -> impl Strategy<Value = Metadata> {
    (
        "[a-z]{1,8}",
        prop::option::of("[A-Za-z][A-Za-z ]{0,11}"),
        prop::collection::btree_map("[a-z]{1,5}", "[A-Z0-9]{4,10}", 0 .. 3),
        prop::collection::btree_map(1_u64 .. 50, "[a-z]{1,6}", 0 .. 3),
    )
        .prop_map(|(name, label, certificates, roles)| {
            let mut builder = Metadata::builder(format!("idp-{name}"))
                .set_certificates(certificates)
                .set_role_mappings(roles);
            if let Some(label) = label {
                builder = builder.set_display_label(label);
            }
            builder.build().unwrap()
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn metadata_update_is_idempotent(metadata in metadata_strategy(), repeats in 1_usize .. 4) {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        let provider = IdentityProvider::builder("seed")
            .add_property("keep", json!(true))
            .build()
            .unwrap();
        let id = store.create_identity_provider(&provider).unwrap();

        store.update_metadata(id, &metadata).unwrap();
        let once = store.get_identity_provider(id).unwrap().unwrap();
        for _ in 0 .. repeats {
            store.update_metadata(id, &metadata).unwrap();
        }
        let many = store.get_identity_provider(id).unwrap().unwrap();

        prop_assert_eq!(&once, &many);
        prop_assert_eq!(many.metadata(), &metadata);
        prop_assert_eq!(many.properties(), provider.properties());
    }

    #[test]
    fn property_merge_only_touches_delta_keys(
        base in prop::collection::btree_map("[a-m]{1,4}", any::<i32>(), 0 .. 5),
        delta in prop::collection::btree_map("[h-z]{1,4}", any::<i32>(), 0 .. 5),
    ) {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        let base_map: PropertyMap = base.iter().map(|(k, v)| (k.clone(), json!(v))).collect();
        let delta_map: PropertyMap = delta.iter().map(|(k, v)| (k.clone(), json!(v))).collect();
        let provider =
            IdentityProvider::builder("idp").add_properties(base_map.clone()).build().unwrap();
        let id = store.create_identity_provider(&provider).unwrap();

        store.merge_properties(id, &delta_map).unwrap();
        let stored = store.get_identity_provider(id).unwrap().unwrap();

        let mut expected = base_map;
        expected.extend(delta_map);
        prop_assert_eq!(stored.properties(), &expected);
    }
}
