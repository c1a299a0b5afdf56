// crates/provider-registry-core/tests/aggregate_builder.rs
// ============================================================================
// Module: Aggregate Builder Tests
// Description: Tests for identity provider composition and validation.
// Purpose: Ensure builders delegate across sections and validate at build time.
// Dependencies: provider-registry-core
// ============================================================================

//! ## Overview
//! Exercises the aggregate builder: section delegation, replace-if-non-empty
//! versus merge semantics, and field-specific validation failures.

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

use std::collections::BTreeMap;

use provider_registry_core::AuthenticationConfig;
use provider_registry_core::AuthenticatorConfig;
use provider_registry_core::ClaimConfig;
use provider_registry_core::IdentityProvider;
use provider_registry_core::Metadata;
use provider_registry_core::ModelError;
use provider_registry_core::PropertyMap;
use provider_registry_core::ProvisionerConfig;
use provider_registry_core::ProvisioningClaim;
use serde_json::json;

fn authenticator(name: &str, enabled: bool) -> AuthenticatorConfig {
    AuthenticatorConfig::builder(name).set_enabled(enabled).build().expect("authenticator")
}

#[test]
fn aggregate_builder_delegates_to_sections() {
    let provider = IdentityProvider::federated("partner")
        .set_display_label("Partner IdP")
        .set_description("federated partner")
        .add_certificate("signing", "AA:BB")
        .set_claim_config(ClaimConfig::new(7).with_local_dialect(true))
        .add_role_mapping(1, "admin")
        .add_requested_claim("urn:email")
        .add_authenticator(authenticator("saml", true))
        .add_provisioner(ProvisionerConfig::builder("scim").build().expect("provisioner"))
        .add_provisioning_claim(ProvisioningClaim::new("urn:mail").expect("claim"))
        .add_provisioning_role("engineering")
        .add_jit_provisioning_idp("partner")
        .add_property("tenant", json!("acme"))
        .build()
        .expect("build provider");

    let metadata = provider.metadata();
    assert_eq!(metadata.name(), "partner");
    assert_eq!(metadata.display_label(), Some("Partner IdP"));
    assert_eq!(metadata.certificates().len(), 1);
    assert!(metadata.claim_config().expect("claim config").is_local_dialect());
    let authentication = provider.authentication().expect("authentication");
    assert!(authentication.requested_claims().contains("urn:email"));
    assert!(authentication.authenticator("saml").expect("saml").is_enabled());
    assert!(provider.provisioning().provisioner("scim").is_some());
    assert!(provider.provisioning().roles().contains("engineering"));
    assert!(provider.provisioning().jit_provisioning().is_triggered_by("partner"));
    assert_eq!(provider.properties().get("tenant"), Some(&json!("acme")));
    assert!(provider.is_enabled());
    assert!(provider.is_unsaved());
}

#[test]
fn zero_authenticators_and_provisioners_is_valid() {
    let provider = IdentityProvider::federated("draft").set_enabled(false).build().expect("build");
    assert!(provider.authentication().is_none());
    assert!(provider.provisioning().is_empty());
    assert!(!provider.is_enabled());
}

#[test]
fn blank_name_fails_with_field() {
    let err = IdentityProvider::federated("  ").build().expect_err("blank name");
    assert!(matches!(err, ModelError::Validation { field: "metadata.name", .. }));
}

#[test]
fn set_with_empty_input_is_not_a_clear() {
    let provider = IdentityProvider::federated("idp")
        .add_property("a", json!(1))
        .set_properties(PropertyMap::new())
        .add_certificate("alias", "thumb")
        .set_certificates(BTreeMap::new())
        .build()
        .expect("build");
    assert_eq!(provider.properties().len(), 1);
    assert_eq!(provider.metadata().certificates().len(), 1);
}

#[test]
fn set_with_values_replaces_and_add_merges() {
    let mut replacement = PropertyMap::new();
    replacement.insert("b".to_string(), json!(2));
    let mut extra = PropertyMap::new();
    extra.insert("c".to_string(), json!(3));
    let provider = IdentityProvider::federated("idp")
        .add_property("a", json!(1))
        .set_properties(replacement)
        .add_properties(extra)
        .build()
        .expect("build");
    let keys: Vec<&str> = provider.properties().keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["b", "c"]);
}

#[test]
fn set_authentication_replaces_the_whole_section() {
    let section = AuthenticationConfig::builder()
        .add_authenticator(authenticator("oidc", true))
        .build()
        .expect("section");
    let provider = IdentityProvider::federated("idp")
        .add_authenticator(authenticator("saml", true))
        .set_authentication(&section)
        .build()
        .expect("build");
    let authentication = provider.authentication().expect("authentication");
    assert_eq!(authentication.authenticator_count(), 1);
    assert!(authentication.authenticator("oidc").is_some());
}

#[test]
fn set_metadata_replaces_identity_section() {
    let metadata = Metadata::builder("renamed").set_description("new").build().expect("metadata");
    let provider =
        IdentityProvider::federated("idp").set_metadata(&metadata).build().expect("build");
    assert_eq!(provider.metadata(), &metadata);
}

#[test]
fn blank_authenticator_property_key_is_ignored() {
    let authenticator = AuthenticatorConfig::builder("basic")
        .add_property("", json!("x"))
        .add_property("realm", json!(null))
        .build()
        .expect("authenticator");
    assert!(authenticator.properties().is_empty());
}

#[test]
fn blank_provisioning_claim_uri_is_rejected() {
    let err = ProvisioningClaim::new(" ").expect_err("blank uri");
    assert!(matches!(err, ModelError::Validation { field: "provisioning.claims.claim_uri", .. }));
}
