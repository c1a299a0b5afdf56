// crates/provider-registry-core/tests/service.rs
// ============================================================================
// Module: Provider Service Tests
// Description: Service facade tests over the in-memory store.
// Purpose: Validate error taxonomy, id|name addressing, and interceptor hooks.
// Dependencies: provider-registry-core, tempfile
// ============================================================================

//! ## Overview
//! Drives [`IdentityProviderService`] through the lifecycle scenarios and
//! checks that interceptors observe every operation without influencing it.

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

use std::sync::Arc;
use std::sync::Mutex;

use provider_registry_core::AuditInterceptor;
use provider_registry_core::AuthStrategy;
use provider_registry_core::AuthenticationConfig;
use provider_registry_core::AuthenticationStep;
use provider_registry_core::AuthenticatorConfig;
use provider_registry_core::FileAuditSink;
use provider_registry_core::IdentityProvider;
use provider_registry_core::IdentityProviderService;
use provider_registry_core::InMemoryProviderStore;
use provider_registry_core::InterceptorError;
use provider_registry_core::LocalAuthenticatorConfig;
use provider_registry_core::Metadata;
use provider_registry_core::OperationOutcome;
use provider_registry_core::PropertyMap;
use provider_registry_core::ProviderInterceptor;
use provider_registry_core::ProviderOperation;
use provider_registry_core::ProviderRef;
use provider_registry_core::ProvisionerConfig;
use provider_registry_core::ProvisioningConfig;
use provider_registry_core::RegistryError;
use provider_registry_core::ServiceProvider;
use provider_registry_core::ServiceProviderRef;
use serde_json::json;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn service() -> IdentityProviderService<InMemoryProviderStore> {
    IdentityProviderService::new(InMemoryProviderStore::new())
}

fn sample_idp(name: &str) -> IdentityProvider {
    IdentityProvider::federated(name)
        .set_display_label("IDP One")
        .set_description("d")
        .build()
        .expect("build idp")
}

/// Records `before`/`after` calls as `phase:operation:outcome` strings.
#[derive(Default)]
struct RecordingInterceptor {
    calls: Mutex<Vec<String>>,
}

impl ProviderInterceptor for RecordingInterceptor {
    fn name(&self) -> &str {
        "recording"
    }

    fn before(&self, operation: &ProviderOperation<'_>) -> Result<(), InterceptorError> {
        self.calls.lock().unwrap().push(format!("before:{}", operation.name()));
        Ok(())
    }

    fn after(
        &self,
        operation: &ProviderOperation<'_>,
        outcome: &OperationOutcome<'_>,
    ) -> Result<(), InterceptorError> {
        self.calls.lock().unwrap().push(format!("after:{}:{}", operation.name(), outcome.label()));
        Ok(())
    }
}

/// Fails every hook.
struct FailingInterceptor;

impl ProviderInterceptor for FailingInterceptor {
    fn name(&self) -> &str {
        "failing"
    }

    fn before(&self, _operation: &ProviderOperation<'_>) -> Result<(), InterceptorError> {
        Err(InterceptorError::new("failing", "before hook failed"))
    }

    fn after(
        &self,
        _operation: &ProviderOperation<'_>,
        _outcome: &OperationOutcome<'_>,
    ) -> Result<(), InterceptorError> {
        Err(InterceptorError::new("failing", "after hook failed"))
    }
}

// ============================================================================
// SECTION: Lifecycle Scenarios
// ============================================================================

#[test]
fn create_disable_delete_scenario() {
    let service = service();
    let id = service.create_identity_provider(&sample_idp("idp1")).expect("create");
    assert_eq!(id.get(), 1);

    let loaded = service.get_identity_provider(&ProviderRef::Id(id)).expect("get");
    assert_eq!(loaded.metadata().name(), "idp1");
    assert_eq!(loaded.id(), Some(id));

    service.disable_identity_provider(&ProviderRef::Id(id)).expect("disable");
    let by_name = service.get_identity_provider(&"idp1".into()).expect("get by name");
    assert!(!by_name.is_enabled());

    service.delete_identity_provider(&ProviderRef::Id(id)).expect("delete");
    let err = service.get_identity_provider(&"idp1".into()).expect_err("deleted");
    assert!(err.is_not_found());
    assert!(service.find_identity_provider(&"idp1".into()).expect("find").is_none());
}

#[test]
fn enabled_listing_excludes_disabled() {
    let service = service();
    service.create_identity_provider(&sample_idp("on")).expect("create on");
    let off = IdentityProvider::federated("off").set_enabled(false).build().expect("off");
    service.create_identity_provider(&off).expect("create off");
    assert_eq!(service.list_enabled_identity_providers().expect("enabled"), vec!["on"]);
    assert_eq!(service.list_identity_providers().expect("all"), vec!["on", "off"]);
}

#[test]
fn duplicate_names_and_second_resident_conflict() {
    let service = service();
    service.create_identity_provider(&sample_idp("dup")).expect("first");
    let err = service.create_identity_provider(&sample_idp("dup")).expect_err("duplicate");
    assert!(matches!(err, RegistryError::Conflict(_)));

    let resident = IdentityProvider::resident().build().expect("resident");
    service.create_identity_provider(&resident).expect("resident");
    let err = service.create_identity_provider(&resident).expect_err("second resident");
    match err {
        RegistryError::Conflict(message) => assert!(message.contains("resident")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn ids_are_not_reused_after_delete() {
    let service = service();
    let first = service.create_identity_provider(&sample_idp("a")).expect("a");
    service.delete_identity_provider(&ProviderRef::Id(first)).expect("delete");
    let second = service.create_identity_provider(&sample_idp("b")).expect("b");
    assert!(second > first);
}

#[test]
fn creating_a_persisted_aggregate_is_rejected() {
    let service = service();
    let id = service.create_identity_provider(&sample_idp("idp")).expect("create");
    let stored = service.get_identity_provider(&ProviderRef::Id(id)).expect("get");
    let err = service.create_identity_provider(&stored).expect_err("already persisted");
    assert!(matches!(err, RegistryError::Validation(_)));
}

#[test]
fn operations_on_missing_targets_are_not_found() {
    let service = service();
    let missing: ProviderRef = "ghost".into();
    assert!(service.enable_identity_provider(&missing).expect_err("enable").is_not_found());
    assert!(service.delete_identity_provider(&missing).expect_err("delete").is_not_found());
    let metadata = Metadata::builder("ghost").build().expect("metadata");
    assert!(service.update_idp_metadata(&missing, &metadata).expect_err("meta").is_not_found());
}

// ============================================================================
// SECTION: Partial Updates
// ============================================================================

#[test]
fn section_updates_leave_other_sections_untouched() {
    let service = service();
    let provider = IdentityProvider::federated("idp")
        .add_authenticator(AuthenticatorConfig::builder("saml").set_enabled(true).build().unwrap())
        .add_provisioner(ProvisionerConfig::builder("scim").build().unwrap())
        .add_property("tier", json!("gold"))
        .build()
        .unwrap();
    let id = service.create_identity_provider(&provider).unwrap();
    let target = ProviderRef::Id(id);

    let provisioning = ProvisioningConfig::builder().add_role("ops").build().unwrap();
    service.update_idp_provisioning_config(&target, &provisioning).unwrap();
    let after = service.get_identity_provider(&target).unwrap();
    assert_eq!(after.provisioning(), &provisioning);
    assert_eq!(after.authentication(), provider.authentication());
    assert_eq!(after.metadata(), provider.metadata());
    assert_eq!(after.properties(), provider.properties());

    let authentication =
        AuthenticationConfig::builder().add_requested_claim("urn:x").build().unwrap();
    service.update_idp_authentication_config(&target, &authentication).unwrap();
    let after = service.get_identity_provider(&target).unwrap();
    assert_eq!(after.authentication(), Some(&authentication));
    assert_eq!(after.provisioning(), &provisioning);
}

#[test]
fn property_updates_merge() {
    let service = service();
    let provider =
        IdentityProvider::federated("idp").add_property("kept", json!(1)).build().unwrap();
    let id = service.create_identity_provider(&provider).unwrap();
    let mut delta = PropertyMap::new();
    delta.insert("added".to_string(), json!(true));
    service.update_idp_properties(&ProviderRef::Id(id), &delta).unwrap();
    let stored = service.get_identity_provider(&ProviderRef::Id(id)).unwrap();
    assert_eq!(stored.properties().get("kept"), Some(&json!(1)));
    assert_eq!(stored.properties().get("added"), Some(&json!(true)));
}

#[test]
fn renaming_resident_through_metadata_is_validation_error() {
    let service = service();
    let id = service
        .create_identity_provider(&IdentityProvider::resident().build().unwrap())
        .unwrap();
    let metadata = Metadata::builder("renamed").build().unwrap();
    let err = service.update_idp_metadata(&ProviderRef::Id(id), &metadata).expect_err("rename");
    assert!(matches!(err, RegistryError::Validation(_)));
}

#[test]
fn property_lookup_scopes_are_distinct() {
    let service = service();
    let provider = IdentityProvider::federated("idp")
        .add_property("entity", json!("urn:a"))
        .add_authenticator(
            AuthenticatorConfig::builder("saml")
                .add_property("issuer", json!("urn:b"))
                .build()
                .unwrap(),
        )
        .build()
        .unwrap();
    service.create_identity_provider(&provider).unwrap();
    let by_entity = service.get_identity_provider_by_property("entity", &json!("urn:a")).unwrap();
    assert!(by_entity.is_some());
    let by_issuer = service.get_identity_provider_by_property("issuer", &json!("urn:b")).unwrap();
    assert!(by_issuer.is_none());
    let found = service
        .get_identity_provider_by_authenticator_property("issuer", &json!("urn:b"))
        .unwrap()
        .expect("authenticator match");
    assert_eq!(found.name(), "idp");
    assert!(service
        .get_identity_provider_by_provisioner_property("issuer", &json!("urn:b"))
        .unwrap()
        .is_none());
}

#[test]
fn property_lookup_prefers_lowest_id() {
    let service = service();
    for name in ["first", "second"] {
        let provider =
            IdentityProvider::federated(name).add_property("shared", json!("x")).build().unwrap();
        service.create_identity_provider(&provider).unwrap();
    }
    let found = service.get_identity_provider_by_property("shared", &json!("x")).unwrap();
    assert_eq!(found.map(|idp| idp.name().to_string()), Some("first".to_string()));
}

// ============================================================================
// SECTION: Interceptors
// ============================================================================

#[test]
fn interceptors_observe_success_and_failure() {
    let mut service = service();
    let recorder = Arc::new(RecordingInterceptor::default());
    service.register_interceptor(recorder.clone());
    service.create_identity_provider(&sample_idp("idp")).unwrap();
    let _ = service.get_identity_provider(&"missing".into());
    let calls = recorder.calls.lock().unwrap().clone();
    assert_eq!(
        calls,
        vec![
            "before:create_identity_provider",
            "after:create_identity_provider:success",
            "before:get_identity_provider",
            "after:get_identity_provider:failure",
        ]
    );
}

#[test]
fn failing_interceptor_does_not_abort_operation() {
    let mut service = service();
    let recorder = Arc::new(RecordingInterceptor::default());
    service.register_interceptor(Arc::new(FailingInterceptor));
    service.register_interceptor(recorder.clone());
    let id = service.create_identity_provider(&sample_idp("idp")).expect("create");
    assert_eq!(id.get(), 1);
    assert_eq!(recorder.calls.lock().unwrap().len(), 2);
}

#[test]
fn audit_interceptor_writes_json_lines() {
    let temp = tempfile::TempDir::new().unwrap();
    let path = temp.path().join("audit.log");
    let mut service = service();
    service.register_interceptor(Arc::new(AuditInterceptor::new(Arc::new(
        FileAuditSink::new(&path).unwrap(),
    ))));
    service.create_identity_provider(&sample_idp("idp1")).unwrap();
    let _ = service.disable_identity_provider(&"ghost".into());

    let contents = std::fs::read_to_string(&path).unwrap();
    let events: Vec<serde_json::Value> =
        contents.lines().map(|line| serde_json::from_str(line).unwrap()).collect();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0]["event"], "provider_audit");
    assert_eq!(events[0]["operation"], "create_identity_provider");
    assert_eq!(events[0]["target"], "name 'idp1'");
    assert_eq!(events[0]["outcome"], "success");
    assert_eq!(events[1]["outcome"], "failure");
    assert_eq!(events[1]["error_kind"], "not_found");
}

// ============================================================================
// SECTION: Service Providers
// ============================================================================

#[test]
fn service_provider_lifecycle() {
    let service = service();
    let app = ServiceProvider::builder("portal")
        .set_description("employee portal")
        .add_authentication_step(
            AuthenticationStep::new(AuthStrategy::RequestPathOrShowAuth)
                .with_local_authenticator(LocalAuthenticatorConfig::new("basic"))
                .with_federated_idp("partner"),
        )
        .build()
        .unwrap();
    let id = service.create_service_provider(&app).unwrap();
    let target = ServiceProviderRef::Id(id);
    let stored = service.get_service_provider(&target).unwrap();
    assert_eq!(stored.local_and_outbound().steps.len(), 1);
    assert_eq!(stored.id(), Some(id));

    service.disable_service_provider(&"portal".into()).unwrap();
    assert!(service.list_enabled_service_providers().unwrap().is_empty());
    assert_eq!(service.list_service_providers().unwrap(), vec!["portal"]);

    let err = service.create_service_provider(&app).expect_err("duplicate");
    assert!(matches!(err, RegistryError::Conflict(_)));

    service.delete_service_provider(&target).unwrap();
    assert!(service.get_service_provider(&target).expect_err("deleted").is_not_found());
}
