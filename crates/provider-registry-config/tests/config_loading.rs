//! Config loading tests for provider-registry-config.
// crates/provider-registry-config/tests/config_loading.rs
// =============================================================================
// Module: Config Loading Tests
// Description: Validate config loading guards and service assembly.
// Purpose: Ensure config input handling is strict and fail-closed.
// =============================================================================

use std::fs;
use std::io::Write;
use std::path::Path;

use provider_registry_config::AuditSinkKind;
use provider_registry_config::ConfigError;
use provider_registry_config::RegistryConfig;
use provider_registry_core::IdentityProvider;
use tempfile::NamedTempFile;
use tempfile::TempDir;

type TestResult = Result<(), String>;

fn assert_invalid(result: Result<RegistryConfig, ConfigError>, needle: &str) -> TestResult {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error {message} did not contain {needle}"))
            }
        }
        Ok(_) => Err("expected invalid config load".to_string()),
    }
}

fn write_config(dir: &TempDir, body: &str) -> Result<std::path::PathBuf, String> {
    let path = dir.path().join("provider-registry.toml");
    fs::write(&path, body).map_err(|err| err.to_string())?;
    Ok(path)
}

fn store_section(dir: &TempDir) -> String {
    let db = dir.path().join("providers.db");
    format!("[store]\npath = \"{}\"\n", db.display())
}

#[test]
fn load_reads_explicit_path_with_defaults() -> TestResult {
    let dir = TempDir::new().map_err(|err| err.to_string())?;
    let path = write_config(&dir, &store_section(&dir))?;
    let config = RegistryConfig::load(Some(&path)).map_err(|err| err.to_string())?;
    if config.store.read_pool_size != 4 || config.store.busy_timeout_ms != 5_000 {
        return Err("unexpected store defaults".to_string());
    }
    if config.audit.sink != AuditSinkKind::None || config.audit.path.is_some() {
        return Err("audit should default to disabled".to_string());
    }
    Ok(())
}

#[test]
fn load_rejects_path_component_too_long() -> TestResult {
    let long_component = "a".repeat(300);
    let path = Path::new(&long_component);
    assert_invalid(RegistryConfig::load(Some(path)), "config path component too long")
}

#[test]
fn load_rejects_oversized_file() -> TestResult {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    let payload = vec![b'a'; 1_048_577];
    file.write_all(&payload).map_err(|err| err.to_string())?;
    assert_invalid(RegistryConfig::load(Some(file.path())), "config file exceeds size limit")
}

#[test]
fn load_rejects_non_utf8_file() -> TestResult {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    file.write_all(&[0xFF, 0xFE, 0xFF]).map_err(|err| err.to_string())?;
    assert_invalid(RegistryConfig::load(Some(file.path())), "config file must be utf-8")
}

#[test]
fn load_rejects_missing_store_section() -> TestResult {
    let dir = TempDir::new().map_err(|err| err.to_string())?;
    let path = write_config(&dir, "[audit]\nsink = \"stderr\"\n")?;
    assert_invalid(RegistryConfig::load(Some(&path)), "config parse error")
}

#[test]
fn load_rejects_unknown_fields() -> TestResult {
    let dir = TempDir::new().map_err(|err| err.to_string())?;
    let body = format!("{}cache_size = 10\n", store_section(&dir));
    let path = write_config(&dir, &body)?;
    assert_invalid(RegistryConfig::load(Some(&path)), "config parse error")
}

#[test]
fn load_rejects_zero_read_pool() -> TestResult {
    let dir = TempDir::new().map_err(|err| err.to_string())?;
    let body = format!("{}read_pool_size = 0\n", store_section(&dir));
    let path = write_config(&dir, &body)?;
    assert_invalid(RegistryConfig::load(Some(&path)), "read_pool_size must be greater than zero")
}

#[test]
fn load_rejects_file_sink_without_path() -> TestResult {
    let dir = TempDir::new().map_err(|err| err.to_string())?;
    let body = format!("{}\n[audit]\nsink = \"file\"\n", store_section(&dir));
    let path = write_config(&dir, &body)?;
    assert_invalid(RegistryConfig::load(Some(&path)), "file audit sink requires path")
}

#[test]
fn load_rejects_audit_path_for_stderr_sink() -> TestResult {
    let dir = TempDir::new().map_err(|err| err.to_string())?;
    let body =
        format!("{}\n[audit]\nsink = \"stderr\"\npath = \"audit.log\"\n", store_section(&dir));
    let path = write_config(&dir, &body)?;
    assert_invalid(
        RegistryConfig::load(Some(&path)),
        "audit path is only valid for the file sink",
    )
}

#[test]
fn open_service_writes_audit_events_to_file() -> TestResult {
    let dir = TempDir::new().map_err(|err| err.to_string())?;
    let audit_log = dir.path().join("audit.log");
    let body = format!(
        "{}\n[audit]\nsink = \"file\"\npath = \"{}\"\n",
        store_section(&dir),
        audit_log.display()
    );
    let path = write_config(&dir, &body)?;
    let config = RegistryConfig::load(Some(&path)).map_err(|err| err.to_string())?;
    let service = config.open_service().map_err(|err| err.to_string())?;

    let provider = IdentityProvider::builder("corp-idp").build().map_err(|err| err.to_string())?;
    service.create_identity_provider(&provider).map_err(|err| err.to_string())?;
    service.readiness().map_err(|err| err.to_string())?;

    let contents = fs::read_to_string(&audit_log).map_err(|err| err.to_string())?;
    if !contents.contains("\"operation\":\"create_identity_provider\"") {
        return Err(format!("audit log missing create event: {contents}"));
    }
    if !contents.contains("\"outcome\":\"success\"") {
        return Err(format!("audit log missing success outcome: {contents}"));
    }
    Ok(())
}

#[test]
fn disabled_audit_builds_no_interceptor() -> TestResult {
    let dir = TempDir::new().map_err(|err| err.to_string())?;
    let path = write_config(&dir, &store_section(&dir))?;
    let config = RegistryConfig::load(Some(&path)).map_err(|err| err.to_string())?;
    let interceptor = config.build_audit_interceptor().map_err(|err| err.to_string())?;
    if interceptor.is_some() {
        return Err("expected no audit interceptor".to_string());
    }
    Ok(())
}
