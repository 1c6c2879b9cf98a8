use pipewright::config::{load_settings, ConfigError, Settings};
use pipewright::services::rpc::RemoteServices;
use pipewright::services::{AppCatalog, ExecutionService, ObjectStore, ReportService};
use std::io::Write;
use std::path::PathBuf;

fn write_config(contents: &str) -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("pipewright.yaml");
    let mut file = std::fs::File::create(&path).expect("create config");
    file.write_all(contents.as_bytes()).expect("write config");
    (dir, path)
}

#[test]
fn config_module_loads_a_minimal_file_with_defaults() {
    let (_dir, path) = write_config(
        "execution_url: https://exec.example.org\n\
         object_store_url: https://store.example.org\n\
         catalog_url: https://catalog.example.org\n",
    );

    let settings = load_settings(&path).expect("load settings");
    assert_eq!(settings.execution_url, "https://exec.example.org");
    assert_eq!(settings.poll_interval_seconds, 10);
    assert_eq!(settings.app_tag, "release");
    assert!(settings.auth_token.is_none());
    assert!(settings.log_root.is_none());
    assert!(settings.nest_parameter_groups);
}

#[test]
fn config_module_honors_explicit_overrides() {
    let (_dir, path) = write_config(
        "execution_url: https://exec.example.org\n\
         object_store_url: https://store.example.org\n\
         catalog_url: https://catalog.example.org\n\
         auth_token: secret-token\n\
         poll_interval_seconds: 3\n\
         app_tag: beta\n\
         log_root: /var/lib/pipewright\n\
         nest_parameter_groups: false\n",
    );

    let settings = load_settings(&path).expect("load settings");
    assert_eq!(settings.auth_token.as_deref(), Some("secret-token"));
    assert_eq!(settings.poll_interval_seconds, 3);
    assert_eq!(settings.app_tag, "beta");
    assert_eq!(
        settings.log_root,
        Some(PathBuf::from("/var/lib/pipewright"))
    );
    assert!(!settings.nest_parameter_groups);
}

#[test]
fn config_module_rejects_empty_service_urls() {
    let (_dir, path) = write_config(
        "execution_url: \"\"\n\
         object_store_url: https://store.example.org\n\
         catalog_url: https://catalog.example.org\n",
    );

    let err = load_settings(&path).expect_err("empty url");
    match err {
        ConfigError::Settings(reason) => assert!(reason.contains("execution_url")),
        other => panic!("expected Settings, got {other:?}"),
    }
}

#[test]
fn config_module_rejects_a_zero_poll_interval() {
    let (_dir, path) = write_config(
        "execution_url: https://exec.example.org\n\
         object_store_url: https://store.example.org\n\
         catalog_url: https://catalog.example.org\n\
         poll_interval_seconds: 0\n",
    );

    let err = load_settings(&path).expect_err("zero poll interval");
    match err {
        ConfigError::Settings(reason) => assert!(reason.contains("poll_interval_seconds")),
        other => panic!("expected Settings, got {other:?}"),
    }
}

#[test]
fn config_module_reports_unreadable_files() {
    let dir = tempfile::tempdir().expect("tempdir");
    let missing = dir.path().join("absent.yaml");
    let err = load_settings(&missing).expect_err("missing file");
    assert!(matches!(err, ConfigError::Read { .. }));
}

#[test]
fn config_module_reports_malformed_yaml() {
    let (_dir, path) = write_config("execution_url: [unterminated\n");
    let err = load_settings(&path).expect_err("malformed yaml");
    assert!(matches!(err, ConfigError::Parse { .. }));
}

#[test]
fn config_module_settings_feed_the_engine_and_remote_services() {
    let (_dir, path) = write_config(
        "execution_url: https://exec.example.org\n\
         object_store_url: https://store.example.org\n\
         catalog_url: https://catalog.example.org\n\
         auth_token: secret-token\n\
         poll_interval_seconds: 3\n\
         nest_parameter_groups: false\n",
    );
    let settings = load_settings(&path).expect("load settings");

    assert_eq!(settings.poll_interval(), std::time::Duration::from_secs(3));
    assert!(!settings.normalize_options().nest_groups);

    let services = RemoteServices::from_settings(&settings);
    let _execution: &dyn ExecutionService = &services.execution;
    let _object_store: &dyn ObjectStore = &services.object_store;
    let _reports: &dyn ReportService = &services.reports;
    let _catalog: &dyn AppCatalog = &services.catalog;
}

#[test]
fn config_module_validate_checks_standalone_settings() {
    let settings = Settings {
        execution_url: "https://exec.example.org".to_string(),
        object_store_url: "https://store.example.org".to_string(),
        catalog_url: "https://catalog.example.org".to_string(),
        auth_token: None,
        poll_interval_seconds: 10,
        app_tag: "   ".to_string(),
        log_root: None,
        nest_parameter_groups: true,
    };
    let err = settings.validate().expect_err("blank app tag");
    match err {
        ConfigError::Settings(reason) => assert!(reason.contains("app_tag")),
        other => panic!("expected Settings, got {other:?}"),
    }
}
