use serial_test::serial;
use std::env;
use std::fs::write;
use tempfile::NamedTempFile;

use mc_utils::config::{PasswordSource, DEFAULT_BASE_URL};
use mc_utils::load_config::{load_config, BASE_URL_ENV};

fn config_file(yaml: &str) -> NamedTempFile {
    let file = NamedTempFile::new().expect("temp file");
    write(file.path(), yaml).unwrap();
    file
}

/// Account password sources are parsed as references, never resolved at load time.
#[test]
#[serial]
fn test_load_config_reads_accounts_and_cms_settings() {
    env::remove_var(BASE_URL_ENV);
    let file = config_file(
        r#"
cms:
  base_url: "https://cms.example.edu"
  timeout_secs: 10
accounts:
  - account: oldsite
    username: jdoe
    password:
      op: "op://Web/Old CMS/password"
  - account: newsite
    username: jdoe
    password:
      env: NEW_CMS_PASSWORD
"#,
    );

    let config = load_config(file.path()).expect("Config should load");

    assert_eq!(config.cms.base_url, "https://cms.example.edu");
    assert_eq!(config.cms.timeout_secs, 10);
    assert_eq!(config.accounts.len(), 2);
    assert_eq!(
        config.account("oldsite").map(|a| &a.password),
        Some(&PasswordSource::Op("op://Web/Old CMS/password".into()))
    );
    assert_eq!(
        config.account("newsite").map(|a| &a.password),
        Some(&PasswordSource::Env("NEW_CMS_PASSWORD".into()))
    );
    assert!(config.account("missing").is_none());
}

#[test]
#[serial]
fn test_load_config_defaults_cms_section() {
    env::remove_var(BASE_URL_ENV);
    let file = config_file("accounts: []\n");

    let config = load_config(file.path()).expect("Config should load");
    assert_eq!(config.cms.base_url, DEFAULT_BASE_URL);
    assert_eq!(config.cms.timeout_secs, 30);
}

#[test]
#[serial]
fn test_load_config_env_overrides_base_url() {
    let file = config_file("cms:\n  base_url: \"https://cms.example.edu\"\n");
    env::set_var(BASE_URL_ENV, "http://127.0.0.1:9999");

    let config = load_config(file.path());
    env::remove_var(BASE_URL_ENV);

    assert_eq!(config.expect("Config should load").cms.base_url, "http://127.0.0.1:9999");
}

#[test]
#[serial]
fn test_load_config_errors_on_duplicate_account() {
    env::remove_var(BASE_URL_ENV);
    let file = config_file(
        r#"
accounts:
  - account: main
    username: a
    password: {env: A}
  - account: main
    username: b
    password: {env: B}
"#,
    );

    let err = load_config(file.path()).unwrap_err();
    assert!(err.to_string().contains("Duplicate account in config: main"), "{err}");
}

#[test]
#[serial]
fn test_load_config_errors_on_zero_timeout() {
    env::remove_var(BASE_URL_ENV);
    let file = config_file("cms:\n  timeout_secs: 0\n");

    let err = load_config(file.path()).unwrap_err();
    assert!(err.to_string().contains("timeout_secs"), "{err}");
}

#[test]
#[serial]
fn test_load_config_errors_on_invalid_yaml() {
    let file = config_file("accounts: [this is: not: valid");

    let err = load_config(file.path()).unwrap_err();
    assert!(err.to_string().starts_with("Failed to parse config YAML"), "{err}");
}

#[test]
#[serial]
fn test_load_config_errors_on_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_config(dir.path().join("absent.yaml")).unwrap_err();
    assert!(err.to_string().starts_with("Failed to read config file"), "{err}");
}
