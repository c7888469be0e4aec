//! Tests for configuration loading and root folder resolution
//!
//! Covers:
//! - Priority order: CLI > environment > TOML > compiled default
//! - Missing or malformed TOML files fall back to defaults
//! - Root folder layout creation (uploads tree, mail spool)
//!
//! Tests that touch SUZUANI_* environment variables are marked #[serial].

use serial_test::serial;
use std::env;
use std::path::PathBuf;
use suzuani_common::config::{
    secret_key_override, CompiledDefaults, ConfigSource, RootFolderInitializer, RootFolderResolver, TomlConfig,
    DEFAULT_ADMIN_PASSWORD, UPLOAD_FOLDERS,
};

fn clear_env() {
    env::remove_var("SUZUANI_ROOT_FOLDER");
    env::remove_var("SUZUANI_ROOT");
    env::remove_var("SUZUANI_SECRET_KEY");
}

#[test]
fn test_compiled_defaults_for_current_platform() {
    let defaults = CompiledDefaults::for_current_platform();

    assert!(!defaults.root_folder.as_os_str().is_empty());
    assert!(defaults.root_folder.to_string_lossy().contains("suzuani"));
    assert_eq!(defaults.log_level, "info");
    assert_eq!(defaults.bind_address, "127.0.0.1");
}

#[test]
#[serial]
fn test_resolver_with_no_overrides_uses_default() {
    clear_env();

    let root_folder = RootFolderResolver::new("test-module").resolve();

    assert_eq!(root_folder, CompiledDefaults::for_current_platform().root_folder);
}

#[test]
#[serial]
fn test_resolver_cli_arg_wins() {
    clear_env();
    env::set_var("SUZUANI_ROOT_FOLDER", "/tmp/suzuani-from-env");

    let root_folder = RootFolderResolver::new("test-module")
        .with_cli_arg(Some(PathBuf::from("/tmp/suzuani-from-cli")))
        .resolve();

    assert_eq!(root_folder, PathBuf::from("/tmp/suzuani-from-cli"));
    clear_env();
}

#[test]
#[serial]
fn test_resolver_root_folder_env_takes_precedence() {
    clear_env();
    env::set_var("SUZUANI_ROOT_FOLDER", "/tmp/suzuani-priority-1");
    env::set_var("SUZUANI_ROOT", "/tmp/suzuani-priority-2");

    let root_folder = RootFolderResolver::new("test-module").resolve();

    assert_eq!(root_folder, PathBuf::from("/tmp/suzuani-priority-1"));
    clear_env();
}

#[test]
#[serial]
fn test_resolver_env_beats_toml() {
    clear_env();
    env::set_var("SUZUANI_ROOT", "/tmp/suzuani-env-root");

    let config = TomlConfig::from_toml_str(r#"root_folder = "/tmp/suzuani-toml-root""#).unwrap();
    let root_folder = RootFolderResolver::new("test-module")
        .with_toml_config(&config)
        .resolve();

    assert_eq!(root_folder, PathBuf::from("/tmp/suzuani-env-root"));
    clear_env();
}

#[test]
#[serial]
fn test_resolver_toml_used_without_env() {
    clear_env();

    let config = TomlConfig::from_toml_str(r#"root_folder = "/tmp/suzuani-toml-root""#).unwrap();
    let root_folder = RootFolderResolver::new("test-module")
        .with_toml_config(&config)
        .resolve();

    assert_eq!(root_folder, PathBuf::from("/tmp/suzuani-toml-root"));
}

#[test]
fn test_toml_config_full_parse() {
    let config = TomlConfig::from_toml_str(
        r#"
        bind_address = "0.0.0.0"
        port = 8080
        secret_key = "s3cr3t"

        [logging]
        level = "debug"

        [mail]
        sender_name = "Suzu"
        sender_address = "mail@suzu.test"
        public_url = "https://suzu.test"

        [admin]
        username = "root"
        email = "root@suzu.test"
        password = "hunter22"
        "#,
    )
    .unwrap();

    assert_eq!(config.bind_address.as_deref(), Some("0.0.0.0"));
    assert_eq!(config.port, Some(8080));
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.mail.sender_name, "Suzu");
    assert_eq!(config.mail.public_url, "https://suzu.test");
    assert!(config.mail.spool_dir.is_none());
    assert_eq!(config.admin.username, "root");
    assert_eq!(config.admin.password, "hunter22");
}

#[test]
fn test_toml_config_empty_uses_defaults() {
    let config = TomlConfig::from_toml_str("").unwrap();

    assert!(config.root_folder.is_none());
    assert_eq!(config.logging.level, "info");
    assert_eq!(config.mail.sender_name, "SuzuAni");
    assert_eq!(config.admin.username, "admin");
    assert_eq!(config.admin.email, "admin@suzuani.com");
    assert_eq!(config.admin.password, DEFAULT_ADMIN_PASSWORD);
}

#[test]
fn test_malformed_toml_file_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("suzuani.toml");
    std::fs::write(&path, "port = \"not a number\"\n[[[").unwrap();

    let loaded = TomlConfig::load_from_path(&path);
    assert!(loaded.config.port.is_none());
    assert_eq!(loaded.config.logging.level, "info");

    // The reason is kept for logging once the subscriber is up
    match loaded.source {
        ConfigSource::Fallback { path: reported, reason } => {
            assert_eq!(reported, path);
            assert!(reason.contains("Parse TOML failed"), "unexpected reason: {}", reason);
        }
        other => panic!("expected a fallback, got {:?}", other),
    }
}

#[test]
fn test_missing_toml_file_falls_back_to_defaults() {
    let path = PathBuf::from("/nonexistent/suzuani.toml");
    let loaded = TomlConfig::load_from_path(&path);
    assert!(loaded.config.root_folder.is_none());
    assert!(matches!(
        loaded.source,
        ConfigSource::Fallback { ref reason, .. } if reason.starts_with("not readable")
    ));
}

#[test]
fn test_valid_toml_file_reports_its_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("suzuani.toml");
    std::fs::write(&path, "port = 8080\n[logging]\nlevel = \"debug\"\n").unwrap();

    let loaded = TomlConfig::load_from_path(&path);
    assert_eq!(loaded.config.port, Some(8080));
    assert_eq!(loaded.config.logging.level, "debug");
    assert_eq!(loaded.source, ConfigSource::File(path));
}

#[test]
#[serial]
fn test_secret_key_override_priority() {
    clear_env();
    let config = TomlConfig::from_toml_str(r#"secret_key = "from-toml""#).unwrap();
    assert_eq!(secret_key_override(&config).as_deref(), Some("from-toml"));

    env::set_var("SUZUANI_SECRET_KEY", "from-env");
    assert_eq!(secret_key_override(&config).as_deref(), Some("from-env"));

    env::set_var("SUZUANI_SECRET_KEY", "   ");
    assert_eq!(secret_key_override(&config).as_deref(), Some("from-toml"));

    clear_env();
    assert!(secret_key_override(&TomlConfig::default()).is_none());
}

#[test]
fn test_initializer_paths() {
    let root = PathBuf::from("/tmp/suzuani-test-root");
    let initializer = RootFolderInitializer::new(root.clone());

    assert_eq!(initializer.database_path(), root.join("suzuani.db"));
    assert_eq!(initializer.uploads_path(), root.join("static").join("uploads"));
    assert_eq!(initializer.mail_spool_path(), root.join("mail_spool"));
}

#[test]
fn test_initializer_creates_layout_idempotently() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("suzuani");
    let initializer = RootFolderInitializer::new(root.clone());

    initializer.ensure_directory_exists().unwrap();
    initializer.ensure_directory_exists().unwrap();

    assert!(root.is_dir());
    for folder in UPLOAD_FOLDERS {
        assert!(initializer.uploads_path().join(folder).is_dir(), "missing {}", folder);
    }
    assert!(initializer.mail_spool_path().is_dir());
    assert!(!initializer.database_exists());
}
