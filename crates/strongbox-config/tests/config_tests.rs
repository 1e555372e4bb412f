// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Strongbox configuration system.

use strongbox_config::diagnostic::ConfigError;
use strongbox_config::{load_and_validate_path, load_and_validate_str, load_config_from_str};

#[test]
fn full_toml_deserializes() {
    let toml = r#"
[log]
level = "debug"

[storage]
database_path = "/tmp/strongbox-test.db"
backup_dir = "/tmp/backups"
cipher_page_size = 8192
min_store_size = 512

[security]
min_password_length = 10
token_secret = "0123456789abcdef0123456789abcdef"
token_ttl_secs = 600

[vault]
kdf_memory_cost = 32768
kdf_iterations = 2
kdf_parallelism = 1
"#;

    let config = load_and_validate_str(toml).expect("valid TOML should load");
    assert_eq!(config.log.level, "debug");
    assert_eq!(config.storage.database_path, "/tmp/strongbox-test.db");
    assert_eq!(config.storage.backup_dir.as_deref(), Some("/tmp/backups"));
    assert_eq!(config.storage.cipher_page_size, 8192);
    assert_eq!(config.storage.min_store_size, 512);
    assert_eq!(config.security.min_password_length, 10);
    assert_eq!(config.security.token_ttl_secs, 600);
    assert_eq!(config.vault.kdf_iterations, 2);
}

#[test]
fn empty_toml_uses_defaults() {
    let config = load_config_from_str("").expect("empty TOML is valid");
    assert_eq!(config.log.level, "info");
    assert_eq!(config.storage.cipher_page_size, 4096);
    assert_eq!(config.security.min_password_length, 6);
}

#[test]
fn unknown_key_gets_suggestion_and_span() {
    let toml = "[storage]\ndatabse_path = \"/tmp/x.db\"\n";
    let errors = load_and_validate_str(toml).unwrap_err();
    let unknown = errors
        .iter()
        .find_map(|e| match e {
            ConfigError::UnknownKey {
                key,
                suggestion,
                span,
                ..
            } => Some((key.clone(), suggestion.clone(), *span)),
            _ => None,
        })
        .expect("expected an unknown key error");
    assert_eq!(unknown.0, "databse_path");
    assert_eq!(unknown.1.as_deref(), Some("database_path"));
    assert!(unknown.2.is_some());
}

#[test]
fn wrong_type_reports_invalid_type() {
    let toml = "[storage]\ncipher_page_size = \"big\"\n";
    let errors = load_and_validate_str(toml).unwrap_err();
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::InvalidType { key, .. } if key.contains("cipher_page_size")))
    );
}

#[test]
fn semantic_errors_surface_as_validation() {
    let toml = "[security]\nmin_password_length = 3\n";
    let errors = load_and_validate_str(toml).unwrap_err();
    assert!(matches!(errors[0], ConfigError::Validation { .. }));
}

#[test]
#[serial_test::serial]
fn explicit_path_is_loaded() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("custom.toml");
    std::fs::write(&path, "[storage]\nmin_store_size = 200\n").unwrap();

    let config = load_and_validate_path(&path).expect("file should load");
    assert_eq!(config.storage.min_store_size, 200);
}

#[test]
#[serial_test::serial]
fn explicit_path_errors_point_into_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.toml");
    std::fs::write(&path, "[vault]\nkdf_iteratons = 4\n").unwrap();

    let errors = load_and_validate_path(&path).unwrap_err();
    assert!(errors.iter().any(|e| matches!(
        e,
        ConfigError::UnknownKey { suggestion: Some(s), span: Some(_), .. } if s == "kdf_iterations"
    )));
}
