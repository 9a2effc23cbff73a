//! Tests for TOML config loading, creation, and path resolution.

use super::*;
use std::path::Path;

#[test]
fn load_from_nonexistent_returns_file_not_found() {
    let result = load_from_path(Path::new("/tmp/nonexistent_parlance_config.toml"));
    let err = result.unwrap_err();
    assert!(matches!(err, parlance_common::ConfigError::FileNotFound(_)));
}

#[test]
fn load_valid_partial_toml() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[backend]
base_url = "https://assistant.internal:9000"

[chat]
max_tokens = 1200
"#,
    )
    .unwrap();

    let config = load_from_path(&path).unwrap();
    assert_eq!(config.backend.base_url, "https://assistant.internal:9000");
    assert_eq!(config.chat.max_tokens, 1200);
    // Defaults preserved
    assert_eq!(config.backend.chat_path, "/chat");
    assert_eq!(config.images.log_capacity, 30);
    assert!(config.storage.data_dir.is_none());
}

#[test]
fn load_invalid_toml_returns_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "this is not valid toml {{{").unwrap();

    let err = load_from_path(&path).unwrap_err();
    assert!(matches!(err, parlance_common::ConfigError::ParseError(_)));
}

#[test]
fn load_config_with_invalid_values_is_lenient() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[chat]
max_tokens = 0
"#,
    )
    .unwrap();

    let config = load_from_path(&path).unwrap();
    assert_eq!(config.chat.max_tokens, 0);
}

#[test]
fn create_and_load_default_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("parlance").join("config.toml");

    create_default_config(&path).unwrap();
    assert!(path.exists());

    let config = load_from_path(&path).unwrap();
    assert_eq!(config.backend.base_url, "http://localhost:8001");
    assert_eq!(config.chat.max_tokens, 800);
}

#[test]
fn default_template_is_valid_toml() {
    let parsed: Result<crate::schema::ParlanceConfig, _> =
        toml::from_str(&template::default_config_toml());
    assert!(parsed.is_ok());
}

#[test]
fn logging_level_parses_lowercase() {
    let config: crate::schema::ParlanceConfig = toml::from_str(
        r#"
[logging]
level = "debug"
"#,
    )
    .unwrap();
    assert_eq!(config.logging.level, crate::schema::LogLevel::Debug);
}

#[test]
fn default_paths_end_with_app_name() {
    let config = default_config_path().unwrap();
    assert_eq!(config.file_name().unwrap(), "config.toml");
    assert!(config.parent().unwrap().ends_with("parlance"));

    let data = default_data_dir().unwrap();
    assert!(data.ends_with("parlance"));
}
