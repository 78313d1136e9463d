//! Configuration file loading.

use spire::config::{ConfigLoader, ToolConfig};
use spire::error::OpsError;
use std::io::Write;
use std::time::Duration;

#[test]
fn loads_a_complete_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "[logging]\nlevel = \"debug\"\nformat = \"json\"\n\n[retry]\npause_secs = 0.25"
    )
    .unwrap();

    let config = ConfigLoader::load_from_file(file.path()).unwrap();
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.logging.format, "json");
    assert_eq!(config.retry.pause(), Duration::from_millis(250));
}

#[test]
fn missing_explicit_file_is_a_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = ConfigLoader::load_from_file(&dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, OpsError::Config(_)));
}

#[test]
fn malformed_file_is_a_config_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "logging = \"not a table\"").unwrap();
    let err = ConfigLoader::load_from_file(file.path()).unwrap_err();
    assert!(matches!(err, OpsError::Config(_)));
}

#[test]
fn invalid_values_are_rejected_on_load() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[retry]\npause_secs = -1.0").unwrap();
    let err = ConfigLoader::load_from_file(file.path()).unwrap_err();
    assert!(matches!(err, OpsError::Config(_)));
}

#[test]
fn defaults_apply_without_any_file() {
    let config = ToolConfig::default();
    assert_eq!(config.logging.level, "info");
    assert_eq!(config.logging.format, "text");
    assert_eq!(config.retry.pause(), Duration::from_secs(2));
}
