//! Integration tests for haptic-config.
//!
//! These tests exercise file round trips in temporary directories.

use haptic_config::{ConfigError, ControlConfig, load_or_default};
use tempfile::TempDir;

#[test]
fn test_save_and_load_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("haptic.toml");

    let mut config = ControlConfig::default();
    config.controller.device_rate_limit_ms = 40;
    config.controller.default_dead_zone = 0.25;
    config.shake.full_scale = 12.5;
    config.save(&path).unwrap();

    let loaded = ControlConfig::load(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_save_creates_parent_directories() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("deeper").join("haptic.toml");

    ControlConfig::default().save(&path).unwrap();
    assert!(path.is_file());
}

#[test]
fn test_load_rejects_invalid_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.toml");
    std::fs::write(&path, "[shake]\nperiod_ms = 0\n").unwrap();

    let err = ControlConfig::load(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { field: "shake.period_ms", .. }));
}

#[test]
fn test_load_or_default_prefers_explicit_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("custom.toml");
    std::fs::write(&path, "[gravity]\nlength_cutoff = 0.5\n").unwrap();

    let config = load_or_default(Some(&path)).unwrap();
    assert_eq!(config.gravity.length_cutoff, 0.5);
}

#[test]
fn test_unknown_keys_are_ignored() {
    let config = ControlConfig::from_toml("[controller]\nfuture_knob = true\n").unwrap();
    assert_eq!(config, ControlConfig::default());
}
