// SPDX-License-Identifier: MPL-2.0

//! Integration tests for configuration module

use qrscan::Config;
use qrscan::backends::camera::types::Facing;
use std::time::Duration;

#[test]
fn test_config_default() {
    let config = Config::default();

    // Check sensible defaults
    assert_eq!(config.preferred_facing, Facing::Environment);
    assert!(config.feedback_enabled, "Feedback should be enabled by default");
    assert!(config.share_command.is_none());
    assert_eq!(config.scan_interval(), Duration::from_millis(150));
}

#[test]
fn test_missing_file_gives_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::load_from(&dir.path().join("missing.json"));
    assert_eq!(config, Config::default());
}

#[test]
fn test_malformed_file_gives_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, "{ not json").unwrap();

    assert_eq!(Config::load_from(&path), Config::default());
}

#[test]
fn test_partial_file_fills_in_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, r#"{ "preferred_facing": "user", "scan_interval_ms": 400 }"#).unwrap();

    let config = Config::load_from(&path);
    assert_eq!(config.preferred_facing, Facing::User);
    assert_eq!(config.scan_interval(), Duration::from_millis(400));
    assert!(config.feedback_enabled);
}

#[test]
fn test_save_and_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.json");

    let config = Config {
        preferred_facing: Facing::User,
        last_camera_path: Some("/dev/video2".to_string()),
        share_command: Some(vec!["kdeconnect-cli".to_string(), "--share-text".to_string()]),
        ..Config::default()
    };
    config.save_to(&path).unwrap();

    assert_eq!(Config::load_from(&path), config);
}

#[test]
fn test_zero_interval_is_clamped() {
    let config = Config {
        scan_interval_ms: 0,
        ..Config::default()
    };
    assert!(config.scan_interval() > Duration::ZERO);
}
