//! Tests for configuration loading

use super::*;
use pretty_assertions::assert_eq;
use std::collections::HashMap;

fn configured() -> PortalConfig {
    let mut config = PortalConfig::default();
    config.backend.url = "https://project.example.co".into();
    config.backend.anon_key = "anon".into();
    config
}

#[test]
fn test_defaults_match_monitor_policy() {
    let settings = MonitorSettings::default();
    assert_eq!(settings.check_interval_ms, 60_000);
    assert_eq!(settings.cache_ttl_ms, 5_000);
    assert_eq!(settings.probe_timeout_ms, 20_000);
    assert_eq!(settings.policy_warning_threshold, 3);
    assert_eq!(settings.reconnect_initial_delay_ms, 2_000);
    assert_eq!(settings.reconnect_max_delay_ms, 30_000);
    assert_eq!(settings.reconnect_max_attempts, 5);
    assert!(!settings.dev_mode);
}

#[test]
fn test_partial_toml_keeps_defaults() {
    let config = PortalConfig::from_toml_str(
        r#"
        [backend]
        url = "https://project.example.co"
        anon_key = "anon"

        [monitor]
        cache_ttl_ms = 2500
        dev_mode = true
        "#,
    )
    .unwrap();

    assert_eq!(config.backend.url, "https://project.example.co");
    assert_eq!(config.backend.probe_query(), ProbeQuery::new("settings", "id"));
    assert_eq!(config.monitor.cache_ttl_ms, 2500);
    assert!(config.monitor.dev_mode);
    assert_eq!(config.monitor.check_interval_ms, 60_000);
}

#[test]
fn test_invalid_toml_is_configuration_error() {
    let err = PortalConfig::from_toml_str("[monitor]\ncache_ttl_ms = \"soon\"").unwrap_err();
    assert!(matches!(err, PortalError::Configuration(_)));
}

#[test]
fn test_missing_file_yields_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = PortalConfig::load(&dir.path().join(CONFIG_FILE_NAME)).unwrap();
    assert_eq!(config, PortalConfig::default());
}

#[test]
fn test_save_then_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join(CONFIG_FILE_NAME);

    let mut config = configured();
    config.monitor.reconnect_max_attempts = 7;
    config.save(&path).unwrap();

    assert_eq!(PortalConfig::load(&path).unwrap(), config);
}

#[test]
fn test_env_overrides() {
    let vars: HashMap<&str, &str> = [
        (ENV_BACKEND_URL, "https://override.example.co"),
        (ENV_ANON_KEY, "override-key"),
        (ENV_DEV_MODE, "TRUE"),
    ]
    .into_iter()
    .collect();

    let mut config = PortalConfig::default();
    config.apply_overrides_from(|key| vars.get(key).map(|v| v.to_string()));

    assert_eq!(config.backend.url, "https://override.example.co");
    assert_eq!(config.backend.anon_key, "override-key");
    assert!(config.monitor.dev_mode);
}

#[test]
fn test_env_dev_mode_falsy_value() {
    let mut config = PortalConfig::default();
    config.monitor.dev_mode = true;
    config.apply_overrides_from(|key| (key == ENV_DEV_MODE).then(|| "0".to_string()));
    assert!(!config.monitor.dev_mode);
}

#[test]
fn test_validate() {
    assert!(configured().validate().is_ok());

    let err = PortalConfig::default().validate().unwrap_err();
    assert!(err.to_string().contains("backend.url"));

    let mut config = configured();
    config.backend.url = "ftp://project".into();
    assert!(config.validate().is_err());

    for malformed in ["http://", "https://bad host.example", "project.example.co"] {
        let mut config = configured();
        config.backend.url = malformed.into();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, PortalError::Configuration(_)), "{malformed}");
    }

    let mut config = configured();
    config.backend.anon_key = "  ".into();
    assert!(config.validate().is_err());

    let mut config = configured();
    config.monitor.reconnect_max_attempts = 0;
    assert!(config.validate().is_err());
}
