use std::env;

use content_delivery::{ClientConfig, ConfigurationError};
use serial_test::serial;

const VARS: [&str; 7] = [
    "CDA_SPACE_ID",
    "CDA_ACCESS_TOKEN",
    "CDA_ENVIRONMENT",
    "CDA_PREVIEW",
    "CDA_API_URL",
    "CDA_LOCALE",
    "CDA_TIMEOUT_SECS",
];

fn clear_env() {
    for var in VARS {
        env::remove_var(var);
    }
}

/// Required variables plus optional overrides produce a complete config.
#[test]
#[serial]
fn test_from_env_reads_all_settings() {
    clear_env();
    env::set_var("CDA_SPACE_ID", "space1");
    env::set_var("CDA_ACCESS_TOKEN", "top-secret-test-key");
    env::set_var("CDA_ENVIRONMENT", "staging");
    env::set_var("CDA_PREVIEW", "true");
    env::set_var("CDA_LOCALE", "de-DE");
    env::set_var("CDA_TIMEOUT_SECS", "5");

    let config = ClientConfig::from_env().expect("Config should load");

    assert_eq!(config.space_id, "space1");
    assert_eq!(config.access_token, "top-secret-test-key");
    assert_eq!(config.environment, "staging");
    assert!(config.preview);
    assert_eq!(config.locale.as_deref(), Some("de-DE"));
    assert_eq!(config.timeout_secs, 5);
    assert_eq!(
        config.sync_url(),
        "https://preview.contentful.com/spaces/space1/environments/staging/sync"
    );
    clear_env();
}

/// Optional settings fall back to their defaults.
#[test]
#[serial]
fn test_from_env_defaults() {
    clear_env();
    env::set_var("CDA_SPACE_ID", "space1");
    env::set_var("CDA_ACCESS_TOKEN", "token");

    let config = ClientConfig::from_env().expect("Config should load");
    assert_eq!(config.environment, "master");
    assert!(!config.preview);
    assert_eq!(config.api_url, None);
    assert_eq!(config.timeout_secs, 30);
    clear_env();
}

/// Missing required variables make the loader fail with the variable name.
#[test]
#[serial]
fn test_from_env_errors_on_missing_env() {
    clear_env();
    env::set_var("CDA_SPACE_ID", "space1");

    let err = ClientConfig::from_env().unwrap_err();
    assert_eq!(err, ConfigurationError::MissingSetting("CDA_ACCESS_TOKEN".into()));
    assert!(err.to_string().contains("CDA_ACCESS_TOKEN"));
    clear_env();
}

/// Unparseable values are reported, not defaulted.
#[test]
#[serial]
fn test_from_env_errors_on_invalid_values() {
    clear_env();
    env::set_var("CDA_SPACE_ID", "space1");
    env::set_var("CDA_ACCESS_TOKEN", "token");
    env::set_var("CDA_TIMEOUT_SECS", "soon");

    let err = ClientConfig::from_env().unwrap_err();
    assert!(matches!(err, ConfigurationError::InvalidSetting { ref name, .. } if name == "CDA_TIMEOUT_SECS"));

    env::set_var("CDA_TIMEOUT_SECS", "10");
    env::set_var("CDA_PREVIEW", "perhaps");
    let err = ClientConfig::from_env().unwrap_err();
    assert!(matches!(err, ConfigurationError::InvalidSetting { ref name, .. } if name == "CDA_PREVIEW"));
    clear_env();
}
