//! Integration tests for Settings loading with layered precedence.
//!
//! Precedence (lowest to highest):
//! - compiled defaults
//! - global config file (absent in these tests)
//! - explicit `--config` file
//! - DRONES_DEPLOY_* environment variables
//! - CLI flags via `with_overrides`

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

use drones_deploy::application::ApplicationError;
use drones_deploy::config::{DependencyMode, Settings};

fn env(pairs: &[(&str, &str)]) -> Option<HashMap<String, String>> {
    Some(
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    )
}

#[test]
fn given_explicit_config_when_load_then_overrides_defaults() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let config_file = temp.path().join("deploy.toml");
    fs::write(
        &config_file,
        r#"
app_dir = "/srv/drones"
deploy_cache = false

[parameters]
path = "/drones/staging"
region = "eu-central-1"

[parameters.named]
BUGOUT_AUTH_URL = "/spire/prod/BUGOUT_AUTH_URL"

[dependencies]
mode = "unpinned"
"#,
    )
    .unwrap();

    // Act
    let settings = Settings::load_with_env(Some(&config_file), env(&[])).unwrap();

    // Assert
    assert_eq!(settings.app_dir, PathBuf::from("/srv/drones"));
    assert!(!settings.deploy_cache);
    assert_eq!(settings.parameter_path(), Some("/drones/staging"));
    assert_eq!(settings.parameters.region, "eu-central-1");
    assert_eq!(
        settings.parameters.named.get("BUGOUT_AUTH_URL").map(String::as_str),
        Some("/spire/prod/BUGOUT_AUTH_URL")
    );
    assert_eq!(settings.dependencies.mode, DependencyMode::Unpinned);
    // Untouched keys keep their defaults
    assert_eq!(settings.env_file_name, "app.env");
    assert_eq!(settings.unit_dir, PathBuf::from("/etc/systemd/system"));
    assert_eq!(settings.dependencies.requirements_file, "requirements.txt");
}

#[test]
fn given_env_vars_when_load_then_override_config_file() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let config_file = temp.path().join("deploy.toml");
    fs::write(
        &config_file,
        "secrets_dir = \"/from/file\"\n[parameters]\nregion = \"eu-central-1\"\n",
    )
    .unwrap();

    // Act
    let settings = Settings::load_with_env(
        Some(&config_file),
        env(&[
            ("DRONES_DEPLOY_SECRETS_DIR", "/from/env"),
            ("DRONES_DEPLOY_PARAMETERS__REGION", "ap-southeast-2"),
            ("DRONES_DEPLOY_PARAMETERS__EXPORT", "true"),
            ("DRONES_DEPLOY_DEPENDENCIES__MODE", "unpinned"),
        ]),
    )
    .unwrap();

    // Assert
    assert_eq!(settings.secrets_dir, PathBuf::from("/from/env"));
    assert_eq!(settings.parameters.region, "ap-southeast-2");
    assert!(settings.parameters.export);
    assert_eq!(settings.dependencies.mode, DependencyMode::Unpinned);
}

#[test]
fn given_env_vars_and_cli_flags_when_load_then_flags_win() {
    let settings = Settings::load_with_env(
        None,
        env(&[("DRONES_DEPLOY_PARAMETERS__PATH", "/drones/env")]),
    )
    .unwrap()
    .with_overrides(None, Some("/drones/flag".into()));

    assert_eq!(settings.parameter_path(), Some("/drones/flag"));
}

#[test]
fn given_invalid_mode_in_env_when_load_then_config_error() {
    let result = Settings::load_with_env(
        None,
        env(&[("DRONES_DEPLOY_DEPENDENCIES__MODE", "yolo")]),
    );

    assert!(matches!(result, Err(ApplicationError::Config { .. })));
}

#[test]
fn given_missing_config_file_when_load_then_config_error() {
    let temp = TempDir::new().unwrap();

    let result = Settings::load_with_env(Some(&temp.path().join("nope.toml")), env(&[]));

    match result {
        Err(ApplicationError::Config { message }) => assert!(message.contains("nope.toml")),
        other => panic!("expected Config error, got {:?}", other),
    }
}

#[test]
fn given_malformed_config_file_when_load_then_config_error() {
    let temp = TempDir::new().unwrap();
    let config_file = temp.path().join("deploy.toml");
    fs::write(&config_file, "deploy_cache = \"maybe\"\n").unwrap();

    let result = Settings::load_with_env(Some(&config_file), env(&[]));

    assert!(matches!(result, Err(ApplicationError::Config { .. })));
}

#[test]
fn given_env_var_path_when_load_then_expands_variables() {
    let home = std::env::var("HOME").unwrap();

    let settings = Settings::load_with_env(
        None,
        env(&[("DRONES_DEPLOY_APP_DIR", "$HOME/drones")]),
    )
    .unwrap();

    assert_eq!(settings.app_dir, PathBuf::from(format!("{home}/drones")));
}

#[test]
fn given_loaded_settings_when_to_toml_then_round_trips_through_config_file() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let mut original = Settings::load_with_env(None, env(&[])).unwrap();
    original.app_dir = PathBuf::from("/srv/drones");
    original
        .parameters
        .named
        .insert("X_TOKEN".into(), "/other/X_TOKEN".into());
    let config_file = temp.path().join("shown.toml");
    fs::write(&config_file, original.to_toml().unwrap()).unwrap();

    // Act
    let reloaded = Settings::load_with_env(Some(&config_file), env(&[])).unwrap();

    // Assert
    assert_eq!(reloaded, original);
}

#[test]
fn given_template_when_parsed_then_is_valid_toml() {
    let temp = TempDir::new().unwrap();
    let config_file = temp.path().join("template.toml");
    fs::write(&config_file, Settings::template()).unwrap();

    let settings = Settings::load_with_env(Some(&config_file), env(&[])).unwrap();

    assert_eq!(settings.env_file_name, "app.env");
}
