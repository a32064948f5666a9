//! Integration tests for the settings store.

use std::fs;

use edxgen_config::{parse_override, ConfigError, ConfigLoader, Value, CONFIG_FILE};
use tempfile::tempdir;

/// Saving overrides and loading them again yields the same user layer.
#[test]
fn test_save_and_reload_overrides() {
    let temp = tempdir().unwrap();
    let loader = ConfigLoader::new(temp.path());

    let mut settings = loader.load().unwrap();
    for input in ["LMS_HOST=learn.example.com", "RUN_MONGODB=false", "MYSQL_PORT=3307"] {
        let (key, value) = parse_override(input).unwrap();
        settings.set(key, value);
    }
    let path = loader.save(&settings).unwrap();
    assert_eq!(path, temp.path().join(CONFIG_FILE));

    let reloaded = loader.load().unwrap();
    assert_eq!(reloaded.user_values(), settings.user_values());
    assert_eq!(reloaded.get("RUN_MONGODB").unwrap(), &Value::Bool(false));
    assert_eq!(reloaded.get("MYSQL_PORT").unwrap(), &Value::Int(3307));
}

/// Only user values are written, sorted by key.
#[test]
fn test_saved_file_contains_user_layer_only() {
    let temp = tempdir().unwrap();
    let loader = ConfigLoader::new(temp.path());

    let mut settings = loader.load().unwrap();
    settings.set("PLATFORM_NAME", "Example Academy");
    settings.set("CONTACT_EMAIL", "admin@example.com");
    loader.save(&settings).unwrap();

    let content = fs::read_to_string(temp.path().join(CONFIG_FILE)).unwrap();
    assert!(!content.contains("DOCKER_IMAGE_OPENEDX"));
    let contact = content.find("CONTACT_EMAIL").unwrap();
    let platform = content.find("PLATFORM_NAME").unwrap();
    assert!(contact < platform);
}

/// User overrides flow through interpolated defaults.
#[test]
fn test_overrides_propagate_through_references() {
    let temp = tempdir().unwrap();
    fs::write(
        temp.path().join(CONFIG_FILE),
        "LMS_HOST: learn.example.com\nOPENEDX_VERSION: sumac.1\n",
    )
    .unwrap();

    let settings = ConfigLoader::new(temp.path()).load().unwrap();
    let context = settings.resolve().unwrap();

    assert_eq!(
        context.get("CMS_HOST"),
        Some(&Value::from("studio.learn.example.com"))
    );
    assert_eq!(
        context.get("DOCKER_IMAGE_OPENEDX"),
        Some(&Value::from("docker.io/overhangio/openedx:sumac.1"))
    );
}

/// A user-introduced cycle is reported instead of looping.
#[test]
fn test_user_cycle_is_reported() {
    let temp = tempdir().unwrap();
    fs::write(
        temp.path().join(CONFIG_FILE),
        "LMS_HOST: \"{{ CMS_HOST }}\"\n",
    )
    .unwrap();

    let settings = ConfigLoader::new(temp.path()).load().unwrap();
    let err = settings.resolve().unwrap_err();
    assert!(matches!(err, ConfigError::CircularReference { .. }));
    assert!(err.to_string().contains("->"));
}
