//! Loading and saving the user configuration file.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, info};

use crate::error::{ConfigError, ConfigResult};
use crate::settings::Settings;
use crate::value::Value;

/// Name of the user configuration file inside the project root.
pub const CONFIG_FILE: &str = "config.yml";

fn key_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid key pattern"))
}

/// Loader for the layered configuration of a project root.
pub struct ConfigLoader {
    root: PathBuf,
}

impl ConfigLoader {
    /// Create a loader for a project root.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    /// Load built-in defaults overlaid with the user configuration.
    pub fn load(&self) -> ConfigResult<Settings> {
        let mut settings = Settings::with_builtin_defaults()?;
        for (key, value) in self.load_user()? {
            settings.set(key, value);
        }
        Ok(settings)
    }

    /// Read the user configuration. A missing or empty file yields no values.
    pub fn load_user(&self) -> ConfigResult<BTreeMap<String, Value>> {
        let path = self.config_path();
        if !path.exists() {
            debug!("No user configuration at {:?}", path);
            return Ok(BTreeMap::new());
        }

        debug!("Loading user configuration from {:?}", path);
        let content = fs::read_to_string(&path)?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        let values: Option<BTreeMap<String, Value>> =
            serde_yaml::from_str(&content).map_err(|e| ConfigError::InvalidFile {
                path: path.clone(),
                message: e.to_string(),
            })?;
        Ok(values.unwrap_or_default())
    }

    /// Persist the user layer of `settings` to the configuration file.
    pub fn save(&self, settings: &Settings) -> ConfigResult<PathBuf> {
        fs::create_dir_all(&self.root)?;
        let path = self.config_path();
        let content = serde_yaml::to_string(settings.user_values())?;
        fs::write(&path, content)?;
        info!("Configuration saved to {:?}", path);
        Ok(path)
    }
}

/// Parse a `KEY=VALUE` override.
///
/// The value is read as YAML so `true`, `3` and `[a, b]` keep their types;
/// anything YAML cannot represent as a setting is kept as a plain string.
pub fn parse_override(input: &str) -> ConfigResult<(String, Value)> {
    let (key, raw) = input
        .split_once('=')
        .ok_or_else(|| ConfigError::InvalidOverride(input.to_string()))?;
    let key = key.trim();

    if !key_pattern().is_match(key) {
        return Err(ConfigError::InvalidOverride(input.to_string()));
    }

    if raw.is_empty() {
        return Ok((key.to_string(), Value::String(String::new())));
    }

    let value = serde_yaml::from_str::<Value>(raw).unwrap_or_else(|_| Value::from(raw));
    Ok((key.to_string(), value))
}
