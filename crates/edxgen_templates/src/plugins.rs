//! YAML plugins contributing patches and settings.
//!
//! A plugin manifest looks like:
//!
//! ```yaml
//! name: myplugin
//! version: 1.0.0
//! priority: 10
//! patches:
//!   local-docker-compose-services: |
//!     myservice:
//!       image: {{ MYPLUGIN_IMAGE }}
//! config:
//!   defaults:
//!     MYPLUGIN_IMAGE: docker.io/myservice:latest
//!   set:
//!     RUN_MONGODB: false
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use edxgen_config::{Settings, Value};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{TemplateError, TemplateResult};
use crate::patches::PatchRegistry;

/// Settings contributed by a plugin.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PluginConfig {
    /// Defaults, overridable by the user.
    #[serde(default)]
    pub defaults: BTreeMap<String, Value>,
    /// Values applied unless the user already set the key.
    #[serde(default)]
    pub set: BTreeMap<String, Value>,
}

/// Plugin manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginManifest {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    /// Priority of every patch of this plugin; lower renders first.
    #[serde(default)]
    pub priority: i32,
    /// Slot name to fragment text.
    #[serde(default)]
    pub patches: BTreeMap<String, String>,
    #[serde(default)]
    pub config: PluginConfig,
}

impl PluginManifest {
    /// Register the patches of this plugin with its priority.
    pub fn register_patches(&self, patches: &mut PatchRegistry) {
        for (slot, text) in &self.patches {
            patches.register_with_priority(slot.clone(), text.clone(), self.priority);
        }
    }

    /// Register patches and settings of this plugin.
    pub fn apply(&self, patches: &mut PatchRegistry, settings: &mut Settings) {
        debug!("Applying plugin {}", self.name);
        self.register_patches(patches);
        settings.add_defaults(
            self.config
                .defaults
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        for (key, value) in &self.config.set {
            if !settings.is_user_defined(key) {
                settings.set(key.clone(), value.clone());
            }
        }
    }
}

/// Loader for plugin manifests in a directory.
pub struct PluginLoader {
    plugins_path: PathBuf,
}

impl PluginLoader {
    pub fn new(plugins_path: impl Into<PathBuf>) -> Self {
        Self {
            plugins_path: plugins_path.into(),
        }
    }

    /// Load all `*.yml`/`*.yaml` manifests, sorted by file name.
    pub fn load_all(&self) -> TemplateResult<Vec<PluginManifest>> {
        if !self.plugins_path.exists() {
            warn!("Plugins directory does not exist: {:?}", self.plugins_path);
            return Ok(Vec::new());
        }

        let mut paths: Vec<PathBuf> = fs::read_dir(&self.plugins_path)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.is_file()
                    && path
                        .extension()
                        .is_some_and(|ext| ext == "yml" || ext == "yaml")
            })
            .collect();
        paths.sort();

        let mut names = BTreeSet::new();
        let mut plugins = Vec::with_capacity(paths.len());
        for path in paths {
            let plugin = self.load_plugin(&path)?;
            if !names.insert(plugin.name.clone()) {
                return Err(TemplateError::InvalidPlugin {
                    path,
                    message: format!("duplicate plugin name '{}'", plugin.name),
                });
            }
            info!("Loaded plugin: {}", plugin.name);
            plugins.push(plugin);
        }
        Ok(plugins)
    }

    /// Load a single manifest file.
    pub fn load_plugin(&self, path: &Path) -> TemplateResult<PluginManifest> {
        debug!("Loading plugin from {:?}", path);
        let content = fs::read_to_string(path)?;
        let plugin: PluginManifest =
            serde_yaml::from_str(&content).map_err(|e| TemplateError::InvalidPlugin {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        if plugin.name.trim().is_empty() {
            return Err(TemplateError::InvalidPlugin {
                path: path.to_path_buf(),
                message: "plugin name is empty".to_string(),
            });
        }
        Ok(plugin)
    }
}
