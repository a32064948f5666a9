//! Layered settings store and interpolation.
//!
//! Settings are looked up in two layers: user values (from `config.yml`,
//! `--set` overrides and plugin `config.set` entries) shadow defaults
//! (built-in `defaults.yml` plus plugin `config.defaults`). String values are
//! small templates: they may reference other settings (`{{ KEY }}`), apply
//! filters (`{{ KEY|upper }}`) or branch (`{% if HTTPS %}...{% endif %}`).
//! Referenced settings are resolved on demand, memoized per resolution pass,
//! and cycles are rejected.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::OnceLock;

use minijinja::{Environment, ErrorKind, UndefinedBehavior};
use serde::Serialize;
use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::value::Value;

/// Maximum nesting of setting references followed while resolving a value.
pub const MAX_RESOLUTION_DEPTH: usize = 50;

const BUILTIN_DEFAULTS: &str = include_str!("defaults/defaults.yml");

/// Environment used to render setting values.
///
/// Absent settings are falsy in conditions but fail when printed.
fn value_environment() -> &'static Environment<'static> {
    static ENV: OnceLock<Environment<'static>> = OnceLock::new();
    ENV.get_or_init(|| {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::SemiStrict);
        env.set_keep_trailing_newline(true);
        env
    })
}

fn has_directives(text: &str) -> bool {
    ["{{", "{%", "{#"].iter().any(|marker| text.contains(marker))
}

fn invalid_value(key: &str, err: minijinja::Error) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        message: err.to_string(),
    }
}

/// Layered key/value settings.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    defaults: BTreeMap<String, Value>,
    user: BTreeMap<String, Value>,
}

impl Settings {
    /// Create an empty settings store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with the built-in Open edX defaults.
    pub fn with_builtin_defaults() -> ConfigResult<Self> {
        let defaults: BTreeMap<String, Value> = serde_yaml::from_str(BUILTIN_DEFAULTS)?;
        Ok(Self {
            defaults,
            user: BTreeMap::new(),
        })
    }

    /// Add default values. Existing defaults with the same key are replaced.
    pub fn add_defaults(&mut self, defaults: impl IntoIterator<Item = (String, Value)>) {
        for (key, value) in defaults {
            self.defaults.insert(key, value);
        }
    }

    /// Set a user value, shadowing any default.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        debug!("Setting {}", key);
        self.user.insert(key, value.into());
    }

    /// Remove a user value, exposing the default again if there is one.
    pub fn unset(&mut self, key: &str) -> Option<Value> {
        self.user.remove(key)
    }

    /// Whether the user layer defines `key`.
    pub fn is_user_defined(&self, key: &str) -> bool {
        self.user.contains_key(key)
    }

    /// User-level values, sorted by key.
    pub fn user_values(&self) -> &BTreeMap<String, Value> {
        &self.user
    }

    /// Raw (unresolved) value of a setting.
    pub fn get(&self, key: &str) -> ConfigResult<&Value> {
        self.user
            .get(key)
            .or_else(|| self.defaults.get(key))
            .ok_or_else(|| ConfigError::UndefinedSetting(key.to_string()))
    }

    /// All known keys across both layers, sorted.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self
            .defaults
            .keys()
            .chain(self.user.keys())
            .map(|k| k.as_str())
            .collect();
        keys.sort_unstable();
        keys.dedup();
        keys
    }

    /// Resolve a single setting, rendering it and every setting it references.
    pub fn render_value(&self, key: &str) -> ConfigResult<Value> {
        Resolver::new(self).resolve_key(key)
    }

    /// Resolve every setting into an immutable render context.
    pub fn resolve(&self) -> ConfigResult<Context> {
        let mut resolver = Resolver::new(self);
        let mut values = BTreeMap::new();
        for key in self.keys() {
            values.insert(key.to_string(), resolver.resolve_key(key)?);
        }
        debug!("Resolved {} settings", values.len());
        Ok(Context { values })
    }
}

/// Memoizing resolver for one resolution pass.
struct Resolver<'a> {
    settings: &'a Settings,
    memo: HashMap<String, Value>,
    path: Vec<String>,
}

impl<'a> Resolver<'a> {
    fn new(settings: &'a Settings) -> Self {
        Self {
            settings,
            memo: HashMap::new(),
            path: Vec::new(),
        }
    }

    fn resolve_key(&mut self, key: &str) -> ConfigResult<Value> {
        if let Some(value) = self.memo.get(key) {
            return Ok(value.clone());
        }

        if self.path.iter().any(|k| k == key) || self.path.len() >= MAX_RESOLUTION_DEPTH {
            let mut chain = self.path.clone();
            chain.push(key.to_string());
            return Err(ConfigError::CircularReference {
                key: chain[0].clone(),
                chain,
            });
        }

        let raw = self.settings.get(key)?.clone();
        self.path.push(key.to_string());
        let resolved = match raw {
            Value::String(text) => self.interpolate(key, &text).map(Value::String),
            Value::List(items) => items
                .iter()
                .map(|item| self.interpolate(key, item))
                .collect::<ConfigResult<Vec<_>>>()
                .map(Value::List),
            other => Ok(other),
        };
        self.path.pop();

        let resolved = resolved?;
        self.memo.insert(key.to_string(), resolved.clone());
        Ok(resolved)
    }

    /// Render one string of setting `key`. Every setting the text refers to
    /// is resolved first and handed to the template as its context.
    fn interpolate(&mut self, key: &str, text: &str) -> ConfigResult<String> {
        if !has_directives(text) {
            return Ok(text.to_string());
        }

        let template = value_environment()
            .template_from_str(text)
            .map_err(|err| invalid_value(key, err))?;

        let referenced: BTreeSet<String> =
            template.undeclared_variables(false).into_iter().collect();
        let mut values = BTreeMap::new();
        let mut missing = Vec::new();
        for name in referenced {
            if self.settings.get(&name).is_ok() {
                let value = self.resolve_key(&name)?;
                values.insert(name, value);
            } else {
                missing.push(name);
            }
        }

        template
            .render(&values)
            .map_err(|err| match (err.kind(), missing.first()) {
                (ErrorKind::UndefinedError, Some(name)) => {
                    ConfigError::UndefinedSetting(name.clone())
                }
                _ => invalid_value(key, err),
            })
    }
}

/// Fully resolved settings handed to every render call.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Context {
    values: BTreeMap<String, Value>,
}

impl Context {
    pub fn new(values: BTreeMap<String, Value>) -> Self {
        Self { values }
    }

    /// Builder-style insertion, mostly useful for tests.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<(String, Value)> for Context {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}
