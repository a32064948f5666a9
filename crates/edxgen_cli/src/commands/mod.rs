//! CLI command definitions.
//!
//! This module defines the command structure for the edxgen CLI.
//! Each subcommand maps to one step of generating an Open edX environment.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::debug;

use edxgen_config::{parse_override, ConfigLoader, Settings};
use edxgen_templates::{PatchRegistry, PluginLoader};

pub mod config;
pub mod patches;
pub mod render;
pub mod walk;

/// edxgen - Open edX deployment environment generator
#[derive(Parser)]
#[command(name = "edxgen")]
#[command(version, about = "edxgen - Open edX deployment environment generator")]
#[command(long_about = r#"
edxgen renders Open edX deployment templates (Compose files, Kubernetes
manifests, web server configuration) from a layered settings store and
plugin-provided patches.

WORKFLOWS:
  config save       → Update and persist config.yml
  config printvalue → Print one resolved setting
  config list       → Print every resolved setting
  render            → Render the template tree into an environment
  patches list      → List patch slots contributed by plugins
  walk              → List the templates under a directory

EXIT CODES:
  0 - Success
  1 - General error
  2 - Invalid arguments
  3 - Settings error
  4 - Template error
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Project root holding config.yml
    #[arg(long, global = true, env = "EDXGEN_ROOT", default_value = ".")]
    pub root: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage the project settings
    #[command(subcommand)]
    Config(config::ConfigCommand),

    /// Render the template tree into an environment directory
    Render(render::RenderArgs),

    /// Inspect plugin patches
    #[command(subcommand)]
    Patches(patches::PatchesCommand),

    /// List template files under a directory
    Walk(walk::WalkArgs),
}

/// Plugins directory option shared by several commands.
#[derive(Args, Clone, Default)]
pub struct PluginsArgs {
    /// Plugins directory (default: <root>/plugins)
    #[arg(long)]
    pub plugins: Option<PathBuf>,
}

impl PluginsArgs {
    pub fn dir(&self, root: &Path) -> PathBuf {
        under_root(root, self.plugins.clone(), "plugins")
    }
}

/// Load settings from `root`, apply plugins and then `--set` overrides.
pub fn load_settings(
    root: &Path,
    plugins_dir: &Path,
    overrides: &[String],
) -> Result<(Settings, PatchRegistry)> {
    let mut settings = ConfigLoader::new(root)
        .load()
        .with_context(|| format!("Failed to load settings from {}", root.display()))?;

    let mut patches = PatchRegistry::new();
    apply_plugins(&mut settings, &mut patches, plugins_dir)?;
    apply_overrides(&mut settings, overrides)?;
    debug!("Loaded {} settings", settings.keys().len());
    Ok((settings, patches))
}

/// Load the plugins of `plugins_dir` and apply them. Returns the plugin count.
pub fn apply_plugins(
    settings: &mut Settings,
    patches: &mut PatchRegistry,
    plugins_dir: &Path,
) -> Result<usize> {
    let plugins = PluginLoader::new(plugins_dir)
        .load_all()
        .with_context(|| format!("Failed to load plugins from {}", plugins_dir.display()))?;
    for plugin in &plugins {
        plugin.apply(patches, settings);
    }
    Ok(plugins.len())
}

/// Apply `KEY=VALUE` overrides as user values.
pub fn apply_overrides(settings: &mut Settings, overrides: &[String]) -> Result<()> {
    for raw in overrides {
        let (key, value) =
            parse_override(raw).with_context(|| format!("Invalid --set argument: {raw}"))?;
        settings.set(key, value);
    }
    Ok(())
}

/// Resolve a path relative to the project root unless given explicitly.
pub fn under_root(root: &Path, explicit: Option<PathBuf>, default: &str) -> PathBuf {
    explicit.unwrap_or_else(|| root.join(default))
}
