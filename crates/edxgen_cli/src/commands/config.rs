//! Config command - Manage project settings.

use std::path::Path;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use tracing::info;

use edxgen_config::ConfigLoader;
use edxgen_templates::PatchRegistry;

use super::{apply_overrides, apply_plugins, load_settings, PluginsArgs};

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Update settings and persist them to config.yml
    Save(SaveArgs),

    /// Print the resolved value of a setting
    #[command(name = "printvalue")]
    PrintValue(PrintValueArgs),

    /// Print every resolved setting
    List(PluginsArgs),
}

#[derive(Args)]
pub struct SaveArgs {
    /// Set a value (KEY=VALUE, repeatable)
    #[arg(short, long = "set", value_name = "KEY=VALUE")]
    set: Vec<String>,

    /// Remove a user value so the default applies again (repeatable)
    #[arg(short, long = "unset", value_name = "KEY")]
    unset: Vec<String>,

    #[command(flatten)]
    plugins: PluginsArgs,
}

#[derive(Args)]
pub struct PrintValueArgs {
    /// Setting name
    key: String,

    #[command(flatten)]
    plugins: PluginsArgs,
}

pub fn execute(command: ConfigCommand, root: &Path) -> Result<()> {
    match command {
        ConfigCommand::Save(args) => save(root, args),
        ConfigCommand::PrintValue(args) => {
            let (settings, _) = load_settings(root, &args.plugins.dir(root), &[])?;
            let value = settings
                .render_value(&args.key)
                .with_context(|| format!("Failed to resolve {}", args.key))?;
            println!("{}", value);
            Ok(())
        }
        ConfigCommand::List(plugins) => {
            let (settings, _) = load_settings(root, &plugins.dir(root), &[])?;
            let context = settings.resolve().context("Failed to resolve settings")?;
            for (key, value) in context.iter() {
                println!("{}={}", key, value);
            }
            Ok(())
        }
    }
}

/// Apply `--set`/`--unset` to the user layer and persist it.
///
/// Plugins take part in validation only: their `config.set` values are not
/// written to config.yml.
fn save(root: &Path, args: SaveArgs) -> Result<()> {
    let loader = ConfigLoader::new(root);
    let mut settings = loader.load().context("Failed to load settings")?;
    apply_overrides(&mut settings, &args.set)?;
    for key in &args.unset {
        if settings.unset(key).is_none() {
            info!("{} was not set in {}", key, loader.config_path().display());
        }
    }

    let mut effective = settings.clone();
    apply_plugins(&mut effective, &mut PatchRegistry::new(), &args.plugins.dir(root))?;
    // Refuse to persist a configuration that cannot be resolved.
    effective
        .resolve()
        .context("Settings do not resolve, nothing saved")?;

    let path = loader.save(&settings).context("Failed to save settings")?;
    println!("✅ Configuration saved to {}", path.display());
    Ok(())
}
