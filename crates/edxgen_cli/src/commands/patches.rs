//! Patches command - Inspect plugin patches.

use std::path::Path;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use edxgen_templates::{PatchRegistry, PatchSource, PluginLoader};

use super::PluginsArgs;

#[derive(Subcommand)]
pub enum PatchesCommand {
    /// List patch slots with their fragment counts
    List(PluginsArgs),

    /// Print the raw content of one slot
    Show(ShowArgs),
}

#[derive(Args)]
pub struct ShowArgs {
    /// Slot name
    slot: String,

    #[command(flatten)]
    plugins: PluginsArgs,
}

pub fn execute(command: PatchesCommand, root: &Path) -> Result<()> {
    match command {
        PatchesCommand::List(args) => {
            let registry = load_registry(root, &args)?;
            if registry.is_empty() {
                println!("No patches registered");
                return Ok(());
            }
            for (slot, count) in registry.slots() {
                println!("{:<48} {}", slot, count);
            }
            Ok(())
        }
        PatchesCommand::Show(args) => {
            let registry = load_registry(root, &args.plugins)?;
            println!("{}", registry.render_slot(&args.slot));
            Ok(())
        }
    }
}

fn load_registry(root: &Path, plugins: &PluginsArgs) -> Result<PatchRegistry> {
    let plugins = plugins.dir(root);
    let mut registry = PatchRegistry::new();
    for plugin in PluginLoader::new(&plugins)
        .load_all()
        .with_context(|| format!("Failed to load plugins from {}", plugins.display()))?
    {
        plugin.register_patches(&mut registry);
    }
    Ok(registry)
}
