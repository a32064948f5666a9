//! Render command - Generate an environment from the template tree.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use edxgen_templates::EnvRenderer;

use super::{load_settings, under_root, PluginsArgs};

#[derive(Args)]
pub struct RenderArgs {
    /// Template root (default: <root>/templates)
    #[arg(long)]
    templates: Option<PathBuf>,

    #[command(flatten)]
    plugins: PluginsArgs,

    /// Output directory (default: <root>/env)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Override a setting for this run only (KEY=VALUE, repeatable)
    #[arg(short, long = "set", value_name = "KEY=VALUE")]
    set: Vec<String>,

    /// Extra ignore pattern for template files (repeatable)
    #[arg(long = "ignore", value_name = "PATTERN")]
    ignore: Vec<String>,

    /// Drop the newline following a block tag
    #[arg(long)]
    trim_blocks: bool,
}

pub fn execute(args: RenderArgs, root: &Path) -> Result<()> {
    let templates = under_root(root, args.templates, "templates");
    let plugins = args.plugins.dir(root);
    let output = under_root(root, args.output, "env");

    let (settings, patches) = load_settings(root, &plugins, &args.set)?;
    let context = settings.resolve().context("Failed to resolve settings")?;
    info!("Resolved {} settings", context.len());

    let mut env =
        EnvRenderer::new(&templates, Arc::new(patches)).trim_blocks(args.trim_blocks);
    for pattern in &args.ignore {
        env = env
            .with_ignore(pattern)
            .with_context(|| format!("Invalid ignore pattern: {pattern}"))?;
    }

    let written = env
        .render_tree(&context, &output)
        .with_context(|| format!("Failed to render templates from {}", templates.display()))?;

    println!(
        "✅ Rendered {} files to {}",
        written.len(),
        output.display()
    );
    Ok(())
}
