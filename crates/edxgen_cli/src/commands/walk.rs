//! Walk command - List template files.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use edxgen_templates::walk_templates;

use super::under_root;

#[derive(Args)]
pub struct WalkArgs {
    /// Directory relative to the template root
    #[arg(default_value = "")]
    path: String,

    /// Template root (default: <root>/templates)
    #[arg(long)]
    templates: Option<PathBuf>,
}

pub fn execute(args: WalkArgs, root: &Path) -> Result<()> {
    let templates = under_root(root, args.templates, "templates");
    let files = walk_templates(&templates, &args.path)
        .with_context(|| format!("Failed to walk {:?} in {}", args.path, templates.display()))?;
    for file in files {
        println!("{}", file);
    }
    Ok(())
}
