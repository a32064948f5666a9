//! Rendering a whole template tree into a deployment environment.

use std::fs;
use std::path::{Path, PathBuf};

use edxgen_config::Context;
use tracing::{debug, info};

use crate::error::{TemplateError, TemplateResult};
use crate::patches::SharedPatchSource;
use crate::renderer::TemplateRenderer;
use crate::walker::TemplateWalker;

const TEXT_EXTENSIONS: &[&str] = &[
    "txt", "md", "yaml", "yml", "json", "toml", "xml", "html", "css", "js", "py", "sh", "bash",
    "cfg", "conf", "ini", "env", "j2", "tpl", "sql", "properties", "caddyfile", "dockerfile",
];

enum Output {
    Rendered(String),
    Copied(PathBuf),
}

/// Renders every template under a root into a mirrored target directory.
pub struct EnvRenderer {
    templates_root: PathBuf,
    renderer: TemplateRenderer,
    walker: TemplateWalker,
}

impl EnvRenderer {
    /// Create an environment renderer for a template root.
    pub fn new(templates_root: impl Into<PathBuf>, patches: SharedPatchSource) -> Self {
        let templates_root = templates_root.into();
        Self {
            renderer: TemplateRenderer::new(patches).with_template_root(&templates_root),
            walker: TemplateWalker::new(&templates_root),
            templates_root,
        }
    }

    /// Skip files and directories whose name matches `pattern`.
    pub fn with_ignore(mut self, pattern: &str) -> TemplateResult<Self> {
        self.walker.add_ignore(pattern)?;
        Ok(self)
    }

    pub fn trim_blocks(mut self, enabled: bool) -> Self {
        self.renderer = self.renderer.trim_blocks(enabled);
        self
    }

    /// Render the tree into `target`.
    ///
    /// Every template is rendered in memory before anything is written, so a
    /// failing template leaves the target untouched.
    pub fn render_tree(&self, context: &Context, target: &Path) -> TemplateResult<Vec<PathBuf>> {
        if !self.templates_root.is_dir() {
            return Err(TemplateError::PathNotFound(self.templates_root.clone()));
        }
        info!(
            "Rendering templates from {:?} to {:?}",
            self.templates_root, target
        );

        let mut outputs = Vec::new();
        for relative in self.walker.walk("")? {
            let source = self.templates_root.join(&relative);
            let output = if is_text_file(&source) {
                match fs::read_to_string(&source) {
                    Ok(content) => {
                        Output::Rendered(self.renderer.render_named(&relative, &content, context)?)
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::InvalidData => Output::Copied(source),
                    Err(e) => return Err(e.into()),
                }
            } else {
                Output::Copied(source)
            };
            outputs.push((target.join(&relative), output));
        }

        let mut written = Vec::with_capacity(outputs.len());
        for (destination, output) in outputs {
            if let Some(parent) = destination.parent() {
                fs::create_dir_all(parent)?;
            }
            match output {
                Output::Rendered(content) => {
                    fs::write(&destination, content)?;
                    debug!("Rendered: {:?}", destination);
                }
                Output::Copied(source) => {
                    fs::copy(&source, &destination)?;
                    debug!("Copied: {:?}", destination);
                }
            }
            written.push(destination);
        }

        info!("Rendered {} files", written.len());
        Ok(written)
    }
}

/// Check if a file should be rendered rather than copied.
fn is_text_file(path: &Path) -> bool {
    match path.extension() {
        Some(ext) => {
            let ext = ext.to_string_lossy().to_lowercase();
            TEXT_EXTENSIONS.contains(&ext.as_str())
        }
        // Caddyfile, Dockerfile and friends
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_text_file() {
        assert!(is_text_file(Path::new("apps/caddy/Caddyfile")));
        assert!(is_text_file(Path::new("local/docker-compose.yml")));
        assert!(is_text_file(Path::new("apps/openedx/settings/lms/production.py")));
        assert!(!is_text_file(Path::new("apps/openedx/static/logo.png")));
    }
}
