//! # edxgen_templates
//!
//! Template rendering and patch composition for edxgen.
//!
//! Deployment templates (Compose files, Kubernetes manifests, the Caddyfile)
//! are Jinja templates rendered with `minijinja`:
//!
//! - `{{ EXPR }}` interpolation with filters such as `|indent(4)`
//! - `{% if %}` / `{% elif %}` / `{% else %}` / `{% endif %}`
//! - `{% for item in EXPR %}` / `{% endfor %}`
//! - `{% include "path" %}` and `{# comments #}`
//! - `{{ patch("slot") }}` extension points filled by plugins
//! - `iter_mounts(MOUNTS, service, app)` and `walk_templates(path)`
//!
//! ## Example
//!
//! ```rust,no_run
//! use edxgen_config::ConfigLoader;
//! use edxgen_templates::{EnvRenderer, PatchRegistry, PluginLoader};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! let mut settings = ConfigLoader::new(".").load().unwrap();
//! let mut patches = PatchRegistry::new();
//! for plugin in PluginLoader::new("plugins").load_all().unwrap() {
//!     plugin.apply(&mut patches, &mut settings);
//! }
//!
//! let context = settings.resolve().unwrap();
//! let env = EnvRenderer::new("templates", Arc::new(patches));
//! let written = env.render_tree(&context, Path::new("env")).unwrap();
//! ```

pub mod env;
pub mod error;
pub mod filters;
pub mod mounts;
pub mod patches;
pub mod plugins;
pub mod renderer;
pub mod walker;

pub use env::EnvRenderer;
pub use error::{TemplateError, TemplateResult};
pub use mounts::{iter_mounts, parse_mounts, MountSpec};
pub use patches::{PatchRegistry, PatchSource, SharedPatchSource};
pub use plugins::{PluginConfig, PluginLoader, PluginManifest};
pub use renderer::TemplateRenderer;
pub use walker::{walk_templates, TemplateWalker};

use std::sync::Arc;

use edxgen_config::Context;

/// Render template text with no patches and no template root.
pub fn render(template_text: &str, context: &Context) -> TemplateResult<String> {
    TemplateRenderer::new(Arc::new(PatchRegistry::new())).render(template_text, context)
}
