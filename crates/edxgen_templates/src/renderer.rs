//! Template rendering.
//!
//! Templates are rendered by a [`minijinja`] environment configured for
//! deployment files: no auto-escaping, trailing newlines kept, absent
//! settings falsy in conditions but an error when printed. On top of the
//! built-in filters the environment provides:
//!
//! - `patch(slot)`: fragments registered for a slot, rendered as templates
//! - `iter_mounts(MOUNTS, service, app)`: bind mounts for a service
//! - `walk_templates(path)`: template files under a directory
//! - `include` of files relative to the template root
//!
//! A render is a pure function of the template text, the resolved settings
//! [`Context`] and the patch source: every call builds a fresh environment.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use edxgen_config::Context;
use minijinja::value::Value as JinjaValue;
use minijinja::{AutoEscape, Environment, Error, ErrorKind, State, Template, UndefinedBehavior};
use tracing::debug;

use crate::error::{TemplateError, TemplateResult};
use crate::filters;
use crate::mounts::{iter_mounts, parse_mounts};
use crate::patches::SharedPatchSource;
use crate::walker::walk_templates;

/// Maximum nesting of patch fragments.
pub const MAX_NESTING_DEPTH: usize = 50;

const INLINE_TEMPLATE: &str = "<string>";

/// Names resolved by the environment rather than by settings.
const GLOBAL_NAMES: &[&str] = &[
    "patch",
    "iter_mounts",
    "walk_templates",
    "range",
    "dict",
    "namespace",
    "debug",
    "cycler",
    "joiner",
    "lipsum",
];

/// Template renderer.
pub struct TemplateRenderer {
    patches: SharedPatchSource,
    template_root: Option<PathBuf>,
    trim_blocks: bool,
}

impl TemplateRenderer {
    /// Create a renderer drawing patch fragments from `patches`.
    pub fn new(patches: SharedPatchSource) -> Self {
        Self {
            patches,
            template_root: None,
            trim_blocks: false,
        }
    }

    /// Root used by `include` and `walk_templates`.
    pub fn with_template_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.template_root = Some(root.into());
        self
    }

    /// Drop the first newline after each block tag.
    pub fn trim_blocks(mut self, enabled: bool) -> Self {
        self.trim_blocks = enabled;
        self
    }

    pub fn template_root(&self) -> Option<&Path> {
        self.template_root.as_deref()
    }

    /// Render inline template text.
    pub fn render(&self, source: &str, context: &Context) -> TemplateResult<String> {
        self.render_named(INLINE_TEMPLATE, source, context)
    }

    /// Render template text, naming it `name` in errors.
    pub fn render_named(
        &self,
        name: &str,
        source: &str,
        context: &Context,
    ) -> TemplateResult<String> {
        let env = self.environment(context);
        let template = env.template_from_named_str(name, source)?;
        render_template(&template, context)
    }

    /// Render a template file relative to the template root.
    pub fn render_file(&self, relative: &str, context: &Context) -> TemplateResult<String> {
        if self.template_root.is_none() {
            return Err(TemplateError::render(
                relative,
                0,
                "no template root configured",
            ));
        }
        let env = self.environment(context);
        let template = env.get_template(relative)?;
        render_template(&template, context)
    }

    fn environment<'s>(&self, context: &Context) -> Environment<'s> {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::SemiStrict);
        env.set_auto_escape_callback(|_: &str| AutoEscape::None);
        env.set_keep_trailing_newline(true);
        env.set_trim_blocks(self.trim_blocks);
        env.add_filter("indent", filters::indent);

        if let Some(root) = self.template_root.clone() {
            env.set_loader(move |name: &str| load_template(&root, name));
        }

        let patches = Arc::clone(&self.patches);
        let globals = JinjaValue::from_serialize(context);
        let depth = Arc::new(AtomicUsize::new(0));
        env.add_function(
            "patch",
            move |state: &State, slot: String| -> Result<String, Error> {
                let text = patches.render_slot(&slot);
                if text.is_empty() {
                    return Ok(text);
                }
                if depth.fetch_add(1, Ordering::SeqCst) >= MAX_NESTING_DEPTH {
                    depth.fetch_sub(1, Ordering::SeqCst);
                    return Err(Error::new(
                        ErrorKind::InvalidOperation,
                        format!("patches nested deeper than {} levels", MAX_NESTING_DEPTH),
                    ));
                }
                debug!("Rendering patch slot {}", slot);
                let rendered =
                    state
                        .env()
                        .render_named_str(&format!("patch:{}", slot), &text, globals.clone());
                depth.fetch_sub(1, Ordering::SeqCst);
                rendered
            },
        );

        env.add_function(
            "iter_mounts",
            |mounts: JinjaValue, service: String, app: String| -> Result<Vec<String>, Error> {
                let entries: Vec<String> = match mounts.as_str() {
                    Some("") => Vec::new(),
                    Some(entry) => vec![entry.to_string()],
                    None => mounts.try_iter()?.map(|item| item.to_string()).collect(),
                };
                let specs = parse_mounts(&entries);
                Ok(iter_mounts(&specs, &service, &app).collect())
            },
        );

        let root = self.template_root.clone();
        env.add_function(
            "walk_templates",
            move |path: String| -> Result<Vec<String>, Error> {
                let root = root.as_ref().ok_or_else(|| {
                    Error::new(ErrorKind::InvalidOperation, "no template root configured")
                })?;
                walk_templates(root, &path).map_err(|err| {
                    Error::new(ErrorKind::InvalidOperation, err.to_string()).with_source(err)
                })
            },
        );

        env
    }
}

fn render_template(template: &Template<'_, '_>, context: &Context) -> TemplateResult<String> {
    template
        .render(JinjaValue::from_serialize(context))
        .map_err(|err| {
            let undefined = err.kind() == ErrorKind::UndefinedError
                && err.name() == Some(template.name());
            let line = err.line().unwrap_or(0);
            match undefined_setting(template, context) {
                Some(name) if undefined => TemplateError::UndefinedSetting {
                    name,
                    template: template.name().to_string(),
                    line,
                },
                _ => TemplateError::from(err),
            }
        })
}

/// First variable the template refers to that neither settings nor the
/// environment define.
fn undefined_setting(template: &Template<'_, '_>, context: &Context) -> Option<String> {
    template
        .undeclared_variables(false)
        .into_iter()
        .filter(|name| context.get(name).is_none() && !GLOBAL_NAMES.contains(&name.as_str()))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .next()
}

/// Loader for `include`: plain relative paths under the template root.
fn load_template(root: &Path, name: &str) -> Result<Option<String>, Error> {
    let relative = Path::new(name);
    if !relative
        .components()
        .all(|component| matches!(component, Component::Normal(_)))
    {
        return Ok(None);
    }

    let path = root.join(relative);
    if !path.is_file() {
        return Err(
            Error::new(ErrorKind::TemplateNotFound, format!("template {} not found", name))
                .with_source(TemplateError::PathNotFound(path)),
        );
    }
    debug!("Loading template {:?}", path);
    fs::read_to_string(&path).map(Some).map_err(|err| {
        Error::new(
            ErrorKind::InvalidOperation,
            format!("cannot read {}", path.display()),
        )
        .with_source(err)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patches::{MockPatchSource, PatchRegistry};
    use tempfile::tempdir;

    fn render(source: &str, context: &Context) -> TemplateResult<String> {
        TemplateRenderer::new(Arc::new(PatchRegistry::new())).render(source, context)
    }

    #[test]
    fn test_interpolation_is_idempotent() {
        let context = Context::default()
            .with("LMS_HOST", "local.edly.io")
            .with("CADDY_HTTP_PORT", 80i64);
        let source = "{{ LMS_HOST }}:{{ CADDY_HTTP_PORT }} {\n    reverse_proxy lms:8000\n}\n";
        let first = render(source, &context).unwrap();
        let second = render(source, &context).unwrap();
        assert_eq!(first, "local.edly.io:80 {\n    reverse_proxy lms:8000\n}\n");
        assert_eq!(first, second);
    }

    #[test]
    fn test_conditional_service() {
        let source = "services:{% if RUN_MYSQL %}mysql{% endif %}";
        let off = render(source, &Context::default().with("RUN_MYSQL", false)).unwrap();
        assert!(!off.contains("mysql"));
        let on = render(source, &Context::default().with("RUN_MYSQL", true)).unwrap();
        assert_eq!(on.matches("mysql").count(), 1);
    }

    #[test]
    fn test_elif_else_and_absent_falsy() {
        let source = "{% if A %}a{% elif B %}b{% else %}c{% endif %}";
        assert_eq!(render(source, &Context::default().with("B", "yes")).unwrap(), "b");
        assert_eq!(render(source, &Context::default()).unwrap(), "c");
        assert_eq!(
            render(source, &Context::default().with("A", 1i64).with("B", true)).unwrap(),
            "a"
        );
        assert_eq!(
            render(
                "{% if not MISSING and X == 'y' %}ok{% endif %}",
                &Context::default().with("X", "y")
            )
            .unwrap(),
            "ok"
        );
    }

    #[test]
    fn test_for_loop_order_and_scope() {
        let context = Context::default()
            .with("item", "outer")
            .with("HOSTS", vec!["a".to_string(), "b".to_string(), "c".to_string()]);
        let output = render(
            "{% for item in HOSTS %}[{{ item }}]{% endfor %}{{ item }}",
            &context,
        )
        .unwrap();
        assert_eq!(output, "[a][b][c]outer");
        assert!(render("{% for x in NOPE %}x{% endfor %}", &Context::default()).is_err());
    }

    #[test]
    fn test_undefined_setting_reports_location() {
        let err = render("line one\n{{ MISSING_KEY }}", &Context::default()).unwrap_err();
        match err {
            TemplateError::UndefinedSetting { name, line, .. } => {
                assert_eq!(name, "MISSING_KEY");
                assert_eq!(line, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_syntax_error_reports_template() {
        let patches = Arc::new(PatchRegistry::new());
        let err = TemplateRenderer::new(patches)
            .render_named("local/docker-compose.yml", "a\n{% if X %}\nb\n", &Context::default())
            .unwrap_err();
        match err {
            TemplateError::Syntax { template, line, .. } => {
                assert_eq!(template, "local/docker-compose.yml");
                assert!(line >= 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_default_filter() {
        let context = Context::default().with("EMPTY", "");
        assert_eq!(render("{{ MISSING|default('x') }}", &context).unwrap(), "x");
        assert_eq!(render("{{ EMPTY|default('x') }}", &context).unwrap(), "");
        assert_eq!(render("{{ EMPTY|default('x', true) }}", &context).unwrap(), "x");
    }

    #[test]
    fn test_indent_width_is_bounded() {
        let context = Context::default().with("X", "a\nb");
        assert!(matches!(
            render("{{ X|indent(1000000000000) }}", &context),
            Err(TemplateError::Render { .. })
        ));
        assert_eq!(render("{{ X|indent(2) }}", &context).unwrap(), "a\n  b");
    }

    #[test]
    fn test_patch_slots_are_rendered_with_context() {
        let mut patches = PatchRegistry::new();
        patches.register("local-docker-compose-services", "myservice:\n  image: {{ IMAGE }}");
        let context = Context::default().with("IMAGE", "docker.io/myservice:1.0");
        let renderer = TemplateRenderer::new(Arc::new(patches));
        let output = renderer
            .render(
                "services:\n  {{ patch(\"local-docker-compose-services\")|indent(2) }}\n  {{ patch('unknown-slot') }}end",
                &context,
            )
            .unwrap();
        assert_eq!(
            output,
            "services:\n  myservice:\n    image: docker.io/myservice:1.0\n  end"
        );
    }

    #[test]
    fn test_patch_source_is_consulted() {
        let mut mock = MockPatchSource::new();
        mock.expect_render_slot()
            .times(1)
            .returning(|slot| format!("# {}", slot));
        let output = TemplateRenderer::new(Arc::new(mock))
            .render("{{ patch('caddyfile-lms') }}", &Context::default())
            .unwrap();
        assert_eq!(output, "# caddyfile-lms");
    }

    #[test]
    fn test_recursive_patch_is_bounded() {
        let mut patches = PatchRegistry::new();
        patches.register("loop", "{{ patch('loop') }}");
        let err = TemplateRenderer::new(Arc::new(patches))
            .render("{{ patch('loop') }}", &Context::default())
            .unwrap_err();
        assert!(matches!(err, TemplateError::Render { .. }));
    }

    #[test]
    fn test_iter_mounts_in_template() {
        let context = Context::default().with(
            "MOUNTS",
            vec![
                "lms:/src/lms:/openedx/lms".to_string(),
                "cms:/src/cms:/openedx/cms".to_string(),
                "/src/shared:/openedx/shared:ro".to_string(),
            ],
        );
        let output = render(
            "{% for mount in iter_mounts(MOUNTS, 'lms', 'openedx') %}- {{ mount }}\n{% endfor %}",
            &context,
        )
        .unwrap();
        assert_eq!(output, "- /src/lms:/openedx/lms\n- /src/shared:/openedx/shared:ro\n");
    }

    #[test]
    fn test_include_and_walk_templates() {
        let temp = tempdir().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("k8s/partials")).unwrap();
        fs::write(root.join("k8s/partials/labels.yml"), "app: {{ APP }}").unwrap();
        fs::write(root.join("k8s/b.yml"), "").unwrap();
        fs::write(root.join("k8s/a.yml"), "").unwrap();

        let renderer =
            TemplateRenderer::new(Arc::new(PatchRegistry::new())).with_template_root(root);
        let context = Context::default().with("APP", "lms");

        assert_eq!(
            renderer
                .render("labels:\n  {% include \"k8s/partials/labels.yml\" %}", &context)
                .unwrap(),
            "labels:\n  app: lms"
        );
        assert_eq!(
            renderer.render_file("k8s/partials/labels.yml", &context).unwrap(),
            "app: lms"
        );
        assert_eq!(
            renderer
                .render("{% for f in walk_templates('k8s') %}{{ f }};{% endfor %}", &context)
                .unwrap(),
            "k8s/a.yml;k8s/b.yml;"
        );
        assert!(matches!(
            renderer.render("{% include 'nope.yml' %}", &context),
            Err(TemplateError::PathNotFound(_))
        ));
        assert!(matches!(
            renderer.render("{{ walk_templates('nope') }}", &context),
            Err(TemplateError::PathNotFound(_))
        ));
    }

    #[test]
    fn test_include_without_root() {
        let err = render("{% include 'x.yml' %}", &Context::default()).unwrap_err();
        assert!(matches!(err, TemplateError::Render { .. }));
    }

    #[test]
    fn test_unknown_function_and_filter() {
        assert!(render("{{ nope() }}", &Context::default()).is_err());
        assert!(render("{{ 'x'|nope }}", &Context::default()).is_err());
    }

    #[test]
    fn test_trim_blocks() {
        let renderer = TemplateRenderer::new(Arc::new(PatchRegistry::new())).trim_blocks(true);
        let output = renderer
            .render(
                "services:\n{% if RUN_REDIS %}\n  redis: {}\n{% endif %}\n",
                &Context::default().with("RUN_REDIS", true),
            )
            .unwrap();
        assert_eq!(output, "services:\n  redis: {}\n");
    }

    #[test]
    fn test_html_is_not_escaped() {
        let patches = Arc::new(PatchRegistry::new());
        let output = TemplateRenderer::new(patches)
            .render_named(
                "apps/openedx/templates/index.html",
                "<a href=\"{{ URL }}\">",
                &Context::default().with("URL", "https://x/?a=1&b=2"),
            )
            .unwrap();
        assert_eq!(output, "<a href=\"https://x/?a=1&b=2\">");
    }

    #[test]
    fn test_list_filters() {
        let context = Context::default().with("ORIGINS", vec!["a".to_string(), "b".to_string()]);
        assert_eq!(render("{{ ORIGINS|join(' ') }}", &context).unwrap(), "a b");
        assert_eq!(render("{{ ORIGINS|length }}", &context).unwrap(), "2");
        assert_eq!(render("{{ 'Lms '|trim|upper }}", &context).unwrap(), "LMS");
    }
}
