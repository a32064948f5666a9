//! Error types for templates.

use std::error::Error as _;
use std::path::PathBuf;

use minijinja::ErrorKind;
use thiserror::Error;

/// Result type alias for template operations.
pub type TemplateResult<T> = Result<T, TemplateError>;

/// Errors that can occur while parsing or rendering templates.
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Syntax error in {template} at line {line}: {message}")]
    Syntax {
        template: String,
        line: usize,
        message: String,
    },

    #[error("Undefined setting '{name}' in {template} at line {line}")]
    UndefinedSetting {
        name: String,
        template: String,
        line: usize,
    },

    #[error("Template rendering failed in {template} at line {line}: {message}")]
    Render {
        template: String,
        line: usize,
        message: String,
    },

    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    #[error("Invalid ignore pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("Invalid plugin {path}: {message}")]
    InvalidPlugin { path: PathBuf, message: String },

    #[error("Settings error: {0}")]
    Config(#[from] edxgen_config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl TemplateError {
    pub(crate) fn render(template: &str, line: usize, message: impl Into<String>) -> Self {
        TemplateError::Render {
            template: template.to_string(),
            line,
            message: message.into(),
        }
    }
}

impl From<minijinja::Error> for TemplateError {
    fn from(err: minijinja::Error) -> Self {
        if let Some(path) = missing_path(&err) {
            return TemplateError::PathNotFound(path);
        }

        let template = err.name().unwrap_or("<string>").to_string();
        let line = err.line().unwrap_or(0);
        let message = err
            .detail()
            .map(str::to_string)
            .unwrap_or_else(|| err.to_string());
        match err.kind() {
            ErrorKind::SyntaxError => TemplateError::Syntax {
                template,
                line,
                message,
            },
            ErrorKind::UndefinedError => TemplateError::UndefinedSetting {
                name: "<expression>".to_string(),
                template,
                line,
            },
            _ => TemplateError::Render {
                template,
                line,
                message,
            },
        }
    }
}

/// Missing path attached by the loader or `walk_templates`, if any.
fn missing_path(err: &minijinja::Error) -> Option<PathBuf> {
    let mut source = err.source();
    while let Some(cause) = source {
        if let Some(TemplateError::PathNotFound(path)) = cause.downcast_ref::<TemplateError>() {
            return Some(path.clone());
        }
        source = cause.source();
    }
    None
}
