//! Enumerating template files under a template root.

use std::path::{Path, PathBuf};

use glob::Pattern;
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{TemplateError, TemplateResult};

/// File and directory names skipped while walking templates.
pub const DEFAULT_IGNORES: &[&str] = &[".*", "partials", "__pycache__", "*.pyc"];

/// Recursive, deterministic walker over a template root.
#[derive(Debug, Clone)]
pub struct TemplateWalker {
    root: PathBuf,
    ignores: Vec<Pattern>,
}

impl TemplateWalker {
    /// Create a walker with the default ignore patterns.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ignores: DEFAULT_IGNORES
                .iter()
                .filter_map(|p| Pattern::new(p).ok())
                .collect(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Add a glob pattern matched against file and directory names.
    pub fn add_ignore(&mut self, pattern: &str) -> TemplateResult<()> {
        let compiled = Pattern::new(pattern).map_err(|e| TemplateError::InvalidPattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;
        self.ignores.push(compiled);
        Ok(())
    }

    fn is_ignored(&self, name: &str) -> bool {
        self.ignores.iter().any(|p| p.matches(name))
    }

    /// Template files under `relative`, as `/`-separated paths relative to
    /// the root, sorted lexicographically.
    pub fn walk(&self, relative: &str) -> TemplateResult<Vec<String>> {
        let start = self.root.join(relative);
        if !start.exists() {
            return Err(TemplateError::PathNotFound(start));
        }
        debug!("Walking templates under {:?}", start);

        let mut files = Vec::new();
        let entries = WalkDir::new(&start)
            .follow_links(true)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !self.is_ignored(&e.file_name().to_string_lossy()));

        for entry in entries {
            let entry = entry.map_err(std::io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(rel) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            let rel = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/");
            files.push(rel);
        }

        files.sort();
        Ok(files)
    }
}

/// Walk `relative` under `root` with the default ignore patterns.
pub fn walk_templates(root: &Path, relative: &str) -> TemplateResult<Vec<String>> {
    TemplateWalker::new(root).walk(relative)
}
