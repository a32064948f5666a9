//! Bind-mount specifications scoped to services and apps.

use tracing::warn;

/// Matches any service or app.
pub const WILDCARD: &str = "*";

const MODES: &[&str] = &["ro", "rw"];

/// A bind mount and the (service, app) pair it applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountSpec {
    pub host_path: String,
    pub container_path: String,
    pub service: String,
    pub app: String,
    /// Compose access mode (`ro` or `rw`), if given.
    pub mode: Option<String>,
}

impl MountSpec {
    /// Mount applying to every service and app.
    pub fn new(host_path: impl Into<String>, container_path: impl Into<String>) -> Self {
        Self {
            host_path: host_path.into(),
            container_path: container_path.into(),
            service: WILDCARD.to_string(),
            app: WILDCARD.to_string(),
            mode: None,
        }
    }

    pub fn for_service(mut self, service: impl Into<String>) -> Self {
        self.service = service.into();
        self
    }

    pub fn for_app(mut self, app: impl Into<String>) -> Self {
        self.app = app.into();
        self
    }

    pub fn with_mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = Some(mode.into());
        self
    }

    /// Parse `host:container`, `service:host:container` or
    /// `service:app:host:container`, optionally followed by `:ro` or `:rw`.
    ///
    /// Service and app names never look like paths, so `/src:/openedx:ro`
    /// is a read-only mount for every service.
    pub fn parse(spec: &str) -> Option<Self> {
        let mut parts: Vec<&str> = spec.trim().split(':').collect();
        if parts.iter().any(|p| p.is_empty()) {
            return None;
        }
        let mode = if parts.len() > 2 && MODES.contains(&parts[parts.len() - 1]) {
            parts.pop()
        } else {
            None
        };

        let parsed = match parts.as_slice() {
            [host, container] => Self::new(*host, *container),
            [service, host, container] if !looks_like_path(service) => {
                Self::new(*host, *container).for_service(*service)
            }
            [service, app, host, container]
                if !looks_like_path(service) && !looks_like_path(app) =>
            {
                Self::new(*host, *container)
                    .for_service(*service)
                    .for_app(*app)
            }
            _ => return None,
        };
        Some(match mode {
            Some(mode) => parsed.with_mode(mode),
            None => parsed,
        })
    }

    /// Whether this mount applies to the given service and app.
    pub fn matches(&self, service: &str, app: &str) -> bool {
        (self.service == WILDCARD || self.service == service)
            && (self.app == WILDCARD || self.app == app)
    }

    /// `host:container[:mode]` form used in Compose volume lists.
    pub fn mount_string(&self) -> String {
        match &self.mode {
            Some(mode) => format!("{}:{}:{}", self.host_path, self.container_path, mode),
            None => format!("{}:{}", self.host_path, self.container_path),
        }
    }
}

fn looks_like_path(segment: &str) -> bool {
    segment.starts_with(['/', '.', '~'])
}

/// Parse mount strings, skipping entries that cannot be parsed.
pub fn parse_mounts<S: AsRef<str>>(entries: &[S]) -> Vec<MountSpec> {
    entries
        .iter()
        .filter_map(|entry| {
            let entry = entry.as_ref();
            let parsed = MountSpec::parse(entry);
            if parsed.is_none() {
                warn!("Ignoring invalid mount specification: {}", entry);
            }
            parsed
        })
        .collect()
}

/// Mount strings applicable to `(service, app)`, in input order.
pub fn iter_mounts<'a>(
    specs: &'a [MountSpec],
    service: &'a str,
    app: &'a str,
) -> impl Iterator<Item = String> + 'a {
    specs
        .iter()
        .filter(move |spec| spec.matches(service, app))
        .map(MountSpec::mount_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_forms() {
        assert_eq!(
            MountSpec::parse("/src/edx-platform:/openedx/edx-platform"),
            Some(MountSpec::new("/src/edx-platform", "/openedx/edx-platform"))
        );
        let spec = MountSpec::parse("lms:/a:/b").unwrap();
        assert_eq!((spec.service.as_str(), spec.app.as_str()), ("lms", WILDCARD));
        let spec = MountSpec::parse("cms:openedx:/a:/b").unwrap();
        assert_eq!((spec.service.as_str(), spec.app.as_str()), ("cms", "openedx"));
        assert_eq!(MountSpec::parse("/only-host"), None);
        assert_eq!(MountSpec::parse("a::b"), None);
        assert_eq!(MountSpec::parse("a:b:c:d:e"), None);
    }

    #[test]
    fn test_parse_access_mode() {
        let spec = MountSpec::parse("/host:/container:ro").unwrap();
        assert_eq!(spec, MountSpec::new("/host", "/container").with_mode("ro"));
        assert_eq!(spec.mount_string(), "/host:/container:ro");

        let spec = MountSpec::parse("lms:openedx:/a:/b:rw").unwrap();
        assert_eq!((spec.service.as_str(), spec.app.as_str()), ("lms", "openedx"));
        assert_eq!(spec.mount_string(), "/a:/b:rw");
    }

    #[test]
    fn test_paths_are_not_service_names() {
        assert_eq!(MountSpec::parse("/a:/b:/c"), None);
        assert_eq!(MountSpec::parse("./src:/a:/b"), None);
        assert_eq!(MountSpec::parse("lms:~/src:/a:/b"), None);
    }

    #[test]
    fn test_iter_mounts_filters_and_keeps_order() {
        let specs = vec![
            MountSpec::new("/h1", "/c1").for_service("lms").for_app("openedx"),
            MountSpec::new("/h2", "/c2").for_service("cms").for_app("openedx"),
            MountSpec::new("/h3", "/c3"),
            MountSpec::new("/h4", "/c4").for_service("lms").for_app("mfe"),
            MountSpec::new("/h5", "/c5").for_service("lms"),
        ];
        let mounts: Vec<String> = iter_mounts(&specs, "lms", "openedx").collect();
        assert_eq!(mounts, vec!["/h1:/c1", "/h3:/c3", "/h5:/c5"]);
    }

    #[test]
    fn test_iter_mounts_empty() {
        assert_eq!(iter_mounts(&[], "lms", "openedx").count(), 0);
    }

    #[test]
    fn test_parse_mounts_skips_invalid() {
        let specs = parse_mounts(&["lms:/a:/b", "bogus", "/c:/d"]);
        assert_eq!(specs.len(), 2);
    }
}
