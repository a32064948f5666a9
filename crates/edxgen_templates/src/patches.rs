//! Named patch slots filled by plugins.
//!
//! Templates splice registered fragments with `{{ patch("slot-name") }}`.
//! Slots never need to be declared: rendering a slot nobody registered for
//! yields an empty string.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

/// Source of patch fragments consumed by the renderer.
#[cfg_attr(test, mockall::automock)]
pub trait PatchSource {
    /// Fragments registered for `slot`, in render order.
    fn fragments(&self, slot: &str) -> Vec<String>;

    /// Fragments of `slot` joined with newlines.
    fn render_slot(&self, slot: &str) -> String {
        self.fragments(slot).join("\n")
    }
}

/// Patch source shared with the template environment.
pub type SharedPatchSource = Arc<dyn PatchSource + Send + Sync>;

#[derive(Debug, Clone)]
struct Fragment {
    priority: i32,
    text: String,
}

/// In-memory patch registry.
///
/// Fragments render by ascending priority; fragments with equal priority
/// keep their registration order.
#[derive(Debug, Clone, Default)]
pub struct PatchRegistry {
    slots: BTreeMap<String, Vec<Fragment>>,
}

impl PatchRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fragment to a slot with the default priority (0).
    pub fn register(&mut self, slot: impl Into<String>, text: impl Into<String>) {
        self.register_with_priority(slot, text, 0);
    }

    /// Append a fragment to a slot with an explicit priority.
    pub fn register_with_priority(
        &mut self,
        slot: impl Into<String>,
        text: impl Into<String>,
        priority: i32,
    ) {
        let slot = slot.into();
        debug!("Registering patch for slot {} (priority {})", slot, priority);
        self.slots.entry(slot).or_default().push(Fragment {
            priority,
            text: text.into(),
        });
    }

    /// Slot names with their fragment counts, sorted by name.
    pub fn slots(&self) -> Vec<(&str, usize)> {
        self.slots
            .iter()
            .map(|(name, fragments)| (name.as_str(), fragments.len()))
            .collect()
    }

    /// Total number of registered fragments.
    pub fn len(&self) -> usize {
        self.slots.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl PatchSource for PatchRegistry {
    fn fragments(&self, slot: &str) -> Vec<String> {
        let Some(fragments) = self.slots.get(slot) else {
            return Vec::new();
        };
        let mut ordered: Vec<&Fragment> = fragments.iter().collect();
        // stable sort keeps registration order within a priority
        ordered.sort_by_key(|f| f.priority);
        ordered.into_iter().map(|f| f.text.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_slot_is_empty() {
        let registry = PatchRegistry::new();
        assert_eq!(registry.render_slot("openedx-lms-common-settings"), "");
        assert!(registry.fragments("anything").is_empty());
    }

    #[test]
    fn test_registration_order() {
        let mut registry = PatchRegistry::new();
        registry.register("caddyfile", "f1");
        registry.register("caddyfile", "f2");
        assert_eq!(registry.render_slot("caddyfile"), "f1\nf2");
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_priority_order() {
        let mut registry = PatchRegistry::new();
        registry.register_with_priority("slot", "late", 10);
        registry.register("slot", "first-default");
        registry.register_with_priority("slot", "early", -5);
        registry.register("slot", "second-default");
        assert_eq!(
            registry.fragments("slot"),
            vec!["early", "first-default", "second-default", "late"]
        );
    }

    #[test]
    fn test_slots_listing() {
        let mut registry = PatchRegistry::new();
        registry.register("b", "x");
        registry.register("a", "y");
        registry.register("b", "z");
        assert_eq!(registry.slots(), vec![("a", 1), ("b", 2)]);
    }
}
