//! The namespace registry: FQN → namespace node.
//!
//! This is the bridge's `sys.modules`. Importing the same name twice must
//! return the same node, so entries are only dropped by explicit removal or
//! by [`Registry::teardown`].

use super::node::NamespaceNode;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::sync::{Arc, OnceLock};

// =============================================================================
// Registry
// =============================================================================

/// Process-wide mapping from fully-qualified name to namespace node.
///
/// Locks are held only for the map operation itself, never across a call
/// into foreign code.
#[derive(Debug, Default)]
pub struct Registry {
    modules: RwLock<FxHashMap<Arc<str>, Arc<NamespaceNode>>>,
}

impl Registry {
    /// Create an empty, isolated registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry.
    pub fn global() -> &'static Arc<Registry> {
        GLOBAL_REGISTRY.get_or_init(|| Arc::new(Registry::new()))
    }

    /// Look up a node.
    #[inline]
    pub fn get(&self, fqn: &str) -> Option<Arc<NamespaceNode>> {
        self.modules.read().get(fqn).cloned()
    }

    /// Insert or overwrite an entry. Returns the displaced node.
    pub fn put(&self, fqn: &str, node: Arc<NamespaceNode>) -> Option<Arc<NamespaceNode>> {
        tracing::trace!(module = fqn, foreign = node.is_foreign_backed(), "registry put");
        self.modules.write().insert(Arc::from(fqn), node)
    }

    /// Remove an entry.
    pub fn remove(&self, fqn: &str) -> Option<Arc<NamespaceNode>> {
        let removed = self.modules.write().remove(fqn);
        if removed.is_some() {
            tracing::trace!(module = fqn, "registry remove");
        }
        removed
    }

    #[inline]
    pub fn contains(&self, fqn: &str) -> bool {
        self.modules.read().contains_key(fqn)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.modules.read().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.modules.read().is_empty()
    }

    /// All registered names, sorted.
    pub fn names(&self) -> Vec<Arc<str>> {
        let mut names: Vec<Arc<str>> = self.modules.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Drop every foreign-backed node, keeping bridge-only placeholders.
    ///
    /// Foreign handles die with the foreign session; bridge-only nodes stay
    /// valid for the life of the process. Returns the number removed.
    pub fn teardown(&self) -> usize {
        let mut modules = self.modules.write();
        let before = modules.len();
        modules.retain(|_, node| !node.is_foreign_backed());
        let removed = before - modules.len();
        drop(modules);

        tracing::debug!(removed, "registry teardown");
        removed
    }
}

static GLOBAL_REGISTRY: OnceLock<Arc<Registry>> = OnceLock::new();

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foreign::{ForeignError, ForeignObject};
    use crate::value::Value;

    struct Handle;

    impl ForeignObject for Handle {
        fn type_name(&self) -> &str {
            "Handle"
        }

        fn get_attr(&self, _name: &str) -> Result<Option<Value>, ForeignError> {
            Ok(None)
        }
    }

    #[test]
    fn test_registry_starts_empty() {
        let registry = Registry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
        assert!(registry.get("a").is_none());
    }

    #[test]
    fn test_put_get_remove() {
        let registry = Arc::new(Registry::new());
        let node = registry.make_module("a", None);
        assert!(registry.contains("a"));
        assert!(Arc::ptr_eq(&registry.get("a").unwrap(), &node));

        let removed = registry.remove("a").unwrap();
        assert!(Arc::ptr_eq(&removed, &node));
        assert!(!registry.contains("a"));
        assert!(registry.remove("a").is_none());
    }

    #[test]
    fn test_put_overwrites() {
        let registry = Arc::new(Registry::new());
        let first = registry.make_module("a", None);
        let second = registry.make_module("a", None);
        assert!(!Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&registry.get("a").unwrap(), &second));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_names_sorted() {
        let registry = Arc::new(Registry::new());
        registry.make_module("b", None);
        registry.make_module("a.x", None);
        registry.make_module("a", None);
        let names = registry.names();
        let names: Vec<&str> = names.iter().map(|n| n.as_ref()).collect();
        assert_eq!(names, vec!["a", "a.x", "b"]);
    }

    #[test]
    fn test_teardown_selectivity() {
        let registry = Arc::new(Registry::new());
        registry.make_module("A", None);
        registry.make_foreign_module("B", Arc::new(Handle));
        registry.make_foreign_module("C", Arc::new(Handle));

        assert_eq!(registry.teardown(), 2);
        assert!(registry.get("A").is_some());
        assert!(registry.get("B").is_none());
        assert!(registry.get("C").is_none());
    }

    #[test]
    fn test_teardown_on_empty_registry() {
        let registry = Registry::new();
        assert_eq!(registry.teardown(), 0);
    }

    #[test]
    fn test_global_registry_is_shared() {
        assert!(Arc::ptr_eq(Registry::global(), Registry::global()));
    }
}
