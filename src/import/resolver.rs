//! `ImportResolver` - the host side of the import protocol.
//!
//! Owns the registry handle and the meta path. `import_module` checks the
//! registry first, imports parents before children, and asks each finder on
//! the meta path in order.

use super::dotted::{DottedName, child_name, leaf_name, parent_package};
use super::importer::{ForeignImporter, MetaPathFinder};
use super::node::NamespaceNode;
use super::registry::Registry;
use crate::enquirer::EnquirerRef;
use crate::error::{ImportError, ImportResult};
use crate::value::Value;
use parking_lot::RwLock;
use std::sync::{Arc, OnceLock};

/// Module cache plus meta path.
#[derive(Default)]
pub struct ImportResolver {
    registry: Arc<Registry>,
    meta_path: RwLock<Vec<Arc<dyn MetaPathFinder>>>,
}

impl ImportResolver {
    /// Create a resolver over a fresh, isolated registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a resolver over an existing registry.
    pub fn with_registry(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            meta_path: RwLock::new(Vec::new()),
        }
    }

    /// The process-wide resolver, backed by [`Registry::global`].
    pub fn global() -> &'static ImportResolver {
        GLOBAL_RESOLVER
            .get_or_init(|| ImportResolver::with_registry(Arc::clone(Registry::global())))
    }

    #[inline]
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    // =========================================================================
    // Meta Path
    // =========================================================================

    /// Install the foreign import hook at the front of the meta path.
    ///
    /// Does nothing if a [`ForeignImporter`] is already installed. Returns
    /// whether a new hook was installed.
    pub fn setup_importer(&self, enquirer: Option<EnquirerRef>) -> ImportResult<bool> {
        if self.foreign_importer().is_some() {
            tracing::debug!("foreign importer already installed");
            return Ok(false);
        }

        let importer = ForeignImporter::new(Arc::clone(&self.registry), enquirer)?;
        Ok(self.install_foreign_importer(importer))
    }

    /// Install a prebuilt foreign import hook, unless one is already present.
    pub fn install_foreign_importer(&self, importer: Arc<ForeignImporter>) -> bool {
        let mut meta_path = self.meta_path.write();
        if meta_path
            .iter()
            .any(|finder| finder.as_any().is::<ForeignImporter>())
        {
            return false;
        }
        meta_path.insert(0, importer);
        tracing::debug!(finders = meta_path.len(), "foreign importer installed");
        true
    }

    /// Append a finder to the meta path.
    pub fn push_finder(&self, finder: Arc<dyn MetaPathFinder>) {
        self.meta_path.write().push(finder);
    }

    /// The installed foreign import hook, if any.
    pub fn foreign_importer(&self) -> Option<Arc<ForeignImporter>> {
        let finder = self
            .meta_path
            .read()
            .iter()
            .find(|finder| finder.as_any().is::<ForeignImporter>())
            .cloned()?;
        finder.into_any().downcast::<ForeignImporter>().ok()
    }

    /// Number of finders on the meta path.
    pub fn meta_path_len(&self) -> usize {
        self.meta_path.read().len()
    }

    // =========================================================================
    // Import Protocol
    // =========================================================================

    /// `import a.b.c` - returns the node for `a.b.c`.
    ///
    /// Parents are imported first and each child is bound on its parent.
    pub fn import_module(&self, name: &str) -> ImportResult<Arc<NamespaceNode>> {
        if let Some(node) = self.registry.get(name) {
            return Ok(node);
        }

        let dotted =
            DottedName::parse(name).ok_or_else(|| ImportError::InvalidName(Arc::from(name)))?;
        for ancestor in dotted.ancestors() {
            self.import_single(ancestor)?;
        }
        self.import_single(dotted.full_name())
    }

    /// Import one name whose parents are already imported.
    fn import_single(&self, fqn: &str) -> ImportResult<Arc<NamespaceNode>> {
        if let Some(node) = self.registry.get(fqn) {
            return Ok(node);
        }

        // Snapshot so no lock is held while finders run.
        let finders: Vec<Arc<dyn MetaPathFinder>> = self.meta_path.read().clone();
        for finder in &finders {
            if let Some(loader) = finder.find_module(fqn) {
                let node = loader.load_module(fqn)?;
                self.bind_on_parent(fqn, &node);
                return Ok(node);
            }
        }

        tracing::trace!(module = fqn, "no finder claimed module");
        Err(ImportError::ModuleNotFound(Arc::from(fqn)))
    }

    /// Bind a freshly imported child as an attribute of its parent.
    fn bind_on_parent(&self, fqn: &str, node: &Arc<NamespaceNode>) {
        if let Some(parent) = parent_package(fqn).and_then(|p| self.registry.get(p)) {
            parent.cache_submodule(leaf_name(fqn), node.name());
        }
    }

    /// `from module import name`.
    ///
    /// Falls back to importing `module.name` as a submodule.
    pub fn import_from(&self, module: &NamespaceNode, name: &str) -> ImportResult<Value> {
        match module.get_attr(name) {
            Ok(value) => Ok(value),
            Err(err) if err.is_not_found() => {
                let fqn = child_name(module.name(), name);
                match self.import_module(&fqn) {
                    Ok(node) => Ok(Value::Module(node)),
                    Err(sub) if sub.is_not_found() => Err(err),
                    Err(sub) => Err(sub),
                }
            }
            Err(err) => Err(err),
        }
    }

    /// `from module import *` - every exported name with its value.
    pub fn import_star(&self, module: &NamespaceNode) -> ImportResult<Vec<(Arc<str>, Value)>> {
        let marker = module.config().all_marker.clone();
        let exported = module.get_attr(&marker)?;
        let Some(names) = exported.as_list() else {
            return Ok(Vec::new());
        };

        let mut bindings = Vec::with_capacity(names.len());
        for name in names.iter().filter_map(Value::as_str) {
            let value = self.import_from(module, name)?;
            bindings.push((Arc::from(name), value));
        }
        Ok(bindings)
    }

    /// Insert a node directly (e.g., a natively built module).
    pub fn insert_module(&self, name: &str, module: Arc<NamespaceNode>) {
        self.registry.put(name, module);
    }

    /// Remove a node from the cache.
    pub fn remove_module(&self, name: &str) -> Option<Arc<NamespaceNode>> {
        self.registry.remove(name)
    }

    /// Names of all cached modules, sorted.
    pub fn cached_modules(&self) -> Vec<Arc<str>> {
        self.registry.names()
    }
}

static GLOBAL_RESOLVER: OnceLock<ImportResolver> = OnceLock::new();

impl std::fmt::Debug for ImportResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImportResolver")
            .field("modules", &self.registry.len())
            .field("meta_path", &self.meta_path_len())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enquirer::ClassList;
    use crate::import::ModuleLoader;
    use std::any::Any;

    fn resolver() -> ImportResolver {
        let resolver = ImportResolver::new();
        resolver
            .setup_importer(Some(Arc::new(ClassList::new([
                "java.util.ArrayList",
                "java.util.concurrent.Future",
            ]))))
            .unwrap();
        resolver
    }

    /// Finder for host-native modules under `native`.
    struct NativeFinder {
        registry: Arc<Registry>,
    }

    impl ModuleLoader for NativeFinder {
        fn load_module(&self, fqn: &str) -> ImportResult<Arc<NamespaceNode>> {
            Ok(self.registry.make_module(fqn, None))
        }
    }

    impl MetaPathFinder for NativeFinder {
        fn find_module(&self, fqn: &str) -> Option<&dyn ModuleLoader> {
            (fqn == "native" || fqn.starts_with("native.")).then_some(self as &dyn ModuleLoader)
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
            self
        }
    }

    #[test]
    fn test_setup_is_idempotent() {
        let resolver = resolver();
        assert_eq!(resolver.meta_path_len(), 1);
        let again = resolver
            .setup_importer(Some(Arc::new(ClassList::new(["x.Y"]))))
            .unwrap();
        assert!(!again);
        assert_eq!(resolver.meta_path_len(), 1);
    }

    #[test]
    fn test_foreign_importer_lookup() {
        let bare = ImportResolver::new();
        assert!(bare.foreign_importer().is_none());
        assert!(resolver().foreign_importer().is_some());
    }

    #[test]
    fn test_finder_behind_foreign_hook() {
        let resolver = resolver();
        resolver.push_finder(Arc::new(NativeFinder {
            registry: Arc::clone(resolver.registry()),
        }));
        assert_eq!(resolver.meta_path_len(), 2);
        assert!(resolver.foreign_importer().is_some());

        let native = resolver.import_module("native.io").unwrap();
        assert!(native.loader().is_none());
        assert!(resolver.registry().get("native").unwrap().is_cached("io"));

        let util = resolver.import_module("java.util").unwrap();
        assert!(util.loader().is_some());
        assert!(resolver.import_module("other").unwrap_err().is_not_found());

        // Setup still finds the hook with another finder on the path.
        assert!(!resolver.setup_importer(None).unwrap());
        assert_eq!(resolver.meta_path_len(), 2);
    }

    #[test]
    fn test_import_imports_parents() {
        let resolver = resolver();
        let node = resolver.import_module("java.util.concurrent").unwrap();
        assert_eq!(node.name(), "java.util.concurrent");
        assert!(resolver.registry().contains("java"));
        assert!(resolver.registry().contains("java.util"));
        assert!(resolver.registry().get("java.util").unwrap().is_cached("concurrent"));
    }

    #[test]
    fn test_import_unknown_module() {
        let resolver = resolver();
        let err = resolver.import_module("javax.swing").unwrap_err();
        assert_eq!(err, ImportError::ModuleNotFound(Arc::from("javax")));
    }

    #[test]
    fn test_import_invalid_name() {
        let resolver = resolver();
        assert!(matches!(
            resolver.import_module("java..util"),
            Err(ImportError::InvalidName(_))
        ));
    }

    #[test]
    fn test_import_without_hook() {
        let resolver = ImportResolver::new();
        assert!(resolver.import_module("java").unwrap_err().is_not_found());
    }

    #[test]
    fn test_insert_and_remove_module() {
        let resolver = ImportResolver::new();
        let node = resolver.registry().make_module("native.mod", None);
        resolver.insert_module("alias", Arc::clone(&node));
        assert!(Arc::ptr_eq(&resolver.import_module("alias").unwrap(), &node));
        assert!(resolver.remove_module("alias").is_some());
        let cached = resolver.cached_modules();
        assert_eq!(cached.len(), 1);
        assert_eq!(cached[0].as_ref(), "native.mod");
    }
}
