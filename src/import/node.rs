//! `NamespaceNode` - the emulated package/module object.
//!
//! A node is either bridge-only (no foreign handle; exists so dotted access
//! can continue) or foreign-backed (wraps a materialized foreign module).
//! Unknown attributes are resolved lazily through [`Strategy::CHAIN`] and
//! memoized in the node's cache.
//!
//! Nodes never hold strong references to each other. A sub-namespace in the
//! cache is stored by FQN and re-fetched from the registry on access.
//!
//! [`Strategy::CHAIN`]: super::chain::Strategy::CHAIN

use super::chain;
use super::importer::ForeignImporter;
use super::registry::Registry;
use crate::config::BridgeConfig;
use crate::enquirer::EnquirerRef;
use crate::error::{ImportError, ImportResult};
use crate::foreign::ForeignRef;
use crate::value::Value;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::{Arc, Weak};

/// Module metadata every node answers for itself.
const METADATA_ATTRS: [&str; 5] = ["__name__", "__file__", "__path__", "__package__", "__loader__"];

/// Cached attribute.
#[derive(Clone)]
pub(crate) enum CacheEntry {
    Value(Value),
    /// Sub-namespace, looked up by FQN in the registry.
    Submodule(Arc<str>),
}

// =============================================================================
// NamespaceNode
// =============================================================================

/// A lazily-resolving module object.
pub struct NamespaceNode {
    /// Fully-qualified name (e.g., "java.util").
    name: Arc<str>,

    /// Foreign module handle; `None` for bridge-only nodes.
    foreign: Option<ForeignRef>,

    /// Registry the node lives in.
    registry: Weak<Registry>,

    /// Enquirer used for unknown attributes. Absent on freshly registered
    /// foreign modules until they are patched.
    enquirer: RwLock<Option<EnquirerRef>>,

    /// Importer that created or patched the node.
    loader: RwLock<Weak<ForeignImporter>>,

    /// Resolved attributes by short name.
    cache: RwLock<FxHashMap<Arc<str>, CacheEntry>>,
}

impl NamespaceNode {
    /// Create a bridge-only node.
    pub(crate) fn bridge(
        name: impl Into<Arc<str>>,
        registry: Weak<Registry>,
        loader: Weak<ForeignImporter>,
        enquirer: Option<EnquirerRef>,
    ) -> Self {
        Self {
            name: name.into(),
            foreign: None,
            registry,
            enquirer: RwLock::new(enquirer),
            loader: RwLock::new(loader),
            cache: RwLock::new(FxHashMap::default()),
        }
    }

    /// Create a foreign-backed node with no enquirer and no loader.
    ///
    /// Module metadata is bound up front so it shadows whatever the foreign
    /// handle reports for the same names.
    pub(crate) fn foreign_backed(
        name: impl Into<Arc<str>>,
        registry: Weak<Registry>,
        handle: ForeignRef,
    ) -> Self {
        let node = Self {
            name: name.into(),
            foreign: Some(handle),
            registry,
            enquirer: RwLock::new(None),
            loader: RwLock::new(Weak::new()),
            cache: RwLock::new(FxHashMap::default()),
        };
        {
            let mut cache = node.cache.write();
            for attr in METADATA_ATTRS {
                if let Some(value) = node.builtin_attr(attr) {
                    cache.insert(Arc::from(attr), CacheEntry::Value(value));
                }
            }
        }
        node
    }

    /// Re-point the loader and enquirer.
    pub(crate) fn patch(&self, loader: Weak<ForeignImporter>, enquirer: Option<EnquirerRef>) {
        *self.loader.write() = loader;
        *self.enquirer.write() = enquirer;
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Get the fully-qualified name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The foreign module handle, if any.
    #[inline]
    pub fn foreign(&self) -> Option<&ForeignRef> {
        self.foreign.as_ref()
    }

    #[inline]
    pub fn is_foreign_backed(&self) -> bool {
        self.foreign.is_some()
    }

    #[inline]
    pub fn enquirer(&self) -> Option<EnquirerRef> {
        self.enquirer.read().clone()
    }

    #[inline]
    pub fn loader(&self) -> Option<Arc<ForeignImporter>> {
        self.loader.read().upgrade()
    }

    #[inline]
    pub(crate) fn loader_weak(&self) -> Weak<ForeignImporter> {
        self.loader.read().clone()
    }

    #[inline]
    pub fn registry(&self) -> Option<Arc<Registry>> {
        self.registry.upgrade()
    }

    /// Configuration of the loader, or the defaults when detached.
    pub fn config(&self) -> Arc<BridgeConfig> {
        self.loader()
            .map(|loader| loader.config())
            .unwrap_or_else(BridgeConfig::shared_default)
    }

    // =========================================================================
    // Attribute Protocol
    // =========================================================================

    /// Resolve an attribute, materializing it on first access.
    #[inline]
    pub fn get_attr(&self, name: &str) -> ImportResult<Value> {
        chain::resolve_attribute(self, name)
    }

    /// `hasattr` semantics: not-found is `false`, other failures propagate.
    pub fn has_attr(&self, name: &str) -> ImportResult<bool> {
        match self.get_attr(name) {
            Ok(_) => Ok(true),
            Err(err) if err.is_not_found() => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Bind an attribute directly.
    ///
    /// Module values are bound by name and re-fetched from the registry.
    pub fn set_attr(&self, name: &str, value: Value) {
        let entry = match value {
            Value::Module(node) => CacheEntry::Submodule(Arc::clone(&node.name)),
            other => CacheEntry::Value(other),
        };
        self.cache.write().insert(Arc::from(name), entry);
    }

    /// Unbind an attribute. Returns `true` if it was bound.
    pub fn del_attr(&self, name: &str) -> bool {
        self.cache.write().remove(name).is_some()
    }

    /// Whether `name` is already resolved.
    #[inline]
    pub fn is_cached(&self, name: &str) -> bool {
        self.cache.read().contains_key(name)
    }

    /// Names resolved so far, sorted.
    pub fn cached_names(&self) -> Vec<Arc<str>> {
        let mut names: Vec<Arc<str>> = self.cache.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Exported names: sub-packages, then simple class names.
    ///
    /// No deduplication; a name reported as both appears twice.
    pub fn list_names(&self) -> Vec<Arc<str>> {
        let Some(enquirer) = self.enquirer() else {
            return Vec::new();
        };

        let mut names = enquirer.get_sub_packages(&self.name).unwrap_or_default();
        if let Some(classes) = enquirer.get_class_names(&self.name) {
            names.extend(classes.iter().map(|class| match class.rsplit_once('.') {
                Some((_, simple)) => Arc::from(simple),
                None => Arc::clone(class),
            }));
        }
        names
    }

    /// `dir(module)`.
    #[inline]
    pub fn dir(&self) -> Vec<Arc<str>> {
        self.list_names()
    }

    /// Call the foreign handle.
    pub fn invoke(&self, args: &[Value]) -> ImportResult<Value> {
        let handle = self
            .foreign
            .as_ref()
            .ok_or_else(|| ImportError::NotCallable(Arc::clone(&self.name)))?;
        Ok(handle.call(args)?)
    }

    // =========================================================================
    // Cache
    // =========================================================================

    /// Cached value, with sub-namespaces re-fetched from the registry.
    ///
    /// A sub-namespace that has left the registry is evicted.
    pub(crate) fn cache_lookup(&self, name: &str) -> Option<Value> {
        let entry = self.cache.read().get(name).cloned()?;
        match entry {
            CacheEntry::Value(value) => Some(value),
            CacheEntry::Submodule(fqn) => {
                if let Some(node) = self.registry().and_then(|r| r.get(&fqn)) {
                    return Some(Value::Module(node));
                }
                let mut cache = self.cache.write();
                if matches!(cache.get(name), Some(CacheEntry::Submodule(f)) if *f == fqn) {
                    cache.remove(name);
                }
                tracing::trace!(module = %self.name, attr = name, "evicted stale submodule");
                None
            }
        }
    }

    pub(crate) fn cache_value(&self, name: &str, value: Value) {
        self.set_attr(name, value);
    }

    pub(crate) fn cache_submodule(&self, name: &str, fqn: &str) {
        self.cache
            .write()
            .insert(Arc::from(name), CacheEntry::Submodule(Arc::from(fqn)));
    }

    /// Built-in module metadata. Served lazily on bridge-only nodes and
    /// bound at construction on foreign-backed ones.
    pub(crate) fn builtin_attr(&self, name: &str) -> Option<Value> {
        match name {
            "__name__" => Some(Value::Str(Arc::clone(&self.name))),
            "__file__" => Some(Value::Str(Arc::clone(&self.config().file_marker))),
            "__path__" => Some(Value::list([])),
            "__package__" | "__loader__" => Some(Value::None),
            _ => None,
        }
    }
}

impl fmt::Debug for NamespaceNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamespaceNode")
            .field("name", &self.name)
            .field("foreign", &self.foreign)
            .field("cached", &self.cache.read().len())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
