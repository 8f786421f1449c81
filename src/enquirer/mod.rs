//! Foreign namespace introspection.
//!
//! The bridge asks an [`Enquirer`] which dotted names are foreign packages,
//! which sub-packages and classes they contain, and (if the enquirer has
//! the capability) which names are loadable foreign modules. Terminal class
//! lookups go through a [`ClassResolver`].
//!
//! Both collaborators have a process-wide default, used when an importer is
//! built without an explicit one.

pub mod class_list;

pub use class_list::ClassList;

use crate::foreign::{ForeignError, ForeignRef};
use crate::value::ClassHandle;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

// =============================================================================
// Enquirer Contract
// =============================================================================

/// Enumerates the foreign namespace.
pub trait Enquirer: Send + Sync {
    /// Whether `fqn` names a foreign package.
    fn is_foreign_package(&self, fqn: &str) -> bool;

    /// Immediate sub-package names (last segment only) under `fqn`.
    fn get_sub_packages(&self, fqn: &str) -> Option<Vec<Arc<str>>>;

    /// Fully-qualified names of the classes directly inside `fqn`.
    fn get_class_names(&self, fqn: &str) -> Option<Vec<Arc<str>>>;

    /// Foreign-module capability. Enquirers that cannot load modules keep
    /// the default, which makes every module query answer "no".
    fn modules(&self) -> Option<&dyn ModuleEnquirer> {
        None
    }
}

/// Optional capability: loading whole foreign modules.
pub trait ModuleEnquirer: Send + Sync {
    /// Whether `fqn` names a loadable foreign module.
    fn is_foreign_module(&self, fqn: &str) -> bool;

    /// Load the foreign module.
    ///
    /// The foreign side may register the module itself while loading (and
    /// may call back into the bridge to do so).
    fn load_foreign_module(&self, fqn: &str) -> Result<ForeignRef, ForeignError>;
}

/// Shared enquirer handle.
pub type EnquirerRef = Arc<dyn Enquirer>;

impl fmt::Debug for dyn Enquirer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Enquirer")
            .field("modules", &self.modules().is_some())
            .finish()
    }
}

/// Module query that tolerates enquirers without the module capability.
#[inline]
pub fn is_foreign_module(enquirer: &dyn Enquirer, fqn: &str) -> bool {
    enquirer
        .modules()
        .is_some_and(|modules| modules.is_foreign_module(fqn))
}

// =============================================================================
// Class Resolution
// =============================================================================

/// Resolves fully-qualified class names to class handles.
pub trait ClassResolver: Send + Sync {
    /// `Ok(None)` when no such class exists on the foreign side.
    fn resolve_class(&self, fqn: &str) -> Result<Option<ClassHandle>, ForeignError>;
}

impl<F> ClassResolver for F
where
    F: Fn(&str) -> Result<Option<ClassHandle>, ForeignError> + Send + Sync,
{
    fn resolve_class(&self, fqn: &str) -> Result<Option<ClassHandle>, ForeignError> {
        self(fqn)
    }
}

/// Shared class resolver handle.
pub type ClassResolverRef = Arc<dyn ClassResolver>;

// =============================================================================
// Process-wide Defaults
// =============================================================================

static DEFAULT_ENQUIRER: RwLock<Option<EnquirerRef>> = RwLock::new(None);
static DEFAULT_CLASS_RESOLVER: RwLock<Option<ClassResolverRef>> = RwLock::new(None);

/// Install the process-wide enquirer. Returns the previous one.
pub fn set_default_enquirer(enquirer: EnquirerRef) -> Option<EnquirerRef> {
    DEFAULT_ENQUIRER.write().replace(enquirer)
}

/// The process-wide enquirer, if one is installed.
pub fn default_enquirer() -> Option<EnquirerRef> {
    DEFAULT_ENQUIRER.read().clone()
}

/// Install the process-wide class resolver. Returns the previous one.
pub fn set_default_class_resolver(resolver: ClassResolverRef) -> Option<ClassResolverRef> {
    DEFAULT_CLASS_RESOLVER.write().replace(resolver)
}

/// The process-wide class resolver, if one is installed.
pub fn default_class_resolver() -> Option<ClassResolverRef> {
    DEFAULT_CLASS_RESOLVER.read().clone()
}

// =============================================================================
// Tests
// =============================================================================
