//! Node creation and foreign-session lifecycle.
//!
//! The host pushes foreign modules in with [`register_foreign_module`],
//! pulls them out with [`unregister_foreign_module`], and calls
//! [`teardown`] when its foreign session ends. The free functions act on
//! the process-wide [`ImportResolver::global`]; the `Registry` methods are
//! the same operations on an explicit registry.

use super::importer::ForeignImporter;
use super::node::NamespaceNode;
use super::registry::Registry;
use super::resolver::ImportResolver;
use crate::enquirer::EnquirerRef;
use crate::error::{ImportError, ImportResult};
use crate::foreign::ForeignRef;
use std::sync::{Arc, Weak};

// =============================================================================
// Node Construction
// =============================================================================

impl Registry {
    /// Create and register a bridge-only node with no loader.
    pub fn make_module(
        self: &Arc<Self>,
        fqn: &str,
        enquirer: Option<EnquirerRef>,
    ) -> Arc<NamespaceNode> {
        self.make_loaded_module(fqn, Weak::new(), enquirer)
    }

    /// Create and register a bridge-only node owned by `loader`.
    pub fn make_loaded_module(
        self: &Arc<Self>,
        fqn: &str,
        loader: Weak<ForeignImporter>,
        enquirer: Option<EnquirerRef>,
    ) -> Arc<NamespaceNode> {
        let node = Arc::new(NamespaceNode::bridge(
            fqn,
            Arc::downgrade(self),
            loader,
            enquirer,
        ));
        self.put(fqn, Arc::clone(&node));
        node
    }

    /// Create and register a foreign-backed node with no loader or enquirer.
    pub fn make_foreign_module(
        self: &Arc<Self>,
        fqn: &str,
        handle: ForeignRef,
    ) -> Arc<NamespaceNode> {
        let node = Arc::new(NamespaceNode::foreign_backed(
            fqn,
            Arc::downgrade(self),
            handle,
        ));
        self.put(fqn, Arc::clone(&node));
        node
    }

    /// Attach a loader and enquirer to `node` and (re-)register it under its
    /// own name.
    pub fn patch_foreign_module(
        &self,
        node: &Arc<NamespaceNode>,
        loader: Weak<ForeignImporter>,
        enquirer: Option<EnquirerRef>,
    ) -> Arc<NamespaceNode> {
        node.patch(loader, enquirer);
        self.put(node.name(), Arc::clone(node));
        Arc::clone(node)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Register a foreign module pushed in by the host, bypassing the import
    /// hook. Overwrites any existing entry.
    pub fn register_foreign_module(
        self: &Arc<Self>,
        fqn: &str,
        handle: ForeignRef,
    ) -> ImportResult<Arc<NamespaceNode>> {
        if super::dotted::DottedName::parse(fqn).is_none() {
            return Err(ImportError::InvalidName(Arc::from(fqn)));
        }
        tracing::debug!(module = fqn, "register foreign module");
        Ok(self.make_foreign_module(fqn, handle))
    }

    /// Remove a registered module.
    ///
    /// Fails with [`ImportError::NotRegistered`] if `fqn` is absent.
    pub fn unregister_foreign_module(&self, fqn: &str) -> ImportResult<Arc<NamespaceNode>> {
        tracing::debug!(module = fqn, "unregister foreign module");
        self.remove(fqn)
            .ok_or_else(|| ImportError::NotRegistered(Arc::from(fqn)))
    }
}

// =============================================================================
// Process-wide Surface
// =============================================================================

/// Install the foreign import hook on the global resolver.
///
/// Idempotent; returns `true` only when a new hook was installed.
pub fn setup_importer(enquirer: Option<EnquirerRef>) -> ImportResult<bool> {
    ImportResolver::global().setup_importer(enquirer)
}

/// Register a host-provided foreign module in the global registry.
pub fn register_foreign_module(fqn: &str, handle: ForeignRef) -> ImportResult<Arc<NamespaceNode>> {
    ImportResolver::global()
        .registry()
        .register_foreign_module(fqn, handle)
}

/// Remove a module from the global registry.
pub fn unregister_foreign_module(fqn: &str) -> ImportResult<Arc<NamespaceNode>> {
    ImportResolver::global()
        .registry()
        .unregister_foreign_module(fqn)
}

/// Drop every foreign-backed node from the global registry.
pub fn teardown() -> usize {
    ImportResolver::global().registry().teardown()
}

// =============================================================================
// Tests
// =============================================================================
