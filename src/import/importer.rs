//! The foreign import hook.
//!
//! [`ForeignImporter`] sits on the resolver's meta path. It claims names the
//! enquirer reports as foreign packages or modules and turns them into
//! registry entries:
//!
//! ```text
//! load_module("java.util")
//!   ├── registry hit            → existing node (identity-stable)
//!   ├── foreign module          → enquirer load, then patch-register
//!   └── otherwise               → fresh bridge-only node
//! ```

use super::node::NamespaceNode;
use super::registry::Registry;
use crate::config::BridgeConfig;
use crate::enquirer::{self, ClassResolverRef, EnquirerRef, default_class_resolver};
use crate::error::{ImportError, ImportResult};
use std::any::Any;
use std::fmt;
use std::sync::{Arc, Weak};

// =============================================================================
// Finder / Loader Protocol
// =============================================================================

/// Loads a module the finder claimed.
pub trait ModuleLoader: Send + Sync {
    fn load_module(&self, fqn: &str) -> ImportResult<Arc<NamespaceNode>>;
}

/// An entry on the resolver's meta path.
pub trait MetaPathFinder: Send + Sync {
    /// Claim `fqn` by returning a loader, or decline with `None`.
    fn find_module(&self, fqn: &str) -> Option<&dyn ModuleLoader>;

    /// Downcasting support, used to detect an already-installed hook.
    fn as_any(&self) -> &dyn Any;

    /// Owned downcasting support.
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

// =============================================================================
// ForeignImporter
// =============================================================================

/// Import hook that materializes foreign packages and modules.
pub struct ForeignImporter {
    /// Weak self-reference handed to nodes as their loader.
    this: Weak<ForeignImporter>,
    registry: Arc<Registry>,
    enquirer: EnquirerRef,
    classes: Option<ClassResolverRef>,
    config: Arc<BridgeConfig>,
}

impl ForeignImporter {
    /// Start building an importer.
    pub fn builder() -> ImporterBuilder {
        ImporterBuilder::default()
    }

    /// Build an importer over `registry` with default class resolution and
    /// configuration. Falls back to the process-wide enquirer.
    pub fn new(
        registry: Arc<Registry>,
        enquirer: Option<EnquirerRef>,
    ) -> ImportResult<Arc<Self>> {
        let mut builder = Self::builder();
        if let Some(enquirer) = enquirer {
            builder = builder.enquirer(enquirer);
        }
        builder.build(registry)
    }

    #[inline]
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    #[inline]
    pub fn enquirer(&self) -> &EnquirerRef {
        &self.enquirer
    }

    #[inline]
    pub fn config(&self) -> Arc<BridgeConfig> {
        Arc::clone(&self.config)
    }

    /// Class resolver: the importer's own, else the process-wide default.
    pub fn class_resolver(&self) -> Option<ClassResolverRef> {
        self.classes.clone().or_else(default_class_resolver)
    }

    /// Whether the enquirer reports `fqn` as a foreign module.
    #[inline]
    fn is_foreign_module(&self, fqn: &str) -> bool {
        enquirer::is_foreign_module(self.enquirer.as_ref(), fqn)
    }

    fn log_decision(&self, fqn: &str, decision: &str) {
        if self.config.is_verbose() {
            tracing::debug!(module = fqn, decision, "import hook");
        } else {
            tracing::trace!(module = fqn, decision, "import hook");
        }
    }
}

impl MetaPathFinder for ForeignImporter {
    fn find_module(&self, fqn: &str) -> Option<&dyn ModuleLoader> {
        if self.enquirer.is_foreign_package(fqn) || self.is_foreign_module(fqn) {
            self.log_decision(fqn, "claimed");
            Some(self)
        } else {
            self.log_decision(fqn, "declined");
            None
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

impl ModuleLoader for ForeignImporter {
    fn load_module(&self, fqn: &str) -> ImportResult<Arc<NamespaceNode>> {
        if let Some(existing) = self.registry.get(fqn) {
            self.log_decision(fqn, "cached");
            return Ok(existing);
        }

        if let Some(modules) = self.enquirer.modules().filter(|m| m.is_foreign_module(fqn)) {
            self.log_decision(fqn, "loading foreign module");
            let handle = modules.load_foreign_module(fqn)?;
            // The load may have registered the module already.
            let node = match self.registry.get(fqn) {
                Some(node) => node,
                None => self.registry.make_foreign_module(fqn, handle),
            };
            return Ok(self.registry.patch_foreign_module(
                &node,
                self.this.clone(),
                Some(Arc::clone(&self.enquirer)),
            ));
        }

        self.log_decision(fqn, "bridge package");
        Ok(self
            .registry
            .make_loaded_module(fqn, self.this.clone(), Some(Arc::clone(&self.enquirer))))
    }
}

impl fmt::Debug for ForeignImporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForeignImporter")
            .field("enquirer", &self.enquirer)
            .field("classes", &self.classes.is_some())
            .field("config", &self.config)
            .finish()
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Builder for [`ForeignImporter`].
#[derive(Default)]
pub struct ImporterBuilder {
    enquirer: Option<EnquirerRef>,
    classes: Option<ClassResolverRef>,
    config: Option<BridgeConfig>,
}

impl ImporterBuilder {
    pub fn enquirer(mut self, enquirer: EnquirerRef) -> Self {
        self.enquirer = Some(enquirer);
        self
    }

    pub fn class_resolver(mut self, classes: ClassResolverRef) -> Self {
        self.classes = Some(classes);
        self
    }

    pub fn config(mut self, config: BridgeConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Finish the importer.
    ///
    /// Without an explicit enquirer the process-wide default is used;
    /// [`ImportError::NoEnquirer`] if there is none.
    pub fn build(self, registry: Arc<Registry>) -> ImportResult<Arc<ForeignImporter>> {
        let enquirer = self
            .enquirer
            .or_else(enquirer::default_enquirer)
            .ok_or(ImportError::NoEnquirer)?;
        let config = Arc::new(self.config.unwrap_or_default());

        Ok(Arc::new_cyclic(|this| ForeignImporter {
            this: this.clone(),
            registry,
            enquirer,
            classes: self.classes,
            config,
        }))
    }
}

// =============================================================================
// Tests
// =============================================================================
