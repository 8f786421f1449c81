//! Errors surfaced by the import bridge.

use crate::foreign::ForeignError;
use std::sync::Arc;

/// Import and attribute-resolution errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ImportError {
    /// Attribute does not exist anywhere in the fallback chain.
    ///
    /// This is the host's "attribute missing" signal, so generic
    /// introspection (`hasattr`, `getattr` with a default) keeps working.
    #[error("module '{module}' has no attribute '{name}'")]
    AttributeNotFound { module: Arc<str>, name: Arc<str> },

    /// No finder on the meta path claimed the module.
    #[error("No module named '{0}'")]
    ModuleNotFound(Arc<str>),

    /// The foreign side raised. Passed through unchanged.
    #[error(transparent)]
    Foreign(#[from] ForeignError),

    /// Unregistering a module that is not in the registry.
    #[error("module '{0}' is not registered")]
    NotRegistered(Arc<str>),

    /// Calling a node that has no foreign handle.
    #[error("module '{0}' is not callable")]
    NotCallable(Arc<str>),

    /// Malformed dotted name.
    #[error("invalid module name '{0}'")]
    InvalidName(Arc<str>),

    /// No enquirer supplied and no process-wide default installed.
    #[error("no class enquirer supplied and no default enquirer installed")]
    NoEnquirer,
}

impl ImportError {
    /// Shorthand for [`ImportError::AttributeNotFound`].
    #[inline]
    pub fn attribute(module: &str, name: &str) -> Self {
        ImportError::AttributeNotFound {
            module: Arc::from(module),
            name: Arc::from(name),
        }
    }

    /// Whether this error belongs to the not-found class.
    ///
    /// Only not-found errors let the resolution chain continue; everything
    /// else aborts it.
    #[inline]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ImportError::AttributeNotFound { .. } | ImportError::ModuleNotFound(_)
        )
    }
}

/// Result type for import operations.
pub type ImportResult<T> = Result<T, ImportError>;
