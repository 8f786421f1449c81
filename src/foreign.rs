//! Opaque handles to objects owned by the foreign (host) runtime.
//!
//! The bridge never looks inside a foreign object. It only asks it for
//! attributes, calls it, and tests its truthiness.

use crate::value::Value;
use std::fmt;
use std::sync::Arc;

// =============================================================================
// Foreign Errors
// =============================================================================

/// An exception raised on the foreign side.
///
/// Carried through the bridge unchanged so the foreign traceback stays
/// visible to the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ForeignError {
    /// Foreign exception type (e.g., "java.lang.IllegalStateException").
    kind: Arc<str>,
    /// Exception message.
    message: Arc<str>,
    /// Foreign stack frames, innermost last.
    traceback: Vec<Arc<str>>,
}

impl ForeignError {
    /// Create a foreign error with an empty traceback.
    pub fn new(kind: impl Into<Arc<str>>, message: impl Into<Arc<str>>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            traceback: Vec::new(),
        }
    }

    /// Append a foreign stack frame.
    pub fn with_frame(mut self, frame: impl Into<Arc<str>>) -> Self {
        self.traceback.push(frame.into());
        self
    }

    #[inline]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[inline]
    pub fn traceback(&self) -> &[Arc<str>] {
        &self.traceback
    }
}

// =============================================================================
// Foreign Objects
// =============================================================================

/// An object living in the foreign runtime.
///
/// Foreign module handles, class objects, and plain foreign values all
/// implement this trait.
pub trait ForeignObject: Send + Sync {
    /// Foreign type name, used in diagnostics.
    fn type_name(&self) -> &str;

    /// Look up an attribute.
    ///
    /// `Ok(None)` means the attribute does not exist. `Err` means the
    /// foreign side raised while looking it up.
    fn get_attr(&self, name: &str) -> Result<Option<Value>, ForeignError>;

    /// Call the object with positional arguments.
    fn call(&self, args: &[Value]) -> Result<Value, ForeignError> {
        let _ = args;
        Err(ForeignError::new(
            "TypeError",
            format!("'{}' object is not callable", self.type_name()),
        ))
    }

    /// Truthiness as the scripting runtime sees it.
    fn is_truthy(&self) -> bool {
        true
    }
}

/// Shared handle to a foreign object.
pub type ForeignRef = Arc<dyn ForeignObject>;

impl fmt::Debug for dyn ForeignObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<foreign {}>", self.type_name())
    }
}

/// Identity comparison of two foreign handles (data pointer only).
#[inline]
pub fn same_object(a: &ForeignRef, b: &ForeignRef) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

// =============================================================================
// Tests
// =============================================================================
