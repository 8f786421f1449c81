//! Values handed across the bridge.
//!
//! A resolved attribute is either a plain scalar/collection coming back from
//! the foreign side, a class handle, a namespace node, or an opaque foreign
//! object.

use crate::foreign::{ForeignRef, same_object};
use crate::import::NamespaceNode;
use std::fmt;
use std::sync::Arc;

// =============================================================================
// ClassHandle
// =============================================================================

/// Handle to a foreign class, as returned by the class resolver.
#[derive(Clone)]
pub struct ClassHandle {
    /// Fully-qualified class name.
    name: Arc<str>,
    /// The foreign class object, when the resolver materialized one.
    object: Option<ForeignRef>,
}

impl ClassHandle {
    /// Create a handle that only carries the class name.
    #[inline]
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            object: None,
        }
    }

    /// Create a handle backed by a foreign class object.
    #[inline]
    pub fn with_object(name: impl Into<Arc<str>>, object: ForeignRef) -> Self {
        Self {
            name: name.into(),
            object: Some(object),
        }
    }

    /// Fully-qualified class name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Last dotted segment of the class name.
    #[inline]
    pub fn simple_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }

    #[inline]
    pub fn object(&self) -> Option<&ForeignRef> {
        self.object.as_ref()
    }
}

impl PartialEq for ClassHandle {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && match (&self.object, &other.object) {
                (None, None) => true,
                (Some(a), Some(b)) => same_object(a, b),
                _ => false,
            }
    }
}

impl fmt::Debug for ClassHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<class '{}'>", self.name)
    }
}

// =============================================================================
// Value
// =============================================================================

/// A value produced by attribute resolution.
#[derive(Clone)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Arc<str>),
    List(Arc<[Value]>),
    Class(ClassHandle),
    Module(Arc<NamespaceNode>),
    Foreign(ForeignRef),
}

impl Value {
    /// Build a string value.
    #[inline]
    pub fn str(s: impl Into<Arc<str>>) -> Self {
        Value::Str(s.into())
    }

    /// Build a list value.
    pub fn list(items: impl IntoIterator<Item = Value>) -> Self {
        Value::List(items.into_iter().collect())
    }

    /// Truthiness as the scripting runtime sees it.
    ///
    /// `None`, `False`, zero, and empty strings/lists are falsy. Foreign
    /// objects decide for themselves.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
            Value::Class(_) | Value::Module(_) => true,
            Value::Foreign(obj) => obj.is_truthy(),
        }
    }

    #[inline]
    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    #[inline]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[inline]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    #[inline]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    #[inline]
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    #[inline]
    pub fn as_class(&self) -> Option<&ClassHandle> {
        match self {
            Value::Class(class) => Some(class),
            _ => None,
        }
    }

    #[inline]
    pub fn as_module(&self) -> Option<&Arc<NamespaceNode>> {
        match self {
            Value::Module(node) => Some(node),
            _ => None,
        }
    }

    #[inline]
    pub fn as_foreign(&self) -> Option<&ForeignRef> {
        match self {
            Value::Foreign(obj) => Some(obj),
            _ => None,
        }
    }

    /// Type name for diagnostics.
    pub fn type_name(&self) -> &str {
        match self {
            Value::None => "NoneType",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Class(_) => "type",
            Value::Module(_) => "module",
            Value::Foreign(obj) => obj.type_name(),
        }
    }
}

impl PartialEq for Value {
    /// Structural equality for scalars and lists, identity for modules and
    /// foreign objects.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Class(a), Value::Class(b)) => a == b,
            (Value::Module(a), Value::Module(b)) => Arc::ptr_eq(a, b),
            (Value::Foreign(a), Value::Foreign(b)) => same_object(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "None"),
            Value::Bool(b) => write!(f, "{}", if *b { "True" } else { "False" }),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => write!(f, "{:?}", s),
            Value::List(items) => f.debug_list().entries(items.iter()).finish(),
            Value::Class(class) => write!(f, "{:?}", class),
            Value::Module(node) => write!(f, "<module '{}'>", node.name()),
            Value::Foreign(obj) => write!(f, "{:?}", obj),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(Arc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(Arc::from(s))
    }
}

impl From<ClassHandle> for Value {
    fn from(class: ClassHandle) -> Self {
        Value::Class(class)
    }
}

impl From<Arc<NamespaceNode>> for Value {
    fn from(node: Arc<NamespaceNode>) -> Self {
        Value::Module(node)
    }
}

impl From<ForeignRef> for Value {
    fn from(obj: ForeignRef) -> Self {
        Value::Foreign(obj)
    }
}

// =============================================================================
// Tests
// =============================================================================
