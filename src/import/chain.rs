//! Attribute resolution chain.
//!
//! An unknown attribute on a [`NamespaceNode`] is resolved by trying each
//! [`Strategy`] in [`Strategy::CHAIN`] order. A strategy answers
//! [`Resolution::Found`] or [`Resolution::NotFound`]; not-found moves on to
//! the next strategy, any other error aborts the chain.
//!
//! ```text
//! get_attr("Widget") on "pkg"
//!   ├── Cache           "Widget" already resolved?
//!   ├── ForeignDelegate foreign handle has a truthy "Widget"?
//!   ├── Native          __name__ / __file__ / __path__ / __package__
//!   ├── ForeignModule   "pkg.Widget" is a loadable foreign module?
//!   ├── SubPackage      "Widget" is a sub-package of "pkg"?
//!   ├── ExportMarker    "Widget" is the export-all marker?
//!   └── Terminal        foreign handle itself, else class "pkg.Widget"
//! ```
//!
//! No lock is held while a strategy calls out to the enquirer, the foreign
//! handle, or the class resolver, so those may re-enter the bridge.

use super::dotted::child_name;
use super::node::NamespaceNode;
use crate::enquirer::default_class_resolver;
use crate::error::{ImportError, ImportResult};
use crate::value::Value;
use std::sync::Arc;

// =============================================================================
// Resolution
// =============================================================================

/// Outcome of a single strategy.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Found(Value),
    NotFound,
}

/// One step of the resolution chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Previously resolved attribute.
    Cache,
    /// Ask the foreign module handle.
    ForeignDelegate,
    /// Built-in module metadata (bridge-only nodes).
    Native,
    /// Load `node.name + "." + name` as a foreign module.
    ForeignModule,
    /// Create a bridge-only child for a known sub-package.
    SubPackage,
    /// List exported names.
    ExportMarker,
    /// Foreign handle as-is, otherwise a class lookup.
    Terminal,
}

impl Strategy {
    /// Evaluation order.
    pub const CHAIN: [Strategy; 7] = [
        Strategy::Cache,
        Strategy::ForeignDelegate,
        Strategy::Native,
        Strategy::ForeignModule,
        Strategy::SubPackage,
        Strategy::ExportMarker,
        Strategy::Terminal,
    ];

    /// Short name for logging.
    pub fn name(self) -> &'static str {
        match self {
            Strategy::Cache => "cache",
            Strategy::ForeignDelegate => "foreign-delegate",
            Strategy::Native => "native",
            Strategy::ForeignModule => "foreign-module",
            Strategy::SubPackage => "sub-package",
            Strategy::ExportMarker => "export-marker",
            Strategy::Terminal => "terminal",
        }
    }

    /// Run this strategy against `node`.
    pub fn apply(self, node: &NamespaceNode, name: &str) -> ImportResult<Resolution> {
        match self {
            Strategy::Cache => Ok(found_or_not(node.cache_lookup(name))),
            Strategy::ForeignDelegate => foreign_delegate(node, name),
            Strategy::Native => Ok(if node.is_foreign_backed() {
                Resolution::NotFound
            } else {
                found_or_not(node.builtin_attr(name))
            }),
            Strategy::ForeignModule => foreign_module(node, name),
            Strategy::SubPackage => sub_package(node, name),
            Strategy::ExportMarker => Ok(if node.config().all_marker.as_ref() == name {
                Resolution::Found(Value::list(node.list_names().into_iter().map(Value::Str)))
            } else {
                Resolution::NotFound
            }),
            Strategy::Terminal => terminal(node, name),
        }
    }
}

#[inline]
fn found_or_not(value: Option<Value>) -> Resolution {
    match value {
        Some(value) => Resolution::Found(value),
        None => Resolution::NotFound,
    }
}

// =============================================================================
// Chain Driver
// =============================================================================

/// Resolve `name` on `node`.
///
/// Fails with [`ImportError::AttributeNotFound`] when every strategy
/// declines.
pub fn resolve_attribute(node: &NamespaceNode, name: &str) -> ImportResult<Value> {
    for strategy in Strategy::CHAIN {
        match strategy.apply(node, name) {
            Ok(Resolution::Found(value)) => {
                if strategy != Strategy::Cache {
                    tracing::trace!(
                        module = node.name(),
                        attr = name,
                        strategy = strategy.name(),
                        "attribute resolved"
                    );
                }
                return Ok(value);
            }
            Ok(Resolution::NotFound) => {}
            Err(err) if err.is_not_found() => {
                tracing::trace!(
                    module = node.name(),
                    attr = name,
                    strategy = strategy.name(),
                    error = %err,
                    "strategy declined"
                );
            }
            Err(err) => return Err(err),
        }
    }

    tracing::trace!(module = node.name(), attr = name, "attribute not found");
    Err(ImportError::attribute(node.name(), name))
}

// =============================================================================
// Strategies
// =============================================================================

/// Ask the foreign handle.
///
/// Falsy results are treated as missing, same as a missing attribute. This
/// hides attributes whose value is legitimately empty (e.g., an empty
/// foreign collection).
fn foreign_delegate(node: &NamespaceNode, name: &str) -> ImportResult<Resolution> {
    let Some(handle) = node.foreign() else {
        return Ok(Resolution::NotFound);
    };

    match handle.get_attr(name)? {
        Some(value) if value.is_truthy() => {
            node.cache_value(name, value.clone());
            Ok(Resolution::Found(value))
        }
        Some(_) => {
            tracing::trace!(
                module = node.name(),
                attr = name,
                "falsy foreign attribute treated as missing"
            );
            Ok(Resolution::NotFound)
        }
        None => Ok(Resolution::NotFound),
    }
}

/// Promote `node.name + "." + name` to a foreign-backed node.
fn foreign_module(node: &NamespaceNode, name: &str) -> ImportResult<Resolution> {
    let Some(enquirer) = node.enquirer() else {
        return Ok(Resolution::NotFound);
    };
    let Some(modules) = enquirer.modules() else {
        return Ok(Resolution::NotFound);
    };

    let fqn = child_name(node.name(), name);
    if !modules.is_foreign_module(&fqn) {
        return Ok(Resolution::NotFound);
    }
    let Some(registry) = node.registry() else {
        return Ok(Resolution::NotFound);
    };

    // The load may register the module itself (and re-enter the bridge).
    if !registry.contains(&fqn) {
        let handle = modules.load_foreign_module(&fqn)?;
        if !registry.contains(&fqn) {
            registry.make_foreign_module(&fqn, handle);
        }
    }

    let Some(child) = registry.get(&fqn) else {
        return Ok(Resolution::NotFound);
    };
    registry.patch_foreign_module(&child, node.loader_weak(), Some(Arc::clone(&enquirer)));
    node.cache_submodule(name, &fqn);
    Ok(Resolution::Found(Value::Module(child)))
}

/// Materialize a bridge-only child for a known sub-package.
fn sub_package(node: &NamespaceNode, name: &str) -> ImportResult<Resolution> {
    let Some(enquirer) = node.enquirer() else {
        return Ok(Resolution::NotFound);
    };
    let is_sub_package = enquirer
        .get_sub_packages(node.name())
        .is_some_and(|subs| subs.iter().any(|sub| sub.as_ref() == name));
    if !is_sub_package {
        return Ok(Resolution::NotFound);
    }
    let Some(registry) = node.registry() else {
        return Ok(Resolution::NotFound);
    };

    let fqn = child_name(node.name(), name);
    let child = match registry.get(&fqn) {
        Some(existing) => existing,
        None => registry.make_loaded_module(&fqn, node.loader_weak(), Some(enquirer)),
    };
    node.cache_submodule(name, &fqn);
    Ok(Resolution::Found(Value::Module(child)))
}

/// Last resort: the foreign handle itself, or a class lookup.
fn terminal(node: &NamespaceNode, name: &str) -> ImportResult<Resolution> {
    if let Some(handle) = node.foreign() {
        return Ok(Resolution::Found(Value::Foreign(Arc::clone(handle))));
    }

    let resolver = match node.loader() {
        Some(loader) => loader.class_resolver(),
        None => default_class_resolver(),
    };
    let Some(resolver) = resolver else {
        return Ok(Resolution::NotFound);
    };

    let fqn = child_name(node.name(), name);
    match resolver.resolve_class(&fqn)? {
        Some(class) => {
            let value = Value::Class(class);
            node.cache_value(name, value.clone());
            Ok(Resolution::Found(value))
        }
        None => Ok(Resolution::NotFound),
    }
}

// =============================================================================
// Tests
// =============================================================================
