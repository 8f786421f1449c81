//! Lazy bridge between a scripting runtime's module system and a foreign
//! class namespace.
//!
//! Attribute access on a [`NamespaceNode`] resolves, on first use, to a
//! native sub-namespace, a foreign sub-package, or a foreign class handle.
//! Nodes live in a [`Registry`] (the host's module cache) and are created
//! either by the [`ForeignImporter`] hook or by the lifecycle API when the
//! host pushes a foreign module in directly.
//!
//! # Architecture
//!
//! ```text
//! ImportResolver
//!   ├── Registry (FQN → NamespaceNode, RwLock<FxHashMap>)
//!   └── meta path
//!         └── ForeignImporter (find_module / load_module)
//!               ├── Enquirer        (packages, classes, foreign modules)
//!               └── ClassResolver   (terminal class lookup)
//!
//! NamespaceNode::get_attr(name)
//!   └── Strategy::CHAIN
//!         Cache → ForeignDelegate → Native → ForeignModule
//!         → SubPackage → ExportMarker → Terminal
//! ```
//!
//! # Usage
//!
//! ```ignore
//! let resolver = ImportResolver::new();
//! resolver.setup_importer(Some(Arc::new(class_list)))?;
//! let util = resolver.import_module("java.util")?;
//! let array_list = util.get_attr("ArrayList")?;
//! ```

pub mod config;
pub mod enquirer;
pub mod error;
pub mod foreign;
pub mod harness;
pub mod import;
pub mod value;

pub use config::BridgeConfig;
pub use enquirer::{
    ClassList, ClassResolver, ClassResolverRef, Enquirer, EnquirerRef, ModuleEnquirer,
    default_class_resolver, default_enquirer, set_default_class_resolver, set_default_enquirer,
};
pub use error::{ImportError, ImportResult};
pub use foreign::{ForeignError, ForeignObject, ForeignRef};
pub use import::lifecycle::{
    register_foreign_module, setup_importer, teardown, unregister_foreign_module,
};
pub use import::{
    DottedName, ForeignImporter, ImportResolver, MetaPathFinder, ModuleLoader, NamespaceNode,
    Registry, Resolution, Strategy,
};
pub use value::{ClassHandle, Value};
