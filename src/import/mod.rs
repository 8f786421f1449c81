//! Foreign namespace import system.
//!
//! # Architecture
//!
//! ```text
//! ImportResolver
//!   ├── Registry (RwLock<FxHashMap>)        registry.rs
//!   ├── meta path → ForeignImporter         importer.rs
//!   └── import_module / import_from / *     resolver.rs
//!
//! NamespaceNode                             node.rs
//!   └── get_attr → Strategy::CHAIN          chain.rs
//!
//! make / patch / register / teardown        lifecycle.rs
//! DottedName, name utilities                dotted.rs
//! ```

pub mod chain;
pub mod dotted;
pub mod importer;
pub mod lifecycle;
pub mod node;
pub mod registry;
pub mod resolver;


pub use chain::{Resolution, Strategy, resolve_attribute};
pub use dotted::DottedName;
pub use importer::{ForeignImporter, ImporterBuilder, MetaPathFinder, ModuleLoader};
pub use node::NamespaceNode;
pub use registry::Registry;
pub use resolver::ImportResolver;
