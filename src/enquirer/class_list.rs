//! In-memory enquirer built from a list of fully-qualified class names.
//!
//! Every proper dotted prefix of a class name is a package. Foreign modules
//! can be attached explicitly, which switches on the module capability.

use super::{ClassResolver, Enquirer, ModuleEnquirer};
use crate::foreign::{ForeignError, ForeignRef};
use crate::import::dotted::{DottedName, parent_package};
use crate::value::ClassHandle;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Package contents, kept sorted for stable listings.
#[derive(Debug, Default)]
struct PackageEntry {
    sub_packages: BTreeSet<Arc<str>>,
    classes: BTreeSet<Arc<str>>,
}

/// Enquirer and class resolver over a fixed set of class names.
#[derive(Debug, Default)]
pub struct ClassList {
    /// Package FQN → contents. The empty key holds the top-level packages.
    packages: FxHashMap<Arc<str>, PackageEntry>,
    classes: FxHashSet<Arc<str>>,
    modules: FxHashMap<Arc<str>, ForeignRef>,
}

impl ClassList {
    /// Build from fully-qualified class names. Malformed names are skipped.
    pub fn new<I, S>(class_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut list = Self::default();
        for name in class_names {
            list.add_class(name.as_ref());
        }
        list
    }

    /// Attach a loadable foreign module.
    pub fn with_module(mut self, fqn: impl Into<Arc<str>>, handle: ForeignRef) -> Self {
        self.modules.insert(fqn.into(), handle);
        self
    }

    /// Number of known classes.
    #[inline]
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    fn add_class(&mut self, name: &str) {
        let Some(dotted) = DottedName::parse(name) else {
            return;
        };
        if dotted.is_simple() {
            // Classes in the default package are not addressable.
            return;
        }

        let class: Arc<str> = Arc::from(name);
        if !self.classes.insert(Arc::clone(&class)) {
            return;
        }

        self.packages
            .entry(Arc::from(dotted.prefix(dotted.depth() - 1)))
            .or_default()
            .classes
            .insert(class);

        // Link each enclosing package to its parent ("" for top level).
        for depth in 1..dotted.depth() {
            self.packages
                .entry(Arc::from(dotted.prefix(depth - 1)))
                .or_default()
                .sub_packages
                .insert(Arc::from(dotted.segment(depth - 1)));
            self.packages
                .entry(Arc::from(dotted.prefix(depth)))
                .or_default();
        }
    }
}

impl Enquirer for ClassList {
    fn is_foreign_package(&self, fqn: &str) -> bool {
        !fqn.is_empty() && self.packages.contains_key(fqn)
    }

    fn get_sub_packages(&self, fqn: &str) -> Option<Vec<Arc<str>>> {
        self.packages
            .get(fqn)
            .map(|entry| entry.sub_packages.iter().cloned().collect())
    }

    fn get_class_names(&self, fqn: &str) -> Option<Vec<Arc<str>>> {
        self.packages
            .get(fqn)
            .map(|entry| entry.classes.iter().cloned().collect())
    }

    fn modules(&self) -> Option<&dyn ModuleEnquirer> {
        if self.modules.is_empty() {
            None
        } else {
            Some(self)
        }
    }
}

impl ModuleEnquirer for ClassList {
    fn is_foreign_module(&self, fqn: &str) -> bool {
        self.modules.contains_key(fqn)
    }

    fn load_foreign_module(&self, fqn: &str) -> Result<ForeignRef, ForeignError> {
        self.modules.get(fqn).cloned().ok_or_else(|| {
            let package = parent_package(fqn).unwrap_or("");
            ForeignError::new(
                "ImportError",
                format!("no foreign module '{}' in package '{}'", fqn, package),
            )
        })
    }
}

impl ClassResolver for ClassList {
    fn resolve_class(&self, fqn: &str) -> Result<Option<ClassHandle>, ForeignError> {
        Ok(self
            .classes
            .get(fqn)
            .map(|name| ClassHandle::new(Arc::clone(name))))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    struct Stub;

    impl crate::foreign::ForeignObject for Stub {
        fn type_name(&self) -> &str {
            "Stub"
        }

        fn get_attr(&self, _name: &str) -> Result<Option<Value>, ForeignError> {
            Ok(None)
        }
    }

    fn names(list: Option<Vec<Arc<str>>>) -> Vec<String> {
        list.unwrap_or_default()
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn sample() -> ClassList {
        ClassList::new([
            "java.util.ArrayList",
            "java.util.HashMap",
            "java.util.concurrent.Future",
            "java.lang.String",
        ])
    }

    #[test]
    fn test_packages_from_prefixes() {
        let list = sample();
        assert!(list.is_foreign_package("java"));
        assert!(list.is_foreign_package("java.util"));
        assert!(list.is_foreign_package("java.util.concurrent"));
        assert!(!list.is_foreign_package("java.util.ArrayList"));
        assert!(!list.is_foreign_package(""));
        assert!(!list.is_foreign_package("javax"));
    }

    #[test]
    fn test_sub_packages_sorted() {
        let list = sample();
        assert_eq!(names(list.get_sub_packages("java")), vec!["lang", "util"]);
        assert_eq!(names(list.get_sub_packages("java.util")), vec!["concurrent"]);
        assert_eq!(names(list.get_sub_packages("")), vec!["java"]);
    }

    #[test]
    fn test_class_names_are_fully_qualified() {
        let list = sample();
        assert_eq!(
            names(list.get_class_names("java.util")),
            vec!["java.util.ArrayList", "java.util.HashMap"]
        );
        assert!(names(list.get_class_names("java")).is_empty());
        assert!(list.get_class_names("nowhere").is_none());
    }

    #[test]
    fn test_duplicates_and_malformed_are_ignored() {
        let list = ClassList::new(["a.B", "a.B", "", "a..C", "Top"]);
        assert_eq!(list.len(), 1);
        assert!(!list.is_empty());
    }

    #[test]
    fn test_resolve_class() {
        let list = sample();
        let class = list.resolve_class("java.lang.String").unwrap().unwrap();
        assert_eq!(class.name(), "java.lang.String");
        assert!(list.resolve_class("java.lang.Missing").unwrap().is_none());
    }

    #[test]
    fn test_module_capability_is_opt_in() {
        let list = sample();
        assert!(list.modules().is_none());

        let list = list.with_module("java.util.functions", Arc::new(Stub));
        let modules = list.modules().unwrap();
        assert!(modules.is_foreign_module("java.util.functions"));
        assert!(!modules.is_foreign_module("java.util"));
        assert!(modules.load_foreign_module("java.util.functions").is_ok());
    }

    #[test]
    fn test_load_unknown_module_fails() {
        let list = sample().with_module("a.m", Arc::new(Stub));
        let err = list.load_foreign_module("a.n").unwrap_err();
        assert_eq!(err.kind(), "ImportError");
    }
}
