//! Dotted (fully-qualified) names.
//!
//! A [`DottedName`] keeps the original string plus the byte offset of every
//! separator, so prefixes and segments are plain slices:
//!
//! ```text
//! "java.util.ArrayList"
//!      ^    ^            dots = [4, 9]
//!   prefix(2)  → "java.util"
//!   segment(2) → "ArrayList"
//! ```

use smallvec::SmallVec;
use std::sync::Arc;

// =============================================================================
// DottedName
// =============================================================================

/// Validated dotted name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DottedName {
    full_name: Arc<str>,
    /// Byte offsets of the `.` separators.
    dots: SmallVec<[usize; 4]>,
}

impl DottedName {
    /// Parse and validate a dotted name.
    ///
    /// Rejects the empty string and any name with an empty segment.
    pub fn parse(name: &str) -> Option<Self> {
        let dots: SmallVec<[usize; 4]> = name
            .bytes()
            .enumerate()
            .filter_map(|(at, b)| (b == b'.').then_some(at))
            .collect();

        let mut start = 0;
        for end in dots.iter().copied().chain(std::iter::once(name.len())) {
            if end == start {
                return None;
            }
            start = end + 1;
        }

        Some(Self {
            full_name: Arc::from(name),
            dots,
        })
    }

    #[inline]
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// Number of segments.
    #[inline]
    pub fn depth(&self) -> usize {
        self.dots.len() + 1
    }

    /// Single segment, no dots.
    #[inline]
    pub fn is_simple(&self) -> bool {
        self.dots.is_empty()
    }

    /// The first `segments` segments joined. `prefix(0)` is the empty root.
    pub fn prefix(&self, segments: usize) -> &str {
        match segments {
            0 => "",
            n if n >= self.depth() => &self.full_name,
            n => &self.full_name[..self.dots[n - 1]],
        }
    }

    /// Segment `index` (zero-based).
    ///
    /// Panics if `index >= depth()`.
    pub fn segment(&self, index: usize) -> &str {
        let start = match index {
            0 => 0,
            i => self.dots[i - 1] + 1,
        };
        let end = self.dots.get(index).copied().unwrap_or(self.full_name.len());
        &self.full_name[start..end]
    }

    /// Proper ancestors, outermost first: "a.b.c" → "a", "a.b".
    pub fn ancestors(&self) -> impl Iterator<Item = &str> + '_ {
        self.dots.iter().map(|&at| &self.full_name[..at])
    }
}

// =============================================================================
// Name Utilities
// =============================================================================

/// `parent + "." + child`, or just `child` under the empty root.
#[inline]
pub fn child_name(parent: &str, child: &str) -> String {
    if parent.is_empty() {
        child.to_string()
    } else {
        format!("{}.{}", parent, child)
    }
}

/// Enclosing package, `None` for a top-level name.
#[inline]
pub fn parent_package(name: &str) -> Option<&str> {
    name.rsplit_once('.').map(|(parent, _)| parent)
}

/// Last segment.
#[inline]
pub fn leaf_name(name: &str) -> &str {
    name.rsplit_once('.').map_or(name, |(_, leaf)| leaf)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_segment() {
        let name = DottedName::parse("java").unwrap();
        assert!(name.is_simple());
        assert_eq!(name.depth(), 1);
        assert_eq!(name.segment(0), "java");
        assert_eq!(name.ancestors().count(), 0);
    }

    #[test]
    fn test_parse_rejects_empty_segments() {
        for bad in ["", ".", ".java", "java.", "java..util"] {
            assert!(DottedName::parse(bad).is_none(), "{:?}", bad);
        }
    }

    #[test]
    fn test_prefix_and_segment() {
        let name = DottedName::parse("java.util.concurrent.Future").unwrap();
        assert_eq!(name.depth(), 4);
        assert_eq!(name.prefix(0), "");
        assert_eq!(name.prefix(2), "java.util");
        assert_eq!(name.prefix(9), "java.util.concurrent.Future");
        assert_eq!(name.segment(1), "util");
        assert_eq!(name.segment(3), "Future");
    }

    #[test]
    fn test_ancestors_outermost_first() {
        let name = DottedName::parse("a.b.c").unwrap();
        let ancestors: Vec<&str> = name.ancestors().collect();
        assert_eq!(ancestors, vec!["a", "a.b"]);
    }

    #[test]
    fn test_name_utilities() {
        assert_eq!(child_name("pkg", "sub"), "pkg.sub");
        assert_eq!(child_name("", "pkg"), "pkg");
        assert_eq!(parent_package("a.b.c"), Some("a.b"));
        assert_eq!(parent_package("a"), None);
        assert_eq!(leaf_name("a.b.c"), "c");
        assert_eq!(leaf_name("a"), "a");
    }
}
