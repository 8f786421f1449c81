//! Bridge configuration.
//!
//! A single struct resolved once when an importer is built. Environment
//! variables override the defaults.

use std::sync::{Arc, LazyLock};

// =============================================================================
// Defaults
// =============================================================================

/// Attribute name that asks a namespace for its exported names.
pub const DEFAULT_ALL_MARKER: &str = "__all__";

/// `__file__` reported by bridge nodes.
pub const DEFAULT_FILE_MARKER: &str = "<foreign>";

/// Environment override for [`BridgeConfig::all_marker`].
pub const ENV_ALL_MARKER: &str = "NSBRIDGE_ALL_MARKER";
/// Environment override for [`BridgeConfig::file_marker`].
pub const ENV_FILE_MARKER: &str = "NSBRIDGE_FILE_MARKER";
/// Environment override for [`BridgeConfig::verbose`].
pub const ENV_VERBOSE: &str = "NSBRIDGE_VERBOSE";

static DEFAULT_CONFIG: LazyLock<Arc<BridgeConfig>> =
    LazyLock::new(|| Arc::new(BridgeConfig::default()));

// =============================================================================
// BridgeConfig
// =============================================================================

/// Settings shared by an importer and every node it creates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Enumeration marker (`from pkg import *` asks for this attribute).
    pub all_marker: Arc<str>,

    /// Value of `__file__` on bridge nodes.
    pub file_marker: Arc<str>,

    /// Import tracing level. Above zero, hook decisions log at `debug`
    /// instead of `trace`.
    pub verbose: u32,
}

impl BridgeConfig {
    /// Resolve configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve configuration from an arbitrary key lookup.
    ///
    /// Empty values are ignored; an unparsable verbosity falls back to 0.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
        let defaults = Self::default();

        Self {
            all_marker: get(ENV_ALL_MARKER)
                .map(Arc::from)
                .unwrap_or(defaults.all_marker),
            file_marker: get(ENV_FILE_MARKER)
                .map(Arc::from)
                .unwrap_or(defaults.file_marker),
            verbose: get(ENV_VERBOSE)
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.verbose),
        }
    }

    /// Shared default configuration, used by nodes without a loader.
    pub fn shared_default() -> Arc<BridgeConfig> {
        Arc::clone(&DEFAULT_CONFIG)
    }

    /// Whether hook decisions should be logged loudly.
    #[inline]
    pub fn is_verbose(&self) -> bool {
        self.verbose > 0
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            all_marker: Arc::from(DEFAULT_ALL_MARKER),
            file_marker: Arc::from(DEFAULT_FILE_MARKER),
            verbose: 0,
        }
    }
}
