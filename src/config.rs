//! Realm configuration.
//!
//! All limits have working defaults; a host overrides them from JSON or from
//! the environment.

use serde::{Deserialize, Serialize};

use crate::error::{JsError, JsResult};
use crate::gc::DEFAULT_GC_THRESHOLD;

/// Tunables for one realm
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RealmConfig {
    /// Net allocations between automatic collections (0 disables them)
    pub gc_threshold: usize,
    /// Nesting limit for accessors, proxy traps and prototype walks
    pub max_recursion_depth: usize,
    /// Named properties a shared shape may hold before the object is moved
    /// to a dictionary shape
    pub max_shared_shape_properties: usize,
}

impl Default for RealmConfig {
    fn default() -> Self {
        Self {
            gc_threshold: DEFAULT_GC_THRESHOLD,
            max_recursion_depth: 512,
            max_shared_shape_properties: 64,
        }
    }
}

impl RealmConfig {
    /// Parse a (possibly partial) JSON document; absent fields keep defaults.
    pub fn from_json(json: &str) -> JsResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| JsError::range_error(format!("invalid realm configuration: {e}")))
    }

    /// Defaults, with `GC_THRESHOLD` applied when it is set and parses.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(threshold) = std::env::var("GC_THRESHOLD")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
        {
            config.gc_threshold = threshold;
        }
        config
    }
}
