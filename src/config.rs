//! Session configuration.

use crate::quib::CacheBehavior;
use serde::{Deserialize, Serialize};

/// Tunables for a [`QuibGraph`](crate::quib::QuibGraph).
///
/// ```rust
/// use quibbler::config::QuibConfig;
/// let cfg = QuibConfig { debug: true, ..Default::default() };
/// assert!(cfg.input_aware_inversion);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuibConfig {
    /// Enables the nested-quib argument scan and graph invariant checks.
    pub debug: bool,
    /// Cache behavior given to newly created quibs.
    pub default_cache_behavior: CacheBehavior,
    /// Under `Auto`, runs faster than this are never cached.
    pub min_seconds_for_cache: f64,
    /// Under `Auto`, results produced faster than this many bytes per second
    /// are cheaper to recompute than to keep.
    pub max_bytes_per_second: f64,
    /// Invert `square`, `abs`, `sin` and friends towards the previous input
    /// (keeping its sign or periodic branch).
    pub input_aware_inversion: bool,
    /// Whether input quibs accept overrides.
    pub allow_overriding_inputs: bool,
}

impl Default for QuibConfig {
    fn default() -> Self {
        QuibConfig {
            debug: false,
            default_cache_behavior: CacheBehavior::Auto,
            min_seconds_for_cache: 1e-3,
            max_bytes_per_second: (1u64 << 30) as f64,
            input_aware_inversion: true,
            allow_overriding_inputs: true,
        }
    }
}
