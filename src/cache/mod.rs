//! Per-quib validity caches.
//!
//! A cache remembers the last computed value of a quib together with which
//! regions of it are still trustworthy. Caches are shallow: they track
//! validity down to the first path component only, and report
//! `PathCannotHaveComponents` for anything deeper, which callers treat as
//! "fall back to the whole value".

pub mod array_cache;
pub mod holistic;
pub mod list_cache;

pub use array_cache::ArrayCache;
pub use holistic::HolisticCache;
pub use list_cache::ListCache;

use crate::array::Value;
use crate::path::Path;
use crate::quib_error::QuibError;

/// Forget every valid region while keeping the last value around as
/// metadata (shape and kind) for later requests.
pub trait InvalidateCache {
    fn invalidate_cache(&mut self);
}

/// Overall validity of a cache.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheStatus {
    AllInvalid,
    AllValid,
    Partial,
}

/// Path-aware validity tracking.
pub trait PathCache: InvalidateCache {
    /// Minimal sub-paths of `path` whose region is not fully valid. A request
    /// that is entirely invalid comes back unchanged.
    fn get_uncached_paths(&self, path: &Path) -> Result<Vec<Path>, QuibError>;
    /// Store `value` (the data found at `path` in a fresh result) and mark
    /// the region valid.
    fn set_valid_value_at_path(&mut self, path: &Path, value: Value) -> Result<(), QuibError>;
    /// Mark the region at `path` invalid; the empty path invalidates all.
    fn set_invalid_at_path(&mut self, path: &Path) -> Result<(), QuibError>;
    /// Can this cache hold `value` without being rebuilt?
    fn matches_result(&self, value: &Value) -> bool;
    /// Last stored value (valid or not).
    fn value(&self) -> Value;
    fn status(&self) -> CacheStatus;
}

/// The cache representation chosen from the shape of a result.
#[derive(Clone, Debug, PartialEq)]
pub enum Cache {
    Holistic(HolisticCache),
    Array(ArrayCache),
    List(ListCache),
}

impl Cache {
    /// An all-invalid cache able to hold `value`.
    pub fn for_result(value: &Value) -> Cache {
        match value {
            Value::Array(a) => Cache::Array(ArrayCache::new(a.clone())),
            Value::List(items) => Cache::List(ListCache::new(items.clone())),
            other => Cache::Holistic(HolisticCache::new(other.clone())),
        }
    }

    fn inner(&self) -> &dyn PathCache {
        match self {
            Cache::Holistic(c) => c,
            Cache::Array(c) => c,
            Cache::List(c) => c,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn PathCache {
        match self {
            Cache::Holistic(c) => c,
            Cache::Array(c) => c,
            Cache::List(c) => c,
        }
    }
}

impl InvalidateCache for Cache {
    fn invalidate_cache(&mut self) {
        self.inner_mut().invalidate_cache();
    }
}

impl PathCache for Cache {
    fn get_uncached_paths(&self, path: &Path) -> Result<Vec<Path>, QuibError> {
        self.inner().get_uncached_paths(path)
    }

    fn set_valid_value_at_path(&mut self, path: &Path, value: Value) -> Result<(), QuibError> {
        self.inner_mut().set_valid_value_at_path(path, value)
    }

    fn set_invalid_at_path(&mut self, path: &Path) -> Result<(), QuibError> {
        self.inner_mut().set_invalid_at_path(path)
    }

    fn matches_result(&self, value: &Value) -> bool {
        self.inner().matches_result(value)
    }

    fn value(&self) -> Value {
        self.inner().value()
    }

    fn status(&self) -> CacheStatus {
        self.inner().status()
    }
}

/// Shallow caches only track the first component of a path.
pub fn truncate_path_to_match_shallow_caches(path: &Path) -> Path {
    path.prefix(1)
}

/// Uncached sub-paths of `path` given an optional cache. No cache means
/// nothing is valid; a path the cache cannot address is reported whole.
pub fn uncached_paths_matching_path(cache: Option<&Cache>, path: &Path) -> Vec<Path> {
    match cache {
        None => vec![path.clone()],
        Some(cache) => cache.get_uncached_paths(path).unwrap_or_else(|err| {
            log::trace!("cache cannot divide {path}: {err}");
            vec![path.clone()]
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::NdArray;

    #[test]
    fn representation_follows_result_kind() {
        assert!(matches!(Cache::for_result(&Value::from(vec![1, 2])), Cache::Array(_)));
        assert!(matches!(
            Cache::for_result(&Value::List(vec![Value::from(1)])),
            Cache::List(_)
        ));
        assert!(matches!(Cache::for_result(&Value::from(1.5)), Cache::Holistic(_)));
    }

    #[test]
    fn missing_cache_means_everything_uncached() {
        let p = Path::of(1);
        assert_eq!(uncached_paths_matching_path(None, &p), vec![p]);
    }

    #[test]
    fn invalidation_keeps_the_value_as_metadata() {
        for value in [Value::from(vec![1, 2]), Value::List(vec![Value::from(1)]), Value::from(1.5)] {
            let mut cache = Cache::for_result(&value);
            cache.set_valid_value_at_path(&Path::new(), value.clone()).unwrap();
            assert_eq!(cache.status(), CacheStatus::AllValid);
            cache.invalidate_cache();
            assert_eq!(cache.status(), CacheStatus::AllInvalid);
            assert_eq!(cache.value(), value);
        }
    }

    #[test]
    fn mismatched_shape_does_not_match() {
        let c = Cache::for_result(&Value::Array(NdArray::from_vec(vec![1.into(), 2.into()])));
        assert!(!c.matches_result(&Value::from(vec![1, 2, 3])));
        assert!(c.matches_result(&Value::from(vec![4, 5])));
    }
}
