//! Lazy, path-aware computation of quib values.
//!
//! A request for a path asks the cache which parts are missing, translates
//! each missing part backwards into the parents, fetches only those parent
//! regions, runs the function and merges the result into the cache.
//!
//! A `None` path asks for metadata only: any value with the right shape
//! and kind will do, so a cached value (valid or not) is returned as is.

use super::{CacheBehavior, QuibGraph, QuibId};
use crate::array::Value;
use crate::cache::{PathCache, truncate_path_to_match_shallow_caches, uncached_paths_matching_path};
use crate::config::QuibConfig;
use crate::path::{Path, deep_get};
use crate::quib_error::{CallFrame, QuibError};
use crate::translation::{ResultMetadata, SourcePaths, Translation, backwards_translate};
use std::time::Instant;

/// Whether a run that took `elapsed` seconds to produce `bytes` is worth
/// keeping.
pub(crate) fn should_cache(behavior: CacheBehavior, elapsed: f64, bytes: usize, config: &QuibConfig) -> bool {
    match behavior {
        CacheBehavior::On => true,
        CacheBehavior::Off => false,
        CacheBehavior::Auto => {
            elapsed > config.min_seconds_for_cache && (bytes as f64) / elapsed < config.max_bytes_per_second
        }
    }
}

fn describe_request(path: Option<&Path>) -> String {
    match path {
        Some(p) => format!("get_value_valid_at_path({p})"),
        None => "get_value_valid_at_path(None)".to_string(),
    }
}

impl QuibGraph {
    /// The whole value of `id`, with overrides applied.
    pub fn get_value(&mut self, id: QuibId) -> Result<Value, QuibError> {
        self.get_value_valid_at_path(id, Some(&Path::new()))
    }

    /// A value of `id` that is valid at least at `path` (`None`: metadata
    /// only), with overrides applied.
    ///
    /// # Errors
    /// Failures anywhere in the computation come back as
    /// `QuibCallFailed`, with one frame per quib on the way down.
    pub fn get_value_valid_at_path(&mut self, id: QuibId, path: Option<&Path>) -> Result<Value, QuibError> {
        let outermost = !self.within_get_value;
        self.within_get_value = true;
        let out = self.overridden_value(id, path);
        if outermost {
            self.within_get_value = false;
        }
        out.map_err(|e| {
            e.with_frame(CallFrame {
                quib: id,
                name: self.describe(id),
                request: describe_request(path),
            })
        })
    }

    fn overridden_value(&mut self, id: QuibId, path: Option<&Path>) -> Result<Value, QuibError> {
        let data = self.run(id, path)?;
        let node = self.node_mut(id)?;
        if node.overrider.is_empty() {
            return Ok(data);
        }
        let template = node.assignment_template.clone();
        node.overrider.override_value(&data, template.as_ref())
    }

    fn run(&mut self, id: QuibId, path: Option<&Path>) -> Result<Value, QuibError> {
        let node = self.node(id)?;
        let uncached = match path {
            Some(p) => uncached_paths_matching_path(node.cache.as_ref(), p),
            None => Vec::new(),
        };
        if uncached.is_empty() {
            if let Some(cache) = &node.cache {
                return Ok(cache.value());
            }
        }

        let start = Instant::now();
        let mut result = None;
        for p in &uncached {
            log::trace!("{id}: running for {p}");
            let (value, effective) = self.run_on_path(id, Some(p))?;
            let truncated = truncate_path_to_match_shallow_caches(&effective);
            let cache = self.node_mut(id)?.ensure_cache_matches(&value);
            let stored = deep_get(&value, &truncated).and_then(|v| cache.set_valid_value_at_path(&truncated, v));
            result = Some(match stored {
                Ok(()) => cache.value(),
                Err(e) => {
                    log::debug!("{id}: could not store {truncated} in cache: {e}");
                    value
                }
            });
        }
        let value = match result {
            Some(v) => v,
            None => {
                let (value, _) = self.run_on_path(id, None)?;
                self.node_mut(id)?.ensure_cache_matches(&value);
                value
            }
        };

        let elapsed = start.elapsed().as_secs_f64();
        let keep = should_cache(
            self.node(id)?.effective_cache_behavior(),
            elapsed,
            value.approx_size_bytes(),
            &self.config,
        );
        let node = self.node_mut(id)?;
        node.last_shape = value.shape();
        if keep && !node.caching {
            log::debug!("{id}: caching enabled after a {elapsed:.6}s run");
            node.caching = true;
        }
        if !node.caching {
            node.cache = None;
        }
        Ok(value)
    }

    /// Run the function once, fetching from each parent only what `path`
    /// needs. Returns the result and the path it is valid at: `path` itself,
    /// or the whole value when the request could not be translated.
    fn run_on_path(&mut self, id: QuibId, path: Option<&Path>) -> Result<(Value, Path), QuibError> {
        let (call, quibs) = self.node(id)?.source_call(|_| None);
        let (fetch_paths, effective): (Vec<Option<Path>>, Path) = match path {
            None => (
                call.sources
                    .iter()
                    .map(|s| if s.is_data { None } else { Some(Path::new()) })
                    .collect(),
                Path::new(),
            ),
            Some(_) if call.sources.is_empty() => (Vec::new(), Path::new()),
            Some(p) => match self.source_paths(id, p)? {
                Some(paths) => (
                    call.sources
                        .iter()
                        .map(|s| {
                            if s.is_data {
                                paths.get(&s.id).cloned()
                            } else {
                                Some(Path::new())
                            }
                        })
                        .collect(),
                    p.clone(),
                ),
                None => {
                    log::debug!("{id}: cannot localize {p}; computing the whole value");
                    (vec![Some(Path::new()); call.sources.len()], Path::new())
                }
            },
        };

        let args = call.resolve(&mut |s| self.get_value_valid_at_path(quibs[s.id.0], fetch_paths[s.id.0].as_ref()))?;
        let value = call.func.call(&args)?;
        self.graphics.artists_created(id, &value);
        Ok((value, effective))
    }

    /// Backward translation of `path` into the data sources of `id`, first
    /// without and then with metadata. `None` when it cannot be localized.
    pub(crate) fn source_paths(&mut self, id: QuibId, path: &Path) -> Result<Option<SourcePaths>, QuibError> {
        let (call, _) = self.node(id)?.source_call(|_| None);
        match backwards_translate(&call, path, None) {
            Translation::Translated(paths) => return Ok(Some(paths)),
            Translation::Failed => return Ok(None),
            Translation::NeedsMetadata => {}
        }
        let call = self.call_with_metadata(id)?;
        let meta = match self.run(id, None) {
            Ok(value) => ResultMetadata::of(&value),
            Err(e) => {
                log::debug!("{id}: no metadata for translating {path}: {e}");
                return Ok(None);
            }
        };
        Ok(backwards_translate(&call, path, Some(&meta)).ok())
    }

    /// The node's call with every source carrying its parent's current
    /// value (valid or not).
    pub(crate) fn call_with_metadata(&mut self, id: QuibId) -> Result<crate::translation::SourceFuncCall, QuibError> {
        let parents = self.node(id)?.parents.clone();
        let mut values = Vec::with_capacity(parents.len());
        for &parent in &parents {
            values.push((parent, self.get_value_valid_at_path(parent, None)?));
        }
        let (call, _) = self.node(id)?.source_call(|q| {
            values
                .iter()
                .find(|(p, _)| *p == q)
                .map(|(_, v)| v.clone())
        });
        Ok(call)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheStatus;
    use crate::function_definitions::Arg;

    #[test]
    fn auto_caching_needs_slow_and_dense_results() {
        let cfg = QuibConfig::default();
        assert!(should_cache(CacheBehavior::On, 0.0, 1 << 40, &cfg));
        assert!(!should_cache(CacheBehavior::Off, 10.0, 1, &cfg));
        assert!(!should_cache(CacheBehavior::Auto, 1e-6, 8, &cfg));
        assert!(should_cache(CacheBehavior::Auto, 0.5, 8, &cfg));
        assert!(!should_cache(CacheBehavior::Auto, 0.5, 1 << 40, &cfg));
    }

    #[test]
    fn cached_quib_computes_only_missing_elements() {
        let mut g = QuibGraph::new();
        let a = g.iquib(vec![1, 2, 3]);
        let b = g.call("multiply", vec![a.into(), Arg::value(10)]).unwrap();
        g.set_cache_behavior(b, CacheBehavior::On).unwrap();
        let v = g.get_value_valid_at_path(b, Some(&Path::of(1))).unwrap();
        assert_eq!(deep_get(&v, &Path::of(1)).unwrap(), Value::from(20));
        assert_eq!(g.cache_status(b).unwrap(), CacheStatus::Partial);
        assert_eq!(g.uncached_paths(b, &Path::of(1)).unwrap(), Vec::<Path>::new());
        assert_eq!(g.get_value(b).unwrap(), Value::from(vec![10, 20, 30]));
        assert_eq!(g.cache_status(b).unwrap(), CacheStatus::AllValid);
    }

    #[test]
    fn metadata_requests_reuse_any_cached_value() {
        let mut g = QuibGraph::new();
        let a = g.iquib(vec![1.0, 2.0]);
        let b = g.call("sqrt", vec![a.into()]).unwrap();
        assert_eq!(g.get_shape(b).unwrap(), Some(vec![2]));
        assert_eq!(g.get_ndim(b).unwrap(), Some(1));
        assert!(!g.is_within_get_value());
    }

    #[test]
    fn errors_carry_the_call_chain() {
        let mut g = QuibGraph::new();
        let a = g.iquib(vec![1, 2]);
        g.set_name(a, Some("a")).unwrap();
        let b = g.call("reshape", vec![a.into(), Arg::value(vec![3, 3])]).unwrap();
        let c = g.call("negative", vec![b.into()]).unwrap();
        let err = g.get_value(c).unwrap_err();
        let names: Vec<&str> = err.trace().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["negative(reshape(a, [3, 3]))", "reshape(a, [3, 3])"]);
        assert!(err.trace()[0].request.starts_with("get_value_valid_at_path("));
    }
}
