//! Invalidation fan-out.
//!
//! A change at a path of one quib is translated forwards into each child,
//! marked invalid in the child's cache, and pushed further down unless the
//! child's own overrides fully cover the affected region. Graphics quibs
//! reached on the way are queued for one redraw per aggregate scope.

use super::node::QuibNode;
use super::{QuibGraph, QuibId};
use crate::cache::PathCache;
use crate::path::Path;
use crate::quib_error::QuibError;
use crate::translation::{ResultMetadata, SourceId, Translation, forwards_translate};

/// Mark `path` invalid in the node's cache. The whole value, or a path the
/// cache cannot address, drops the cache altogether.
fn invalidate_cache_at(node: &mut QuibNode, path: &Path) {
    if path.is_empty() {
        node.reset_cache();
        return;
    }
    let failed = match &mut node.cache {
        Some(cache) => cache.set_invalid_at_path(path).err(),
        None => None,
    };
    if let Some(e) = failed {
        log::debug!("{}: cannot invalidate {path} in place ({e}); dropping cache", node.id);
        node.reset_cache();
    }
}

impl QuibGraph {
    /// Invalidate everything that depends on `path` of `id` (not `id`
    /// itself) and redraw the graphics quibs affected.
    pub fn invalidate_and_redraw_at_path(&mut self, id: QuibId, path: &Path) -> Result<(), QuibError> {
        self.with_aggregate_redraw(|g| g.invalidate_children_at_path(id, path))
    }

    fn invalidate_children_at_path(&mut self, id: QuibId, path: &Path) -> Result<(), QuibError> {
        let children = self.node(id)?.children.clone();
        for child in children {
            for child_path in self.forward_paths(id, child, path)? {
                self.invalidate_quib_at_path(child, &child_path)?;
            }
        }
        Ok(())
    }

    /// Invalidate `id` itself at `path`, then its dependents.
    pub(crate) fn invalidate_quib_at_path(&mut self, id: QuibId, path: &Path) -> Result<(), QuibError> {
        let node = self.node_mut(id)?;
        invalidate_cache_at(node, path);
        if node.definition.is_graphics {
            self.redraw.pending.insert(id);
        }
        let node = self.node(id)?;
        if node
            .overrider
            .is_completely_overridden_at_first_component(node.result_shape().as_deref(), path)
        {
            log::trace!("{id}: overrides absorb the change at {path}");
            return Ok(());
        }
        self.invalidate_children_at_path(id, path)
    }

    /// Paths of `child` affected by a change at `path` of its parent
    /// `parent`; the whole value when that cannot be narrowed down.
    fn forward_paths(&mut self, parent: QuibId, child: QuibId, path: &Path) -> Result<Vec<Path>, QuibError> {
        let (call, quibs) = self.node(child)?.source_call(|_| None);
        let mut out = Vec::new();
        for source in call.sources.iter().filter(|s| quibs[s.id.0] == parent) {
            if !source.is_data {
                return Ok(vec![Path::new()]);
            }
            let translated = match forwards_translate(&call, source.id, path, None) {
                Translation::NeedsMetadata => self.forwards_with_metadata(child, source.id, path),
                other => other,
            };
            match translated {
                Translation::Translated(paths) => out.extend(paths),
                _ => {
                    log::debug!("{child}: cannot forward {path} from {parent}; invalidating all");
                    return Ok(vec![Path::new()]);
                }
            }
        }
        Ok(out)
    }

    fn forwards_with_metadata(&mut self, child: QuibId, source: SourceId, path: &Path) -> Translation<Vec<Path>> {
        let prepared = self.call_with_metadata(child).and_then(|call| {
            let meta = ResultMetadata::of(&self.get_value_valid_at_path(child, None)?);
            Ok((call, meta))
        });
        match prepared {
            Ok((call, meta)) => forwards_translate(&call, source, path, Some(&meta)),
            Err(e) => {
                log::debug!("{child}: metadata unavailable for forward translation: {e}");
                Translation::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::Value;
    use crate::cache::CacheStatus;
    use crate::function_definitions::Arg;
    use crate::quib::{CacheBehavior, GraphicsObserver};
    use std::sync::{Arc, Mutex};

    #[test]
    fn change_invalidates_only_the_translated_element() {
        let mut g = QuibGraph::new();
        let a = g.iquib(vec![1, 2, 3]);
        let b = g.call("add", vec![a.into(), Arg::value(1)]).unwrap();
        g.set_cache_behavior(b, CacheBehavior::On).unwrap();
        g.get_value(b).unwrap();
        g.invalidate_and_redraw_at_path(a, &Path::of(0)).unwrap();
        assert_eq!(g.cache_status(b).unwrap(), CacheStatus::Partial);
        assert!(g.uncached_paths(b, &Path::of(1)).unwrap().is_empty());
        assert_eq!(g.uncached_paths(b, &Path::of(0)).unwrap().len(), 1);
    }

    #[test]
    fn whole_invalidation_drops_the_cache() {
        let mut g = QuibGraph::new();
        let a = g.iquib(vec![1, 2]);
        let b = g.call("sum", vec![a.into()]).unwrap();
        g.set_cache_behavior(b, CacheBehavior::On).unwrap();
        g.get_value(b).unwrap();
        g.invalidate_and_redraw_at_path(a, &Path::new()).unwrap();
        assert_eq!(g.cache_status(b).unwrap(), CacheStatus::AllInvalid);
    }

    #[test]
    fn overrides_absorb_changes_without_a_cache() {
        let mut g = QuibGraph::with_config(crate::config::QuibConfig {
            min_seconds_for_cache: f64::INFINITY,
            ..Default::default()
        });
        let a = g.iquib(vec![1, 2, 3]);
        let b = g.call("add", vec![a.into(), Arg::value(1)]).unwrap();
        let c = g.call("negative", vec![b.into()]).unwrap();
        g.set_cache_behavior(c, CacheBehavior::On).unwrap();
        g.set_allow_overriding(b, true).unwrap();
        g.override_quib(b, crate::assignment::Assignment::new(Path::of(0), 100)).unwrap();
        assert_eq!(g.get_value(c).unwrap(), Value::from(vec![-100, -3, -4]));
        assert!(g.node(b).unwrap().cache.is_none());

        g.invalidate_and_redraw_at_path(a, &Path::of(0)).unwrap();
        assert_eq!(g.cache_status(c).unwrap(), CacheStatus::AllValid);
        g.invalidate_and_redraw_at_path(a, &Path::of(1)).unwrap();
        assert_eq!(g.cache_status(c).unwrap(), CacheStatus::Partial);
    }

    #[derive(Default, Clone)]
    struct Recorder(Arc<Mutex<Vec<Vec<QuibId>>>>);

    impl GraphicsObserver for Recorder {
        fn redraw(&mut self, quibs: &[QuibId]) {
            self.0.lock().unwrap().push(quibs.to_vec());
        }
    }

    #[test]
    fn graphics_redraw_once_per_scope() {
        let mut g = QuibGraph::new();
        g.registry_mut().register(
            crate::function_definitions::Func::new("plot", |_| Ok(Value::from(0))),
            crate::function_definitions::FuncDefinition::builder("plot").graphics().build(),
        );
        let recorder = Recorder::default();
        g.set_graphics_observer(recorder.clone());
        let a = g.iquib(vec![1, 2]);
        let p = g.call("plot", vec![a.into()]).unwrap();
        g.with_aggregate_redraw(|g| {
            g.invalidate_and_redraw_at_path(a, &Path::of(0))?;
            g.invalidate_and_redraw_at_path(a, &Path::of(1))
        })
        .unwrap();
        assert_eq!(*recorder.0.lock().unwrap(), vec![vec![p]]);
    }
}
