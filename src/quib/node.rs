//! `QuibNode`: one function call in the graph and everything recorded on it.

use super::{CacheBehavior, QuibId};
use crate::assignment::{AssignmentTemplate, Overrider};
use crate::cache::{Cache, PathCache};
use crate::function_definitions::{Arg, CallArgs, Func, FuncDefinition};
use crate::translation::SourceFuncCall;
use std::collections::BTreeSet;
use std::sync::Arc;

/// A node of the graph: `func(*args, **kwargs)` with quib arguments as
/// parents.
///
/// # Invariants
/// - `parents` lists, once each and in argument order, exactly the quibs
///   found in `args`.
/// - `cache`, when present, never reports a region valid unless a value
///   computed from the current arguments was stored there since the last
///   invalidation covering it.
#[derive(Debug)]
pub struct QuibNode {
    pub(crate) id: QuibId,
    pub(crate) func: Func,
    pub(crate) args: CallArgs<Arg>,
    pub(crate) definition: Arc<FuncDefinition>,
    pub(crate) parents: Vec<QuibId>,
    pub(crate) children: Vec<QuibId>,
    pub(crate) cache: Option<Cache>,
    /// Once a run qualifies for caching the node keeps caching until its
    /// whole value is invalidated.
    pub(crate) caching: bool,
    pub(crate) cache_behavior: CacheBehavior,
    /// Shape of the last computed value; survives dropping the cache.
    pub(crate) last_shape: Option<Vec<usize>>,
    pub(crate) overrider: Overrider,
    pub(crate) assignment_template: Option<AssignmentTemplate>,
    pub(crate) allow_overriding: bool,
    /// Quibs the assignment may land on when it starts here; `None` allows
    /// any.
    pub(crate) assigned_quibs: Option<BTreeSet<QuibId>>,
    pub(crate) name: Option<String>,
}

impl QuibNode {
    pub(crate) fn new(
        id: QuibId,
        func: Func,
        args: CallArgs<Arg>,
        definition: Arc<FuncDefinition>,
        cache_behavior: CacheBehavior,
        allow_overriding: bool,
    ) -> Self {
        let mut parents = Vec::new();
        for (_, arg) in args.iter() {
            for q in arg.quibs() {
                if !parents.contains(&q) {
                    parents.push(q);
                }
            }
        }
        let mut node = QuibNode {
            id,
            func,
            args,
            definition,
            parents,
            children: Vec::new(),
            cache: None,
            caching: false,
            cache_behavior,
            last_shape: None,
            overrider: Overrider::new(),
            assignment_template: None,
            allow_overriding,
            assigned_quibs: None,
            name: None,
        };
        node.reset_cache();
        node
    }

    pub fn id(&self) -> QuibId {
        self.id
    }

    pub fn func(&self) -> &Func {
        &self.func
    }

    pub fn args(&self) -> &CallArgs<Arg> {
        &self.args
    }

    pub fn definition(&self) -> &FuncDefinition {
        &self.definition
    }

    pub fn parents(&self) -> &[QuibId] {
        &self.parents
    }

    pub fn children(&self) -> &[QuibId] {
        &self.children
    }

    pub fn overrider(&self) -> &Overrider {
        &self.overrider
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn allow_overriding(&self) -> bool {
        self.allow_overriding
    }

    pub fn assignment_template(&self) -> Option<&AssignmentTemplate> {
        self.assignment_template.as_ref()
    }

    pub fn assigned_quibs(&self) -> Option<&BTreeSet<QuibId>> {
        self.assigned_quibs.as_ref()
    }

    pub fn cache_behavior(&self) -> CacheBehavior {
        self.cache_behavior
    }

    /// Random and graphics functions ignore the requested behavior.
    pub fn effective_cache_behavior(&self) -> CacheBehavior {
        if self.definition.is_random || self.definition.is_graphics {
            CacheBehavior::On
        } else {
            self.cache_behavior
        }
    }

    pub(crate) fn reset_cache(&mut self) {
        self.cache = None;
        self.caching = self.effective_cache_behavior() == CacheBehavior::On;
    }

    /// Replace the cache when it cannot hold `result`.
    pub(crate) fn ensure_cache_matches(&mut self, result: &crate::array::Value) -> &mut Cache {
        if !matches!(&self.cache, Some(cache) if cache.matches_result(result)) {
            self.cache = Some(Cache::for_result(result));
        }
        self.cache.get_or_insert_with(|| Cache::for_result(result))
    }

    /// Shape of the last computed value, whether or not it is cached.
    pub(crate) fn result_shape(&self) -> Option<Vec<usize>> {
        self.cache
            .as_ref()
            .and_then(|c| c.value().shape())
            .or_else(|| self.last_shape.clone())
    }

    /// The call with quibs replaced by sources; `fetch` supplies values for
    /// metadata-aware translation.
    pub(crate) fn source_call(
        &self,
        fetch: impl FnMut(QuibId) -> Option<crate::array::Value>,
    ) -> (SourceFuncCall, Vec<QuibId>) {
        SourceFuncCall::from_args(self.func.clone(), Arc::clone(&self.definition), &self.args, fetch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::Value;

    #[test]
    fn parents_are_unique_and_ordered() {
        let args = CallArgs::new(vec![Arg::Quib(QuibId(2)), Arg::List(vec![Arg::Quib(QuibId(1)), Arg::Quib(QuibId(2))])]);
        let node = QuibNode::new(
            QuibId(3),
            Func::new("f", |_| Ok(Value::from(0))),
            args,
            Arc::new(FuncDefinition::builder("f").build()),
            CacheBehavior::Auto,
            false,
        );
        assert_eq!(node.parents(), &[QuibId(2), QuibId(1)]);
        assert!(!node.caching);
    }

    #[test]
    fn random_functions_always_cache() {
        let node = QuibNode::new(
            QuibId(0),
            Func::new("random", |_| Ok(Value::from(0.5))),
            CallArgs::default(),
            Arc::new(FuncDefinition::builder("random").random().build()),
            CacheBehavior::Off,
            false,
        );
        assert_eq!(node.effective_cache_behavior(), CacheBehavior::On);
        assert!(node.caching);
    }
}
