//! `QuibGraph`: the session that owns every quib.
//!
//! The graph holds the node arena, the function registry, configuration,
//! undo history, the override chooser and its remembered choices, and the
//! graphics observer. Computation, invalidation and assignment live in
//! sibling modules as further `impl QuibGraph` blocks.

use super::graphics::{GraphicsObserver, NoGraphics};
use super::node::QuibNode;
use super::{CacheBehavior, QuibId};
use crate::array::{Value, ValueKind};
use crate::assignment::{Assignment, AssignmentTemplate, ChoiceCache, FirstOptionChooser, OverrideChooser, Overrider};
use crate::cache::{CacheStatus, PathCache, uncached_paths_matching_path};
use crate::config::QuibConfig;
use crate::debug_invariants::DebugInvariants;
use crate::function_definitions::builtins::iquib_func;
use crate::function_definitions::{Arg, ArgumentRef, CallArgs, Func, FuncRegistry, getitem};
use crate::path::{Index, Path};
use crate::project::{OverriderChange, Project};
use crate::quib_error::QuibError;
use indexmap::IndexSet;
use itertools::Itertools;
use std::collections::BTreeSet;
use std::fmt;

/// Redraws deferred until the outermost aggregate scope closes.
#[derive(Debug, Default)]
pub(crate) struct RedrawState {
    pub(crate) depth: usize,
    pub(crate) pending: IndexSet<QuibId>,
}

/// An editing session over a graph of quibs.
///
/// ```rust
/// use quibbler::prelude::*;
/// let mut graph = QuibGraph::new();
/// let a = graph.iquib(vec![1, 2, 3]);
/// let doubled = graph.call("multiply", vec![a.into(), Arg::value(2)])?;
/// graph.assign(doubled, Assignment::new(Path::of(1), 6))?;
/// assert_eq!(graph.get_value(a)?, Value::from(vec![1, 3, 3]));
/// # Ok::<(), QuibError>(())
/// ```
pub struct QuibGraph {
    pub(crate) nodes: Vec<Option<QuibNode>>,
    pub(crate) registry: FuncRegistry,
    pub(crate) config: QuibConfig,
    pub(crate) project: Project,
    pub(crate) chooser: Box<dyn OverrideChooser>,
    pub(crate) choice_cache: ChoiceCache,
    pub(crate) graphics: Box<dyn GraphicsObserver>,
    pub(crate) redraw: RedrawState,
    pub(crate) within_get_value: bool,
}

impl fmt::Debug for QuibGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuibGraph")
            .field("quibs", &self.len())
            .field("config", &self.config)
            .field("undo_steps", &self.project.undo_len())
            .finish_non_exhaustive()
    }
}

impl Default for QuibGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl QuibGraph {
    /// Session with default configuration and every built-in function.
    pub fn new() -> Self {
        Self::with_config(QuibConfig::default())
    }

    pub fn with_config(config: QuibConfig) -> Self {
        let registry = FuncRegistry::with_builtins(&config);
        Self::with_registry(config, registry)
    }

    pub fn with_registry(config: QuibConfig, registry: FuncRegistry) -> Self {
        QuibGraph {
            nodes: Vec::new(),
            registry,
            config,
            project: Project::new(),
            chooser: Box::new(FirstOptionChooser),
            choice_cache: ChoiceCache::new(),
            graphics: Box::new(NoGraphics),
            redraw: RedrawState::default(),
            within_get_value: false,
        }
    }

    pub fn config(&self) -> &QuibConfig {
        &self.config
    }

    pub fn registry(&self) -> &FuncRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut FuncRegistry {
        &mut self.registry
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn set_chooser(&mut self, chooser: impl OverrideChooser + 'static) {
        self.chooser = Box::new(chooser);
    }

    pub fn set_graphics_observer(&mut self, observer: impl GraphicsObserver + 'static) {
        self.graphics = Box::new(observer);
    }

    pub fn choice_cache(&self) -> &ChoiceCache {
        &self.choice_cache
    }

    pub fn choice_cache_mut(&mut self) -> &mut ChoiceCache {
        &mut self.choice_cache
    }

    /// True while a value request is being served (including nested parent
    /// requests).
    pub fn is_within_get_value(&self) -> bool {
        self.within_get_value
    }

    /// Number of live quibs.
    pub fn len(&self) -> usize {
        self.nodes.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn quib_ids(&self) -> impl Iterator<Item = QuibId> + '_ {
        self.nodes.iter().flatten().map(|n| n.id)
    }

    pub fn node(&self, id: QuibId) -> Result<&QuibNode, QuibError> {
        self.nodes
            .get(id.0)
            .and_then(Option::as_ref)
            .ok_or(QuibError::UnknownQuib(id))
    }

    pub(crate) fn node_mut(&mut self, id: QuibId) -> Result<&mut QuibNode, QuibError> {
        self.nodes
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(QuibError::UnknownQuib(id))
    }

    /* ------------------------------------------------------------------ */
    /* Creation                                                            */
    /* ------------------------------------------------------------------ */

    fn insert_node(&mut self, func: Func, args: CallArgs<Arg>, allow_overriding: bool) -> QuibId {
        let id = QuibId(self.nodes.len());
        let definition = self.registry.get_definition_for_function(&func);
        let node = QuibNode::new(
            id,
            func,
            args,
            definition,
            self.config.default_cache_behavior,
            allow_overriding,
        );
        for &parent in &node.parents {
            if let Ok(p) = self.node_mut(parent) {
                if !p.children.contains(&id) {
                    p.children.push(id);
                }
            }
        }
        log::trace!("created {id} = {}", node.func.name());
        self.nodes.push(Some(node));
        id
    }

    /// An input quib holding `value`.
    pub fn iquib(&mut self, value: impl Into<Value>) -> QuibId {
        let func = self.registry.get_func("iquib").unwrap_or_else(|_| iquib_func());
        let allow = self.config.allow_overriding_inputs;
        self.insert_node(func, CallArgs::new(vec![Arg::Value(value.into())]), allow)
    }

    /// A quib for `func(args)`, registered as a child of every quib in
    /// `args`. Graphics functions are evaluated right away.
    ///
    /// # Errors
    /// - `UnknownQuib` if an argument refers to a missing quib.
    /// - `NestedQuib` (debug mode only) for a quib inside a list inside a
    ///   list.
    pub fn create_quib(&mut self, func: Func, args: CallArgs<Arg>) -> Result<QuibId, QuibError> {
        for (at, arg) in args.iter() {
            for q in arg.quibs() {
                self.node(q)?;
            }
            if self.config.debug && nested_quib(arg, 0) {
                return Err(QuibError::NestedQuib {
                    func: func.name().to_string(),
                    argument: at.to_string(),
                });
            }
        }
        let is_graphics = self.registry.get_definition_for_function(&func).is_graphics;
        let id = self.insert_node(func, args, false);
        if self.config.debug {
            if let Err(e) = self.validate_invariants() {
                self.unlink_from_parents(id);
                self.nodes.pop();
                return Err(e);
            }
        }
        if is_graphics {
            if let Err(e) = self.get_value(id) {
                log::warn!("initial drawing of {id} failed: {e}");
            }
        }
        Ok(id)
    }

    /// A quib calling the registered function `name` with positional
    /// arguments.
    pub fn call(&mut self, name: &str, args: Vec<Arg>) -> Result<QuibId, QuibError> {
        self.call_with(name, CallArgs::new(args))
    }

    pub fn call_with(&mut self, name: &str, args: CallArgs<Arg>) -> Result<QuibId, QuibError> {
        let func = self.registry.get_func(name)?;
        self.create_quib(func, args)
    }

    /// `quib[index]`.
    pub fn getitem(&mut self, quib: QuibId, index: impl Into<Index>) -> Result<QuibId, QuibError> {
        self.create_quib(getitem(index), CallArgs::new(vec![Arg::Quib(quib)]))
    }

    /// Remove a quib nobody depends on.
    ///
    /// # Errors
    /// `QuibHasChildren` while other quibs still use it.
    pub fn remove_quib(&mut self, id: QuibId) -> Result<(), QuibError> {
        if !self.node(id)?.children.is_empty() {
            return Err(QuibError::QuibHasChildren(id));
        }
        self.unlink_from_parents(id);
        self.nodes[id.0] = None;
        Ok(())
    }

    fn unlink_from_parents(&mut self, id: QuibId) {
        let parents = self.node(id).map(|n| n.parents.clone()).unwrap_or_default();
        for parent in parents {
            if let Ok(p) = self.node_mut(parent) {
                p.children.retain(|&c| c != id);
            }
        }
    }

    /* ------------------------------------------------------------------ */
    /* Structure and naming                                                */
    /* ------------------------------------------------------------------ */

    pub fn parents(&self, id: QuibId) -> Result<Vec<QuibId>, QuibError> {
        Ok(self.node(id)?.parents.clone())
    }

    pub fn children(&self, id: QuibId) -> Result<Vec<QuibId>, QuibError> {
        Ok(self.node(id)?.children.clone())
    }

    /// Every quib `id` depends on, directly or not.
    pub fn ancestors(&self, id: QuibId) -> Result<BTreeSet<QuibId>, QuibError> {
        let mut seen = BTreeSet::new();
        let mut stack = self.node(id)?.parents.clone();
        while let Some(q) = stack.pop() {
            if seen.insert(q) {
                stack.extend(self.node(q)?.parents.iter().copied());
            }
        }
        Ok(seen)
    }

    pub fn name(&self, id: QuibId) -> Result<Option<String>, QuibError> {
        Ok(self.node(id)?.name.clone())
    }

    /// Names start with a letter and hold letters, digits, spaces and
    /// underscores.
    ///
    /// # Errors
    /// `InvalidName` for anything else.
    pub fn set_name(&mut self, id: QuibId, name: Option<&str>) -> Result<(), QuibError> {
        if let Some(name) = name {
            let mut chars = name.chars();
            let valid = chars.next().is_some_and(|c| c.is_alphabetic())
                && chars.all(|c| c.is_alphanumeric() || c == '_' || c == ' ');
            if !valid {
                return Err(QuibError::InvalidName(name.to_string()));
            }
        }
        self.node_mut(id)?.name = name.map(str::to_string);
        Ok(())
    }

    /// `func(arg, ...)` with named quibs shown by name and unnamed ones
    /// expanded.
    pub fn functional_representation(&self, id: QuibId) -> Result<String, QuibError> {
        let node = self.node(id)?;
        let args = node
            .args
            .iter()
            .map(|(at, arg)| {
                let shown = self.arg_representation(arg)?;
                Ok(match at {
                    ArgumentRef::Positional(_) => shown,
                    ArgumentRef::Keyword(k) => format!("{k}={shown}"),
                })
            })
            .collect::<Result<Vec<String>, QuibError>>()?;
        Ok(format!("{}({})", node.func.name(), args.join(", ")))
    }

    fn arg_representation(&self, arg: &Arg) -> Result<String, QuibError> {
        Ok(match arg {
            Arg::Quib(q) => self.label(*q)?,
            Arg::Value(v) => v.to_string(),
            Arg::List(items) => format!(
                "[{}]",
                items
                    .iter()
                    .map(|a| self.arg_representation(a))
                    .collect::<Result<Vec<_>, _>>()?
                    .join(", ")
            ),
        })
    }

    /// Name if set, else the functional representation.
    pub fn label(&self, id: QuibId) -> Result<String, QuibError> {
        match &self.node(id)?.name {
            Some(name) => Ok(name.clone()),
            None => self.functional_representation(id),
        }
    }

    /// Best-effort label for messages.
    pub(crate) fn describe(&self, id: QuibId) -> String {
        self.label(id).unwrap_or_else(|_| id.to_string())
    }

    /* ------------------------------------------------------------------ */
    /* Settings                                                            */
    /* ------------------------------------------------------------------ */

    /// # Errors
    /// `InvalidCacheBehavior` when a random or graphics quib is asked not to
    /// cache.
    pub fn set_cache_behavior(&mut self, id: QuibId, behavior: CacheBehavior) -> Result<(), QuibError> {
        let label = self.describe(id);
        let node = self.node_mut(id)?;
        if (node.definition.is_random || node.definition.is_graphics) && behavior != CacheBehavior::On {
            return Err(QuibError::InvalidCacheBehavior {
                quib: label,
                requested: format!("{behavior:?}"),
            });
        }
        node.cache_behavior = behavior;
        match behavior {
            CacheBehavior::On => node.caching = true,
            CacheBehavior::Off => node.reset_cache(),
            CacheBehavior::Auto => {}
        }
        Ok(())
    }

    pub fn set_allow_overriding(&mut self, id: QuibId, allow: bool) -> Result<(), QuibError> {
        self.node_mut(id)?.allow_overriding = allow;
        Ok(())
    }

    /// Template applied to assigned values from now on; the quib's value
    /// changes, so its dependents are invalidated.
    pub fn set_assignment_template(
        &mut self,
        id: QuibId,
        template: Option<AssignmentTemplate>,
    ) -> Result<(), QuibError> {
        self.node_mut(id)?.assignment_template = template;
        self.invalidate_and_redraw_at_path(id, &Path::new())
    }

    /// Restrict where assignments starting at `id` may land.
    pub fn set_assigned_quibs(&mut self, id: QuibId, quibs: Option<Vec<QuibId>>) -> Result<(), QuibError> {
        if let Some(qs) = &quibs {
            for &q in qs {
                self.node(q)?;
            }
        }
        self.node_mut(id)?.assigned_quibs = quibs.map(|qs| qs.into_iter().collect());
        Ok(())
    }

    /* ------------------------------------------------------------------ */
    /* Cache inspection                                                    */
    /* ------------------------------------------------------------------ */

    /// `AllInvalid` when nothing is cached.
    pub fn cache_status(&self, id: QuibId) -> Result<CacheStatus, QuibError> {
        Ok(self
            .node(id)?
            .cache
            .as_ref()
            .map_or(CacheStatus::AllInvalid, PathCache::status))
    }

    /// Sub-paths of `path` that would have to be computed.
    pub fn uncached_paths(&self, id: QuibId, path: &Path) -> Result<Vec<Path>, QuibError> {
        Ok(uncached_paths_matching_path(self.node(id)?.cache.as_ref(), path))
    }

    pub fn get_shape(&mut self, id: QuibId) -> Result<Option<Vec<usize>>, QuibError> {
        Ok(self.get_value_valid_at_path(id, None)?.shape())
    }

    pub fn get_type(&mut self, id: QuibId) -> Result<ValueKind, QuibError> {
        Ok(self.get_value_valid_at_path(id, None)?.kind())
    }

    pub fn get_ndim(&mut self, id: QuibId) -> Result<Option<usize>, QuibError> {
        Ok(self.get_shape(id)?.map(|s| s.len()))
    }

    /// `true` wherever an override currently applies.
    pub fn get_override_mask(&mut self, id: QuibId) -> Result<Value, QuibError> {
        let value = self.get_value_valid_at_path(id, None)?;
        Ok(self.node(id)?.overrider.fill_override_mask(value.false_mask()))
    }

    /* ------------------------------------------------------------------ */
    /* Overrides as data                                                   */
    /* ------------------------------------------------------------------ */

    pub fn override_list(&self, id: QuibId) -> Result<&Overrider, QuibError> {
        Ok(&self.node(id)?.overrider)
    }

    /// Replace every override on `id` (used when loading saved state).
    /// Returns the paths whose overrides changed; only those are
    /// invalidated.
    pub fn replace_assignments(&mut self, id: QuibId, assignments: Vec<Assignment>) -> Result<Vec<Path>, QuibError> {
        let node = self.node_mut(id)?;
        let before = node.overrider.clone();
        let changed = node.overrider.replace_assignments(assignments);
        let after = node.overrider.clone();
        self.project.record(OverriderChange {
            quib: id,
            before,
            after,
            paths: changed.clone(),
        });
        self.with_aggregate_redraw(|g| {
            for path in &changed {
                g.invalidate_and_redraw_at_path(id, path)?;
            }
            Ok(())
        })?;
        Ok(changed)
    }

    /// Invalidate random and file-loading quibs so they run again.
    pub fn refresh_impure_quibs(&mut self) -> Result<(), QuibError> {
        let impure: Vec<QuibId> = self
            .nodes
            .iter()
            .flatten()
            .filter(|n| n.definition.is_impure())
            .map(|n| n.id)
            .collect();
        log::debug!("refreshing {} impure quibs", impure.len());
        self.with_aggregate_redraw(|g| {
            for id in impure {
                g.invalidate_quib_at_path(id, &Path::new())?;
            }
            Ok(())
        })
    }

    /* ------------------------------------------------------------------ */
    /* Scopes, undo and redo                                               */
    /* ------------------------------------------------------------------ */

    /// Run `f` with redraws deferred; graphics quibs invalidated inside are
    /// redrawn once when the outermost scope ends.
    pub fn with_aggregate_redraw<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, QuibError>,
    ) -> Result<T, QuibError> {
        self.redraw.depth += 1;
        let out = f(self);
        self.redraw.depth -= 1;
        if self.redraw.depth == 0 && !self.redraw.pending.is_empty() {
            let quibs: Vec<QuibId> = std::mem::take(&mut self.redraw.pending).into_iter().collect();
            log::debug!("redrawing {}", quibs.iter().join(", "));
            self.graphics.redraw(&quibs);
        }
        out
    }

    /// Run `f` as a single undo step.
    pub fn with_undo_group<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T, QuibError>) -> Result<T, QuibError> {
        self.project.begin_group();
        let out = f(self);
        self.project.end_group();
        out
    }

    /// # Errors
    /// `NothingToUndo` on an empty history.
    pub fn undo(&mut self) -> Result<(), QuibError> {
        let step = self.project.pop_undo().ok_or(QuibError::NothingToUndo)?;
        self.restore(step.into_iter().rev().map(|c| (c.quib, c.before, c.paths)))
    }

    /// # Errors
    /// `NothingToRedo` when nothing was undone since the last change.
    pub fn redo(&mut self) -> Result<(), QuibError> {
        let step = self.project.pop_redo().ok_or(QuibError::NothingToRedo)?;
        self.restore(step.into_iter().map(|c| (c.quib, c.after, c.paths)))
    }

    fn restore(&mut self, states: impl Iterator<Item = (QuibId, Overrider, Vec<Path>)>) -> Result<(), QuibError> {
        self.with_aggregate_redraw(|g| {
            for (quib, overrider, paths) in states {
                g.node_mut(quib)?.overrider = overrider;
                for path in &paths {
                    g.invalidate_and_redraw_at_path(quib, path)?;
                }
            }
            Ok(())
        })
    }
}

/// A quib inside a list that is itself inside a list.
fn nested_quib(arg: &Arg, depth: usize) -> bool {
    match arg {
        Arg::Quib(_) => depth > 1,
        Arg::Value(_) => false,
        Arg::List(items) => items.iter().any(|a| nested_quib(a, depth + 1)),
    }
}

impl DebugInvariants for QuibGraph {
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(self.validate_invariants(), "QuibGraph");
    }

    /// Parent and child links mirror each other and no quib is its own
    /// ancestor.
    fn validate_invariants(&self) -> Result<(), QuibError> {
        for node in self.nodes.iter().flatten() {
            for &p in &node.parents {
                if !self.node(p)?.children.contains(&node.id) {
                    return Err(QuibError::InvalidArgument(format!(
                        "{} lists parent {p} which does not list it as a child",
                        node.id
                    )));
                }
            }
            for &c in &node.children {
                if !self.node(c)?.parents.contains(&node.id) {
                    return Err(QuibError::InvalidArgument(format!(
                        "{} lists child {c} which does not list it as a parent",
                        node.id
                    )));
                }
            }
            if self.ancestors(node.id)?.contains(&node.id) {
                return Err(QuibError::InvalidArgument(format!("{} is its own ancestor", node.id)));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_debug_check_leaves_the_graph_unchanged() {
        let mut g = QuibGraph::with_config(QuibConfig {
            debug: true,
            ..Default::default()
        });
        let a = g.iquib(vec![1, 2]);
        g.node_mut(a).unwrap().children.push(QuibId(99));
        let err = g.call("negative", vec![a.into()]).unwrap_err();
        assert_eq!(err, QuibError::UnknownQuib(QuibId(99)));
        assert_eq!(g.len(), 1);
        assert_eq!(g.children(a).unwrap(), vec![QuibId(99)]);

        g.node_mut(a).unwrap().children.clear();
        let b = g.call("negative", vec![a.into()]).unwrap();
        assert_eq!(b, QuibId(1));
        assert_eq!(g.children(a).unwrap(), vec![b]);
    }

    #[test]
    fn names_are_validated() {
        let mut g = QuibGraph::new();
        let a = g.iquib(1);
        assert!(g.set_name(a, Some("my quib_1")).is_ok());
        assert_eq!(g.label(a).unwrap(), "my quib_1");
        assert!(matches!(g.set_name(a, Some("1abc")), Err(QuibError::InvalidName(_))));
        assert!(matches!(g.set_name(a, Some("a-b")), Err(QuibError::InvalidName(_))));
        g.set_name(a, None).unwrap();
        assert_eq!(g.label(a).unwrap(), "iquib(1)");
    }

    #[test]
    fn functional_representation_expands_unnamed_parents() {
        let mut g = QuibGraph::new();
        let a = g.iquib(vec![1, 2]);
        g.set_name(a, Some("a")).unwrap();
        let b = g.call("add", vec![a.into(), Arg::value(1)]).unwrap();
        let c = g.call("negative", vec![b.into()]).unwrap();
        assert_eq!(g.functional_representation(c).unwrap(), "negative(add(a, 1))");
    }

    #[test]
    fn removal_requires_no_children() {
        let mut g = QuibGraph::new();
        let a = g.iquib(1);
        let b = g.call("negative", vec![a.into()]).unwrap();
        assert!(matches!(g.remove_quib(a), Err(QuibError::QuibHasChildren(_))));
        g.remove_quib(b).unwrap();
        assert!(g.children(a).unwrap().is_empty());
        g.remove_quib(a).unwrap();
        assert!(g.is_empty());
        assert!(matches!(g.node(a), Err(QuibError::UnknownQuib(_))));
    }

    #[test]
    fn structure_is_consistent() {
        let mut g = QuibGraph::new();
        let a = g.iquib(vec![1, 2]);
        let b = g.call("add", vec![a.into(), a.into()]).unwrap();
        let c = g.call("sum", vec![b.into()]).unwrap();
        assert_eq!(g.parents(b).unwrap(), vec![a]);
        assert_eq!(g.ancestors(c).unwrap(), [a, b].into_iter().collect());
        assert!(g.validate_invariants().is_ok());
    }

    #[test]
    fn nested_quibs_are_rejected_in_debug_mode() {
        let mut g = QuibGraph::with_config(QuibConfig {
            debug: true,
            ..Default::default()
        });
        let a = g.iquib(1);
        let args = vec![Arg::List(vec![Arg::List(vec![a.into()])])];
        assert!(matches!(g.call("array", args), Err(QuibError::NestedQuib { .. })));
    }

    #[test]
    fn random_quibs_must_cache() {
        let mut g = QuibGraph::new();
        let r = g.call("random", vec![]).unwrap();
        assert!(matches!(
            g.set_cache_behavior(r, CacheBehavior::Off),
            Err(QuibError::InvalidCacheBehavior { .. })
        ));
        assert!(g.set_cache_behavior(r, CacheBehavior::On).is_ok());
    }
}
