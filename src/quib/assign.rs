//! Assignments: finding where a change should land and applying it.
//!
//! An assignment made on a quib is inverted upwards through its function
//! for as long as the function allows it. Every quib on the way that accepts
//! overrides is a candidate; the candidates form an options tree that the
//! override chooser (or the remembered choice) settles. The winning override
//! is applied together with removals on the quibs it bypasses, as one undo
//! step and one redraw.

use super::{QuibGraph, QuibId};
use crate::array::Value;
use crate::assignment::override_choice::Blocked;
use crate::assignment::{
    Assignment, AssignmentToQuib, OverrideGroup, OverrideOption, OverrideOptionsTree, OverrideRemoval, resolve,
};
use crate::inversion::invert;
use crate::path::Path;
use crate::project::OverriderChange;
use crate::quib_error::QuibError;
use std::collections::BTreeSet;

impl QuibGraph {
    /// Make `id` show `assignment`, overriding it or one of its ancestors.
    ///
    /// A default assignment removes the override at its path instead.
    ///
    /// # Errors
    /// - `OverridingNotAllowed` when `id` refuses overrides and nothing
    ///   upstream can take the change.
    /// - `AssignmentNotPossible` when inversion leads nowhere overridable.
    /// - `AssignmentCancelledByUser` from the chooser; nothing is applied.
    pub fn assign(&mut self, id: QuibId, assignment: Assignment) -> Result<(), QuibError> {
        if assignment.is_default() {
            return self.remove_override(id, &assignment.path);
        }
        let group = self.get_override_group_for_assignment(id, assignment)?;
        self.apply_override_group(group)
    }

    /// Assign a whole new value.
    pub fn assign_value(&mut self, id: QuibId, value: impl Into<Value>) -> Result<(), QuibError> {
        self.assign(id, Assignment::new(Path::new(), value))
    }

    /// Record `assignment` on `id` itself, without inversion.
    ///
    /// # Errors
    /// `OverridingNotAllowed` unless the quib accepts overrides.
    pub fn override_quib(&mut self, id: QuibId, assignment: Assignment) -> Result<(), QuibError> {
        if !self.node(id)?.allow_overriding {
            return Err(QuibError::OverridingNotAllowed {
                quib: self.describe(id),
                path: assignment.path,
            });
        }
        self.apply_override_group(OverrideGroup::single(id, assignment))
    }

    /// Show the computed value of `id` at `path` again, also dropping the
    /// overrides upstream that fed that region.
    pub fn remove_override(&mut self, id: QuibId, path: &Path) -> Result<(), QuibError> {
        let mut removals = vec![OverrideRemoval::new(id, path.clone())];
        let mut frontier = vec![(id, path.clone())];
        while let Some((quib, path)) = frontier.pop() {
            for removal in self.get_inversions_for_override_removal(quib, &path)? {
                frontier.push((removal.quib, removal.path.clone()));
                if self.node(removal.quib)?.allow_overriding {
                    removals.push(removal);
                }
            }
        }
        self.apply_override_group(OverrideGroup::new(Vec::new(), removals))
    }

    /// The same change expressed on the parents of `id`; empty when the
    /// function cannot be inverted there.
    pub fn get_inversions_for_assignment(
        &mut self,
        id: QuibId,
        assignment: &Assignment,
    ) -> Result<Vec<AssignmentToQuib>, QuibError> {
        let node = self.node(id)?;
        if assignment.is_default() || node.definition.inverters.is_empty() || node.parents.is_empty() {
            return Ok(Vec::new());
        }
        let parents = node.parents.clone();
        let mut values = Vec::with_capacity(parents.len());
        for parent in parents {
            values.push((parent, self.get_value(parent)?));
        }
        let (call, quibs) = self
            .node(id)?
            .source_call(|q| values.iter().find(|(p, _)| *p == q).map(|(_, v)| v.clone()));
        let previous = self.get_value(id)?;
        match invert(&call, assignment, &previous) {
            Ok(inversals) => Ok(inversals
                .into_iter()
                .map(|inv| AssignmentToQuib::new(quibs[inv.source.0], inv.assignment))
                .collect()),
            Err(QuibError::NoInvertersFound { .. } | QuibError::FailedToInvert { .. }) => {
                log::debug!("{id}: {assignment} cannot be inverted");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    /// Regions of the data parents of `id` that feed `path`.
    pub fn get_inversions_for_override_removal(
        &mut self,
        id: QuibId,
        path: &Path,
    ) -> Result<Vec<OverrideRemoval>, QuibError> {
        let node = self.node(id)?;
        if node.parents.is_empty() {
            return Ok(Vec::new());
        }
        let (_, quibs) = node.source_call(|_| None);
        Ok(match self.source_paths(id, path)? {
            Some(paths) => paths
                .into_iter()
                .map(|(source, p)| OverrideRemoval::new(quibs[source.0], p))
                .collect(),
            None => Vec::new(),
        })
    }

    /// Every place `assignment` on `id` could land, as a tree.
    pub fn get_override_options_tree(
        &mut self,
        id: QuibId,
        assignment: Assignment,
    ) -> Result<OverrideOptionsTree, QuibError> {
        let assigned = self.node(id)?.assigned_quibs.clone();
        self.build_options_tree(id, assignment, Vec::new(), assigned.as_ref())
    }

    fn build_options_tree(
        &mut self,
        top: QuibId,
        assignment: Assignment,
        mut removals: Vec<OverrideRemoval>,
        assigned: Option<&BTreeSet<QuibId>>,
    ) -> Result<OverrideOptionsTree, QuibError> {
        let mut blocked = Blocked {
            stayed_at_top: true,
            top_allows_overriding: self.node(top)?.allow_overriding,
            top_label: self.describe(top),
        };
        let mut options = Vec::new();
        let mut current = AssignmentToQuib::new(top, assignment.clone());
        loop {
            if self.node(current.quib)?.allow_overriding && assigned.is_none_or(|a| a.contains(&current.quib)) {
                options.push(OverrideOption {
                    quib: current.quib,
                    assignment: current.assignment.clone(),
                    removals: removals.clone(),
                });
            }
            let mut inversions = self.get_inversions_for_assignment(current.quib, &current.assignment)?;
            if inversions.len() > 1 {
                let mut diverged_removals = removals;
                diverged_removals.push(OverrideRemoval::new(current.quib, current.assignment.path.clone()));
                let children = inversions
                    .into_iter()
                    .map(|inv| self.build_options_tree(inv.quib, inv.assignment, Vec::new(), assigned))
                    .collect::<Result<Vec<_>, _>>()?;
                return Ok(OverrideOptionsTree {
                    top,
                    assignment,
                    options,
                    diverged_removals,
                    children,
                    blocked,
                });
            }
            let Some(next) = inversions.pop() else {
                return Ok(OverrideOptionsTree {
                    top,
                    assignment,
                    options,
                    diverged_removals: Vec::new(),
                    children: Vec::new(),
                    blocked,
                });
            };
            removals.push(OverrideRemoval::new(current.quib, current.assignment.path.clone()));
            blocked.stayed_at_top = false;
            current = next;
        }
    }

    /// Resolve where `assignment` on `id` lands, consulting the chooser
    /// when the answer is ambiguous.
    pub fn get_override_group_for_assignment(
        &mut self,
        id: QuibId,
        assignment: Assignment,
    ) -> Result<OverrideGroup, QuibError> {
        let tree = self.get_override_options_tree(id, assignment)?;
        resolve(tree, self.chooser.as_mut(), &mut self.choice_cache)
    }

    /// Apply removals, then overrides, as one undo step and one redraw.
    pub fn apply_override_group(&mut self, group: OverrideGroup) -> Result<(), QuibError> {
        for quib in group.quibs() {
            self.node(quib)?;
        }
        log::debug!(
            "applying {} overrides and {} removals",
            group.overrides.len(),
            group.removals.len()
        );
        self.with_undo_group(|g| {
            g.with_aggregate_redraw(|g| {
                for removal in group.removals {
                    let node = g.node_mut(removal.quib)?;
                    let before = node.overrider.clone();
                    if node.overrider.return_assignments_to_default(&removal.path).is_none() {
                        continue;
                    }
                    let after = node.overrider.clone();
                    g.project.record(OverriderChange {
                        quib: removal.quib,
                        before,
                        after,
                        paths: vec![removal.path.clone()],
                    });
                    g.invalidate_and_redraw_at_path(removal.quib, &removal.path)?;
                }
                for AssignmentToQuib { quib, assignment } in group.overrides {
                    let path = assignment.path.clone();
                    let node = g.node_mut(quib)?;
                    let before = node.overrider.clone();
                    node.overrider.add_assignment(assignment);
                    let after = node.overrider.clone();
                    g.project.record(OverriderChange {
                        quib,
                        before,
                        after,
                        paths: vec![path.clone()],
                    });
                    g.invalidate_and_redraw_at_path(quib, &path)?;
                }
                Ok(())
            })
        })
    }

    pub fn can_undo(&self) -> bool {
        self.project.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.project.can_redo()
    }
}
