//! Undo/redo history of override changes.
//!
//! Every change to a quib's [`Overrider`] is recorded as a before/after
//! snapshot. Changes made inside an undo group form one step.

use crate::assignment::Overrider;
use crate::path::Path;
use crate::quib::QuibId;

/// One overrider change on one quib.
#[derive(Clone, Debug, PartialEq)]
pub struct OverriderChange {
    pub quib: QuibId,
    pub before: Overrider,
    pub after: Overrider,
    /// Region of the quib's value the change affects.
    pub paths: Vec<Path>,
}

/// Undo and redo stacks plus the group being recorded.
#[derive(Clone, Debug, Default)]
pub struct Project {
    undo: Vec<Vec<OverriderChange>>,
    redo: Vec<Vec<OverriderChange>>,
    open: Vec<OverriderChange>,
    depth: usize,
}

impl Project {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Number of undoable steps.
    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    pub(crate) fn begin_group(&mut self) {
        self.depth += 1;
    }

    /// Close a group; the outermost close turns the collected changes into
    /// one step.
    pub(crate) fn end_group(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        if self.depth == 0 && !self.open.is_empty() {
            self.undo.push(std::mem::take(&mut self.open));
        }
    }

    /// Record a change; any new change discards the redo history.
    pub(crate) fn record(&mut self, change: OverriderChange) {
        if change.before == change.after {
            return;
        }
        self.redo.clear();
        if self.depth > 0 {
            self.open.push(change);
        } else {
            self.undo.push(vec![change]);
        }
    }

    pub(crate) fn pop_undo(&mut self) -> Option<Vec<OverriderChange>> {
        let step = self.undo.pop()?;
        self.redo.push(step.clone());
        Some(step)
    }

    pub(crate) fn pop_redo(&mut self) -> Option<Vec<OverriderChange>> {
        let step = self.redo.pop()?;
        self.undo.push(step.clone());
        Some(step)
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
        self.open.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assignment::Assignment;

    fn change(q: usize, v: i32) -> OverriderChange {
        let mut after = Overrider::new();
        after.add_assignment(Assignment::new(Path::of(0), v));
        OverriderChange {
            quib: QuibId(q),
            before: Overrider::new(),
            after,
            paths: vec![Path::of(0)],
        }
    }

    #[test]
    fn groups_collapse_into_one_step() {
        let mut project = Project::new();
        project.begin_group();
        project.record(change(0, 1));
        project.begin_group();
        project.record(change(1, 2));
        project.end_group();
        assert!(!project.can_undo());
        project.end_group();
        assert_eq!(project.undo_len(), 1);
        assert_eq!(project.pop_undo().map(|s| s.len()), Some(2));
        assert!(project.can_redo());
    }

    #[test]
    fn new_changes_clear_redo_and_noops_are_skipped() {
        let mut project = Project::new();
        project.record(change(0, 1));
        project.pop_undo();
        project.record(OverriderChange {
            quib: QuibId(0),
            before: Overrider::new(),
            after: Overrider::new(),
            paths: Vec::new(),
        });
        assert!(project.can_redo());
        project.record(change(0, 2));
        assert!(!project.can_redo());
    }
}
