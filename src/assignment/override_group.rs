//! Batches of quib changes applied as one step.

use super::assignment::Assignment;
use crate::path::Path;
use crate::quib::QuibId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An assignment bound for a specific quib.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AssignmentToQuib {
    pub quib: QuibId,
    pub assignment: Assignment,
}

impl AssignmentToQuib {
    pub fn new(quib: QuibId, assignment: Assignment) -> Self {
        AssignmentToQuib { quib, assignment }
    }
}

impl fmt::Display for AssignmentToQuib {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.quib, self.assignment)
    }
}

/// Reset `quib` to its computed value at `path`, so a change made upstream
/// shows through an earlier explicit override.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideRemoval {
    pub quib: QuibId,
    pub path: Path,
}

impl OverrideRemoval {
    pub fn new(quib: QuibId, path: Path) -> Self {
        OverrideRemoval { quib, path }
    }
}

/// Overrides plus the removals they need, applied together: removals
/// first, then overrides, then one aggregated invalidation pass.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OverrideGroup {
    pub overrides: Vec<AssignmentToQuib>,
    pub removals: Vec<OverrideRemoval>,
}

impl OverrideGroup {
    pub fn new(overrides: Vec<AssignmentToQuib>, removals: Vec<OverrideRemoval>) -> Self {
        OverrideGroup { overrides, removals }
    }

    /// A group with a single override and no removals.
    pub fn single(quib: QuibId, assignment: Assignment) -> Self {
        OverrideGroup {
            overrides: vec![AssignmentToQuib::new(quib, assignment)],
            removals: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.overrides.is_empty() && self.removals.is_empty()
    }

    pub fn extend(&mut self, other: OverrideGroup) {
        self.overrides.extend(other.overrides);
        self.removals.extend(other.removals);
    }

    /// Every quib the group touches, removals first, without repeats.
    pub fn quibs(&self) -> Vec<QuibId> {
        let mut out: Vec<QuibId> = Vec::new();
        let touched = self
            .removals
            .iter()
            .map(|r| r.quib)
            .chain(self.overrides.iter().map(|o| o.quib));
        for q in touched {
            if !out.contains(&q) {
                out.push(q);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quibs_are_listed_once_removals_first() {
        let mut group = OverrideGroup::single(QuibId(2), Assignment::new(Path::of(0), 1));
        group.extend(OverrideGroup::new(
            vec![AssignmentToQuib::new(QuibId(3), Assignment::new(Path::new(), 5))],
            vec![OverrideRemoval::new(QuibId(1), Path::new()), OverrideRemoval::new(QuibId(2), Path::new())],
        ));
        assert_eq!(group.quibs(), vec![QuibId(1), QuibId(2), QuibId(3)]);
        assert!(!group.is_empty());
        assert!(OverrideGroup::default().is_empty());
    }
}
