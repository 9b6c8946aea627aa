//! `Overrider`: the ordered record of explicit assignments on one quib.
//!
//! Assignments are keyed by path. Re-assigning a path moves it to the end,
//! so it is replayed last. Replay works on a copy of the computed value;
//! stale entries that no longer fit the value are skipped with a warning,
//! except the most recently added one, whose failure is reported.

use super::assignment::{Assignment, AssignmentValue};
use super::template::AssignmentTemplate;
use crate::array::{NdArray, Scalar, Value};
use crate::debug_invariants::DebugInvariants;
use crate::path::{Index, Path, bool_mask_at_path, deep_assigned, deep_get, select_path};
use crate::quib_error::QuibError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Ordered path -> assignment map.
///
/// # Invariants
/// Every key equals the path of the assignment stored under it.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(from = "Vec<Assignment>", into = "Vec<Assignment>")]
pub struct Overrider {
    assignments: IndexMap<Path, Assignment>,
    /// Path of the assignment whose failure must surface.
    active: Option<Path>,
}

/// Equal when the same assignments replay in the same order.
impl PartialEq for Overrider {
    fn eq(&self, other: &Self) -> bool {
        self.assignments.iter().eq(other.assignments.iter())
    }
}

impl From<Vec<Assignment>> for Overrider {
    fn from(list: Vec<Assignment>) -> Self {
        let mut overrider = Overrider::new();
        for a in list {
            overrider.add_assignment(a);
        }
        overrider.active = None;
        overrider
    }
}

impl From<Overrider> for Vec<Assignment> {
    fn from(o: Overrider) -> Self {
        o.assignments.into_values().collect()
    }
}

impl Overrider {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// Assignments in replay order.
    pub fn iter(&self) -> impl Iterator<Item = &Assignment> {
        self.assignments.values()
    }

    pub fn get(&self, path: &Path) -> Option<&Assignment> {
        self.assignments.get(path)
    }

    pub fn index_of(&self, path: &Path) -> Option<usize> {
        self.assignments.get_index_of(path)
    }

    /// Record `assignment`, replacing any earlier one at the same path and
    /// moving it to the end.
    pub fn add_assignment(&mut self, assignment: Assignment) {
        self.assignments.shift_remove(&assignment.path);
        self.active = Some(assignment.path.clone());
        self.assignments.insert(assignment.path.clone(), assignment);
        crate::debug_invariants!(self.validate_invariants(), "Overrider::add_assignment");
    }

    /// Expose the computed value at `path` again. Does nothing (and returns
    /// `None`) when there are no overrides at all.
    pub fn return_assignments_to_default(&mut self, path: &Path) -> Option<Assignment> {
        if self.is_empty() {
            return None;
        }
        let to_default = Assignment::to_default(path.clone());
        self.add_assignment(to_default.clone());
        Some(to_default)
    }

    /// Remove and return the assignment at `path`.
    ///
    /// # Errors
    /// `NoAssignmentFoundAtPath` if nothing is recorded there.
    pub fn pop_assignment_at_path(&mut self, path: &Path) -> Result<Assignment, QuibError> {
        if self.active.as_ref() == Some(path) {
            self.active = None;
        }
        self.assignments
            .shift_remove(path)
            .ok_or_else(|| QuibError::NoAssignmentFoundAtPath { path: path.clone() })
    }

    /// Put `assignment` at position `index` of the replay order.
    pub fn insert_assignment_at_path_and_index(&mut self, assignment: Assignment, index: usize) {
        self.assignments.shift_remove(&assignment.path);
        let index = index.min(self.assignments.len());
        self.assignments.shift_insert(index, assignment.path.clone(), assignment);
    }

    /// Replace the whole record. Returns the paths whose effective
    /// assignment changed; when surviving entries were reordered the whole
    /// value (`[]`) is reported instead.
    pub fn replace_assignments(&mut self, new: Vec<Assignment>) -> Vec<Path> {
        let replacement = Overrider::from(new);
        let old_order: Vec<&Path> = self
            .assignments
            .keys()
            .filter(|p| replacement.assignments.contains_key(*p))
            .collect();
        let new_order: Vec<&Path> = replacement
            .assignments
            .keys()
            .filter(|p| self.assignments.contains_key(*p))
            .collect();
        let changed = if old_order != new_order {
            vec![Path::new()]
        } else {
            let removed = self
                .assignments
                .keys()
                .filter(|p| !replacement.assignments.contains_key(*p));
            let added_or_changed = replacement
                .assignments
                .iter()
                .filter(|(p, a)| self.assignments.get(*p) != Some(a))
                .map(|(p, _)| p);
            removed.chain(added_or_changed).cloned().collect()
        };
        *self = replacement;
        changed
    }

    /// Drop every assignment, returning the paths they covered.
    pub fn clear_assignments(&mut self) -> Vec<Path> {
        self.replace_assignments(Vec::new())
    }

    /// `data` with every assignment replayed in order. Assigned values pass
    /// through `template` when given.
    ///
    /// # Errors
    /// Only the failure of the most recently added assignment is reported;
    /// older entries that no longer apply are skipped.
    pub fn override_value(&mut self, data: &Value, template: Option<&AssignmentTemplate>) -> Result<Value, QuibError> {
        let mut value = data.clone();
        for assignment in self.assignments.values() {
            let attempt = match &assignment.value {
                AssignmentValue::Value(v) => match template {
                    Some(t) => t.convert(v),
                    None => Ok(v.clone()),
                },
                AssignmentValue::Default => deep_get(data, &assignment.path),
            }
            .and_then(|new| deep_assigned(&value, &assignment.path, new));
            match attempt {
                Ok(v) => value = v,
                Err(e) if self.active.as_ref() == Some(&assignment.path) => {
                    self.active = None;
                    return Err(e);
                }
                Err(e) => log::warn!("skipping stale override at {}: {e}", assignment.path),
            }
        }
        self.active = None;
        Ok(value)
    }

    /// Set `true` in `false_mask` wherever an assignment currently applies.
    pub fn fill_override_mask(&self, false_mask: Value) -> Value {
        let mut mask = false_mask;
        for assignment in self.assignments.values() {
            let flag = Value::Scalar(Scalar::Bool(!assignment.is_default()));
            if assignment.path.is_empty() {
                mask = mask.map_scalars(&mut |_| Scalar::Bool(!assignment.is_default()));
                continue;
            }
            match deep_assigned(&mask, &assignment.path, flag) {
                Ok(m) => mask = m,
                Err(e) => log::warn!("override at {} does not fit the mask: {e}", assignment.path),
            }
        }
        mask
    }

    /// Is every cell of `path` (first component, on an array of `shape`)
    /// covered by value assignments replayed after any reset?
    pub fn is_completely_overridden_at_first_component(&self, shape: Option<&[usize]>, path: &Path) -> bool {
        let Some(shape) = shape else {
            return self
                .assignments
                .values()
                .last()
                .is_some_and(|a| a.path.is_empty() && !a.is_default());
        };
        let Ok(target) = bool_mask_at_path(shape, path) else {
            return false;
        };
        let mut covered = NdArray::full(shape.to_vec(), false);
        for assignment in self.assignments.values() {
            let Ok((region, used)) = select_path(shape, &assignment.path) else {
                continue;
            };
            if used < assignment.path.len() {
                continue;
            }
            let set = !assignment.is_default();
            for p in region.positions {
                covered.data_mut()[p] = set;
            }
        }
        target
            .data()
            .iter()
            .zip(covered.data())
            .all(|(&t, &c)| !t || c)
    }

    /// Does any recorded path select cells through a boolean mask? Such
    /// assignments have no literal text form.
    pub fn can_save_as_text(&self) -> bool {
        fn has_mask(index: &Index) -> bool {
            match index {
                Index::Mask(_) => true,
                Index::Tuple(items) => items.iter().any(has_mask),
                _ => false,
            }
        }
        !self
            .assignments
            .keys()
            .any(|p| p.iter().any(|c| has_mask(&c.index)))
    }
}

impl DebugInvariants for Overrider {
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(self.validate_invariants(), "Overrider");
    }

    fn validate_invariants(&self) -> Result<(), QuibError> {
        for (path, assignment) in &self.assignments {
            if path != &assignment.path {
                return Err(QuibError::InvalidArgument(format!(
                    "override keyed at {path} holds an assignment at {}",
                    assignment.path
                )));
            }
        }
        Ok(())
    }
}
