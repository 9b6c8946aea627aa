//! Validity tracking for list results: one valid flag per element.

use super::{CacheStatus, InvalidateCache, PathCache};
use crate::array::Value;
use crate::debug_invariants::DebugInvariants;
use crate::path::{Index, Path, PathComponent, deep_get};
use crate::quib_error::QuibError;

/// Shallow per-element cache of a list value.
///
/// # Invariants
/// `items.len() == valid.len()`.
#[derive(Clone, Debug, PartialEq)]
pub struct ListCache {
    items: Vec<Value>,
    valid: Vec<bool>,
}

impl ListCache {
    pub fn new(items: Vec<Value>) -> Self {
        let valid = vec![false; items.len()];
        ListCache { items, valid }
    }

    fn positions(&self, component: &PathComponent) -> Result<Vec<usize>, QuibError> {
        let len = self.items.len();
        let resolve = |i: isize| -> Result<usize, QuibError> {
            let r = if i < 0 { i + len as isize } else { i };
            if r < 0 || r >= len as isize {
                return Err(QuibError::IndexOutOfBounds { index: i, len });
            }
            Ok(r as usize)
        };
        match &component.index {
            Index::Int(i) => Ok(vec![resolve(*i)?]),
            Index::Slice(s) => Ok(s.resolve(len)),
            Index::Indices(ix) => ix.iter().map(|&i| resolve(i)).collect(),
            Index::All => Ok((0..len).collect()),
            Index::Mask(m) if m.shape() == [len] => Ok(m.true_positions()),
            _ => Err(QuibError::PathCannotHaveComponents {
                kind: "list cache".into(),
                component: component.index.to_string(),
            }),
        }
    }
}

impl InvalidateCache for ListCache {
    fn invalidate_cache(&mut self) {
        self.valid.iter_mut().for_each(|v| *v = false);
    }
}

impl PathCache for ListCache {
    fn get_uncached_paths(&self, path: &Path) -> Result<Vec<Path>, QuibError> {
        let positions = match path.first() {
            Some(first) => self.positions(first)?,
            None => (0..self.items.len()).collect(),
        };
        let invalid: Vec<usize> = positions.iter().copied().filter(|&p| !self.valid[p]).collect();
        Ok(if invalid.is_empty() {
            Vec::new()
        } else if invalid.len() == positions.len() {
            vec![path.clone()]
        } else {
            vec![Path::of(Index::Indices(invalid.into_iter().map(|p| p as isize).collect()))]
        })
    }

    fn set_valid_value_at_path(&mut self, path: &Path, value: Value) -> Result<(), QuibError> {
        let Some(first) = path.first() else {
            match value {
                Value::List(items) if items.len() == self.items.len() => {
                    self.items = items;
                    self.valid.iter_mut().for_each(|v| *v = true);
                    return Ok(());
                }
                other => {
                    return Err(QuibError::InvalidType {
                        expected: format!("list of length {}", self.items.len()),
                        found: other.kind().to_string(),
                    });
                }
            }
        };
        if path.len() > 1 {
            return Err(QuibError::PathCannotHaveComponents {
                kind: "list cache".into(),
                component: path[1].index.to_string(),
            });
        }
        let positions = self.positions(first)?;
        let single = matches!(first.index, Index::Int(_));
        for (k, p) in positions.into_iter().enumerate() {
            self.items[p] = if single {
                value.clone()
            } else {
                deep_get(&value, &[PathComponent::new(Index::Int(k as isize))])?
            };
            self.valid[p] = true;
        }
        crate::debug_invariants!(self.validate_invariants(), "ListCache::set_valid_value_at_path");
        Ok(())
    }

    fn set_invalid_at_path(&mut self, path: &Path) -> Result<(), QuibError> {
        match path.first() {
            None => self.invalidate_cache(),
            Some(first) => {
                for p in self.positions(first)? {
                    self.valid[p] = false;
                }
            }
        }
        Ok(())
    }

    fn matches_result(&self, value: &Value) -> bool {
        matches!(value, Value::List(items) if items.len() == self.items.len())
    }

    fn value(&self) -> Value {
        Value::List(self.items.clone())
    }

    fn status(&self) -> CacheStatus {
        if self.valid.iter().all(|&v| v) {
            CacheStatus::AllValid
        } else if self.valid.iter().any(|&v| v) {
            CacheStatus::Partial
        } else {
            CacheStatus::AllInvalid
        }
    }
}

impl DebugInvariants for ListCache {
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(self.validate_invariants(), "ListCache");
    }

    fn validate_invariants(&self) -> Result<(), QuibError> {
        if self.items.len() != self.valid.len() {
            return Err(QuibError::ShapeMismatch {
                expected: vec![self.items.len()],
                found: vec![self.valid.len()],
            });
        }
        Ok(())
    }
}
