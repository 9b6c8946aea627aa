//! Validity tracking for array results: one valid flag per cell.

use super::{CacheStatus, InvalidateCache, PathCache};
use crate::array::{NdArray, Scalar, Value};
use crate::debug_invariants::DebugInvariants;
use crate::path::access::scatter;
use crate::path::{Path, PathComponent, select};
use crate::quib_error::QuibError;

/// Last known array value plus a same-shaped mask of valid cells.
///
/// # Invariants
/// `valid.shape() == value.shape()`.
#[derive(Clone, Debug, PartialEq)]
pub struct ArrayCache {
    value: NdArray<Scalar>,
    valid: NdArray<bool>,
}

impl ArrayCache {
    /// Cache shaped like `value` with nothing valid yet.
    pub fn new(value: NdArray<Scalar>) -> Self {
        let valid = NdArray::full(value.shape().to_vec(), false);
        ArrayCache { value, valid }
    }

    pub fn shape(&self) -> &[usize] {
        self.value.shape()
    }

    pub fn valid_mask(&self) -> &NdArray<bool> {
        &self.valid
    }

    fn shallow(path: &Path) -> Result<&PathComponent, QuibError> {
        match path.components() {
            [first] => Ok(first),
            [_, second, ..] => Err(QuibError::PathCannotHaveComponents {
                kind: "array cache".into(),
                component: second.index.to_string(),
            }),
            [] => Err(QuibError::InvalidArgument("expected a non-empty path".into())),
        }
    }
}

impl InvalidateCache for ArrayCache {
    fn invalidate_cache(&mut self) {
        self.valid = NdArray::full(self.valid.shape().to_vec(), false);
    }
}

impl PathCache for ArrayCache {
    fn get_uncached_paths(&self, path: &Path) -> Result<Vec<Path>, QuibError> {
        let Some(first) = path.first() else {
            return Ok(match self.status() {
                CacheStatus::AllValid => Vec::new(),
                CacheStatus::AllInvalid => vec![Path::new()],
                CacheStatus::Partial => vec![Path::from(vec![PathComponent::mask(self.valid.not())])],
            });
        };
        let selection = select(self.shape(), &first.index)?;
        let valid = self.valid.data();
        let invalid: Vec<usize> = selection.positions.iter().copied().filter(|&p| !valid[p]).collect();
        if invalid.is_empty() {
            return Ok(Vec::new());
        }
        if invalid.len() == selection.positions.len() {
            return Ok(vec![path.clone()]);
        }
        let mut mask = NdArray::full(self.shape().to_vec(), false);
        for p in invalid {
            mask.data_mut()[p] = true;
        }
        Ok(vec![Path::from(vec![PathComponent::mask(mask)])])
    }

    fn set_valid_value_at_path(&mut self, path: &Path, value: Value) -> Result<(), QuibError> {
        if path.is_empty() {
            let array = value.as_ndarray()?;
            if array.shape() != self.shape() {
                return Err(QuibError::ShapeMismatch {
                    expected: self.shape().to_vec(),
                    found: array.shape().to_vec(),
                });
            }
            self.value = array;
            self.valid = NdArray::full(self.shape().to_vec(), true);
        } else {
            let first = Self::shallow(path)?;
            scatter(&mut self.value, &first.index, &value)?;
            let positions = select(self.shape(), &first.index)?.positions;
            let valid = self.valid.data_mut();
            for p in positions {
                valid[p] = true;
            }
        }
        crate::debug_invariants!(self.validate_invariants(), "ArrayCache::set_valid_value_at_path");
        Ok(())
    }

    fn set_invalid_at_path(&mut self, path: &Path) -> Result<(), QuibError> {
        let Some(first) = path.first() else {
            self.invalidate_cache();
            return Ok(());
        };
        let positions = select(self.shape(), &first.index)?.positions;
        let valid = self.valid.data_mut();
        for p in positions {
            valid[p] = false;
        }
        Ok(())
    }

    fn matches_result(&self, value: &Value) -> bool {
        matches!(value, Value::Array(a) if a.shape() == self.shape())
    }

    fn value(&self) -> Value {
        Value::Array(self.value.clone())
    }

    fn status(&self) -> CacheStatus {
        if self.valid.all() {
            CacheStatus::AllValid
        } else if !self.valid.any() {
            CacheStatus::AllInvalid
        } else {
            CacheStatus::Partial
        }
    }
}

impl DebugInvariants for ArrayCache {
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(self.validate_invariants(), "ArrayCache");
    }

    fn validate_invariants(&self) -> Result<(), QuibError> {
        if self.valid.shape() != self.value.shape() {
            return Err(QuibError::ShapeMismatch {
                expected: self.value.shape().to_vec(),
                found: self.valid.shape().to_vec(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::Index;

    fn cache() -> ArrayCache {
        ArrayCache::new(NdArray::from_vec(vec![Scalar::Int(0); 4]))
    }

    #[test]
    fn empty_path_on_fresh_cache_is_unchanged() {
        let c = cache();
        assert_eq!(c.get_uncached_paths(&Path::new()).unwrap(), vec![Path::new()]);
        assert_eq!(c.status(), CacheStatus::AllInvalid);
    }

    #[test]
    fn valid_then_invalid_round_trip() {
        let mut c = cache();
        let p = Path::of(2);
        c.set_valid_value_at_path(&p, Value::from(7)).unwrap();
        assert!(c.get_uncached_paths(&p).unwrap().is_empty());
        assert_eq!(c.status(), CacheStatus::Partial);
        c.set_invalid_at_path(&p).unwrap();
        assert_eq!(c.get_uncached_paths(&p).unwrap(), vec![p]);
    }

    #[test]
    fn partial_request_returns_mask_of_invalid_cells() {
        let mut c = cache();
        c.set_valid_value_at_path(&Path::of(1), Value::from(1)).unwrap();
        let uncached = c.get_uncached_paths(&Path::of(Index::slice(Some(0), Some(3)))).unwrap();
        assert_eq!(uncached.len(), 1);
        match &uncached[0][0].index {
            Index::Mask(m) => assert_eq!(m.data(), &[true, false, true, false]),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn deep_paths_cannot_divide_a_shallow_cache() {
        let mut c = cache();
        let deep = Path::of(0).with(PathComponent::new(0));
        assert!(matches!(
            c.set_valid_value_at_path(&deep, Value::from(1)),
            Err(QuibError::PathCannotHaveComponents { .. })
        ));
    }
}
