//! Single-flag cache for scalar and opaque results.

use super::{CacheStatus, InvalidateCache, PathCache};
use crate::array::{Value, ValueKind};
use crate::path::Path;
use crate::quib_error::QuibError;

/// A value that is either valid as a whole or not at all.
#[derive(Clone, Debug, PartialEq)]
pub struct HolisticCache {
    value: Value,
    valid: bool,
}

impl HolisticCache {
    pub fn new(value: Value) -> Self {
        HolisticCache { value, valid: false }
    }
}

impl InvalidateCache for HolisticCache {
    fn invalidate_cache(&mut self) {
        self.valid = false;
    }
}

impl PathCache for HolisticCache {
    fn get_uncached_paths(&self, path: &Path) -> Result<Vec<Path>, QuibError> {
        Ok(if self.valid { Vec::new() } else { vec![path.clone()] })
    }

    fn set_valid_value_at_path(&mut self, path: &Path, value: Value) -> Result<(), QuibError> {
        if let Some(first) = path.first() {
            return Err(QuibError::PathCannotHaveComponents {
                kind: "holistic cache".into(),
                component: first.index.to_string(),
            });
        }
        self.value = value;
        self.valid = true;
        Ok(())
    }

    fn set_invalid_at_path(&mut self, _path: &Path) -> Result<(), QuibError> {
        self.valid = false;
        Ok(())
    }

    fn matches_result(&self, value: &Value) -> bool {
        !matches!(value.kind(), ValueKind::Array | ValueKind::List)
    }

    fn value(&self) -> Value {
        self.value.clone()
    }

    fn status(&self) -> CacheStatus {
        if self.valid {
            CacheStatus::AllValid
        } else {
            CacheStatus::AllInvalid
        }
    }
}
