//! A single write into a quib's value.

use crate::array::Value;
use crate::path::Path;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What to write: a concrete value, or "show the computed value again".
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum AssignmentValue {
    Value(Value),
    Default,
}

/// Write `value` at `path`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub path: Path,
    pub value: AssignmentValue,
}

impl Assignment {
    pub fn new(path: Path, value: impl Into<Value>) -> Self {
        Assignment {
            path,
            value: AssignmentValue::Value(value.into()),
        }
    }

    /// Undo any override at `path`, exposing the computed value there.
    pub fn to_default(path: Path) -> Self {
        Assignment {
            path,
            value: AssignmentValue::Default,
        }
    }

    pub fn value(&self) -> Option<&Value> {
        match &self.value {
            AssignmentValue::Value(v) => Some(v),
            AssignmentValue::Default => None,
        }
    }

    #[inline]
    pub fn is_default(&self) -> bool {
        matches!(self.value, AssignmentValue::Default)
    }
}

impl fmt::Display for Assignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            AssignmentValue::Value(v) => write!(f, "{} = {v}", self.path),
            AssignmentValue::Default => write!(f, "{} = default", self.path),
        }
    }
}
