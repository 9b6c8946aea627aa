//! Scalar cell values with numpy-like promotion rules.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Kind of a scalar, used for casting written values to the kind of the cell
/// they replace.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ScalarKind {
    Bool,
    Int,
    Float,
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarKind::Bool => f.write_str("bool"),
            ScalarKind::Int => f.write_str("int"),
            ScalarKind::Float => f.write_str("float"),
        }
    }
}

/// A single cell value.
///
/// Equality is numeric across kinds (`Int(3) == Float(3.0)`), matching how
/// array elements compare after promotion.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
}

impl Scalar {
    #[inline]
    pub fn kind(&self) -> ScalarKind {
        match self {
            Scalar::Bool(_) => ScalarKind::Bool,
            Scalar::Int(_) => ScalarKind::Int,
            Scalar::Float(_) => ScalarKind::Float,
        }
    }

    #[inline]
    pub fn as_f64(&self) -> f64 {
        match *self {
            Scalar::Bool(b) => f64::from(u8::from(b)),
            Scalar::Int(i) => i as f64,
            Scalar::Float(x) => x,
        }
    }

    /// Integer value, if this scalar is integral (floats must have no
    /// fractional part).
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Scalar::Bool(b) => Some(i64::from(b)),
            Scalar::Int(i) => Some(i),
            Scalar::Float(x) if x.fract() == 0.0 && x.is_finite() => num_traits::cast(x),
            Scalar::Float(_) => None,
        }
    }

    #[inline]
    pub fn is_truthy(&self) -> bool {
        match *self {
            Scalar::Bool(b) => b,
            Scalar::Int(i) => i != 0,
            Scalar::Float(x) => x != 0.0,
        }
    }

    /// Convert to `kind`; floats written into integer cells truncate.
    pub fn cast(self, kind: ScalarKind) -> Scalar {
        match kind {
            ScalarKind::Bool => Scalar::Bool(self.is_truthy()),
            ScalarKind::Int => match self {
                Scalar::Float(x) => Scalar::Int(num_traits::cast(x.trunc()).unwrap_or(0)),
                other => Scalar::Int(other.as_i64().unwrap_or(0)),
            },
            ScalarKind::Float => Scalar::Float(self.as_f64()),
        }
    }

    /// Cast to the kind of `cell`, the value this scalar is replacing.
    #[inline]
    pub fn cast_like(self, cell: &Scalar) -> Scalar {
        self.cast(cell.kind())
    }

    /// Combine two scalars: integer arithmetic when both are non-float and
    /// `int_op` is defined, float arithmetic otherwise.
    pub fn combine(
        a: Scalar,
        b: Scalar,
        int_op: impl Fn(i64, i64) -> Option<i64>,
        float_op: impl Fn(f64, f64) -> f64,
    ) -> Scalar {
        if a.kind() != ScalarKind::Float && b.kind() != ScalarKind::Float {
            if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
                if let Some(r) = int_op(x, y) {
                    return Scalar::Int(r);
                }
            }
        }
        Scalar::Float(float_op(a.as_f64(), b.as_f64()))
    }

    /// Total order used by `sort`: NaN sorts last.
    pub fn total_cmp(&self, other: &Scalar) -> Ordering {
        match (self, other) {
            (Scalar::Int(a), Scalar::Int(b)) => a.cmp(b),
            _ => self.as_f64().total_cmp(&other.as_f64()),
        }
    }
}

impl PartialEq for Scalar {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Scalar::Int(a), Scalar::Int(b)) => a == b,
            (Scalar::Bool(a), Scalar::Bool(b)) => a == b,
            _ => self.as_f64() == other.as_f64(),
        }
    }
}

impl Default for Scalar {
    fn default() -> Self {
        Scalar::Int(0)
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(true) => f.write_str("True"),
            Scalar::Bool(false) => f.write_str("False"),
            Scalar::Int(i) => write!(f, "{i}"),
            Scalar::Float(x) => write!(f, "{x:?}"),
        }
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Scalar::Bool(b)
    }
}

impl From<i64> for Scalar {
    fn from(i: i64) -> Self {
        Scalar::Int(i)
    }
}

impl From<i32> for Scalar {
    fn from(i: i32) -> Self {
        Scalar::Int(i64::from(i))
    }
}

impl From<usize> for Scalar {
    fn from(i: usize) -> Self {
        Scalar::Int(i as i64)
    }
}

impl From<f64> for Scalar {
    fn from(x: f64) -> Self {
        Scalar::Float(x)
    }
}
