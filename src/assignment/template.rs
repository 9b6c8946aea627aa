//! Coercion of incoming assignment values (bounds, ranges, kinds).

use crate::array::{Scalar, ScalarKind, Value};
use crate::quib_error::QuibError;
use serde::{Deserialize, Serialize};

/// Applied element-wise to every assigned value before it is written.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum AssignmentTemplate {
    /// Clip into `[min, max]`; the result takes the kind of `min`.
    Bound { min: Scalar, max: Scalar },
    /// Snap to `start + k * step` for the nearest `k`, staying within
    /// `[start, stop]`.
    Range { start: Scalar, stop: Scalar, step: Scalar },
    /// Cast to a scalar kind.
    Kind(ScalarKind),
}

fn result_kind(a: Scalar, b: Scalar) -> ScalarKind {
    if a.kind() == ScalarKind::Float || b.kind() == ScalarKind::Float {
        ScalarKind::Float
    } else {
        ScalarKind::Int
    }
}

impl AssignmentTemplate {
    /// Convert `value`.
    ///
    /// # Errors
    /// `InvalidType` for records, which have no numeric reading.
    pub fn convert(&self, value: &Value) -> Result<Value, QuibError> {
        if let Value::Record(_) = value {
            return Err(QuibError::InvalidType {
                expected: "numeric".into(),
                found: value.kind().to_string(),
            });
        }
        Ok(value.map_scalars(&mut |s| self.convert_scalar(s)))
    }

    pub fn convert_scalar(&self, s: Scalar) -> Scalar {
        match *self {
            AssignmentTemplate::Bound { min, max } => {
                let x = s.as_f64().clamp(min.as_f64(), max.as_f64());
                Scalar::Float(x).cast(result_kind(min, max))
            }
            AssignmentTemplate::Range { start, stop, step } => {
                let (a, b, d) = (start.as_f64(), stop.as_f64(), step.as_f64());
                if d == 0.0 {
                    return start;
                }
                let last = ((b - a) / d).floor().max(0.0);
                let k = ((s.as_f64() - a) / d).round().clamp(0.0, last);
                let kind = result_kind(start, step);
                match kind {
                    ScalarKind::Int => match (start.as_i64(), step.as_i64()) {
                        (Some(a), Some(d)) => Scalar::Int(a + d * (k as i64)),
                        _ => Scalar::Float(a + d * k),
                    },
                    _ => Scalar::Float(a + d * k),
                }
            }
            AssignmentTemplate::Kind(kind) => s.cast(kind),
        }
    }
}
