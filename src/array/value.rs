//! `Value`: the data a quib computes, from scalars and arrays to lists and records.

use super::ndarray::NdArray;
use super::scalar::Scalar;
use crate::quib_error::QuibError;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Variant name of a [`Value`], reported by `get_type`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    Scalar,
    Array,
    List,
    Record,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ValueKind::Scalar => "scalar",
            ValueKind::Array => "array",
            ValueKind::List => "list",
            ValueKind::Record => "record",
        };
        f.write_str(s)
    }
}

/// A (possibly nested) computed value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Scalar(Scalar),
    Array(NdArray<Scalar>),
    List(Vec<Value>),
    Record(BTreeMap<String, Value>),
}

impl Value {
    #[inline]
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Scalar(_) => ValueKind::Scalar,
            Value::Array(_) => ValueKind::Array,
            Value::List(_) => ValueKind::List,
            Value::Record(_) => ValueKind::Record,
        }
    }

    /// Array of the given shape.
    ///
    /// # Errors
    /// `ShapeMismatch` if `data` does not fill `shape`.
    pub fn from_shape<S: Into<Scalar>>(shape: &[usize], data: Vec<S>) -> Result<Self, QuibError> {
        let data = data.into_iter().map(Into::into).collect();
        Ok(Value::Array(NdArray::from_shape_vec(shape.to_vec(), data)?))
    }

    pub fn record<K: Into<String>>(fields: impl IntoIterator<Item = (K, Value)>) -> Self {
        Value::Record(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn as_scalar(&self) -> Option<Scalar> {
        match self {
            Value::Scalar(s) => Some(*s),
            Value::Array(a) if a.ndim() == 0 => a.item().copied(),
            _ => None,
        }
    }

    /// View as an array: scalars become 0-d, rectangular lists of numbers are
    /// stacked. Records and ragged lists have no array form.
    pub fn to_ndarray(&self) -> Option<NdArray<Scalar>> {
        match self {
            Value::Scalar(s) => Some(NdArray::scalar(*s)),
            Value::Array(a) => Some(a.clone()),
            Value::List(items) => {
                let parts: Vec<NdArray<Scalar>> = items.iter().map(Value::to_ndarray).collect::<Option<_>>()?;
                let inner: Vec<usize> = parts.first().map(|p| p.shape().to_vec()).unwrap_or_default();
                if parts.iter().any(|p| p.shape() != inner.as_slice()) {
                    return None;
                }
                let mut shape = vec![parts.len()];
                shape.extend_from_slice(&inner);
                let data = parts.into_iter().flat_map(NdArray::into_data).collect();
                NdArray::from_shape_vec(shape, data).ok()
            }
            Value::Record(_) => None,
        }
    }

    /// Like [`to_ndarray`](Self::to_ndarray) but reports a typed error.
    pub fn as_ndarray(&self) -> Result<NdArray<Scalar>, QuibError> {
        self.to_ndarray().ok_or_else(|| QuibError::InvalidType {
            expected: "array-like".into(),
            found: self.kind().to_string(),
        })
    }

    /// Shape of the array form, or `[len]` for a ragged list; `None` for
    /// records.
    pub fn shape(&self) -> Option<Vec<usize>> {
        match self {
            Value::Scalar(_) => Some(Vec::new()),
            Value::Array(a) => Some(a.shape().to_vec()),
            Value::List(items) => Some(
                self.to_ndarray()
                    .map(|a| a.shape().to_vec())
                    .unwrap_or_else(|| vec![items.len()]),
            ),
            Value::Record(_) => None,
        }
    }

    /// Rough in-memory footprint, used by the automatic caching heuristic.
    pub fn approx_size_bytes(&self) -> usize {
        match self {
            Value::Scalar(_) => std::mem::size_of::<Scalar>(),
            Value::Array(a) => a.len() * std::mem::size_of::<Scalar>(),
            Value::List(items) => items.iter().map(Value::approx_size_bytes).sum::<usize>() + std::mem::size_of::<Value>(),
            Value::Record(fields) => fields
                .iter()
                .map(|(k, v)| k.len() + v.approx_size_bytes())
                .sum(),
        }
    }

    /// Apply `f` to every scalar leaf, keeping the structure.
    pub fn map_scalars(&self, f: &mut impl FnMut(Scalar) -> Scalar) -> Value {
        match self {
            Value::Scalar(s) => Value::Scalar(f(*s)),
            Value::Array(a) => Value::Array(a.map(|s| f(*s))),
            Value::List(items) => Value::List(items.iter().map(|v| v.map_scalars(f)).collect()),
            Value::Record(fields) => Value::Record(
                fields.iter().map(|(k, v)| (k.clone(), v.map_scalars(f))).collect(),
            ),
        }
    }

    /// Same structure with every scalar replaced by `false`: the starting
    /// point of an override mask.
    pub fn false_mask(&self) -> Value {
        self.map_scalars(&mut |_| Scalar::Bool(false))
    }

    /// Rebuild `array` with the nesting of `template`: a list template gets a
    /// list back, anything else gets the array (or its scalar when 0-d).
    pub fn like(template: &Value, array: NdArray<Scalar>) -> Value {
        match template {
            Value::List(_) => nested_list(&array),
            Value::Scalar(_) if array.ndim() == 0 => Value::Scalar(array.item().copied().unwrap_or_default()),
            _ => Value::Array(array),
        }
    }
}

fn nested_list(array: &NdArray<Scalar>) -> Value {
    match array.shape() {
        [] => Value::Scalar(array.item().copied().unwrap_or_default()),
        [_] => Value::List(array.iter().copied().map(Value::Scalar).collect()),
        [n, rest @ ..] => {
            let chunk = rest.iter().product::<usize>();
            Value::List(
                (0..*n)
                    .map(|i| {
                        let data = array.data()[i * chunk..(i + 1) * chunk].to_vec();
                        match NdArray::from_shape_vec(rest.to_vec(), data) {
                            Ok(sub) => nested_list(&sub),
                            Err(_) => Value::List(Vec::new()),
                        }
                    })
                    .collect(),
            )
        }
    }
}

fn fmt_array(f: &mut fmt::Formatter<'_>, shape: &[usize], data: &[Scalar]) -> fmt::Result {
    match shape {
        [] => write!(f, "{}", data.first().copied().unwrap_or_default()),
        [_] => write!(f, "[{}]", data.iter().join(", ")),
        [n, rest @ ..] => {
            let chunk = rest.iter().product::<usize>();
            f.write_str("[")?;
            for i in 0..*n {
                if i > 0 {
                    f.write_str(", ")?;
                }
                fmt_array(f, rest, &data[i * chunk..(i + 1) * chunk])?;
            }
            f.write_str("]")
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Scalar(s) => write!(f, "{s}"),
            Value::Array(a) => fmt_array(f, a.shape(), a.data()),
            Value::List(items) => write!(f, "[{}]", items.iter().join(", ")),
            Value::Record(fields) => write!(
                f,
                "{{{}}}",
                fields.iter().map(|(k, v)| format!("{k:?}: {v}")).join(", ")
            ),
        }
    }
}

impl From<Scalar> for Value {
    fn from(s: Scalar) -> Self {
        Value::Scalar(s)
    }
}

impl From<NdArray<Scalar>> for Value {
    fn from(a: NdArray<Scalar>) -> Self {
        Value::Array(a)
    }
}

impl From<NdArray<bool>> for Value {
    fn from(a: NdArray<bool>) -> Self {
        Value::Array(a.map(|&b| Scalar::Bool(b)))
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

macro_rules! value_from_native {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(x: $t) -> Self {
                    Value::Scalar(Scalar::from(x))
                }
            }

            impl From<Vec<$t>> for Value {
                fn from(xs: Vec<$t>) -> Self {
                    Value::Array(NdArray::from_vec(xs.into_iter().map(Scalar::from).collect()))
                }
            }
        )*
    };
}

value_from_native!(bool, i32, i64, f64);
