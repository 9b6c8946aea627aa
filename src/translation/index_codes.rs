//! Index-code arrays: generic translation through rearranging functions.
//!
//! The focal source is replaced by an array holding each cell's own linear
//! index and every other data argument by sentinels; running the real
//! function on these codes shows which source cell lands on each result
//! cell. This is only sound for functions that move, copy or drop elements
//! without computing on them (reshape, transpose, concatenate, tile,
//! indexing and the like).

use super::source::{SourceArg, SourceFuncCall, SourceId};
use super::Untranslatable;
use crate::array::{NdArray, Scalar, Value};
use crate::path::bool_mask_at_path;
use crate::path::PathComponent;

/// Placeholder for a cell outside the region of interest.
pub const NON_CHOSEN_ELEMENT: i64 = -1;
/// Cell belonging to a data argument other than the focal one.
pub const OTHERS_ELEMENT: i64 = -2;
/// A scalar data argument that is not the focal source.
pub const SCALAR_NOT_CONTAINING_FOCAL_SOURCE: i64 = -3;
/// The focal source itself is a scalar.
pub const FOCAL_SOURCE_SCALAR: i64 = -4;

/// Meaning of one result code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IndexCode {
    /// Linear index into the focal source.
    Focal(usize),
    NonChosen,
    Others,
    ScalarNotContainingFocal,
    FocalSourceScalar,
}

impl IndexCode {
    pub fn from_code(code: i64) -> Option<IndexCode> {
        match code {
            c if c >= 0 => Some(IndexCode::Focal(c as usize)),
            NON_CHOSEN_ELEMENT => Some(IndexCode::NonChosen),
            OTHERS_ELEMENT => Some(IndexCode::Others),
            SCALAR_NOT_CONTAINING_FOCAL_SOURCE => Some(IndexCode::ScalarNotContainingFocal),
            FOCAL_SOURCE_SCALAR => Some(IndexCode::FocalSourceScalar),
            _ => None,
        }
    }
}

fn is_scalar_like(value: &Value) -> bool {
    value.shape().is_some_and(|s| s.is_empty())
}

/// Code array standing in for one data value.
pub(crate) fn encode(value: &Value, focal: bool) -> Result<Value, Untranslatable> {
    if is_scalar_like(value) {
        let code = if focal {
            FOCAL_SOURCE_SCALAR
        } else {
            SCALAR_NOT_CONTAINING_FOCAL_SOURCE
        };
        return Ok(Value::Scalar(Scalar::Int(code)));
    }
    let shape = value.to_ndarray().ok_or(Untranslatable::Failed)?.shape().to_vec();
    let n = crate::array::shape_size(&shape) as i64;
    let data: Vec<Scalar> = if focal {
        (0..n).map(Scalar::Int).collect()
    } else {
        vec![Scalar::Int(OTHERS_ELEMENT); n as usize]
    };
    Ok(Value::Array(NdArray::from_shape_vec(shape, data)?))
}

/// Run the call with `focal` encoded and every other data leaf marked as
/// foreign; returns the code array of the result.
pub(crate) fn result_codes(call: &SourceFuncCall, focal: SourceId) -> Result<NdArray<i64>, Untranslatable> {
    let result = call.run_mapped(|arg, is_data| match (arg, is_data) {
        (SourceArg::Source(id), true) => encode(call.value_of(*id)?, *id == focal),
        (other, true) => encode(&call.concrete(other)?, false),
        (other, false) => call.concrete(other),
    })?;
    let array = result.to_ndarray().ok_or(Untranslatable::Failed)?;
    let codes = array.data().iter().map(Scalar::as_i64).collect::<Option<Vec<_>>>();
    Ok(NdArray::from_shape_vec(array.shape().to_vec(), codes.ok_or(Untranslatable::Failed)?)?)
}

/// Boolean stand-in for a data value: `true` where `path` reaches in the
/// focal source, `false` everywhere else.
pub(crate) fn encode_mask(value: &Value, path: Option<&[PathComponent]>) -> Result<Value, Untranslatable> {
    let shape = value.shape().ok_or(Untranslatable::Failed)?;
    let mask = match path {
        Some(path) => bool_mask_at_path(&shape, path)?,
        None => NdArray::full(shape, false),
    };
    let scalars = mask.map(|&b| Scalar::Bool(b));
    Ok(if matches!(value, Value::Scalar(_)) {
        Value::Scalar(scalars.item().copied().unwrap_or_default())
    } else {
        Value::Array(scalars)
    })
}

/// Run the call on boolean stand-ins and read back which result cells the
/// changed region reaches.
pub(crate) fn result_mask(call: &SourceFuncCall, focal: SourceId, path: &[PathComponent]) -> Result<NdArray<bool>, Untranslatable> {
    let result = call.run_mapped(|arg, is_data| match (arg, is_data) {
        (SourceArg::Source(id), true) => {
            encode_mask(call.value_of(*id)?, (*id == focal).then_some(path))
        }
        (other, true) => encode_mask(&call.concrete(other)?, None),
        (other, false) => call.concrete(other),
    })?;
    let array = result.to_ndarray().ok_or(Untranslatable::Failed)?;
    Ok(array.map(Scalar::is_truthy))
}

/// Source cells reached from the selected result cells.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FocalHits {
    None,
    /// The source is a scalar and it was reached.
    WholeScalar,
    /// Linear source positions, in the order first reached.
    Positions(Vec<usize>),
}

/// Scan the codes at `result_positions` (in order) and collect the focal
/// source cells they point to, first occurrence only.
pub fn focal_hits(codes: &NdArray<i64>, result_positions: &[usize]) -> FocalHits {
    let mut seen = hashbrown::HashSet::new();
    let mut positions = Vec::new();
    for &p in result_positions {
        match codes.data().get(p).copied().and_then(IndexCode::from_code) {
            Some(IndexCode::FocalSourceScalar) => return FocalHits::WholeScalar,
            Some(IndexCode::Focal(i)) => {
                if seen.insert(i) {
                    positions.push(i);
                }
            }
            _ => {}
        }
    }
    if positions.is_empty() {
        FocalHits::None
    } else {
        FocalHits::Positions(positions)
    }
}

/// Mask of `shape` that is `true` at `positions`.
pub fn positions_to_mask(shape: &[usize], positions: &[usize]) -> NdArray<bool> {
    let mut mask = NdArray::full(shape.to_vec(), false);
    let data = mask.data_mut();
    for &p in positions {
        if let Some(cell) = data.get_mut(p) {
            *cell = true;
        }
    }
    mask
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn focal_arrays_carry_their_positions() {
        let v = Value::from_shape(&[2, 2], vec![9, 9, 9, 9]).unwrap();
        let codes = encode(&v, true).unwrap();
        assert_eq!(codes, Value::from_shape(&[2, 2], vec![0i64, 1, 2, 3]).unwrap());
        assert_eq!(encode(&Value::from(1.5), true).unwrap(), Value::from(FOCAL_SOURCE_SCALAR));
        assert_eq!(
            encode(&Value::from(vec![1, 2]), false).unwrap(),
            Value::from(vec![OTHERS_ELEMENT, OTHERS_ELEMENT])
        );
    }

    #[test]
    fn first_occurrence_wins() {
        let codes = NdArray::from_vec(vec![1i64, OTHERS_ELEMENT, 1, 0]);
        assert_eq!(focal_hits(&codes, &[0, 1, 2, 3]), FocalHits::Positions(vec![1, 0]));
        assert_eq!(focal_hits(&codes, &[1]), FocalHits::None);
        let scalar = NdArray::from_vec(vec![FOCAL_SOURCE_SCALAR; 3]);
        assert_eq!(focal_hits(&scalar, &[2]), FocalHits::WholeScalar);
    }
}
