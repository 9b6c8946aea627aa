//! Standard array broadcasting: trailing-dimension alignment, size-1 axes
//! stretch.

use super::ndarray::{NdArray, ravel_index, shape_size, unravel_index};
use crate::quib_error::QuibError;

/// Broadcast result shape of `shapes`.
///
/// # Errors
/// `ShapeMismatch` if two extents differ and neither is 1.
pub fn broadcast_shapes<'a>(shapes: impl IntoIterator<Item = &'a [usize]>) -> Result<Vec<usize>, QuibError> {
    let mut out: Vec<usize> = Vec::new();
    for shape in shapes {
        if shape.len() > out.len() {
            let mut padded = vec![1; shape.len() - out.len()];
            padded.extend_from_slice(&out);
            out = padded;
        }
        let offset = out.len() - shape.len();
        for (ax, &n) in shape.iter().enumerate() {
            let slot = &mut out[offset + ax];
            if *slot == 1 {
                *slot = n;
            } else if n != 1 && n != *slot {
                return Err(QuibError::ShapeMismatch {
                    expected: out.clone(),
                    found: shape.to_vec(),
                });
            }
        }
    }
    Ok(out)
}

/// Linear position in an operand of `source_shape` that feeds linear
/// position `position` of a broadcast result of `result_shape`.
pub fn broadcast_source_position(position: usize, result_shape: &[usize], source_shape: &[usize]) -> usize {
    let index = unravel_index(position, result_shape);
    let offset = result_shape.len() - source_shape.len();
    let source_index: Vec<usize> = source_shape
        .iter()
        .enumerate()
        .map(|(ax, &n)| if n == 1 { 0 } else { index[offset + ax] })
        .collect();
    ravel_index(&source_index, source_shape)
}

/// Reverse of broadcasting for a boolean mask: a cell of the operand is
/// marked when any result cell it was stretched into is marked.
pub fn unbroadcast_mask(mask: &NdArray<bool>, source_shape: &[usize]) -> Result<NdArray<bool>, QuibError> {
    if mask.ndim() < source_shape.len() {
        return Err(QuibError::ShapeMismatch {
            expected: mask.shape().to_vec(),
            found: source_shape.to_vec(),
        });
    }
    let mut out = vec![false; shape_size(source_shape)];
    for position in mask.true_positions() {
        out[broadcast_source_position(position, mask.shape(), source_shape)] = true;
    }
    NdArray::from_shape_vec(source_shape.to_vec(), out)
}
