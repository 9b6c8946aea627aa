//! Resolve an [`Index`] against an array shape into the linear positions it
//! covers.

use super::component::{Index, PathComponent};
use crate::array::{ravel_index, shape_size, for_each_index};
use crate::quib_error::QuibError;

/// Cells addressed by an index: the shape of the selected block and the
/// row-major linear positions of its cells in the indexed array.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selection {
    pub shape: Vec<usize>,
    pub positions: Vec<usize>,
}

impl Selection {
    /// True when the selection is a single cell with every axis fixed.
    pub fn is_single_element(&self) -> bool {
        self.shape.is_empty()
    }
}

fn not_applicable(shape: &[usize], index: &Index) -> QuibError {
    QuibError::PathCannotHaveComponents {
        kind: format!("array of shape {shape:?}"),
        component: index.to_string(),
    }
}

fn resolve_position(i: isize, len: usize) -> Result<usize, QuibError> {
    let n = len as isize;
    let resolved = if i < 0 { i + n } else { i };
    if resolved < 0 || resolved >= n {
        return Err(QuibError::IndexOutOfBounds { index: i, len });
    }
    Ok(resolved as usize)
}

/// Resolve `index` against an array of `shape`.
///
/// # Errors
/// - `PathCannotHaveComponents` for field names, nested tuples, masks inside
///   tuples, or more indices than axes.
/// - `IndexOutOfBounds` for integer positions outside an axis.
/// - `ShapeMismatch` when a mask does not match the leading axes.
pub fn select(shape: &[usize], index: &Index) -> Result<Selection, QuibError> {
    match index {
        Index::All => Ok(Selection {
            shape: shape.to_vec(),
            positions: (0..shape_size(shape)).collect(),
        }),
        Index::Mask(mask) => select_mask(shape, mask),
        Index::Field(_) => Err(not_applicable(shape, index)),
        Index::Tuple(items) => select_axes(shape, items, index),
        other => select_axes(shape, std::slice::from_ref(other), index),
    }
}

/// Resolve the array-indexing prefix of `path` against an array of
/// `shape`, composing each component over the block the previous ones
/// selected. Returns the selection and the number of components used:
/// indexing stops at a single cell or at a field name.
///
/// # Errors
/// As [`select`], for any component that is used.
pub fn select_path(shape: &[usize], path: &[PathComponent]) -> Result<(Selection, usize), QuibError> {
    let mut current = select(shape, &Index::All)?;
    let mut used = 0;
    for component in path {
        if current.is_single_element() || matches!(component.index, Index::Field(_)) {
            break;
        }
        let inner = select(&current.shape, &component.index)?;
        current = Selection {
            shape: inner.shape,
            positions: inner.positions.into_iter().map(|p| current.positions[p]).collect(),
        };
        used += 1;
    }
    Ok((current, used))
}

fn select_mask(shape: &[usize], mask: &crate::array::NdArray<bool>) -> Result<Selection, QuibError> {
    if mask.ndim() == 0 {
        let hit = mask.item().copied().unwrap_or(false);
        let mut out_shape = vec![usize::from(hit)];
        out_shape.extend_from_slice(shape);
        let positions = if hit { (0..shape_size(shape)).collect() } else { Vec::new() };
        return Ok(Selection { shape: out_shape, positions });
    }
    if mask.ndim() > shape.len() || mask.shape() != &shape[..mask.ndim()] {
        return Err(QuibError::ShapeMismatch {
            expected: shape.to_vec(),
            found: mask.shape().to_vec(),
        });
    }
    let inner = shape_size(&shape[mask.ndim()..]);
    let hits = mask.true_positions();
    let mut out_shape = vec![hits.len()];
    out_shape.extend_from_slice(&shape[mask.ndim()..]);
    let positions = hits
        .into_iter()
        .flat_map(|p| p * inner..(p + 1) * inner)
        .collect();
    Ok(Selection { shape: out_shape, positions })
}

fn select_axes(shape: &[usize], items: &[Index], whole: &Index) -> Result<Selection, QuibError> {
    if items.len() > shape.len() {
        return Err(not_applicable(shape, whole));
    }
    let mut coords: Vec<Vec<usize>> = Vec::with_capacity(shape.len());
    let mut out_shape = Vec::new();
    for (axis, &len) in shape.iter().enumerate() {
        match items.get(axis) {
            Some(Index::Int(i)) => coords.push(vec![resolve_position(*i, len)?]),
            Some(Index::Slice(s)) => {
                let c = s.positions(len)?;
                out_shape.push(c.len());
                coords.push(c);
            }
            Some(Index::Indices(ix)) => {
                let c = ix
                    .iter()
                    .map(|&i| resolve_position(i, len))
                    .collect::<Result<Vec<_>, _>>()?;
                out_shape.push(c.len());
                coords.push(c);
            }
            Some(Index::All) | None => {
                out_shape.push(len);
                coords.push((0..len).collect());
            }
            Some(_) => return Err(not_applicable(shape, whole)),
        }
    }
    let extents: Vec<usize> = coords.iter().map(Vec::len).collect();
    let mut positions = Vec::with_capacity(shape_size(&extents));
    for_each_index(&extents, |k| {
        let index: Vec<usize> = k.iter().zip(&coords).map(|(&j, c)| c[j]).collect();
        positions.push(ravel_index(&index, shape));
    });
    Ok(Selection { shape: out_shape, positions })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::NdArray;
    use crate::path::Slice;

    #[test]
    fn integer_fixes_leading_axis() {
        let s = select(&[2, 3], &Index::Int(1)).unwrap();
        assert_eq!(s.shape, vec![3]);
        assert_eq!(s.positions, vec![3, 4, 5]);
        let e = select(&[2, 3], &Index::at(&[-1, -1])).unwrap();
        assert!(e.is_single_element());
        assert_eq!(e.positions, vec![5]);
    }

    #[test]
    fn tuple_of_slices() {
        let idx = Index::Tuple(vec![Index::All, Index::Slice(Slice::new(Some(1), None, None))]);
        let s = select(&[2, 3], &idx).unwrap();
        assert_eq!(s.shape, vec![2, 2]);
        assert_eq!(s.positions, vec![1, 2, 4, 5]);
    }

    #[test]
    fn mask_over_leading_axes() {
        let mask = NdArray::from_vec(vec![false, true]);
        let s = select(&[2, 3], &Index::Mask(mask)).unwrap();
        assert_eq!(s.shape, vec![1, 3]);
        assert_eq!(s.positions, vec![3, 4, 5]);
    }

    #[test]
    fn chained_components_compose() {
        let path = [
            PathComponent::new(Index::Int(1)),
            PathComponent::new(Index::Slice(Slice::new(Some(1), None, None))),
        ];
        let (s, used) = select_path(&[2, 3], &path).unwrap();
        assert_eq!(used, 2);
        assert_eq!(s.shape, vec![2]);
        assert_eq!(s.positions, vec![4, 5]);

        let deeper = [
            PathComponent::new(Index::Int(0)),
            PathComponent::new(Index::Int(2)),
            PathComponent::new(Index::Field("x".into())),
        ];
        let (s, used) = select_path(&[2, 3], &deeper).unwrap();
        assert_eq!(used, 2);
        assert_eq!(s.positions, vec![2]);
    }

    #[test]
    fn zero_step_slice_is_rejected() {
        let idx = Index::Slice(Slice::new(None, None, Some(0)));
        assert!(matches!(select(&[4], &idx), Err(QuibError::InvalidArgument(_))));
    }

    #[test]
    fn out_of_bounds_and_too_many_indices() {
        assert!(matches!(
            select(&[3], &Index::Int(3)),
            Err(QuibError::IndexOutOfBounds { .. })
        ));
        assert!(matches!(
            select(&[3], &Index::at(&[0, 0])),
            Err(QuibError::PathCannotHaveComponents { .. })
        ));
    }
}
