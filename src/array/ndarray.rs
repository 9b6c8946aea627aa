//! Row-major n-dimensional arrays generic over the element type.
//!
//! The same container carries numeric data, `i64` index codes and boolean
//! masks. Every operation in the "rearrangement" group below (`reshape`,
//! `transpose`, `swapaxes`, `rot90`, `flip`, `ravel`, `squeeze`,
//! `expand_dims`, `concatenate`, `repeat`, `tile`, `broadcast_to`, `gather`)
//! only moves or copies elements and never inspects them. Path translation
//! relies on that: running one of these on an array of index codes tells
//! exactly where each input cell ends up.

use crate::quib_error::QuibError;
use serde::{Deserialize, Serialize};

/// Number of elements of an array of `shape`.
#[inline]
pub fn shape_size(shape: &[usize]) -> usize {
    shape.iter().product()
}

/// Row-major strides (in elements) for `shape`.
pub fn strides(shape: &[usize]) -> Vec<usize> {
    let mut strides = vec![1; shape.len()];
    for axis in (0..shape.len().saturating_sub(1)).rev() {
        strides[axis] = strides[axis + 1] * shape[axis + 1];
    }
    strides
}

/// Linear position of multi-index `index` in an array of `shape`.
#[inline]
pub fn ravel_index(index: &[usize], shape: &[usize]) -> usize {
    index
        .iter()
        .zip(strides(shape))
        .map(|(i, s)| i * s)
        .sum()
}

/// Multi-index of linear position `pos` in an array of `shape`.
pub fn unravel_index(mut pos: usize, shape: &[usize]) -> Vec<usize> {
    let mut index = vec![0; shape.len()];
    for axis in (0..shape.len()).rev() {
        if shape[axis] > 0 {
            index[axis] = pos % shape[axis];
            pos /= shape[axis];
        }
    }
    index
}

/// Visit every multi-index of `shape` in row-major order. A 0-d shape visits
/// the single empty index; a shape with a zero extent visits nothing.
pub fn for_each_index(shape: &[usize], mut f: impl FnMut(&[usize])) {
    if shape.iter().any(|&n| n == 0) {
        return;
    }
    let mut index = vec![0usize; shape.len()];
    loop {
        f(&index);
        let mut axis = shape.len();
        loop {
            if axis == 0 {
                return;
            }
            axis -= 1;
            index[axis] += 1;
            if index[axis] < shape[axis] {
                break;
            }
            index[axis] = 0;
        }
    }
}

/// Resolve a possibly negative axis against `ndim`.
pub fn normalize_axis(axis: isize, ndim: usize) -> Result<usize, QuibError> {
    let n = ndim as isize;
    let resolved = if axis < 0 { axis + n } else { axis };
    if resolved < 0 || resolved >= n {
        return Err(QuibError::InvalidArgument(format!(
            "axis {axis} is out of bounds for array of dimension {ndim}"
        )));
    }
    Ok(resolved as usize)
}

/// Dense row-major n-dimensional array.
///
/// # Invariants
/// `data.len() == shape.iter().product()`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NdArray<T> {
    shape: Vec<usize>,
    data: Vec<T>,
}

impl<T> NdArray<T> {
    /// Build an array from a shape and row-major data.
    ///
    /// # Errors
    /// `ShapeMismatch` if `data.len()` is not the product of `shape`.
    pub fn from_shape_vec(shape: Vec<usize>, data: Vec<T>) -> Result<Self, QuibError> {
        if shape_size(&shape) != data.len() {
            return Err(QuibError::ShapeMismatch {
                expected: shape,
                found: vec![data.len()],
            });
        }
        Ok(NdArray { shape, data })
    }

    /// One-dimensional array.
    pub fn from_vec(data: Vec<T>) -> Self {
        NdArray {
            shape: vec![data.len()],
            data,
        }
    }

    /// Zero-dimensional array holding `value`.
    pub fn scalar(value: T) -> Self {
        NdArray {
            shape: Vec::new(),
            data: vec![value],
        }
    }

    #[inline]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    #[inline]
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn data(&self) -> &[T] {
        &self.data
    }

    #[inline]
    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn into_data(self) -> Vec<T> {
        self.data
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.data.iter()
    }

    pub fn get(&self, index: &[usize]) -> Option<&T> {
        if index.len() != self.shape.len() || index.iter().zip(&self.shape).any(|(i, n)| i >= n) {
            return None;
        }
        self.data.get(ravel_index(index, &self.shape))
    }

    /// The single element of a size-1 array.
    pub fn item(&self) -> Option<&T> {
        if self.data.len() == 1 {
            self.data.first()
        } else {
            None
        }
    }

    pub fn map<U>(&self, f: impl FnMut(&T) -> U) -> NdArray<U> {
        NdArray {
            shape: self.shape.clone(),
            data: self.data.iter().map(f).collect(),
        }
    }

    /// Element-wise combination of two same-shaped arrays.
    pub fn zip_with<U, R>(
        &self,
        other: &NdArray<U>,
        mut f: impl FnMut(&T, &U) -> R,
    ) -> Result<NdArray<R>, QuibError> {
        if self.shape != other.shape {
            return Err(QuibError::ShapeMismatch {
                expected: self.shape.clone(),
                found: other.shape.clone(),
            });
        }
        Ok(NdArray {
            shape: self.shape.clone(),
            data: self
                .data
                .iter()
                .zip(&other.data)
                .map(|(a, b)| f(a, b))
                .collect(),
        })
    }

    /// Linear positions of each 1-d lane along `axis`, in row-major order of
    /// the remaining axes.
    pub fn axis_lanes(&self, axis: usize) -> Vec<Vec<usize>> {
        let mut outer = self.shape.clone();
        let len = outer.remove(axis);
        let strides = strides(&self.shape);
        let mut lanes = Vec::with_capacity(shape_size(&outer));
        for_each_index(&outer, |rest| {
            let mut full: Vec<usize> = rest.to_vec();
            full.insert(axis, 0);
            let start = ravel_index(&full, &self.shape);
            lanes.push((0..len).map(|k| start + k * strides[axis]).collect());
        });
        lanes
    }
}

impl<T: Clone> NdArray<T> {
    pub fn full(shape: Vec<usize>, value: T) -> Self {
        let n = shape_size(&shape);
        NdArray {
            shape,
            data: vec![value; n],
        }
    }

    /// New array of `shape` whose element at each multi-index is this array's
    /// element at `source(index)`.
    fn remap(&self, shape: Vec<usize>, mut source: impl FnMut(&[usize]) -> Vec<usize>) -> Self {
        let mut data = Vec::with_capacity(shape_size(&shape));
        for_each_index(&shape, |index| {
            let from = source(index);
            data.push(self.data[ravel_index(&from, &self.shape)].clone());
        });
        NdArray { shape, data }
    }

    /// Elements at the given linear positions, arranged in `shape`.
    pub fn gather(&self, positions: &[usize], shape: Vec<usize>) -> Result<Self, QuibError> {
        let data = positions
            .iter()
            .map(|&p| {
                self.data.get(p).cloned().ok_or(QuibError::IndexOutOfBounds {
                    index: p as isize,
                    len: self.data.len(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        NdArray::from_shape_vec(shape, data)
    }

    /// Reshape; one extent may be `-1` and is inferred.
    pub fn reshape(&self, shape: &[isize]) -> Result<Self, QuibError> {
        let known: usize = shape.iter().filter(|&&n| n >= 0).map(|&n| n as usize).product();
        let unknown = shape.iter().filter(|&&n| n < 0).count();
        let resolved: Vec<usize> = match unknown {
            0 => shape.iter().map(|&n| n as usize).collect(),
            1 if known > 0 && self.len() % known == 0 => shape
                .iter()
                .map(|&n| if n < 0 { self.len() / known } else { n as usize })
                .collect(),
            _ => {
                return Err(QuibError::InvalidArgument(format!(
                    "cannot reshape array of size {} into shape {shape:?}",
                    self.len()
                )));
            }
        };
        if shape_size(&resolved) != self.len() {
            return Err(QuibError::InvalidArgument(format!(
                "cannot reshape array of size {} into shape {resolved:?}",
                self.len()
            )));
        }
        Ok(NdArray {
            shape: resolved,
            data: self.data.clone(),
        })
    }

    pub fn ravel(&self) -> Self {
        NdArray::from_vec(self.data.clone())
    }

    /// Permute axes; `None` reverses them.
    pub fn transpose(&self, axes: Option<&[usize]>) -> Result<Self, QuibError> {
        let axes: Vec<usize> = match axes {
            Some(a) => a.to_vec(),
            None => (0..self.ndim()).rev().collect(),
        };
        let mut seen = vec![false; self.ndim()];
        if axes.len() != self.ndim() || axes.iter().any(|&a| a >= self.ndim() || std::mem::replace(&mut seen[a], true)) {
            return Err(QuibError::InvalidArgument(format!(
                "axes {axes:?} are not a permutation of {} dimensions",
                self.ndim()
            )));
        }
        let shape = axes.iter().map(|&a| self.shape[a]).collect();
        Ok(self.remap(shape, |index| {
            let mut from = vec![0; axes.len()];
            for (out_axis, &in_axis) in axes.iter().enumerate() {
                from[in_axis] = index[out_axis];
            }
            from
        }))
    }

    pub fn swapaxes(&self, a: usize, b: usize) -> Result<Self, QuibError> {
        let mut axes: Vec<usize> = (0..self.ndim()).collect();
        if a >= axes.len() || b >= axes.len() {
            return Err(QuibError::InvalidArgument(format!(
                "cannot swap axes {a} and {b} of a {}-d array",
                self.ndim()
            )));
        }
        axes.swap(a, b);
        self.transpose(Some(&axes))
    }

    /// Reverse the order of elements along `axis`, or along every axis.
    pub fn flip(&self, axis: Option<usize>) -> Result<Self, QuibError> {
        if let Some(a) = axis {
            if a >= self.ndim() {
                return Err(QuibError::InvalidArgument(format!("axis {a} out of range")));
            }
        }
        let shape = self.shape.clone();
        Ok(self.remap(shape.clone(), |index| {
            index
                .iter()
                .enumerate()
                .map(|(ax, &i)| {
                    if axis.is_none_or(|a| a == ax) {
                        shape[ax] - 1 - i
                    } else {
                        i
                    }
                })
                .collect()
        }))
    }

    /// Rotate by 90 degrees `k` times in the plane of the first two axes.
    pub fn rot90(&self, k: isize) -> Result<Self, QuibError> {
        if self.ndim() < 2 {
            return Err(QuibError::InvalidArgument(
                "rot90 requires an array of at least 2 dimensions".into(),
            ));
        }
        match k.rem_euclid(4) {
            0 => Ok(self.clone()),
            1 => self.flip(Some(1))?.swapaxes(0, 1),
            2 => self.flip(Some(0))?.flip(Some(1)),
            _ => self.swapaxes(0, 1)?.flip(Some(1)),
        }
    }

    /// Remove length-1 axes (all of them, or only `axis`).
    pub fn squeeze(&self, axis: Option<usize>) -> Result<Self, QuibError> {
        let shape: Vec<usize> = match axis {
            Some(a) if self.shape.get(a) == Some(&1) => {
                let mut s = self.shape.clone();
                s.remove(a);
                s
            }
            Some(a) => {
                return Err(QuibError::InvalidArgument(format!(
                    "cannot squeeze axis {a} of shape {:?}",
                    self.shape
                )));
            }
            None => self.shape.iter().copied().filter(|&n| n != 1).collect(),
        };
        Ok(NdArray {
            shape,
            data: self.data.clone(),
        })
    }

    pub fn expand_dims(&self, axis: usize) -> Result<Self, QuibError> {
        if axis > self.ndim() {
            return Err(QuibError::InvalidArgument(format!("axis {axis} out of range")));
        }
        let mut shape = self.shape.clone();
        shape.insert(axis, 1);
        Ok(NdArray {
            shape,
            data: self.data.clone(),
        })
    }

    /// Join arrays along an existing axis.
    pub fn concatenate(arrays: &[NdArray<T>], axis: usize) -> Result<Self, QuibError> {
        let first = arrays.first().ok_or_else(|| {
            QuibError::InvalidArgument("need at least one array to concatenate".into())
        })?;
        if axis >= first.ndim() {
            return Err(QuibError::InvalidArgument(format!(
                "axis {axis} out of range for concatenation"
            )));
        }
        for a in arrays {
            let compatible = a.ndim() == first.ndim()
                && a.shape.iter().zip(&first.shape).enumerate().all(|(ax, (x, y))| ax == axis || x == y);
            if !compatible {
                return Err(QuibError::ShapeMismatch {
                    expected: first.shape.clone(),
                    found: a.shape.clone(),
                });
            }
        }
        let mut shape = first.shape.clone();
        shape[axis] = arrays.iter().map(|a| a.shape[axis]).sum();
        let mut data = Vec::with_capacity(shape_size(&shape));
        for_each_index(&shape, |index| {
            let mut local = index.to_vec();
            for a in arrays {
                if local[axis] < a.shape[axis] {
                    data.push(a.data[ravel_index(&local, &a.shape)].clone());
                    return;
                }
                local[axis] -= a.shape[axis];
            }
        });
        Ok(NdArray { shape, data })
    }

    /// Repeat each element `repeats` times along `axis` (flattening first
    /// when `axis` is `None`).
    pub fn repeat(&self, repeats: usize, axis: Option<usize>) -> Result<Self, QuibError> {
        let (base, axis) = match axis {
            Some(a) if a < self.ndim() => (self.clone(), a),
            Some(a) => return Err(QuibError::InvalidArgument(format!("axis {a} out of range"))),
            None => (self.ravel(), 0),
        };
        let mut shape = base.shape.clone();
        shape[axis] *= repeats;
        Ok(base.remap(shape, |index| {
            let mut from = index.to_vec();
            from[axis] /= repeats.max(1);
            from
        }))
    }

    /// Tile the array `reps` times along each axis (axes aligned at the end).
    pub fn tile(&self, reps: &[usize]) -> Self {
        let ndim = self.ndim().max(reps.len());
        let mut base_shape = vec![1; ndim - self.ndim()];
        base_shape.extend_from_slice(&self.shape);
        let mut full_reps = vec![1; ndim - reps.len()];
        full_reps.extend_from_slice(reps);
        let base = NdArray {
            shape: base_shape.clone(),
            data: self.data.clone(),
        };
        let shape = base_shape.iter().zip(&full_reps).map(|(n, r)| n * r).collect();
        base.remap(shape, |index| {
            index.iter().zip(&base_shape).map(|(i, n)| i % n).collect()
        })
    }

    /// Stretch to `shape` following the standard broadcasting rule.
    pub fn broadcast_to(&self, shape: &[usize]) -> Result<Self, QuibError> {
        if shape.len() < self.ndim() {
            return Err(QuibError::ShapeMismatch {
                expected: shape.to_vec(),
                found: self.shape.clone(),
            });
        }
        let offset = shape.len() - self.ndim();
        for (ax, &n) in self.shape.iter().enumerate() {
            if n != 1 && n != shape[offset + ax] {
                return Err(QuibError::ShapeMismatch {
                    expected: shape.to_vec(),
                    found: self.shape.clone(),
                });
            }
        }
        let own = self.shape.clone();
        Ok(self.remap(shape.to_vec(), |index| {
            own.iter()
                .enumerate()
                .map(|(ax, &n)| if n == 1 { 0 } else { index[offset + ax] })
                .collect()
        }))
    }
}

impl NdArray<bool> {
    #[inline]
    pub fn any(&self) -> bool {
        self.data.iter().any(|&b| b)
    }

    #[inline]
    pub fn all(&self) -> bool {
        self.data.iter().all(|&b| b)
    }

    pub fn count_true(&self) -> usize {
        self.data.iter().filter(|&&b| b).count()
    }

    /// Linear positions holding `true`, ascending.
    pub fn true_positions(&self) -> Vec<usize> {
        self.data
            .iter()
            .enumerate()
            .filter_map(|(i, &b)| b.then_some(i))
            .collect()
    }

    pub fn not(&self) -> Self {
        self.map(|b| !b)
    }

    /// OR-reduce along `axis`, keeping it with extent 1.
    pub fn any_along_axis_keepdims(&self, axis: usize) -> Self {
        let mut shape = self.shape.clone();
        shape[axis] = 1;
        let data = self
            .axis_lanes(axis)
            .into_iter()
            .map(|lane| lane.into_iter().any(|p| self.data[p]))
            .collect();
        NdArray { shape, data }
    }

    /// Running OR along `axis`; `reverse` runs from the end of each lane.
    pub fn cumulative_any(&self, axis: usize, reverse: bool) -> Self {
        let mut out = self.clone();
        for mut lane in self.axis_lanes(axis) {
            if reverse {
                lane.reverse();
            }
            let mut acc = false;
            for p in lane {
                acc |= self.data[p];
                out.data[p] = acc;
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arange(shape: &[usize]) -> NdArray<i64> {
        let n = shape_size(shape) as i64;
        NdArray::from_shape_vec(shape.to_vec(), (0..n).collect()).unwrap()
    }

    #[test]
    fn transpose_moves_elements() {
        let a = arange(&[2, 3]);
        let t = a.transpose(None).unwrap();
        assert_eq!(t.shape(), &[3, 2]);
        assert_eq!(t.data(), &[0, 3, 1, 4, 2, 5]);
    }

    #[test]
    fn rot90_matches_numpy() {
        // np.rot90(np.arange(6).reshape(2, 3)) == [[2, 5], [1, 4], [0, 3]]
        let r = arange(&[2, 3]).rot90(1).unwrap();
        assert_eq!(r.shape(), &[3, 2]);
        assert_eq!(r.data(), &[2, 5, 1, 4, 0, 3]);
        let r3 = arange(&[2, 3]).rot90(3).unwrap();
        assert_eq!(r3.data(), &[3, 0, 4, 1, 5, 2]);
    }

    #[test]
    fn concatenate_and_repeat() {
        let c = NdArray::concatenate(&[arange(&[2]), arange(&[3])], 0).unwrap();
        assert_eq!(c.data(), &[0, 1, 0, 1, 2]);
        let r = arange(&[2]).repeat(2, None).unwrap();
        assert_eq!(r.data(), &[0, 0, 1, 1]);
        let t = arange(&[2]).tile(&[2]);
        assert_eq!(t.data(), &[0, 1, 0, 1]);
    }

    #[test]
    fn broadcast_stretches_unit_axes() {
        let a = arange(&[3, 1]);
        let b = a.broadcast_to(&[2, 3, 2]).unwrap();
        assert_eq!(b.shape(), &[2, 3, 2]);
        assert_eq!(&b.data()[..6], &[0, 0, 1, 1, 2, 2]);
        assert!(arange(&[3]).broadcast_to(&[2]).is_err());
    }

    #[test]
    fn reshape_infers_one_extent() {
        let r = arange(&[6]).reshape(&[3, -1]).unwrap();
        assert_eq!(r.shape(), &[3, 2]);
        assert!(arange(&[6]).reshape(&[4, -1]).is_err());
    }

    #[test]
    fn cumulative_any_runs_along_axis() {
        let m = NdArray::from_vec(vec![false, true, false, false]);
        assert_eq!(m.cumulative_any(0, false).data(), &[false, true, true, true]);
        assert_eq!(m.cumulative_any(0, true).data(), &[true, true, false, false]);
    }

    #[test]
    fn zero_dim_index_iteration() {
        let mut visited = 0;
        for_each_index(&[], |idx| {
            assert!(idx.is_empty());
            visited += 1;
        });
        assert_eq!(visited, 1);
    }
}
