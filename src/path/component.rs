//! Path components and paths.

use crate::array::NdArray;
use crate::quib_error::QuibError;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;

/// A `start:stop:step` slice with numpy semantics (negative bounds count
/// from the end, missing bounds default by direction).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Slice {
    pub start: Option<isize>,
    pub stop: Option<isize>,
    pub step: Option<isize>,
}

impl Slice {
    pub fn new(start: Option<isize>, stop: Option<isize>, step: Option<isize>) -> Self {
        Slice { start, stop, step }
    }

    /// Like [`Slice::resolve`], rejecting a zero step.
    ///
    /// # Errors
    /// `InvalidArgument` when `step` is zero.
    pub fn positions(&self, len: usize) -> Result<Vec<usize>, QuibError> {
        if self.step == Some(0) {
            return Err(QuibError::InvalidArgument(format!("slice {self} has a zero step")));
        }
        Ok(self.resolve(len))
    }

    /// Positions selected from an axis of length `len`, in order.
    pub fn resolve(&self, len: usize) -> Vec<usize> {
        let n = len as isize;
        let step = self.step.unwrap_or(1);
        if step == 0 {
            return Vec::new();
        }
        let clamp = |v: isize, lo: isize, hi: isize| v.max(lo).min(hi);
        let wrap = |v: isize| if v < 0 { v + n } else { v };
        let mut out = Vec::new();
        if step > 0 {
            let mut i = clamp(self.start.map_or(0, wrap), 0, n);
            let stop = clamp(self.stop.map_or(n, wrap), 0, n);
            while i < stop {
                out.push(i as usize);
                i += step;
            }
        } else {
            let mut i = clamp(self.start.map_or(n - 1, wrap), -1, n - 1);
            let stop = self.stop.map_or(-1, |s| clamp(wrap(s), -1, n - 1));
            while i > stop {
                out.push(i as usize);
                i += step;
            }
        }
        out
    }
}

impl fmt::Display for Slice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |v: Option<isize>| v.map(|x| x.to_string()).unwrap_or_default();
        write!(f, "{}:{}", show(self.start), show(self.stop))?;
        if let Some(step) = self.step {
            write!(f, ":{step}")?;
        }
        Ok(())
    }
}

/// One indexing operation.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Index {
    /// A single position along the first axis (negative counts from the end).
    Int(isize),
    Slice(Slice),
    /// Several positions along one axis.
    Indices(Vec<isize>),
    /// Boolean mask over the leading axes.
    Mask(NdArray<bool>),
    /// Multi-dimensional index, one entry per axis.
    Tuple(Vec<Index>),
    /// Named field of a record.
    Field(String),
    /// Every element.
    All,
}

impl Index {
    pub fn slice(start: Option<isize>, stop: Option<isize>) -> Self {
        Index::Slice(Slice::new(start, stop, None))
    }

    pub fn field(name: impl Into<String>) -> Self {
        Index::Field(name.into())
    }

    /// Index addressing one element of an n-d array.
    pub fn at(coords: &[isize]) -> Self {
        match coords {
            [i] => Index::Int(*i),
            _ => Index::Tuple(coords.iter().copied().map(Index::Int).collect()),
        }
    }
}

impl From<isize> for Index {
    fn from(i: isize) -> Self {
        Index::Int(i)
    }
}

impl From<i32> for Index {
    fn from(i: i32) -> Self {
        Index::Int(i as isize)
    }
}

impl From<Slice> for Index {
    fn from(s: Slice) -> Self {
        Index::Slice(s)
    }
}

impl From<NdArray<bool>> for Index {
    fn from(m: NdArray<bool>) -> Self {
        Index::Mask(m)
    }
}

impl fmt::Display for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Index::Int(i) => write!(f, "{i}"),
            Index::Slice(s) => write!(f, "{s}"),
            Index::Indices(ix) => write!(f, "[{}]", ix.iter().join(", ")),
            Index::Mask(m) => write!(
                f,
                "<mask {} of {}>",
                m.shape().iter().join("x"),
                m.count_true()
            ),
            Index::Tuple(items) => write!(f, "{}", items.iter().join(", ")),
            Index::Field(name) => write!(f, "{name:?}"),
            Index::All => f.write_str("..."),
        }
    }
}

/// One step of a [`Path`].
///
/// `extract_element` controls what a single-cell selection yields: the bare
/// scalar (`true`, the default) or a 0-d array (`false`, used for masks
/// produced by forward translation).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathComponent {
    pub index: Index,
    pub extract_element: bool,
}

impl PathComponent {
    pub fn new(index: impl Into<Index>) -> Self {
        PathComponent {
            index: index.into(),
            extract_element: true,
        }
    }

    /// A boolean-mask component that never extracts a bare element.
    pub fn mask(mask: NdArray<bool>) -> Self {
        PathComponent {
            index: Index::Mask(mask),
            extract_element: false,
        }
    }

    /// Does this component stand for the whole object?
    pub fn is_whole(&self) -> bool {
        matches!(self.index, Index::All)
    }
}

impl fmt::Display for PathComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.index)
    }
}

/// Ordered, immutable route into a value; empty means the whole value.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Path(Vec<PathComponent>);

impl Path {
    pub fn new() -> Self {
        Path(Vec::new())
    }

    pub fn from_components(components: Vec<PathComponent>) -> Self {
        Path(components)
    }

    /// Single-component path.
    pub fn of(index: impl Into<Index>) -> Self {
        Path(vec![PathComponent::new(index)])
    }

    /// Path to one element of an n-d array.
    pub fn at(coords: &[isize]) -> Self {
        Path::of(Index::at(coords))
    }

    pub fn components(&self) -> &[PathComponent] {
        &self.0
    }

    /// New path with `component` appended.
    pub fn with(&self, component: PathComponent) -> Path {
        let mut components = self.0.clone();
        components.push(component);
        Path(components)
    }

    /// New path made of `self` followed by `rest`.
    pub fn join(&self, rest: &[PathComponent]) -> Path {
        Path(self.0.iter().chain(rest).cloned().collect())
    }

    /// The first `n` components (or all of them).
    pub fn prefix(&self, n: usize) -> Path {
        Path(self.0.iter().take(n).cloned().collect())
    }

    pub fn suffix(&self, n: usize) -> Path {
        Path(self.0.iter().skip(n).cloned().collect())
    }
}

impl Deref for Path {
    type Target = [PathComponent];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<PathComponent>> for Path {
    fn from(components: Vec<PathComponent>) -> Self {
        Path(components)
    }
}

impl FromIterator<PathComponent> for Path {
    fn from_iter<I: IntoIterator<Item = PathComponent>>(iter: I) -> Self {
        Path(iter.into_iter().collect())
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("[]");
        }
        for c in &self.0 {
            write!(f, "{c}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slices_follow_numpy() {
        assert_eq!(Slice::new(Some(1), Some(3), None).resolve(5), vec![1, 2]);
        assert_eq!(Slice::new(None, None, Some(-1)).resolve(3), vec![2, 1, 0]);
        assert_eq!(Slice::new(Some(-2), None, None).resolve(4), vec![2, 3]);
        assert_eq!(Slice::new(None, Some(-1), Some(2)).resolve(6), vec![0, 2, 4]);
        assert!(Slice::new(Some(3), Some(1), None).resolve(5).is_empty());
    }

    #[test]
    fn paths_render_as_subscripts() {
        let p = Path::of(1).with(PathComponent::new(Index::slice(Some(0), Some(2))));
        assert_eq!(p.to_string(), "[1][0:2]");
        assert_eq!(Path::new().to_string(), "[]");
        assert_eq!(Path::at(&[0, 1]).to_string(), "[0, 1]");
    }
}
