//! Deep get/assign: read or write the sub-value addressed by a path inside a
//! nested [`Value`].

use super::component::{Index, Path, PathComponent};
use super::selection::{Selection, select, select_path};
use crate::array::{NdArray, Scalar, Value};
use crate::quib_error::QuibError;

fn cannot_apply(value: &Value, component: &PathComponent) -> QuibError {
    QuibError::PathCannotHaveComponents {
        kind: value.kind().to_string(),
        component: component.index.to_string(),
    }
}

fn list_position(i: isize, len: usize) -> Result<usize, QuibError> {
    let n = len as isize;
    let resolved = if i < 0 { i + n } else { i };
    if resolved < 0 || resolved >= n {
        return Err(QuibError::IndexOutOfBounds { index: i, len });
    }
    Ok(resolved as usize)
}

/// Positions of a list addressed by a one-dimensional index, or `None` when
/// the index needs the array view of the list.
fn list_positions(index: &Index, len: usize) -> Result<Option<Vec<usize>>, QuibError> {
    Ok(match index {
        Index::Slice(s) => Some(s.positions(len)?),
        Index::Indices(ix) => Some(
            ix.iter()
                .map(|&i| list_position(i, len))
                .collect::<Result<_, _>>()?,
        ),
        Index::All => Some((0..len).collect()),
        _ => None,
    })
}

fn get_array_component(array: &NdArray<Scalar>, component: &PathComponent) -> Result<Value, QuibError> {
    let Selection { shape, positions } = select(array.shape(), &component.index)?;
    let picked = array.gather(&positions, shape)?;
    let is_mask = matches!(component.index, Index::Mask(_));
    if picked.ndim() == 0 && component.extract_element && !is_mask {
        Ok(Value::Scalar(picked.item().copied().unwrap_or_default()))
    } else {
        Ok(Value::Array(picked))
    }
}

fn get_component(value: &Value, component: &PathComponent) -> Result<Value, QuibError> {
    match (value, &component.index) {
        (_, Index::All) if !matches!(value, Value::Array(_)) => Ok(value.clone()),
        (Value::Array(a), _) => get_array_component(a, component),
        (Value::Record(fields), Index::Field(name)) => fields
            .get(name)
            .cloned()
            .ok_or_else(|| cannot_apply(value, component)),
        (Value::List(items), Index::Int(i)) => Ok(items[list_position(*i, items.len())?].clone()),
        (Value::List(items), index @ (Index::Slice(_) | Index::Indices(_))) => {
            let positions = list_positions(index, items.len())?.unwrap_or_default();
            Ok(Value::List(positions.into_iter().map(|p| items[p].clone()).collect()))
        }
        (Value::List(_), Index::Mask(_) | Index::Tuple(_)) => {
            let array = value.to_ndarray().ok_or_else(|| cannot_apply(value, component))?;
            get_array_component(&array, component)
        }
        _ => Err(cannot_apply(value, component)),
    }
}

/// Sub-value of `value` at `path`.
///
/// # Errors
/// `PathCannotHaveComponents` when a component does not apply to the
/// sub-value it meets (e.g. indexing a scalar), `IndexOutOfBounds` for
/// positions past the end.
pub fn deep_get(value: &Value, path: &[PathComponent]) -> Result<Value, QuibError> {
    let Some((first, rest)) = path.split_first() else {
        return Ok(value.clone());
    };
    let sub = get_component(value, first)?;
    deep_get(&sub, rest)
}

/// Write `new` into the cells of `array` picked by `index`, broadcasting
/// `new` over the selection and casting each written scalar to the kind of
/// the cell it replaces.
pub(crate) fn scatter(array: &mut NdArray<Scalar>, index: &Index, new: &Value) -> Result<(), QuibError> {
    let selection = select(array.shape(), index)?;
    write_selection(array, &selection, new)
}

fn write_selection(array: &mut NdArray<Scalar>, selection: &Selection, new: &Value) -> Result<(), QuibError> {
    let values = spread_over_selection(new, selection)?;
    let data = array.data_mut();
    for (&pos, v) in selection.positions.iter().zip(values) {
        data[pos] = v.cast_like(&data[pos]);
    }
    Ok(())
}

/// Write `new` through a chain of array components such as `[1][0]`.
fn assign_in_array(mut array: NdArray<Scalar>, path: &[PathComponent], new: &Value) -> Result<NdArray<Scalar>, QuibError> {
    let (selection, used) = select_path(array.shape(), path)?;
    if let Some(extra) = path.get(used) {
        return Err(QuibError::PathCannotHaveComponents {
            kind: "scalar".into(),
            component: extra.index.to_string(),
        });
    }
    write_selection(&mut array, &selection, new)?;
    Ok(array)
}

/// One scalar of `new` per selected cell, in selection order.
pub(crate) fn spread_over_selection(new: &Value, selection: &Selection) -> Result<Vec<Scalar>, QuibError> {
    let source = new.as_ndarray()?;
    let source = if source.shape() == selection.shape.as_slice() {
        source
    } else if source.len() == selection.positions.len() && source.ndim() <= 1 {
        // a flat run of values fills a mask selection in order
        NdArray::from_vec(source.into_data())
    } else {
        source.broadcast_to(&selection.shape)?
    };
    Ok(source.into_data())
}

fn assign_in(value: Value, path: &[PathComponent], new: Value) -> Result<Value, QuibError> {
    let Some((first, rest)) = path.split_first() else {
        return Ok(new);
    };
    match value {
        Value::Array(array) => Ok(Value::Array(assign_in_array(array, path, &new)?)),
        Value::Record(mut fields) => match &first.index {
            Index::Field(name) => {
                let updated = match fields.remove(name) {
                    Some(old) => assign_in(old, rest, new)?,
                    None if rest.is_empty() => new,
                    None => {
                        return Err(QuibError::PathCannotHaveComponents {
                            kind: "record".into(),
                            component: first.index.to_string(),
                        });
                    }
                };
                fields.insert(name.clone(), updated);
                Ok(Value::Record(fields))
            }
            Index::All => assign_in(Value::Record(fields), rest, new),
            _ => Err(cannot_apply(&Value::Record(fields), first)),
        },
        Value::List(mut items) => match &first.index {
            Index::Int(i) => {
                let p = list_position(*i, items.len())?;
                let old = std::mem::replace(&mut items[p], Value::List(Vec::new()));
                items[p] = assign_in(old, rest, new)?;
                Ok(Value::List(items))
            }
            Index::Mask(_) | Index::Tuple(_) => {
                let template = Value::List(items);
                let array = template
                    .to_ndarray()
                    .ok_or_else(|| cannot_apply(&template, first))?;
                let array = assign_in_array(array, path, &new)?;
                Ok(Value::like(&template, array))
            }
            Index::Field(_) => Err(cannot_apply(&Value::List(items), first)),
            index => {
                let positions = list_positions(index, items.len())?.unwrap_or_default();
                let replacements: Vec<Value> = match &new {
                    Value::List(vals) if vals.len() == positions.len() && rest.is_empty() => vals.clone(),
                    Value::Array(a) if a.ndim() >= 1 && a.shape()[0] == positions.len() && rest.is_empty() => {
                        (0..positions.len())
                            .map(|k| deep_get(&new, &[PathComponent::new(Index::Int(k as isize))]))
                            .collect::<Result<_, _>>()?
                    }
                    _ => vec![new.clone(); positions.len()],
                };
                for (p, r) in positions.into_iter().zip(replacements) {
                    let old = std::mem::replace(&mut items[p], Value::List(Vec::new()));
                    items[p] = assign_in(old, rest, r)?;
                }
                Ok(Value::List(items))
            }
        },
        Value::Scalar(_) => Err(cannot_apply(&value, first)),
    }
}

/// `value` with `new` written at `path`, consuming `value` so only the
/// containers along the path are rebuilt.
///
/// Boolean-mask components fan the assignment out over every `true` cell;
/// scalars are broadcast over multi-cell selections.
///
/// # Errors
/// `FailedToDeepAssign` wrapping the root cause and the offending path.
pub fn deep_assign(value: Value, path: &Path, new: Value) -> Result<Value, QuibError> {
    assign_in(value, path, new).map_err(|e| QuibError::deep_assign_failed(path, e))
}

/// Copying form of [`deep_assign`].
pub fn deep_assigned(value: &Value, path: &Path, new: Value) -> Result<Value, QuibError> {
    deep_assign(value.clone(), path, new)
}

/// Boolean mask of `shape` that is `true` exactly where the array part of
/// `path` reaches (everywhere for the empty path). Components past a single
/// cell cannot narrow the region any further.
pub fn bool_mask_at_path(shape: &[usize], path: &[PathComponent]) -> Result<NdArray<bool>, QuibError> {
    let (selection, _) = select_path(shape, path)?;
    let mut mask = NdArray::full(shape.to_vec(), false);
    let data = mask.data_mut();
    for p in selection.positions {
        data[p] = true;
    }
    Ok(mask)
}

/// Split `path` into the components that index an array of `shape` and the
/// remainder, which applies inside the selected cell.
///
/// # Errors
/// As [`select`](super::select), for an array component that does not fit.
pub fn split_path_at_end_of_array(shape: &[usize], path: &Path) -> Result<(Path, Path), QuibError> {
    let (_, used) = select_path(shape, path)?;
    Ok((path.prefix(used), path.suffix(used)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::Slice;

    fn arr(v: Vec<i64>) -> Value {
        Value::from(v)
    }

    #[test]
    fn get_element_and_slice() {
        let v = arr(vec![10, 20, 30]);
        assert_eq!(deep_get(&v, &Path::of(1)).unwrap(), Value::from(20i64));
        let s = deep_get(&v, &Path::of(Slice::new(Some(1), None, None))).unwrap();
        assert_eq!(s, arr(vec![20, 30]));
        assert_eq!(deep_get(&v, &Path::new()).unwrap(), v);
    }

    #[test]
    fn indexing_a_scalar_fails() {
        let v = Value::from(3i64);
        assert!(matches!(
            deep_get(&v, &Path::of(0)),
            Err(QuibError::PathCannotHaveComponents { .. })
        ));
        assert!(matches!(
            deep_assign(v, &Path::of(0), Value::from(1)),
            Err(QuibError::FailedToDeepAssign { .. })
        ));
    }

    #[test]
    fn mask_assignment_fans_out() {
        let v = arr(vec![1, 2, 3, 4]);
        let mask = NdArray::from_vec(vec![true, false, true, false]);
        let out = deep_assign(v.clone(), &Path::of(mask.clone()), Value::from(0)).unwrap();
        assert_eq!(out, arr(vec![0, 2, 0, 4]));
        let seq = deep_assign(v, &Path::of(mask), Value::from(vec![7, 9])).unwrap();
        assert_eq!(seq, arr(vec![7, 2, 9, 4]));
    }

    #[test]
    fn assignment_casts_to_cell_kind() {
        let out = deep_assign(arr(vec![1, 2, 3]), &Path::of(1), Value::from(3.0)).unwrap();
        assert_eq!(out, arr(vec![1, 3, 3]));
        match out {
            Value::Array(a) => assert_eq!(a.data()[1].kind(), crate::array::ScalarKind::Int),
            _ => panic!("expected array"),
        }
    }

    #[test]
    fn nested_list_and_record() {
        let v = Value::record([
            ("xs", Value::List(vec![Value::from(1), Value::from(2)])),
            ("name", Value::from(0)),
        ]);
        let path = Path::of(Index::field("xs")).with(PathComponent::new(-1));
        let out = deep_assign(v, &path, Value::from(5)).unwrap();
        assert_eq!(deep_get(&out, &path).unwrap(), Value::from(5));
    }

    #[test]
    fn list_accepts_array_style_index() {
        let v = Value::List(vec![Value::from(1), Value::from(2), Value::from(3)]);
        let mask = NdArray::from_vec(vec![false, true, false]);
        let out = deep_assign(v, &Path::of(mask), Value::from(9)).unwrap();
        assert_eq!(out, Value::List(vec![Value::from(1), Value::from(9), Value::from(3)]));
    }

    #[test]
    fn mask_of_first_component() {
        let m = bool_mask_at_path(&[2, 2], &Path::at(&[1, 0])).unwrap();
        assert_eq!(m.data(), &[false, false, true, false]);
        assert!(bool_mask_at_path(&[3], &[]).unwrap().all());
    }

    #[test]
    fn chained_array_components() {
        let v = Value::from_shape(&[2, 2], vec![1, 2, 3, 4]).unwrap();
        let path = Path::of(1).with(PathComponent::new(0));
        assert_eq!(deep_get(&v, &path).unwrap(), Value::from(3));
        let out = deep_assign(v, &path, Value::from(30)).unwrap();
        assert_eq!(out, Value::from_shape(&[2, 2], vec![1, 2, 30, 4]).unwrap());
        let m = bool_mask_at_path(&[2, 2], &path).unwrap();
        assert_eq!(m.data(), &[false, false, true, false]);
    }

    #[test]
    fn chained_components_past_a_cell_fail() {
        let v = Value::from_shape(&[2, 2], vec![1, 2, 3, 4]).unwrap();
        let path = Path::at(&[0, 0]).with(PathComponent::new(0));
        assert!(matches!(
            deep_assign(v, &path, Value::from(1)),
            Err(QuibError::FailedToDeepAssign { .. })
        ));
    }

    #[test]
    fn split_at_end_of_array() {
        let path = Path::of(1).with(PathComponent::new(0)).with(PathComponent::new(Index::field("x")));
        let (array, rest) = split_path_at_end_of_array(&[2, 2], &path).unwrap();
        assert_eq!(array, Path::of(1).with(PathComponent::new(0)));
        assert_eq!(rest, Path::of(Index::field("x")));
    }

    #[test]
    fn zero_step_slice_does_not_assign_silently() {
        let v = arr(vec![1, 2, 3]);
        let path = Path::of(Slice::new(None, None, Some(0)));
        let err = deep_assign(v, &path, Value::from(0)).unwrap_err();
        assert!(matches!(
            err,
            QuibError::FailedToDeepAssign { ref source, .. } if matches!(**source, QuibError::InvalidArgument(_))
        ));
    }
}
