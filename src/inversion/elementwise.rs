//! Element-wise inversion: solve for one operand cell by cell, holding the
//! other operands at their previous values.

use super::{Inversal, Inverter, failed};
use crate::array::{NdArray, Scalar, Value, broadcast_source_position};
use crate::assignment::Assignment;
use crate::function_definitions::ArgumentRef;
use crate::path::access::spread_over_selection;
use crate::path::{Path, PathComponent, Selection, select_path};
use crate::quib_error::QuibError;
use crate::translation::SourceFuncCall;
use crate::translation::index_codes::positions_to_mask;
use crate::translation::translators::elementwise::broadcast_backwards;

pub struct ElementwiseInverter;

pub static ELEMENTWISE_INVERTER: ElementwiseInverter = ElementwiseInverter;

/// Result cells addressed by `path`, chained components included. Array
/// cells hold scalars, so nothing may follow a single cell.
pub(crate) fn selected(result_shape: &[usize], path: &Path) -> Result<Selection, QuibError> {
    let (selection, used) = select_path(result_shape, path)?;
    match path.get(used) {
        None => Ok(selection),
        Some(extra) => Err(QuibError::PathCannotHaveComponents {
            kind: "scalar".into(),
            component: extra.index.to_string(),
        }),
    }
}

/// Previous positional arguments as arrays; `None` for parameters and for
/// arguments with no array form.
fn previous_args(call: &SourceFuncCall) -> Vec<Option<NdArray<Scalar>>> {
    call.args
        .args
        .iter()
        .enumerate()
        .map(|(i, arg)| {
            call.definition.data_argument(&ArgumentRef::Positional(i))?;
            call.concrete(arg).ok().and_then(|v| v.to_ndarray())
        })
        .collect()
}

fn previous_at(args: &[Option<NdArray<Scalar>>], position: usize, result_shape: &[usize]) -> Vec<f64> {
    args.iter()
        .map(|a| match a {
            Some(arr) if arr.ndim() <= result_shape.len() => arr
                .data()
                .get(broadcast_source_position(position, result_shape, arr.shape()))
                .map_or(f64::NAN, Scalar::as_f64),
            _ => f64::NAN,
        })
        .collect()
}

/// Shared by the element-wise and `vectorize` inverters: the first data
/// source that has a declared inverse and feeds the assigned region
/// receives the whole change.
pub(crate) fn invert_elementwise(
    call: &SourceFuncCall,
    assignment: &Assignment,
    previous_result: &Value,
) -> Result<Vec<Inversal>, QuibError> {
    let new = assignment.value().ok_or_else(|| failed(call))?;
    let result_shape = previous_result.shape().ok_or_else(|| failed(call))?;
    let implicated = broadcast_backwards(call, &assignment.path, &result_shape).map_err(|_| failed(call))?;
    let (source, inverse) = call
        .data_sources()
        .filter(|s| s.location.item.is_none() && implicated.contains_key(&s.id))
        .find_map(|s| match s.location.argument {
            ArgumentRef::Positional(i) => call.definition.inverse_for(i).map(|inv| (s, inv)),
            ArgumentRef::Keyword(_) => None,
        })
        .ok_or_else(|| failed(call))?;
    let source_array = call
        .value_of(source.id)
        .ok()
        .and_then(Value::to_ndarray)
        .ok_or_else(|| failed(call))?;

    let selection = selected(&result_shape, &assignment.path)?;
    let new_values = spread_over_selection(new, &selection)?;
    let args = previous_args(call);
    let same_shape = source_array.shape() == result_shape.as_slice();

    let mut seen = hashbrown::HashSet::new();
    let mut hits: Vec<(usize, Scalar)> = Vec::with_capacity(selection.positions.len());
    for (&p, y) in selection.positions.iter().zip(&new_values) {
        let sp = broadcast_source_position(p, &result_shape, source_array.shape());
        if !same_shape && !seen.insert(sp) {
            continue;
        }
        let Some(cell) = source_array.data().get(sp) else {
            return Err(failed(call));
        };
        let x = (inverse.func)(y.as_f64(), &previous_at(&args, p, &result_shape));
        hits.push((sp, Scalar::Float(x).cast_like(cell)));
    }
    if hits.is_empty() {
        return Ok(Vec::new());
    }

    let inverted = if same_shape {
        let values: Vec<Scalar> = hits.into_iter().map(|(_, s)| s).collect();
        let value = match selection.shape.as_slice() {
            [] => Value::Scalar(values[0]),
            shape => Value::Array(NdArray::from_shape_vec(shape.to_vec(), values)?),
        };
        Assignment::new(assignment.path.clone(), value)
    } else if source_array.ndim() == 0 {
        Assignment::new(Path::new(), Value::Scalar(hits[0].1))
    } else {
        hits.sort_by_key(|(sp, _)| *sp);
        let positions: Vec<usize> = hits.iter().map(|(sp, _)| *sp).collect();
        let mask = positions_to_mask(source_array.shape(), &positions);
        let values = hits.into_iter().map(|(_, s)| s).collect();
        Assignment::new(
            Path::from(vec![PathComponent::mask(mask)]),
            Value::Array(NdArray::from_vec(values)),
        )
    };
    Ok(vec![Inversal::new(source.id, inverted)])
}

impl Inverter for ElementwiseInverter {
    fn name(&self) -> &'static str {
        "elementwise"
    }

    fn invert(
        &self,
        call: &SourceFuncCall,
        assignment: &Assignment,
        previous_result: &Value,
    ) -> Result<Vec<Inversal>, QuibError> {
        invert_elementwise(call, assignment, previous_result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function_definitions::{Arg, CallArgs, Func, FuncDefinition};
    use crate::inversion::inverse_funcs::binary_inverses;
    use crate::path::Index;
    use crate::quib::QuibId;
    use crate::translation::SourceId;
    use crate::translation::translators::ELEMENTWISE;
    use std::sync::Arc;

    fn add_call(a: Arg, b: Arg, values: Vec<Value>) -> SourceFuncCall {
        let mut def = FuncDefinition::builder("add")
            .data_args([0, 1])
            .backwards(&ELEMENTWISE)
            .inverter(&ELEMENTWISE_INVERTER);
        for inv in binary_inverses("add") {
            def = def.inverse(inv);
        }
        let func = Func::new("add", |_| Ok(Value::from(0)));
        let mut values = values.into_iter();
        SourceFuncCall::from_args(func, Arc::new(def.build()), &CallArgs::new(vec![a, b]), |_| values.next()).0
    }

    #[test]
    fn same_shape_keeps_the_path() {
        let call = add_call(
            Arg::Quib(QuibId(0)),
            Arg::value(10),
            vec![Value::from(vec![1, 2, 3])],
        );
        let previous = Value::from(vec![11, 12, 13]);
        let out = invert_elementwise(&call, &Assignment::new(Path::of(1), 20), &previous).unwrap();
        assert_eq!(out, vec![Inversal::new(SourceId(0), Assignment::new(Path::of(1), 10))]);
    }

    #[test]
    fn chained_path_reaches_a_single_cell() {
        let grid = Value::from_shape(&[2, 2], vec![1, 2, 3, 4]).unwrap();
        let call = add_call(Arg::Quib(QuibId(0)), Arg::value(10), vec![grid]);
        let previous = Value::from_shape(&[2, 2], vec![11, 12, 13, 14]).unwrap();
        let path = Path::of(0).with(PathComponent::new(1));
        let out = invert_elementwise(&call, &Assignment::new(path.clone(), 30), &previous).unwrap();
        assert_eq!(out, vec![Inversal::new(SourceId(0), Assignment::new(path, 20))]);
    }

    #[test]
    fn first_invertible_operand_takes_the_change() {
        let call = add_call(
            Arg::Quib(QuibId(0)),
            Arg::Quib(QuibId(1)),
            vec![Value::from(vec![1.0, 2.0]), Value::from(vec![5.0, 5.0])],
        );
        let previous = Value::from(vec![6.0, 7.0]);
        let out = invert_elementwise(&call, &Assignment::new(Path::of(0), 9.0), &previous).unwrap();
        assert_eq!(out[0].source, SourceId(0));
        assert_eq!(out[0].assignment.value(), Some(&Value::from(4.0)));
    }

    #[test]
    fn broadcast_operand_gets_a_mask() {
        let call = add_call(
            Arg::Quib(QuibId(0)),
            Arg::value(vec![0, 10, 20]),
            vec![Value::from(vec![1])],
        );
        let previous = Value::from(vec![1, 11, 21]);
        let out = invert_elementwise(&call, &Assignment::new(Path::of(2), 25), &previous).unwrap();
        let assignment = &out[0].assignment;
        assert_eq!(assignment.value(), Some(&Value::from(vec![5])));
        match &assignment.path[0].index {
            Index::Mask(m) => assert_eq!(m.data(), &[true]),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn default_assignments_are_not_inverted() {
        let call = add_call(Arg::Quib(QuibId(0)), Arg::value(1), vec![Value::from(1)]);
        let err = invert_elementwise(&call, &Assignment::to_default(Path::new()), &Value::from(2)).unwrap_err();
        assert!(matches!(err, QuibError::FailedToInvert { .. }));
    }
}
