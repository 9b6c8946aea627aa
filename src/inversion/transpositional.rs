//! Inverting rearrangements: the new values go, unchanged, to the source
//! cells the index codes point at.

use super::elementwise::selected;
use super::{Inversal, Inverter, failed};
use crate::array::{NdArray, Scalar, Value, unravel_index};
use crate::assignment::Assignment;
use crate::path::access::spread_over_selection;
use crate::path::{Path, PathComponent};
use crate::quib_error::QuibError;
use crate::translation::index_codes::{IndexCode, positions_to_mask, result_codes};
use crate::translation::{SourceFuncCall, SourceId};

pub struct TranspositionalInverter;

pub static TRANSPOSITIONAL_INVERTER: TranspositionalInverter = TranspositionalInverter;

/// Assignment into `source` for the `(result position, new value)` pairs,
/// or `None` when the source feeds none of them. Repeated source cells
/// (from `tile`, `repeat` and the like) take the first value that reaches
/// them.
fn source_assignment(
    call: &SourceFuncCall,
    source: SourceId,
    changes: &[(usize, Scalar)],
) -> Result<Option<Assignment>, QuibError> {
    let codes = result_codes(call, source).map_err(|_| failed(call))?;
    let mut seen = hashbrown::HashSet::new();
    let mut hits: Vec<(usize, Scalar)> = Vec::new();
    for &(p, y) in changes {
        match codes.data().get(p).copied().and_then(IndexCode::from_code) {
            Some(IndexCode::FocalSourceScalar) => {
                return Ok(Some(Assignment::new(Path::new(), Value::Scalar(y))));
            }
            Some(IndexCode::Focal(i)) if seen.insert(i) => hits.push((i, y)),
            _ => {}
        }
    }
    if hits.is_empty() {
        return Ok(None);
    }
    let shape = call
        .value_of(source)
        .ok()
        .and_then(Value::shape)
        .ok_or_else(|| failed(call))?;
    if let [(position, y)] = hits.as_slice() {
        let coords: Vec<isize> = unravel_index(*position, &shape).into_iter().map(|c| c as isize).collect();
        return Ok(Some(Assignment::new(Path::at(&coords), Value::Scalar(*y))));
    }
    hits.sort_by_key(|(i, _)| *i);
    let positions: Vec<usize> = hits.iter().map(|(i, _)| *i).collect();
    let values = hits.into_iter().map(|(_, y)| y).collect();
    Ok(Some(Assignment::new(
        Path::from(vec![PathComponent::mask(positions_to_mask(&shape, &positions))]),
        Value::Array(NdArray::from_vec(values)),
    )))
}

impl Inverter for TranspositionalInverter {
    fn name(&self) -> &'static str {
        "transpositional"
    }

    fn invert(
        &self,
        call: &SourceFuncCall,
        assignment: &Assignment,
        previous_result: &Value,
    ) -> Result<Vec<Inversal>, QuibError> {
        let new = assignment.value().ok_or_else(|| failed(call))?;
        let result_shape = previous_result.shape().ok_or_else(|| failed(call))?;
        let selection = selected(&result_shape, &assignment.path)?;
        let values = spread_over_selection(new, &selection)?;
        let changes: Vec<(usize, Scalar)> = selection.positions.iter().copied().zip(values).collect();

        let mut out = Vec::new();
        for source in call.data_sources() {
            if let Some(a) = source_assignment(call, source.id, &changes)? {
                out.push(Inversal::new(source.id, a));
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function_definitions::{Arg, CallArgs, Func, FuncDefinition};
    use crate::quib::QuibId;
    use std::sync::Arc;

    fn concat_call(a: Value, b: Value) -> SourceFuncCall {
        let def = Arc::new(
            FuncDefinition::builder("concatenate")
                .multi_data_arg(0)
                .inverter(&TRANSPOSITIONAL_INVERTER)
                .build(),
        );
        let func = Func::new("concatenate", |args: &CallArgs<Value>| {
            let Value::List(items) = &args.args[0] else {
                return Err(QuibError::InvalidArgument("expected a list".into()));
            };
            let arrays = items.iter().map(Value::as_ndarray).collect::<Result<Vec<_>, _>>()?;
            Ok(Value::Array(NdArray::concatenate(&arrays, 0)?))
        });
        let args = CallArgs::new(vec![Arg::List(vec![Arg::Quib(QuibId(0)), Arg::Quib(QuibId(1))])]);
        let mut values = vec![a, b].into_iter();
        SourceFuncCall::from_args(func, def, &args, |_| values.next()).0
    }

    #[test]
    fn concatenate_targets_the_second_operand() {
        let call = concat_call(Value::from(vec![1, 2]), Value::from(vec![3, 4]));
        let previous = Value::from(vec![1, 2, 3, 4]);
        let out = TRANSPOSITIONAL_INVERTER
            .invert(&call, &Assignment::new(Path::of(2), 99), &previous)
            .unwrap();
        assert_eq!(out, vec![Inversal::new(SourceId(1), Assignment::new(Path::at(&[0]), 99))]);
    }

    #[test]
    fn chained_path_on_a_transpose() {
        let def = Arc::new(
            FuncDefinition::builder("transpose")
                .data_args([0])
                .inverter(&TRANSPOSITIONAL_INVERTER)
                .build(),
        );
        let func = Func::new("transpose", |args: &CallArgs<Value>| {
            Ok(Value::Array(args.args[0].as_ndarray()?.transpose(None)?))
        });
        let grid = Value::from_shape(&[2, 2], vec![1, 2, 3, 4]).unwrap();
        let (call, _) = SourceFuncCall::from_args(
            func,
            def,
            &CallArgs::new(vec![Arg::Quib(QuibId(0))]),
            |_| Some(grid.clone()),
        );
        let previous = Value::from_shape(&[2, 2], vec![1, 3, 2, 4]).unwrap();
        let path = Path::of(0).with(PathComponent::new(1));
        let out = TRANSPOSITIONAL_INVERTER
            .invert(&call, &Assignment::new(path, 30), &previous)
            .unwrap();
        assert_eq!(out, vec![Inversal::new(SourceId(0), Assignment::new(Path::at(&[1, 0]), 30))]);
    }

    #[test]
    fn spanning_assignment_splits_across_sources() {
        let call = concat_call(Value::from(vec![1, 2]), Value::from(vec![3, 4]));
        let previous = Value::from(vec![1, 2, 3, 4]);
        let out = TRANSPOSITIONAL_INVERTER
            .invert(&call, &Assignment::new(Path::new(), 0), &previous)
            .unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[1].assignment.value(), Some(&Value::from(vec![0, 0])));
    }
}
