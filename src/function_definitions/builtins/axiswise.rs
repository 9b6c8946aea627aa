//! Reductions, accumulations, `sort` and `diff`.

use super::{array_result, axis_param, opt_int, param};
use crate::array::{NdArray, Scalar, Value, normalize_axis};
use crate::function_definitions::{CallArgs, Func, FuncDefinition, FuncRegistry};
use crate::quib_error::QuibError;
use crate::translation::translators::{ACCUMULATION, DIFF_ALONG_AXIS, REDUCTION, SORT_ALONG_AXIS};

const REDUCTIONS: &[&str] = &["sum", "prod", "min", "max", "mean", "any", "all"];
const ACCUMULATIONS: &[&str] = &["cumsum", "cumprod"];

fn add(a: Scalar, b: Scalar) -> Scalar {
    Scalar::combine(a, b, i64::checked_add, |x, y| x + y)
}

fn mul(a: Scalar, b: Scalar) -> Scalar {
    Scalar::combine(a, b, i64::checked_mul, |x, y| x * y)
}

fn reduce(name: &str, lane: &[Scalar]) -> Result<Scalar, QuibError> {
    Ok(match name {
        "sum" => lane.iter().fold(Scalar::Int(0), |acc, &s| add(acc, s)),
        "prod" => lane.iter().fold(Scalar::Int(1), |acc, &s| mul(acc, s)),
        "mean" => Scalar::Float(lane.iter().map(Scalar::as_f64).sum::<f64>() / lane.len() as f64),
        "any" => Scalar::Bool(lane.iter().any(Scalar::is_truthy)),
        "all" => Scalar::Bool(lane.iter().all(Scalar::is_truthy)),
        "min" | "max" => {
            let keep_first = |a: &Scalar, b: &Scalar| (name == "min") == a.total_cmp(b).is_le();
            lane.iter()
                .copied()
                .reduce(|a, b| if keep_first(&a, &b) { a } else { b })
                .ok_or_else(|| QuibError::InvalidArgument(format!("{name}() of an empty array")))?
        }
        other => return Err(QuibError::UnknownFunction(other.to_string())),
    })
}

fn reduce_value(name: &str, value: &Value, axis: Option<isize>) -> Result<Value, QuibError> {
    let array = value.as_ndarray()?;
    let Some(axis) = axis else {
        return Ok(Value::Scalar(reduce(name, array.data())?));
    };
    let axis = normalize_axis(axis, array.ndim())?;
    let mut shape = array.shape().to_vec();
    shape.remove(axis);
    let data = array
        .axis_lanes(axis)
        .iter()
        .map(|lane| {
            let cells: Vec<Scalar> = lane.iter().map(|&p| array.data()[p]).collect();
            reduce(name, &cells)
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(array_result(NdArray::from_shape_vec(shape, data)?))
}

fn accumulate(name: &str, value: &Value, axis: Option<isize>) -> Result<Value, QuibError> {
    let array = value.as_ndarray()?;
    let (mut out, axis) = match axis {
        None => (array.ravel(), 0),
        Some(a) => {
            let a = normalize_axis(a, array.ndim())?;
            (array, a)
        }
    };
    let product = name == "cumprod";
    let step: fn(Scalar, Scalar) -> Scalar = if product { mul } else { add };
    let start = Scalar::Int(i64::from(product));
    for lane in out.axis_lanes(axis) {
        let mut acc = start;
        for p in lane {
            acc = step(acc, out.data()[p]);
            out.data_mut()[p] = acc;
        }
    }
    Ok(Value::Array(out))
}

fn sort(value: &Value, axis: isize) -> Result<Value, QuibError> {
    let mut array = value.as_ndarray()?;
    if array.ndim() == 0 {
        return Err(QuibError::InvalidArgument("cannot sort a 0-d value".into()));
    }
    let axis = normalize_axis(axis, array.ndim())?;
    for lane in array.axis_lanes(axis) {
        let mut cells: Vec<Scalar> = lane.iter().map(|&p| array.data()[p]).collect();
        cells.sort_by(Scalar::total_cmp);
        for (p, cell) in lane.into_iter().zip(cells) {
            array.data_mut()[p] = cell;
        }
    }
    Ok(Value::Array(array))
}

fn diff_once(array: &NdArray<Scalar>, axis: usize) -> Result<NdArray<Scalar>, QuibError> {
    let mut shape = array.shape().to_vec();
    shape[axis] = shape[axis].saturating_sub(1);
    let mut out = NdArray::full(shape, Scalar::Int(0));
    for (src, dst) in array.axis_lanes(axis).into_iter().zip(out.axis_lanes(axis)) {
        for (k, &p) in dst.iter().enumerate() {
            let (prev, next) = (array.data()[src[k]], array.data()[src[k + 1]]);
            out.data_mut()[p] = Scalar::combine(next, prev, i64::checked_sub, |x, y| x - y);
        }
    }
    Ok(out)
}

fn diff(value: &Value, n: i64, axis: isize) -> Result<Value, QuibError> {
    let n = usize::try_from(n).map_err(|_| QuibError::InvalidArgument(format!("diff order must be non-negative, got {n}")))?;
    let mut array = value.as_ndarray()?;
    let axis = normalize_axis(axis, array.ndim())?;
    for _ in 0..n {
        array = diff_once(&array, axis)?;
    }
    Ok(Value::Array(array))
}

pub(super) fn register(registry: &mut FuncRegistry) {
    for &name in REDUCTIONS {
        registry.register(
            Func::new(name, move |args: &CallArgs<Value>| {
                reduce_value(name, param(args, 0, "a", name)?, axis_param(args, 1)?)
            }),
            FuncDefinition::builder(name)
                .data_args([0])
                .backwards(&REDUCTION)
                .forwards(&REDUCTION)
                .build(),
        );
    }
    for &name in ACCUMULATIONS {
        registry.register(
            Func::new(name, move |args: &CallArgs<Value>| {
                accumulate(name, param(args, 0, "a", name)?, axis_param(args, 1)?)
            }),
            FuncDefinition::builder(name)
                .data_args([0])
                .backwards(&ACCUMULATION)
                .forwards(&ACCUMULATION)
                .build(),
        );
    }
    registry.register(
        Func::new("sort", |args: &CallArgs<Value>| {
            sort(param(args, 0, "a", "sort")?, axis_param(args, 1)?.unwrap_or(-1))
        }),
        FuncDefinition::builder("sort")
            .data_args([0])
            .backwards(&SORT_ALONG_AXIS)
            .forwards(&SORT_ALONG_AXIS)
            .build(),
    );
    registry.register(
        Func::new("diff", |args: &CallArgs<Value>| {
            diff(
                param(args, 0, "a", "diff")?,
                opt_int(args, 1, "n")?.unwrap_or(1),
                axis_param(args, 2)?.unwrap_or(-1),
            )
        }),
        FuncDefinition::builder("diff")
            .data_args([0])
            .backwards(&DIFF_ALONG_AXIS)
            .forwards(&DIFF_ALONG_AXIS)
            .build(),
    );
}
