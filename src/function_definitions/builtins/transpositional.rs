//! Functions that move, copy or select elements without changing them.

use super::{axis_param, int_list, opt_int, param, shape_arg};
use crate::array::{NdArray, Scalar, Value, normalize_axis};
use crate::function_definitions::{CallArgs, Func, FuncDefinition, FuncRegistry};
use crate::inversion::TRANSPOSITIONAL_INVERTER;
use crate::path::{Index, PathComponent, deep_get};
use crate::quib_error::QuibError;
use crate::translation::translators::TRANSPOSITIONAL;

type ArrayFn = fn(&CallArgs<Value>) -> Result<Value, QuibError>;

fn definition(name: &str) -> crate::function_definitions::FuncDefinitionBuilder {
    FuncDefinition::builder(name)
        .backwards(&TRANSPOSITIONAL)
        .forwards(&TRANSPOSITIONAL)
        .inverter(&TRANSPOSITIONAL_INVERTER)
}

fn array_of(args: &CallArgs<Value>, func: &str) -> Result<NdArray<Scalar>, QuibError> {
    param(args, 0, "a", func)?.as_ndarray()
}

fn axis_for(args: &CallArgs<Value>, position: usize, ndim: usize) -> Result<Option<usize>, QuibError> {
    axis_param(args, position)?.map(|a| normalize_axis(a, ndim)).transpose()
}

fn array(args: &CallArgs<Value>) -> Result<Value, QuibError> {
    Ok(Value::Array(array_of(args, "array")?))
}

fn reshape(args: &CallArgs<Value>) -> Result<Value, QuibError> {
    let a = array_of(args, "reshape")?;
    let shape: Vec<isize> = int_list(param(args, 1, "newshape", "reshape")?, "shape")?
        .into_iter()
        .map(|d| d as isize)
        .collect();
    Ok(Value::Array(a.reshape(&shape)?))
}

fn transpose(args: &CallArgs<Value>) -> Result<Value, QuibError> {
    let a = array_of(args, "transpose")?;
    let axes = match args.param(1, "axes") {
        None => None,
        Some(v) => Some(
            int_list(v, "axis")?
                .into_iter()
                .map(|ax| normalize_axis(ax as isize, a.ndim()))
                .collect::<Result<Vec<_>, _>>()?,
        ),
    };
    Ok(Value::Array(a.transpose(axes.as_deref())?))
}

fn swapaxes(args: &CallArgs<Value>) -> Result<Value, QuibError> {
    let a = array_of(args, "swapaxes")?;
    let first = opt_int(args, 1, "axis1")?.ok_or_else(|| QuibError::InvalidArgument("swapaxes() missing `axis1`".into()))?;
    let second = opt_int(args, 2, "axis2")?.ok_or_else(|| QuibError::InvalidArgument("swapaxes() missing `axis2`".into()))?;
    let (first, second) = (normalize_axis(first as isize, a.ndim())?, normalize_axis(second as isize, a.ndim())?);
    Ok(Value::Array(a.swapaxes(first, second)?))
}

fn rot90(args: &CallArgs<Value>) -> Result<Value, QuibError> {
    let k = opt_int(args, 1, "k")?.unwrap_or(1);
    Ok(Value::Array(array_of(args, "rot90")?.rot90(k as isize)?))
}

fn flip(args: &CallArgs<Value>) -> Result<Value, QuibError> {
    let a = array_of(args, "flip")?;
    let axis = axis_for(args, 1, a.ndim())?;
    Ok(Value::Array(a.flip(axis)?))
}

fn ravel(args: &CallArgs<Value>) -> Result<Value, QuibError> {
    Ok(Value::Array(array_of(args, "ravel")?.ravel()))
}

fn squeeze(args: &CallArgs<Value>) -> Result<Value, QuibError> {
    let a = array_of(args, "squeeze")?;
    let axis = axis_for(args, 1, a.ndim())?;
    Ok(Value::Array(a.squeeze(axis)?))
}

fn expand_dims(args: &CallArgs<Value>) -> Result<Value, QuibError> {
    let a = array_of(args, "expand_dims")?;
    let axis = axis_for(args, 1, a.ndim() + 1)?
        .ok_or_else(|| QuibError::InvalidArgument("expand_dims() missing `axis`".into()))?;
    Ok(Value::Array(a.expand_dims(axis)?))
}

fn concatenate(args: &CallArgs<Value>) -> Result<Value, QuibError> {
    let Value::List(items) = param(args, 0, "arrays", "concatenate")? else {
        return Err(QuibError::InvalidType {
            expected: "list of arrays".into(),
            found: "non-list".into(),
        });
    };
    let arrays = items.iter().map(Value::as_ndarray).collect::<Result<Vec<_>, _>>()?;
    let ndim = arrays.first().map_or(1, NdArray::ndim);
    let axis = normalize_axis(axis_param(args, 1)?.unwrap_or(0), ndim)?;
    Ok(Value::Array(NdArray::concatenate(&arrays, axis)?))
}

fn repeat(args: &CallArgs<Value>) -> Result<Value, QuibError> {
    let a = array_of(args, "repeat")?;
    let n = opt_int(args, 1, "repeats")?.unwrap_or(1);
    let n = usize::try_from(n).map_err(|_| QuibError::InvalidArgument(format!("negative repeat count {n}")))?;
    let axis = axis_for(args, 2, a.ndim())?;
    Ok(Value::Array(a.repeat(n, axis)?))
}

fn tile(args: &CallArgs<Value>) -> Result<Value, QuibError> {
    let a = array_of(args, "tile")?;
    let reps = shape_arg(param(args, 1, "reps", "tile")?)?;
    Ok(Value::Array(a.tile(&reps)))
}

fn broadcast_to(args: &CallArgs<Value>) -> Result<Value, QuibError> {
    let a = array_of(args, "broadcast_to")?;
    let shape = shape_arg(param(args, 1, "shape", "broadcast_to")?)?;
    Ok(Value::Array(a.broadcast_to(&shape)?))
}

/// `full(shape, fill_value)`: the fill value is the data.
fn full(args: &CallArgs<Value>) -> Result<Value, QuibError> {
    let shape = shape_arg(param(args, 0, "shape", "full")?)?;
    let fill = param(args, 1, "fill_value", "full")?.as_ndarray()?;
    Ok(Value::Array(fill.broadcast_to(&shape)?))
}

/// `a[index]` for a fixed index.
pub fn getitem(index: impl Into<Index>) -> Func {
    let component = PathComponent::new(index);
    Func::new("getitem", move |args: &CallArgs<Value>| {
        deep_get(param(args, 0, "a", "getitem")?, std::slice::from_ref(&component))
    })
    .with_definition(definition("getitem").data_args([0]).build())
}

pub(super) fn register(registry: &mut FuncRegistry) {
    let single: &[(&str, ArrayFn)] = &[
        ("array", array),
        ("asarray", array),
        ("reshape", reshape),
        ("transpose", transpose),
        ("swapaxes", swapaxes),
        ("rot90", rot90),
        ("flip", flip),
        ("ravel", ravel),
        ("squeeze", squeeze),
        ("expand_dims", expand_dims),
        ("repeat", repeat),
        ("tile", tile),
        ("broadcast_to", broadcast_to),
    ];
    for &(name, f) in single {
        registry.register(Func::new(name, f), definition(name).data_args([0]).build());
    }
    registry.register(
        Func::new("concatenate", concatenate),
        definition("concatenate").multi_data_arg(0).build(),
    );
    registry.register(Func::new("full", full), definition("full").data_args([1]).build());
}
