//! Built-in numeric functions and the definitions that make them
//! quib-aware.
//!
//! Each family lives in its own module and registers itself into a
//! [`FuncRegistry`]; argument conventions follow numpy (`axis` at the
//! position numpy uses, also accepted as a keyword).

mod axiswise;
mod elementwise;
mod generators;
mod shape_only;
mod transpositional;
mod vectorize;

pub use generators::loadtxt;
pub use transpositional::getitem;
pub use vectorize::{vectorize, vectorize_with_signature};

use super::definition::FuncDefinition;
use super::func::{CallArgs, Func};
use super::registry::FuncRegistry;
use crate::array::{NdArray, Scalar, Value};
use crate::config::QuibConfig;
use crate::quib_error::QuibError;

pub(crate) fn register_all(registry: &mut FuncRegistry, config: &QuibConfig) {
    registry.register(iquib_func(), FuncDefinition::builder("iquib").build());
    elementwise::register(registry, config.input_aware_inversion);
    axiswise::register(registry);
    transpositional::register(registry);
    shape_only::register(registry);
    generators::register(registry);
}

/// Input quibs: the function returns its argument unchanged.
pub(crate) fn iquib_func() -> Func {
    Func::new("iquib", |args: &CallArgs<Value>| Ok(param(args, 0, "value", "iquib")?.clone()))
}

/// Required argument, by position or keyword.
pub(crate) fn param<'a>(
    args: &'a CallArgs<Value>,
    position: usize,
    name: &str,
    func: &str,
) -> Result<&'a Value, QuibError> {
    args.param(position, name)
        .ok_or_else(|| QuibError::InvalidArgument(format!("{func}() missing argument `{name}`")))
}

pub(crate) fn to_int(value: &Value, what: &str) -> Result<i64, QuibError> {
    value
        .as_scalar()
        .and_then(|s| s.as_i64())
        .ok_or_else(|| QuibError::InvalidType {
            expected: format!("integer {what}"),
            found: value.kind().to_string(),
        })
}

pub(crate) fn opt_int(args: &CallArgs<Value>, position: usize, name: &str) -> Result<Option<i64>, QuibError> {
    args.param(position, name).map(|v| to_int(v, name)).transpose()
}

/// Optional `axis` argument.
pub(crate) fn axis_param(args: &CallArgs<Value>, position: usize) -> Result<Option<isize>, QuibError> {
    Ok(opt_int(args, position, "axis")?.map(|a| a as isize))
}

/// A single integer or a 1-d sequence of them.
pub(crate) fn int_list(value: &Value, what: &str) -> Result<Vec<i64>, QuibError> {
    if value.as_scalar().is_some() {
        return Ok(vec![to_int(value, what)?]);
    }
    value
        .as_ndarray()?
        .iter()
        .map(|s| {
            s.as_i64().ok_or_else(|| QuibError::InvalidType {
                expected: format!("integer {what}"),
                found: s.kind().to_string(),
            })
        })
        .collect()
}

pub(crate) fn shape_arg(value: &Value) -> Result<Vec<usize>, QuibError> {
    int_list(value, "shape")?
        .into_iter()
        .map(|d| usize::try_from(d).map_err(|_| QuibError::InvalidArgument(format!("negative dimension {d}"))))
        .collect()
}

/// 0-d results come back as plain scalars, as numpy reductions do.
pub(crate) fn array_result(array: NdArray<Scalar>) -> Value {
    match array.item() {
        Some(s) if array.ndim() == 0 => Value::Scalar(*s),
        _ => Value::Array(array),
    }
}
