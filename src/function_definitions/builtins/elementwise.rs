//! Unary and binary element-wise math with numpy broadcasting.

use super::param;
use crate::array::{Scalar, Value, broadcast_shapes};
use crate::function_definitions::{CallArgs, Func, FuncDefinition, FuncRegistry};
use crate::inversion::ELEMENTWISE_INVERTER;
use crate::inversion::inverse_funcs::{binary_inverses, unary_inverse};
use crate::quib_error::QuibError;
use crate::translation::translators::ELEMENTWISE;
use std::cmp::Ordering;

const UNARY: &[&str] = &[
    "negative", "positive", "abs", "square", "sqrt", "exp", "log", "log2", "log10", "sin", "cos", "tan", "arcsin",
    "arccos", "arctan", "sinh", "cosh", "tanh", "degrees", "radians", "floor", "ceil", "round", "reciprocal",
];

const BINARY: &[&str] = &[
    "add", "subtract", "multiply", "divide", "power", "mod", "minimum", "maximum", "equal", "not_equal", "greater",
    "greater_equal", "less", "less_equal",
];

fn float_unary(name: &str) -> fn(f64) -> f64 {
    match name {
        "negative" => |x| -x,
        "positive" => |x| x,
        "abs" => f64::abs,
        "square" => |x| x * x,
        "sqrt" => f64::sqrt,
        "exp" => f64::exp,
        "log" => f64::ln,
        "log2" => f64::log2,
        "log10" => f64::log10,
        "sin" => f64::sin,
        "cos" => f64::cos,
        "tan" => f64::tan,
        "arcsin" => f64::asin,
        "arccos" => f64::acos,
        "arctan" => f64::atan,
        "sinh" => f64::sinh,
        "cosh" => f64::cosh,
        "tanh" => f64::tanh,
        "degrees" => f64::to_degrees,
        "radians" => f64::to_radians,
        "floor" => f64::floor,
        "ceil" => f64::ceil,
        "round" => f64::round_ties_even,
        "reciprocal" => f64::recip,
        _ => |_| f64::NAN,
    }
}

/// Sign and magnitude functions keep integers integral.
fn apply_unary(name: &str, op: fn(f64) -> f64, s: Scalar) -> Scalar {
    match (name, s) {
        ("negative", Scalar::Int(i)) => Scalar::Int(i.wrapping_neg()),
        ("positive", Scalar::Int(i)) => Scalar::Int(i),
        ("abs", Scalar::Int(i)) => Scalar::Int(i.wrapping_abs()),
        ("square", Scalar::Int(i)) => i.checked_mul(i).map_or_else(|| Scalar::Float(op(i as f64)), Scalar::Int),
        _ => Scalar::Float(op(s.as_f64())),
    }
}

fn floor_mod(a: i64, b: i64) -> Option<i64> {
    let r = a.checked_rem(b)?;
    Some(if r != 0 && (r < 0) != (b < 0) { r + b } else { r })
}

fn floor_fmod(a: f64, b: f64) -> f64 {
    let r = a % b;
    if r != 0.0 && (r < 0.0) != (b < 0.0) { r + b } else { r }
}

fn compare(a: Scalar, b: Scalar) -> Option<Ordering> {
    match (a, b) {
        (Scalar::Int(x), Scalar::Int(y)) => Some(x.cmp(&y)),
        _ => a.as_f64().partial_cmp(&b.as_f64()),
    }
}

fn binary_op(name: &str) -> Option<fn(Scalar, Scalar) -> Scalar> {
    let op: fn(Scalar, Scalar) -> Scalar = match name {
        "add" => |a, b| Scalar::combine(a, b, i64::checked_add, |x, y| x + y),
        "subtract" => |a, b| Scalar::combine(a, b, i64::checked_sub, |x, y| x - y),
        "multiply" => |a, b| Scalar::combine(a, b, i64::checked_mul, |x, y| x * y),
        "divide" => |a, b| Scalar::Float(a.as_f64() / b.as_f64()),
        "power" => |a, b| {
            Scalar::combine(a, b, |x, y| u32::try_from(y).ok().and_then(|e| x.checked_pow(e)), f64::powf)
        },
        "mod" => |a, b| Scalar::combine(a, b, floor_mod, floor_fmod),
        "minimum" => |a, b| Scalar::combine(a, b, |x, y| Some(x.min(y)), f64::min),
        "maximum" => |a, b| Scalar::combine(a, b, |x, y| Some(x.max(y)), f64::max),
        "equal" => |a, b| Scalar::Bool(compare(a, b) == Some(Ordering::Equal)),
        "not_equal" => |a, b| Scalar::Bool(compare(a, b) != Some(Ordering::Equal)),
        "greater" => |a, b| Scalar::Bool(compare(a, b) == Some(Ordering::Greater)),
        "greater_equal" => |a, b| Scalar::Bool(matches!(compare(a, b), Some(Ordering::Greater | Ordering::Equal))),
        "less" => |a, b| Scalar::Bool(compare(a, b) == Some(Ordering::Less)),
        "less_equal" => |a, b| Scalar::Bool(matches!(compare(a, b), Some(Ordering::Less | Ordering::Equal))),
        _ => return None,
    };
    Some(op)
}

/// Apply `f` to every cell; scalars stay scalars.
pub(crate) fn map_elements(value: &Value, mut f: impl FnMut(Scalar) -> Scalar) -> Result<Value, QuibError> {
    Ok(match value {
        Value::Scalar(s) => Value::Scalar(f(*s)),
        other => Value::Array(other.as_ndarray()?.map(|s| f(*s))),
    })
}

/// Broadcast `a` against `b` and combine cell by cell.
pub(crate) fn zip_elements(a: &Value, b: &Value, mut f: impl FnMut(Scalar, Scalar) -> Scalar) -> Result<Value, QuibError> {
    if let (Value::Scalar(x), Value::Scalar(y)) = (a, b) {
        return Ok(Value::Scalar(f(*x, *y)));
    }
    let (x, y) = (a.as_ndarray()?, b.as_ndarray()?);
    let shape = broadcast_shapes([x.shape(), y.shape()])?;
    let (x, y) = (x.broadcast_to(&shape)?, y.broadcast_to(&shape)?);
    Ok(Value::Array(x.zip_with(&y, |p, q| f(*p, *q))?))
}

pub(super) fn register(registry: &mut FuncRegistry, input_aware: bool) {
    for &name in UNARY {
        let op = float_unary(name);
        let func = Func::new(name, move |args: &CallArgs<Value>| {
            map_elements(param(args, 0, "x", name)?, |s| apply_unary(name, op, s))
        });
        let mut def = FuncDefinition::builder(name)
            .data_args([0])
            .backwards(&ELEMENTWISE)
            .forwards(&ELEMENTWISE)
            .inverter(&ELEMENTWISE_INVERTER);
        if let Some(inverse) = unary_inverse(name, input_aware) {
            def = def.inverse(inverse);
        }
        registry.register(func, def.build());
    }
    for &name in BINARY {
        let Some(op) = binary_op(name) else { continue };
        let func = Func::new(name, move |args: &CallArgs<Value>| {
            zip_elements(param(args, 0, "x1", name)?, param(args, 1, "x2", name)?, op)
        });
        let mut def = FuncDefinition::builder(name)
            .data_args([0, 1])
            .backwards(&ELEMENTWISE)
            .forwards(&ELEMENTWISE)
            .inverter(&ELEMENTWISE_INVERTER);
        for inverse in binary_inverses(name) {
            def = def.inverse(inverse);
        }
        registry.register(func, def.build());
    }
}
