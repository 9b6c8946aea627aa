//! Closed-form inverses of element-wise functions.
//!
//! Every function takes the requested result `y` and the previous values of
//! the call's positional arguments at the same broadcast position, and
//! returns the value the inverted argument must take.

use crate::function_definitions::ElementwiseInverse;
use num_traits::{Float, FloatConst};

/// Previous value of positional argument `i` (NaN when absent).
#[inline]
fn arg(previous: &[f64], i: usize) -> f64 {
    previous.get(i).copied().unwrap_or(f64::NAN)
}

/// `-1` for negative `x`, else `1`; zero keeps the positive branch.
#[inline]
fn sign_of<F: Float>(x: F) -> F {
    if x < F::zero() { -F::one() } else { F::one() }
}

/// Among `base + k * period` (for every integer `k`), the one nearest to
/// `target`.
pub fn nearest_periodic<F: Float>(base: F, period: F, target: F) -> F {
    if !target.is_finite() {
        return base;
    }
    let k = ((target - base) / period).round();
    base + k * period
}

/// Of the solutions `±base + 2πk`, the one nearest to `target` (used by the
/// even periodic functions).
fn nearest_of_pair<F: Float + FloatConst>(first: F, second: F, target: F) -> F {
    let two_pi = F::PI() + F::PI();
    let a = nearest_periodic(first, two_pi, target);
    let b = nearest_periodic(second, two_pi, target);
    if (a - target).abs() <= (b - target).abs() { a } else { b }
}

/// `sin` solution nearest the previous input.
pub fn inverse_sin_near(y: f64, previous: f64) -> f64 {
    let base = y.asin();
    nearest_of_pair(base, f64::PI() - base, previous)
}

/// `cos` solution nearest the previous input.
pub fn inverse_cos_near(y: f64, previous: f64) -> f64 {
    let base = y.acos();
    nearest_of_pair(base, -base, previous)
}

/// `tan` solution nearest the previous input.
pub fn inverse_tan_near(y: f64, previous: f64) -> f64 {
    nearest_periodic(y.atan(), f64::PI(), previous)
}

/// Inverse of a single-argument function, input-aware variants when
/// `input_aware` is set. `None` for functions with no inverse.
pub fn unary_inverse(name: &str, input_aware: bool) -> Option<ElementwiseInverse> {
    if input_aware {
        let aware = match name {
            "square" => Some(ElementwiseInverse::new(0, |y, p| y.sqrt() * sign_of(arg(p, 0)))),
            "abs" => Some(ElementwiseInverse::new(0, |y, p| y * sign_of(arg(p, 0)))),
            "cosh" => Some(ElementwiseInverse::new(0, |y, p| y.acosh() * sign_of(arg(p, 0)))),
            "sin" => Some(ElementwiseInverse::new(0, |y, p| inverse_sin_near(y, arg(p, 0)))),
            "cos" => Some(ElementwiseInverse::new(0, |y, p| inverse_cos_near(y, arg(p, 0)))),
            "tan" => Some(ElementwiseInverse::new(0, |y, p| inverse_tan_near(y, arg(p, 0)))),
            _ => None,
        };
        if aware.is_some() {
            return aware;
        }
    }
    let inverse = match name {
        "negative" => ElementwiseInverse::new(0, |y, _| -y),
        "positive" | "floor" | "ceil" | "round" | "abs" => ElementwiseInverse::new(0, |y, _| y),
        "sqrt" => ElementwiseInverse::new(0, |y, _| y * y),
        "square" => ElementwiseInverse::new(0, |y, _| y.sqrt()),
        "exp" => ElementwiseInverse::new(0, |y, _| y.ln()),
        "log" => ElementwiseInverse::new(0, |y, _| y.exp()),
        "log2" => ElementwiseInverse::new(0, |y, _| y.exp2()),
        "log10" => ElementwiseInverse::new(0, |y, _| 10f64.powf(y)),
        "sin" => ElementwiseInverse::new(0, |y, _| y.asin()),
        "cos" => ElementwiseInverse::new(0, |y, _| y.acos()),
        "tan" => ElementwiseInverse::new(0, |y, _| y.atan()),
        "arcsin" => ElementwiseInverse::new(0, |y, _| y.sin()),
        "arccos" => ElementwiseInverse::new(0, |y, _| y.cos()),
        "arctan" => ElementwiseInverse::new(0, |y, _| y.tan()),
        "sinh" => ElementwiseInverse::new(0, |y, _| y.asinh()),
        "cosh" => ElementwiseInverse::new(0, |y, _| y.acosh()),
        "tanh" => ElementwiseInverse::new(0, |y, _| y.atanh()),
        "degrees" => ElementwiseInverse::new(0, |y, _| y.to_radians()),
        "radians" => ElementwiseInverse::new(0, |y, _| y.to_degrees()),
        _ => return None,
    };
    Some(inverse)
}

/// Per-operand inverses of a two-argument function; empty when it has
/// none.
pub fn binary_inverses(name: &str) -> Vec<ElementwiseInverse> {
    match name {
        "add" => vec![
            ElementwiseInverse::new(0, |y, p| y - arg(p, 1)),
            ElementwiseInverse::new(1, |y, p| y - arg(p, 0)),
        ],
        "subtract" => vec![
            ElementwiseInverse::new(0, |y, p| y + arg(p, 1)),
            ElementwiseInverse::new(1, |y, p| arg(p, 0) - y),
        ],
        "multiply" => vec![
            ElementwiseInverse::new(0, |y, p| y / arg(p, 1)),
            ElementwiseInverse::new(1, |y, p| y / arg(p, 0)),
        ],
        "divide" => vec![
            ElementwiseInverse::new(0, |y, p| y * arg(p, 1)),
            ElementwiseInverse::new(1, |y, p| arg(p, 0) / y),
        ],
        "power" => vec![
            ElementwiseInverse::new(0, |y, p| y.powf(1.0 / arg(p, 1))),
            ElementwiseInverse::new(1, |y, p| y.ln() / arg(p, 0).ln()),
        ],
        _ => Vec::new(),
    }
}
