//! Functions that create data rather than transform it: ranges, constant
//! arrays, random draws and text files.

use super::{opt_int, param, shape_arg};
use crate::array::{NdArray, Scalar, Value};
use crate::function_definitions::{CallArgs, Func, FuncDefinition, FuncRegistry};
use crate::quib_error::QuibError;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;

fn arange(args: &CallArgs<Value>) -> Result<Value, QuibError> {
    let first = param(args, 0, "start", "arange")?.as_scalar().unwrap_or(Scalar::Int(0));
    let (start, stop) = match args.param(1, "stop").and_then(Value::as_scalar) {
        Some(stop) => (first, stop),
        None => (Scalar::Int(0), first),
    };
    let step = args.param(2, "step").and_then(Value::as_scalar).unwrap_or(Scalar::Int(1));
    if step.as_f64() == 0.0 {
        return Err(QuibError::InvalidArgument("arange() step must be non-zero".into()));
    }
    let count = ((stop.as_f64() - start.as_f64()) / step.as_f64()).ceil().max(0.0) as usize;
    let data = (0..count)
        .map(|i| match (start, step) {
            (Scalar::Int(s), Scalar::Int(d)) => Scalar::Int(s + d * i as i64),
            _ => Scalar::Float(start.as_f64() + step.as_f64() * i as f64),
        })
        .collect();
    Ok(Value::Array(NdArray::from_vec(data)))
}

fn linspace(args: &CallArgs<Value>) -> Result<Value, QuibError> {
    let start = param(args, 0, "start", "linspace")?.as_scalar().map_or(f64::NAN, |s| s.as_f64());
    let stop = param(args, 1, "stop", "linspace")?.as_scalar().map_or(f64::NAN, |s| s.as_f64());
    let num = opt_int(args, 2, "num")?.unwrap_or(50).max(0) as usize;
    let data = match num {
        0 => Vec::new(),
        1 => vec![Scalar::Float(start)],
        n => (0..n)
            .map(|i| Scalar::Float(start + (stop - start) * i as f64 / (n - 1) as f64))
            .collect(),
    };
    Ok(Value::Array(NdArray::from_vec(data)))
}

fn constant(args: &CallArgs<Value>, fill: f64, func: &str) -> Result<Value, QuibError> {
    let shape = shape_arg(param(args, 0, "shape", func)?)?;
    Ok(Value::Array(NdArray::full(shape, Scalar::Float(fill))))
}

/// Uniform draws in `[0, 1)`; a scalar without `size`.
fn random(args: &CallArgs<Value>) -> Result<Value, QuibError> {
    let mut rng = SmallRng::from_entropy();
    match args.param(0, "size") {
        None => Ok(Value::Scalar(Scalar::Float(rng.r#gen::<f64>()))),
        Some(size) => {
            let shape = shape_arg(size)?;
            let n = crate::array::shape_size(&shape);
            let data = (0..n).map(|_| Scalar::Float(rng.r#gen::<f64>())).collect();
            Ok(Value::Array(NdArray::from_shape_vec(shape, data)?))
        }
    }
}

/// Parse whitespace- or comma-separated numbers; `#` starts a comment.
/// One row or one column gives a 1-d array.
pub(crate) fn parse_text(text: &str) -> Result<Value, QuibError> {
    let mut rows: Vec<Vec<f64>> = Vec::new();
    for (line_no, line) in text.lines().enumerate() {
        let line = line.split('#').next().unwrap_or_default().trim();
        if line.is_empty() {
            continue;
        }
        let row = line
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|t| !t.is_empty())
            .map(|t| {
                t.parse::<f64>()
                    .map_err(|_| QuibError::InvalidArgument(format!("line {}: cannot parse `{t}`", line_no + 1)))
            })
            .collect::<Result<Vec<_>, _>>()?;
        rows.push(row);
    }
    let width = rows.first().map_or(0, Vec::len);
    if rows.iter().any(|r| r.len() != width) {
        return Err(QuibError::InvalidArgument("rows have different lengths".into()));
    }
    let height = rows.len();
    let data: Vec<Scalar> = rows.into_iter().flatten().map(Scalar::Float).collect();
    let shape = if height == 1 || width == 1 { vec![data.len()] } else { vec![height, width] };
    Ok(Value::Array(NdArray::from_shape_vec(shape, data)?))
}

/// `loadtxt` for a fixed file. The file is re-read whenever the quib is
/// invalidated; it is never cached across reruns.
pub fn loadtxt(path: impl Into<PathBuf>) -> Func {
    let path = path.into();
    Func::new("loadtxt", move |_: &CallArgs<Value>| {
        let text = std::fs::read_to_string(&path).map_err(|e| QuibError::Io(format!("{}: {e}", path.display())))?;
        log::debug!("loaded {} bytes from {}", text.len(), path.display());
        parse_text(&text)
    })
    .with_definition(FuncDefinition::builder("loadtxt").file_loading().build())
}

pub(super) fn register(registry: &mut FuncRegistry) {
    registry.register(Func::new("arange", arange), FuncDefinition::builder("arange").build());
    registry.register(Func::new("linspace", linspace), FuncDefinition::builder("linspace").build());
    registry.register(
        Func::new("zeros", |args: &CallArgs<Value>| constant(args, 0.0, "zeros")),
        FuncDefinition::builder("zeros").build(),
    );
    registry.register(
        Func::new("ones", |args: &CallArgs<Value>| constant(args, 1.0, "ones")),
        FuncDefinition::builder("ones").build(),
    );
    registry.register(Func::new("random", random), FuncDefinition::builder("random").random().build());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arange_keeps_integers() {
        let out = arange(&CallArgs::new(vec![Value::from(4)])).unwrap();
        assert_eq!(out, Value::from(vec![0, 1, 2, 3]));
        let out = arange(&CallArgs::new(vec![Value::from(1), Value::from(2), Value::from(0.5)])).unwrap();
        assert_eq!(out, Value::from(vec![1.0, 1.5]));
    }

    #[test]
    fn linspace_includes_both_ends() {
        let out = linspace(&CallArgs::new(vec![Value::from(0), Value::from(1)]).with_kwarg("num", Value::from(3))).unwrap();
        assert_eq!(out, Value::from(vec![0.0, 0.5, 1.0]));
    }

    #[test]
    fn random_respects_size() {
        let out = random(&CallArgs::new(vec![Value::from(vec![2, 2])])).unwrap();
        assert_eq!(out.shape(), Some(vec![2, 2]));
        let Value::Scalar(Scalar::Float(x)) = random(&CallArgs::default()).unwrap() else {
            panic!("expected a float");
        };
        assert!((0.0..1.0).contains(&x));
    }

    #[test]
    fn text_parsing() {
        let grid = parse_text("1 2 3\n# note\n4,5,6\n").unwrap();
        assert_eq!(grid.shape(), Some(vec![2, 3]));
        assert_eq!(parse_text("1\n2\n").unwrap(), Value::from(vec![1.0, 2.0]));
        assert!(parse_text("1 2\n3\n").is_err());
        assert!(parse_text("x").is_err());
    }

    #[test]
    fn loadtxt_reports_missing_files() {
        let f = loadtxt("/nonexistent/quibbler/data.txt");
        assert!(matches!(f.call(&CallArgs::default()), Err(QuibError::Io(_))));
    }
}
