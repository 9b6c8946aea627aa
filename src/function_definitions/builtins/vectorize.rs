//! Lifting scalar and core-dimension functions over broadcast arrays.

use crate::array::{NdArray, Scalar, Value, broadcast_shapes, broadcast_source_position, shape_size};
use crate::function_definitions::{CallArgs, ElementwiseInverse, Func, FuncDefinition, Signature};
use crate::inversion::VECTORIZE_INVERTER;
use crate::quib_error::QuibError;
use crate::translation::translators::VECTORIZE;

/// Wrap `scalar_fn` (taking `nargs` floats) as an array function.
///
/// Every positional argument is data. With `inverses` given, assignments to
/// the result are inverted through them just like element-wise math.
///
/// ```rust
/// use quibbler::function_definitions::{CallArgs, ElementwiseInverse, vectorize};
/// use quibbler::array::Value;
/// let double = vectorize("double", 1, |x| x[0] * 2.0, vec![ElementwiseInverse::new(0, |y, _| y / 2.0)]);
/// let out = double.call(&CallArgs::new(vec![Value::from(vec![1, 2])])).unwrap();
/// assert_eq!(out, Value::from(vec![2.0, 4.0]));
/// ```
pub fn vectorize(
    name: impl Into<String>,
    nargs: usize,
    scalar_fn: impl Fn(&[f64]) -> f64 + Send + Sync + 'static,
    inverses: Vec<ElementwiseInverse>,
) -> Func {
    let core_fn = move |cells: &[NdArray<f64>]| {
        let x: Vec<f64> = cells.iter().map(|c| c.data().first().copied().unwrap_or(f64::NAN)).collect();
        Ok(NdArray::scalar(scalar_fn(&x)))
    };
    build(name.into(), Signature::scalar(nargs), core_fn, inverses)
}

/// Wrap `core_fn` as an array function with core dimensions, as in
/// `"(m,n),(n)->(m)"`.
///
/// `core_fn` sees one core block per argument and returns the result core
/// block; leading loop axes broadcast across arguments. Declared inverses
/// are only used when every argument core matches the result core, where
/// they apply cell by cell.
///
/// ```rust
/// use quibbler::function_definitions::{CallArgs, vectorize_with_signature};
/// use quibbler::array::{NdArray, Value};
/// let total = vectorize_with_signature(
///     "total",
///     "(n)->()",
///     |core: &[NdArray<f64>]| Ok(NdArray::scalar(core[0].data().iter().sum())),
///     Vec::new(),
/// )?;
/// let rows = Value::from_shape(&[2, 2], vec![1, 2, 3, 4])?;
/// assert_eq!(total.call(&CallArgs::new(vec![rows]))?, Value::from(vec![3.0, 7.0]));
/// # Ok::<(), quibbler::quib_error::QuibError>(())
/// ```
pub fn vectorize_with_signature(
    name: impl Into<String>,
    signature: &str,
    core_fn: impl Fn(&[NdArray<f64>]) -> Result<NdArray<f64>, QuibError> + Send + Sync + 'static,
    inverses: Vec<ElementwiseInverse>,
) -> Result<Func, QuibError> {
    Ok(build(name.into(), signature.parse()?, core_fn, inverses))
}

fn build(
    name: String,
    signature: Signature,
    core_fn: impl Fn(&[NdArray<f64>]) -> Result<NdArray<f64>, QuibError> + Send + Sync + 'static,
    inverses: Vec<ElementwiseInverse>,
) -> Func {
    let mut def = FuncDefinition::builder(name.clone())
        .data_args(0..signature.nargs())
        .backwards(&VECTORIZE)
        .forwards(&VECTORIZE)
        .signature(signature.clone());
    if !inverses.is_empty() {
        def = def.inverter(&VECTORIZE_INVERTER);
    }
    for inverse in inverses {
        def = def.inverse(inverse);
    }
    let label = name.clone();
    Func::new(name, move |args: &CallArgs<Value>| apply(&label, &signature, &core_fn, args))
        .with_definition(def.build())
}

fn apply(
    name: &str,
    signature: &Signature,
    core_fn: &dyn Fn(&[NdArray<f64>]) -> Result<NdArray<f64>, QuibError>,
    args: &CallArgs<Value>,
) -> Result<Value, QuibError> {
    let nargs = signature.nargs();
    if args.args.len() < nargs {
        return Err(QuibError::InvalidArgument(format!(
            "{name}() takes {nargs} arguments, got {}",
            args.args.len()
        )));
    }
    let arrays = args.args[..nargs]
        .iter()
        .map(Value::as_ndarray)
        .collect::<Result<Vec<_>, _>>()?;
    let mut loops = Vec::with_capacity(nargs);
    let mut cores = Vec::with_capacity(nargs);
    for (i, a) in arrays.iter().enumerate() {
        let (l, c) = Signature::split(a.shape(), signature.arg_core_ndim(i))?;
        loops.push(l);
        cores.push(c);
    }
    let sizes = signature.bind(&cores)?;
    let loop_shape = broadcast_shapes(loops.iter().copied())?;

    let mut result_core: Option<Vec<usize>> = None;
    let mut data = Vec::new();
    for p in 0..shape_size(&loop_shape) {
        let cells = arrays
            .iter()
            .zip(loops.iter().zip(&cores))
            .map(|(a, (l, c))| {
                let size = shape_size(c);
                let start = broadcast_source_position(p, &loop_shape, l) * size;
                let block = a.data()[start..start + size].iter().map(Scalar::as_f64).collect();
                NdArray::from_shape_vec(c.to_vec(), block)
            })
            .collect::<Result<Vec<_>, _>>()?;
        let out = core_fn(&cells)?;
        match &result_core {
            Some(core) if core.as_slice() != out.shape() => {
                return Err(QuibError::ShapeMismatch {
                    expected: core.clone(),
                    found: out.shape().to_vec(),
                });
            }
            Some(_) => {}
            None => {
                check_result_core(name, signature, &sizes, out.shape())?;
                result_core = Some(out.shape().to_vec());
            }
        }
        data.extend(out.data().iter().map(|&x| Scalar::Float(x)));
    }
    let core = match result_core {
        Some(core) => core,
        None => signature
            .result
            .iter()
            .map(|n| {
                sizes.get(n).copied().ok_or_else(|| {
                    QuibError::InvalidArgument(format!("{name}(): cannot size core dimension {n} of an empty result"))
                })
            })
            .collect::<Result<_, _>>()?,
    };
    let out = NdArray::from_shape_vec([loop_shape.as_slice(), core.as_slice()].concat(), data)?;
    if out.ndim() == 0 {
        return Ok(Value::Scalar(out.item().copied().unwrap_or_default()));
    }
    Ok(Value::Array(out))
}

fn check_result_core(
    name: &str,
    signature: &Signature,
    sizes: &hashbrown::HashMap<String, usize>,
    shape: &[usize],
) -> Result<(), QuibError> {
    let agrees = shape.len() == signature.result_core_ndim()
        && signature
            .result
            .iter()
            .zip(shape)
            .all(|(n, &size)| sizes.get(n).is_none_or(|&bound| bound == size));
    if agrees {
        Ok(())
    } else {
        Err(QuibError::InvalidArgument(format!(
            "{name}() returned a core of shape {shape:?}, expected {}",
            signature
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broadcasts_over_all_arguments() {
        let hyp = vectorize("hypot", 2, |x| x[0].hypot(x[1]), Vec::new());
        let out = hyp
            .call(&CallArgs::new(vec![Value::from(vec![3.0, 5.0]), Value::from(4.0)]))
            .unwrap();
        assert_eq!(out, Value::from(vec![5.0, 41f64.sqrt()]));
        assert!(hyp.definition().is_some_and(|d| d.inverters.is_empty()));
    }

    #[test]
    fn scalar_inputs_give_a_scalar() {
        let inc = vectorize("inc", 1, |x| x[0] + 1.0, Vec::new());
        assert_eq!(inc.call(&CallArgs::new(vec![Value::from(1)])).unwrap(), Value::from(2.0));
        assert!(inc.call(&CallArgs::default()).is_err());
    }

    #[test]
    fn core_dimensions_loop_over_leading_axes() {
        let normalize = vectorize_with_signature(
            "normalize",
            "(n)->(n)",
            |core: &[NdArray<f64>]| {
                let total: f64 = core[0].data().iter().sum();
                Ok(core[0].map(|x| x / total))
            },
            Vec::new(),
        )
        .unwrap();
        let rows = Value::from_shape(&[2, 2], vec![1, 3, 2, 2]).unwrap();
        let out = normalize.call(&CallArgs::new(vec![rows])).unwrap();
        assert_eq!(out, Value::from_shape(&[2, 2], vec![0.25, 0.75, 0.5, 0.5]).unwrap());
        let signature = normalize.definition().and_then(|d| d.signature.clone()).unwrap();
        assert_eq!(signature.to_string(), "(n)->(n)");
    }

    #[test]
    fn core_sizes_must_agree_across_arguments() {
        let dot = vectorize_with_signature(
            "dot",
            "(n),(n)->()",
            |core: &[NdArray<f64>]| {
                let d = core[0].data().iter().zip(core[1].data()).map(|(a, b)| a * b).sum();
                Ok(NdArray::scalar(d))
            },
            Vec::new(),
        )
        .unwrap();
        let a = Value::from_shape(&[2, 2], vec![1, 2, 3, 4]).unwrap();
        let out = dot.call(&CallArgs::new(vec![a, Value::from(vec![1, 1])])).unwrap();
        assert_eq!(out, Value::from(vec![3.0, 7.0]));
        assert!(dot.call(&CallArgs::new(vec![Value::from(vec![1, 2]), Value::from(vec![1, 2, 3])])).is_err());
    }

    #[test]
    fn result_core_must_match_the_signature() {
        let wrong = vectorize_with_signature("wrong", "(n)->()", |core: &[NdArray<f64>]| Ok(core[0].clone()), Vec::new())
            .unwrap();
        assert!(wrong.call(&CallArgs::new(vec![Value::from(vec![1, 2])])).is_err());
        assert!(vectorize_with_signature("bad", "(n)", |_: &[NdArray<f64>]| Ok(NdArray::scalar(0.0)), Vec::new()).is_err());
    }
}
