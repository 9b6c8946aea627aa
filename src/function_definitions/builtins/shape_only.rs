//! Functions whose result depends only on the shape of their input.

use super::param;
use crate::array::{NdArray, Scalar, Value};
use crate::function_definitions::{CallArgs, Func, FuncDefinition, FuncRegistry};
use crate::quib_error::QuibError;
use crate::translation::translators::SHAPE_ONLY;

fn filled_like(value: &Value, fill: i64) -> Result<Value, QuibError> {
    let array = value.as_ndarray()?.map(|cell| Scalar::Int(fill).cast_like(cell));
    Ok(Value::like(value, array))
}

fn shape(value: &Value) -> Result<Value, QuibError> {
    let shape = value.as_ndarray()?.shape().iter().map(|&d| Scalar::from(d)).collect();
    Ok(Value::Array(NdArray::from_vec(shape)))
}

pub(super) fn register(registry: &mut FuncRegistry) {
    let def = |name: &str| {
        FuncDefinition::builder(name)
            .data_args([0])
            .backwards(&SHAPE_ONLY)
            .forwards(&SHAPE_ONLY)
            .build()
    };
    registry.register(
        Func::new("zeros_like", |args: &CallArgs<Value>| filled_like(param(args, 0, "a", "zeros_like")?, 0)),
        def("zeros_like"),
    );
    registry.register(
        Func::new("ones_like", |args: &CallArgs<Value>| filled_like(param(args, 0, "a", "ones_like")?, 1)),
        def("ones_like"),
    );
    registry.register(
        Func::new("shape", |args: &CallArgs<Value>| shape(param(args, 0, "a", "shape")?)),
        def("shape"),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_functions_keep_shape_and_kind() {
        let out = filled_like(&Value::from(vec![1.5, 2.5]), 1).unwrap();
        assert_eq!(out, Value::from(vec![1.0, 1.0]));
        assert!(matches!(filled_like(&Value::from(3), 0).unwrap(), Value::Scalar(Scalar::Int(0))));
        assert_eq!(shape(&Value::from_shape(&[2, 3], vec![0; 6]).unwrap()).unwrap(), Value::from(vec![2, 3]));
    }
}
