//! Inverting `vectorize`d functions through their declared scalar inverse,
//! undoing broadcasting of each argument.
//!
//! With core dimensions, inversion is only attempted when every argument
//! core has the shape of the result core; the scalar inverse then applies
//! to matching core cells.

use super::elementwise::invert_elementwise;
use super::{Inversal, Inverter, failed};
use crate::array::Value;
use crate::assignment::Assignment;
use crate::function_definitions::{ArgumentRef, Signature};
use crate::quib_error::QuibError;
use crate::translation::SourceFuncCall;

pub struct VectorizeInverter;

pub static VECTORIZE_INVERTER: VectorizeInverter = VectorizeInverter;

fn cores_match_result(call: &SourceFuncCall, signature: &Signature, result_shape: &[usize]) -> Result<bool, QuibError> {
    let (_, result_core) = Signature::split(result_shape, signature.result_core_ndim())?;
    for source in call.data_sources() {
        let &ArgumentRef::Positional(arg) = &source.location.argument else {
            return Ok(false);
        };
        let Some(shape) = call.value_of(source.id).ok().and_then(Value::shape) else {
            return Ok(false);
        };
        let (_, core) = Signature::split(&shape, signature.arg_core_ndim(arg))?;
        if core != result_core {
            return Ok(false);
        }
    }
    Ok(true)
}

impl Inverter for VectorizeInverter {
    fn name(&self) -> &'static str {
        "vectorize"
    }

    fn invert(
        &self,
        call: &SourceFuncCall,
        assignment: &Assignment,
        previous_result: &Value,
    ) -> Result<Vec<Inversal>, QuibError> {
        if let Some(signature) = call.definition.signature.as_ref().filter(|s| !s.is_scalar()) {
            let result_shape = previous_result.shape().ok_or_else(|| failed(call))?;
            if !cores_match_result(call, signature, &result_shape)? {
                return Err(failed(call));
            }
        }
        invert_elementwise(call, assignment, previous_result)
    }
}
