//! `vectorize`d functions: the loop axes broadcast like element-wise
//! functions, while every result cell depends on the whole core of the
//! argument cells it was computed from.

use super::elementwise::{broadcast_backwards, broadcast_forwards, source_shape};
use crate::array::{NdArray, shape_size, unbroadcast_mask};
use crate::function_definitions::{ArgumentRef, Signature};
use crate::path::{Path, PathComponent, bool_mask_at_path};
use crate::quib_error::QuibError;
use crate::translation::source::{SourceFuncCall, SourceId};
use crate::translation::{
    BackwardsPathTranslator, ForwardsPathTranslator, ResultMetadata, SourcePaths, Translation, Untranslatable,
    mask_to_paths,
};

pub struct VectorizeTranslator;

pub static VECTORIZE: VectorizeTranslator = VectorizeTranslator;

/// Signature with core dimensions, `None` for plain scalar functions.
fn core_signature(call: &SourceFuncCall) -> Option<&Signature> {
    call.definition.signature.as_ref().filter(|s| !s.is_scalar())
}

fn positional(call: &SourceFuncCall, source: SourceId) -> Result<usize, Untranslatable> {
    let location = &call.source(source).location;
    match (&location.argument, &location.item) {
        (ArgumentRef::Positional(i), None) => Ok(*i),
        _ => Err(Untranslatable::Failed),
    }
}

/// Collapse the axes of `mask` past the first `loop_ndim` with `any`.
pub(crate) fn any_over_core(mask: &NdArray<bool>, loop_ndim: usize) -> Result<NdArray<bool>, QuibError> {
    let (loop_shape, core) = mask.shape().split_at(loop_ndim.min(mask.ndim()));
    let core_size = shape_size(core);
    let data = if core_size == 0 {
        vec![false; shape_size(loop_shape)]
    } else {
        mask.data().chunks(core_size).map(|c| c.iter().any(|&b| b)).collect()
    };
    NdArray::from_shape_vec(loop_shape.to_vec(), data)
}

/// Stretch every cell of `mask` over a trailing `core` block.
pub(crate) fn expand_over_core(mask: &NdArray<bool>, core: &[usize]) -> Result<NdArray<bool>, QuibError> {
    let size = shape_size(core);
    let data = mask.data().iter().flat_map(|&b| std::iter::repeat_n(b, size)).collect();
    NdArray::from_shape_vec([mask.shape(), core].concat(), data)
}

fn core_backwards(
    call: &SourceFuncCall,
    signature: &Signature,
    path: &Path,
    result_shape: &[usize],
) -> Result<SourcePaths, Untranslatable> {
    let mask = bool_mask_at_path(result_shape, path)?;
    let mut out = SourcePaths::new();
    if !mask.any() {
        return Ok(out);
    }
    let (result_loop, _) = Signature::split(result_shape, signature.result_core_ndim())?;
    let loop_mask = any_over_core(&mask, result_loop.len())?;
    for source in call.data_sources() {
        let arg = positional(call, source.id)?;
        let shape = source_shape(call, source.id)?;
        let (arg_loop, arg_core) = Signature::split(&shape, signature.arg_core_ndim(arg))?;
        let own = unbroadcast_mask(&loop_mask, arg_loop)?;
        if !own.any() {
            continue;
        }
        let path = if shape.is_empty() {
            Path::new()
        } else {
            Path::from(vec![PathComponent::mask(expand_over_core(&own, arg_core)?)])
        };
        out.insert(source.id, path);
    }
    Ok(out)
}

fn core_forwards(
    call: &SourceFuncCall,
    signature: &Signature,
    source: SourceId,
    path: &Path,
    result_shape: &[usize],
) -> Result<Vec<Path>, Untranslatable> {
    let arg = positional(call, source)?;
    let shape = source_shape(call, source)?;
    let mask = bool_mask_at_path(&shape, path)?;
    if !mask.any() {
        return Ok(Vec::new());
    }
    let (arg_loop, _) = Signature::split(&shape, signature.arg_core_ndim(arg))?;
    let loop_mask = any_over_core(&mask, arg_loop.len())?;
    let (result_loop, result_core) = Signature::split(result_shape, signature.result_core_ndim())?;
    let wide = loop_mask.broadcast_to(result_loop)?;
    Ok(mask_to_paths(expand_over_core(&wide, result_core)?))
}

impl BackwardsPathTranslator for VectorizeTranslator {
    fn name(&self) -> &'static str {
        "vectorize"
    }

    fn backwards_translate(
        &self,
        call: &SourceFuncCall,
        path: &Path,
        meta: Option<&ResultMetadata>,
    ) -> Translation<SourcePaths> {
        ResultMetadata::shape(meta)
            .and_then(|shape| match core_signature(call) {
                Some(signature) => core_backwards(call, signature, path, shape),
                None => broadcast_backwards(call, path, shape),
            })
            .into()
    }
}

impl ForwardsPathTranslator for VectorizeTranslator {
    fn name(&self) -> &'static str {
        "vectorize"
    }

    fn forwards_translate(
        &self,
        call: &SourceFuncCall,
        source: SourceId,
        path: &Path,
        meta: Option<&ResultMetadata>,
    ) -> Translation<Vec<Path>> {
        ResultMetadata::shape(meta)
            .and_then(|shape| match core_signature(call) {
                Some(signature) => core_forwards(call, signature, source, path, shape),
                None => broadcast_forwards(call, source, path, shape),
            })
            .into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::Value;
    use crate::function_definitions::{Arg, CallArgs, vectorize_with_signature};
    use crate::quib::QuibId;

    /// Row sums: `(n)->()` over a `[2, 3]` argument.
    fn row_sum_call() -> (SourceFuncCall, ResultMetadata) {
        let func = vectorize_with_signature(
            "row_sum",
            "(n)->()",
            |core: &[NdArray<f64>]| Ok(NdArray::scalar(core[0].data().iter().sum())),
            Vec::new(),
        )
        .unwrap();
        let input = Value::from_shape(&[2, 3], vec![1, 2, 3, 4, 5, 6]).unwrap();
        let result = func.call(&CallArgs::new(vec![input.clone()])).unwrap();
        let definition = func.definition().cloned().unwrap();
        let (call, _) = SourceFuncCall::from_args(
            func,
            definition,
            &CallArgs::new(vec![Arg::Quib(QuibId(0))]),
            |_| Some(input.clone()),
        );
        (call, ResultMetadata::of(&result))
    }

    #[test]
    fn result_cell_needs_the_whole_core_row() {
        let (call, meta) = row_sum_call();
        let back = VECTORIZE.backwards_translate(&call, &Path::of(1), Some(&meta)).ok().unwrap();
        let mask = bool_mask_at_path(&[2, 3], &back[&SourceId(0)]).unwrap();
        assert_eq!(mask.data(), &[false, false, false, true, true, true]);
    }

    #[test]
    fn one_core_element_changes_its_loop_cell() {
        let (call, meta) = row_sum_call();
        let forward = VECTORIZE
            .forwards_translate(&call, SourceId(0), &Path::at(&[0, 2]), Some(&meta))
            .ok()
            .unwrap();
        assert_eq!(forward.len(), 1);
        let mask = bool_mask_at_path(&[2], &forward[0]).unwrap();
        assert_eq!(mask.data(), &[true, false]);
    }

    #[test]
    fn core_helpers_reduce_and_stretch() {
        let mask = NdArray::from_shape_vec(vec![2, 2], vec![false, true, false, false]).unwrap();
        let reduced = any_over_core(&mask, 1).unwrap();
        assert_eq!(reduced.data(), &[true, false]);
        let stretched = expand_over_core(&reduced, &[3]).unwrap();
        assert_eq!(stretched.shape(), &[2, 3]);
        assert_eq!(stretched.count_true(), 3);
    }
}
