//! Element-wise functions: result cell `i` depends on the broadcast cell `i`
//! of every data argument.

use crate::array::{broadcast_shapes, unbroadcast_mask};
use crate::path::{Path, PathComponent, bool_mask_at_path};
use crate::translation::source::{SourceFuncCall, SourceId};
use crate::translation::{
    BackwardsPathTranslator, ForwardsPathTranslator, ResultMetadata, SourcePaths, Translation, Untranslatable,
    mask_to_paths,
};

/// Closed-form translation for element-wise functions.
///
/// Without metadata the path passes through unchanged as long as every
/// other data argument is a plain scalar; otherwise source shapes are needed
/// to undo broadcasting.
pub struct ElementwiseTranslator;

pub static ELEMENTWISE: ElementwiseTranslator = ElementwiseTranslator;

/// True when `source` is the only data argument that is not a plain scalar.
fn passes_through(call: &SourceFuncCall, source: SourceId) -> bool {
    let own = &call.source(source).location;
    own.item.is_none()
        && call
            .definition
            .data_arguments
            .iter()
            .all(|d| d.argument == own.argument || call.is_plain_scalar(&d.argument))
}

pub(crate) fn source_shape(call: &SourceFuncCall, source: SourceId) -> Result<Vec<usize>, Untranslatable> {
    call.value_of(source)?.shape().ok_or(Untranslatable::Failed)
}

/// Backward translation against a known result shape.
pub(crate) fn broadcast_backwards(
    call: &SourceFuncCall,
    path: &Path,
    result_shape: &[usize],
) -> Result<SourcePaths, Untranslatable> {
    let mask = bool_mask_at_path(result_shape, path)?;
    let mut out = SourcePaths::new();
    if !mask.any() {
        return Ok(out);
    }
    for source in call.data_sources() {
        let shape = source_shape(call, source.id)?;
        if shape == result_shape {
            out.insert(source.id, path.clone());
            continue;
        }
        let own = unbroadcast_mask(&mask, &shape)?;
        if own.any() {
            let path = if own.ndim() == 0 {
                Path::new()
            } else {
                Path::from(vec![PathComponent::mask(own)])
            };
            out.insert(source.id, path);
        }
    }
    Ok(out)
}

/// Forward translation against a known result shape.
pub(crate) fn broadcast_forwards(
    call: &SourceFuncCall,
    source: SourceId,
    path: &Path,
    result_shape: &[usize],
) -> Result<Vec<Path>, Untranslatable> {
    let shape = source_shape(call, source)?;
    let mask = bool_mask_at_path(&shape, path)?;
    if !mask.any() {
        return Ok(Vec::new());
    }
    if shape == result_shape {
        return Ok(vec![path.clone()]);
    }
    Ok(mask_to_paths(mask.broadcast_to(result_shape)?))
}

fn result_shape(call: &SourceFuncCall) -> Result<Vec<usize>, Untranslatable> {
    let shapes = call.data_arg_shapes()?;
    Ok(broadcast_shapes(shapes.iter().map(Vec::as_slice))?)
}

impl BackwardsPathTranslator for ElementwiseTranslator {
    fn name(&self) -> &'static str {
        "elementwise"
    }

    fn backwards_translate(
        &self,
        call: &SourceFuncCall,
        path: &Path,
        _meta: Option<&ResultMetadata>,
    ) -> Translation<SourcePaths> {
        let data: Vec<SourceId> = call.data_sources().map(|s| s.id).collect();
        if let [only] = data.as_slice() {
            if passes_through(call, *only) {
                return Translation::Translated(SourcePaths::from([(*only, path.clone())]));
            }
        }
        result_shape(call)
            .and_then(|shape| broadcast_backwards(call, path, &shape))
            .into()
    }
}

impl ForwardsPathTranslator for ElementwiseTranslator {
    fn name(&self) -> &'static str {
        "elementwise"
    }

    fn forwards_translate(
        &self,
        call: &SourceFuncCall,
        source: SourceId,
        path: &Path,
        _meta: Option<&ResultMetadata>,
    ) -> Translation<Vec<Path>> {
        if passes_through(call, source) {
            return Translation::Translated(vec![path.clone()]);
        }
        result_shape(call)
            .and_then(|shape| broadcast_forwards(call, source, path, &shape))
            .into()
    }
}
