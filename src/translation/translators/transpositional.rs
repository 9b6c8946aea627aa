//! Rearranging functions, translated by running them on index codes
//! (backward) or boolean masks (forward).

use crate::path::{Path, PathComponent, select_path};
use crate::translation::index_codes::{FocalHits, focal_hits, positions_to_mask, result_codes, result_mask};
use crate::translation::source::{SourceFuncCall, SourceId};
use crate::translation::{
    BackwardsPathTranslator, ForwardsPathTranslator, ResultMetadata, SourcePaths, Translation, Untranslatable,
    mask_to_paths,
};

pub struct TranspositionalTranslator;

pub static TRANSPOSITIONAL: TranspositionalTranslator = TranspositionalTranslator;

/// Linear result positions addressed by the array part of `path`.
pub(crate) fn selected_positions(result_shape: &[usize], path: &Path) -> Result<Vec<usize>, Untranslatable> {
    Ok(select_path(result_shape, path)?.0.positions)
}

/// Source path covering the source cells `source` contributes to `path`, or
/// `None` when it contributes nothing there.
pub(crate) fn source_path_for(
    call: &SourceFuncCall,
    source: SourceId,
    path: &Path,
) -> Result<Option<Path>, Untranslatable> {
    let codes = result_codes(call, source)?;
    let positions = selected_positions(codes.shape(), path)?;
    Ok(match focal_hits(&codes, &positions) {
        FocalHits::None => None,
        FocalHits::WholeScalar => Some(Path::new()),
        FocalHits::Positions(hits) => {
            let shape = call.value_of(source)?.shape().ok_or(Untranslatable::Failed)?;
            Some(Path::from(vec![PathComponent::mask(positions_to_mask(&shape, &hits))]))
        }
    })
}

impl BackwardsPathTranslator for TranspositionalTranslator {
    fn name(&self) -> &'static str {
        "transpositional"
    }

    fn backwards_translate(
        &self,
        call: &SourceFuncCall,
        path: &Path,
        _meta: Option<&ResultMetadata>,
    ) -> Translation<SourcePaths> {
        let translate = || -> Result<SourcePaths, Untranslatable> {
            let mut out = SourcePaths::new();
            for source in call.data_sources() {
                if let Some(p) = source_path_for(call, source.id, path)? {
                    out.insert(source.id, p);
                }
            }
            Ok(out)
        };
        translate().into()
    }
}

impl ForwardsPathTranslator for TranspositionalTranslator {
    fn name(&self) -> &'static str {
        "transpositional"
    }

    fn forwards_translate(
        &self,
        call: &SourceFuncCall,
        source: SourceId,
        path: &Path,
        _meta: Option<&ResultMetadata>,
    ) -> Translation<Vec<Path>> {
        result_mask(call, source, &path[..path.len().min(1)])
            .map(mask_to_paths)
            .into()
    }
}
