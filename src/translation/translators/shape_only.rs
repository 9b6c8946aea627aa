//! Functions that read only the shape of their data (`zeros_like`,
//! `shape`): no element of the source is ever needed, and only a change of
//! the whole source can change the result.

use crate::path::Path;
use crate::translation::source::{SourceFuncCall, SourceId};
use crate::translation::{BackwardsPathTranslator, ForwardsPathTranslator, ResultMetadata, SourcePaths, Translation};

pub struct ShapeOnlyTranslator;

pub static SHAPE_ONLY: ShapeOnlyTranslator = ShapeOnlyTranslator;

impl BackwardsPathTranslator for ShapeOnlyTranslator {
    fn name(&self) -> &'static str {
        "shape-only"
    }

    fn backwards_translate(
        &self,
        _call: &SourceFuncCall,
        _path: &Path,
        _meta: Option<&ResultMetadata>,
    ) -> Translation<SourcePaths> {
        Translation::Translated(SourcePaths::new())
    }
}

impl ForwardsPathTranslator for ShapeOnlyTranslator {
    fn name(&self) -> &'static str {
        "shape-only"
    }

    fn forwards_translate(
        &self,
        _call: &SourceFuncCall,
        _source: SourceId,
        path: &Path,
        _meta: Option<&ResultMetadata>,
    ) -> Translation<Vec<Path>> {
        Translation::Translated(if path.is_empty() { vec![Path::new()] } else { Vec::new() })
    }
}
