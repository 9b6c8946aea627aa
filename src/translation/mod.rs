//! Path translation between a function's arguments and its result.
//!
//! Backward translation answers "which part of each data source feeds this
//! part of the result"; forward translation answers "which part of the
//! result changes when this part of a source changes". Each function
//! category registers an ordered list of translators. A translator that
//! needs shapes answers [`Translation::NeedsMetadata`] when called without
//! them, and the caller retries with source values and result metadata.

pub mod index_codes;
pub mod source;
pub mod translators;

pub use source::{Source, SourceArg, SourceFuncCall, SourceId, SourceLocation};

use crate::array::{Value, ValueKind};
use crate::path::Path;
use crate::quib_error::QuibError;
use std::collections::BTreeMap;

/// Outcome of one translation attempt.
#[derive(Clone, Debug, PartialEq)]
pub enum Translation<T> {
    Translated(T),
    /// Retry with source values and result metadata.
    NeedsMetadata,
    Failed,
}

impl<T> Translation<T> {
    pub fn ok(self) -> Option<T> {
        match self {
            Translation::Translated(t) => Some(t),
            _ => None,
        }
    }
}

/// Why a translator could not produce a result.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Untranslatable {
    NeedsMetadata,
    Failed,
}

impl From<QuibError> for Untranslatable {
    fn from(err: QuibError) -> Self {
        log::trace!("translation failed: {err}");
        Untranslatable::Failed
    }
}

impl<T> From<Result<T, Untranslatable>> for Translation<T> {
    fn from(r: Result<T, Untranslatable>) -> Self {
        match r {
            Ok(t) => Translation::Translated(t),
            Err(Untranslatable::NeedsMetadata) => Translation::NeedsMetadata,
            Err(Untranslatable::Failed) => Translation::Failed,
        }
    }
}

/// Path in each implicated data source. Sources missing from the map are
/// not needed.
pub type SourcePaths = BTreeMap<SourceId, Path>;

/// Shape and kind of the (possibly not yet valid) result.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResultMetadata {
    pub shape: Option<Vec<usize>>,
    pub kind: ValueKind,
}

impl ResultMetadata {
    pub fn of(value: &Value) -> Self {
        ResultMetadata {
            shape: value.shape(),
            kind: value.kind(),
        }
    }

    pub(crate) fn shape(meta: Option<&ResultMetadata>) -> Result<&[usize], Untranslatable> {
        match meta {
            Some(m) => m.shape.as_deref().ok_or(Untranslatable::Failed),
            None => Err(Untranslatable::NeedsMetadata),
        }
    }
}

/// Result path -> source paths.
pub trait BackwardsPathTranslator: Send + Sync {
    fn name(&self) -> &'static str;
    fn backwards_translate(
        &self,
        call: &SourceFuncCall,
        path: &Path,
        meta: Option<&ResultMetadata>,
    ) -> Translation<SourcePaths>;
}

/// Changed source path -> affected result paths (empty when nothing is
/// affected).
pub trait ForwardsPathTranslator: Send + Sync {
    fn name(&self) -> &'static str;
    fn forwards_translate(
        &self,
        call: &SourceFuncCall,
        source: SourceId,
        path: &Path,
        meta: Option<&ResultMetadata>,
    ) -> Translation<Vec<Path>>;
}

/// Try every registered backward translator in order; first success wins.
///
/// Answers `NeedsMetadata` only when some translator asked for it and
/// `meta` was not supplied.
pub fn backwards_translate(
    call: &SourceFuncCall,
    path: &Path,
    meta: Option<&ResultMetadata>,
) -> Translation<SourcePaths> {
    let mut wants_metadata = false;
    for translator in &call.definition.backwards_translators {
        match translator.backwards_translate(call, path, meta) {
            Translation::Translated(paths) => return Translation::Translated(paths),
            Translation::NeedsMetadata => wants_metadata = true,
            Translation::Failed => {}
        }
    }
    if wants_metadata && meta.is_none() {
        Translation::NeedsMetadata
    } else {
        Translation::Failed
    }
}

/// Forward counterpart of [`backwards_translate`]. A change to the whole
/// source always affects the whole result.
pub fn forwards_translate(
    call: &SourceFuncCall,
    source: SourceId,
    path: &Path,
    meta: Option<&ResultMetadata>,
) -> Translation<Vec<Path>> {
    if path.is_empty() {
        return Translation::Translated(vec![Path::new()]);
    }
    let mut wants_metadata = false;
    for translator in &call.definition.forwards_translators {
        match translator.forwards_translate(call, source, path, meta) {
            Translation::Translated(paths) => return Translation::Translated(paths),
            Translation::NeedsMetadata => wants_metadata = true,
            Translation::Failed => {}
        }
    }
    if wants_metadata && meta.is_none() {
        Translation::NeedsMetadata
    } else {
        Translation::Failed
    }
}

/// Turn a boolean region of the result into paths: nothing, the whole
/// (0-d) value, or a mask component.
pub(crate) fn mask_to_paths(mask: crate::array::NdArray<bool>) -> Vec<Path> {
    if !mask.any() {
        Vec::new()
    } else if mask.ndim() == 0 {
        vec![Path::new()]
    } else {
        vec![Path::from(vec![crate::path::PathComponent::mask(mask)])]
    }
}
