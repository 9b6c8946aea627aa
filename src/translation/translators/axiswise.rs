//! Functions that work along one axis: reductions (`sum`), accumulations
//! (`cumsum`) and all-to-all lane operations (`sort`, `diff`).

use crate::array::{NdArray, Value, normalize_axis};
use crate::path::{Path, PathComponent, bool_mask_at_path};
use crate::translation::source::{SourceFuncCall, SourceId};
use crate::translation::{
    BackwardsPathTranslator, ForwardsPathTranslator, ResultMetadata, SourcePaths, Translation, Untranslatable,
    mask_to_paths,
};

/// Where a function takes its `axis` parameter and what it defaults to
/// (`None` means the array is flattened first).
#[derive(Clone, Copy, Debug)]
pub struct AxisParam {
    pub position: usize,
    pub default: Option<isize>,
}

impl AxisParam {
    fn resolve(&self, call: &SourceFuncCall, ndim: usize) -> Result<Option<usize>, Untranslatable> {
        let axis = match call.param_value(self.position, "axis")? {
            None => self.default,
            Some(Value::Scalar(s)) => Some(s.as_i64().ok_or(Untranslatable::Failed)? as isize),
            Some(_) => return Err(Untranslatable::Failed),
        };
        axis.map(|a| normalize_axis(a, ndim)).transpose().map_err(Untranslatable::from)
    }
}

#[derive(Clone, Copy, Debug)]
enum Kind {
    Reduction,
    Accumulation,
    AlongAxis,
}

/// One translator type, parameterized by how the axis is consumed.
pub struct AxiswiseTranslator {
    kind: Kind,
    axis: AxisParam,
}

/// `sum`, `prod`, `min`, `max`, `mean`, `any`, `all`.
pub static REDUCTION: AxiswiseTranslator = AxiswiseTranslator {
    kind: Kind::Reduction,
    axis: AxisParam {
        position: 1,
        default: None,
    },
};

/// `cumsum`, `cumprod`.
pub static ACCUMULATION: AxiswiseTranslator = AxiswiseTranslator {
    kind: Kind::Accumulation,
    axis: AxisParam {
        position: 1,
        default: None,
    },
};

/// `sort`: every lane cell depends on the whole lane.
pub static SORT_ALONG_AXIS: AxiswiseTranslator = AxiswiseTranslator {
    kind: Kind::AlongAxis,
    axis: AxisParam {
        position: 1,
        default: Some(-1),
    },
};

/// `diff(a, n, axis)`.
pub static DIFF_ALONG_AXIS: AxiswiseTranslator = AxiswiseTranslator {
    kind: Kind::AlongAxis,
    axis: AxisParam {
        position: 2,
        default: Some(-1),
    },
};

fn data_source(call: &SourceFuncCall) -> Result<(SourceId, Vec<usize>), Untranslatable> {
    let source = call.data_sources().next().ok_or(Untranslatable::Failed)?;
    let shape = call.value_of(source.id)?.shape().ok_or(Untranslatable::Failed)?;
    Ok((source.id, shape))
}

fn mask_path(mask: NdArray<bool>) -> Path {
    if mask.ndim() == 0 {
        Path::new()
    } else {
        Path::from(vec![PathComponent::mask(mask)])
    }
}

fn to_shape(mask: NdArray<bool>, shape: &[usize]) -> Result<NdArray<bool>, Untranslatable> {
    let target: Vec<isize> = shape.iter().map(|&n| n as isize).collect();
    Ok(mask.reshape(&target)?)
}

impl AxiswiseTranslator {
    fn source_mask(
        &self,
        call: &SourceFuncCall,
        path: &Path,
        meta: Option<&ResultMetadata>,
        shape: &[usize],
    ) -> Result<NdArray<bool>, Untranslatable> {
        let axis = self.axis.resolve(call, shape.len())?;
        Ok(match (self.kind, axis) {
            (Kind::Reduction | Kind::AlongAxis, None) => {
                let result_shape = match self.kind {
                    Kind::Reduction => Vec::new(),
                    _ => ResultMetadata::shape(meta)?.to_vec(),
                };
                let hit = bool_mask_at_path(&result_shape, path)?.any();
                NdArray::full(shape.to_vec(), hit)
            }
            (Kind::Reduction, Some(a)) => {
                let mut result_shape = shape.to_vec();
                result_shape.remove(a);
                bool_mask_at_path(&result_shape, path)?
                    .expand_dims(a)?
                    .broadcast_to(shape)?
            }
            (Kind::Accumulation, None) => {
                let flat = bool_mask_at_path(&[crate::array::shape_size(shape)], path)?;
                to_shape(flat.cumulative_any(0, true), shape)?
            }
            (Kind::Accumulation, Some(a)) => bool_mask_at_path(shape, path)?.cumulative_any(a, true),
            (Kind::AlongAxis, Some(a)) => {
                let result_shape = ResultMetadata::shape(meta)?;
                bool_mask_at_path(result_shape, path)?
                    .any_along_axis_keepdims(a)
                    .broadcast_to(shape)?
            }
        })
    }

    fn result_mask(
        &self,
        call: &SourceFuncCall,
        path: &Path,
        meta: Option<&ResultMetadata>,
        shape: &[usize],
    ) -> Result<NdArray<bool>, Untranslatable> {
        let axis = self.axis.resolve(call, shape.len())?;
        let changed = bool_mask_at_path(shape, path)?;
        Ok(match (self.kind, axis) {
            (Kind::Reduction, None) => NdArray::scalar(changed.any()),
            (Kind::AlongAxis, None) => NdArray::full(ResultMetadata::shape(meta)?.to_vec(), changed.any()),
            (Kind::Reduction, Some(a)) => changed.any_along_axis_keepdims(a).squeeze(Some(a))?,
            (Kind::Accumulation, None) => changed.ravel().cumulative_any(0, false),
            (Kind::Accumulation, Some(a)) => changed.cumulative_any(a, false),
            (Kind::AlongAxis, Some(a)) => changed
                .any_along_axis_keepdims(a)
                .broadcast_to(ResultMetadata::shape(meta)?)?,
        })
    }
}

impl BackwardsPathTranslator for AxiswiseTranslator {
    fn name(&self) -> &'static str {
        match self.kind {
            Kind::Reduction => "reduction",
            Kind::Accumulation => "accumulation",
            Kind::AlongAxis => "along-axis",
        }
    }

    fn backwards_translate(
        &self,
        call: &SourceFuncCall,
        path: &Path,
        meta: Option<&ResultMetadata>,
    ) -> Translation<SourcePaths> {
        let translated = data_source(call).and_then(|(id, shape)| {
            let mask = self.source_mask(call, path, meta, &shape)?;
            let mut out = SourcePaths::new();
            if mask.any() {
                out.insert(id, mask_path(mask));
            }
            Ok(out)
        });
        translated.into()
    }
}

impl ForwardsPathTranslator for AxiswiseTranslator {
    fn name(&self) -> &'static str {
        BackwardsPathTranslator::name(self)
    }

    fn forwards_translate(
        &self,
        call: &SourceFuncCall,
        source: SourceId,
        path: &Path,
        meta: Option<&ResultMetadata>,
    ) -> Translation<Vec<Path>> {
        let translated = call
            .value_of(source)
            .and_then(|v| v.shape().ok_or(Untranslatable::Failed))
            .and_then(|shape| self.result_mask(call, path, meta, &shape))
            .map(mask_to_paths);
        translated.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function_definitions::{Arg, CallArgs, Func, FuncDefinition};
    use crate::path::Index;
    use crate::quib::QuibId;
    use std::sync::Arc;

    fn call_with_axis(name: &str, value: Value, axis: Option<i32>) -> SourceFuncCall {
        let def = Arc::new(FuncDefinition::builder(name).data_args([0]).build());
        let func = Func::new(name.to_string(), |_| Ok(Value::from(0)));
        let mut args = CallArgs::new(vec![Arg::Quib(QuibId(0))]);
        if let Some(a) = axis {
            args = args.with_kwarg("axis", Arg::value(a));
        }
        SourceFuncCall::from_args(func, def, &args, |_| Some(value.clone())).0
    }

    fn grid() -> Value {
        Value::from_shape(&[2, 3], vec![1, 2, 3, 4, 5, 6]).unwrap()
    }

    #[test]
    fn reduced_cell_needs_its_lane() {
        let call = call_with_axis("sum", grid(), Some(0));
        let paths = REDUCTION.backwards_translate(&call, &Path::of(1), None).ok().unwrap();
        match &paths[&SourceId(0)][0].index {
            Index::Mask(m) => assert_eq!(m.data(), &[false, true, false, false, true, false]),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn full_reduction_depends_on_everything() {
        let call = call_with_axis("sum", grid(), None);
        let paths = REDUCTION.backwards_translate(&call, &Path::new(), None).ok().unwrap();
        match &paths[&SourceId(0)][0].index {
            Index::Mask(m) => assert!(m.all()),
            other => panic!("unexpected {other:?}"),
        }
        let forward = REDUCTION
            .forwards_translate(&call, SourceId(0), &Path::at(&[0, 0]), None)
            .ok()
            .unwrap();
        assert_eq!(forward, vec![Path::new()]);
    }

    #[test]
    fn cumsum_change_reaches_the_tail() {
        let call = call_with_axis("cumsum", Value::from(vec![1, 2, 3, 4]), Some(0));
        let forward = ACCUMULATION
            .forwards_translate(&call, SourceId(0), &Path::of(1), None)
            .ok()
            .unwrap();
        match &forward[0][0].index {
            Index::Mask(m) => assert_eq!(m.data(), &[false, true, true, true]),
            other => panic!("unexpected {other:?}"),
        }
        let back = ACCUMULATION.backwards_translate(&call, &Path::of(2), None).ok().unwrap();
        match &back[&SourceId(0)][0].index {
            Index::Mask(m) => assert_eq!(m.data(), &[true, true, true, false]),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn sort_needs_result_shape() {
        let call = call_with_axis("sort", Value::from(vec![3, 1, 2]), None);
        assert_eq!(
            SORT_ALONG_AXIS.backwards_translate(&call, &Path::of(0), None),
            Translation::NeedsMetadata
        );
        let meta = ResultMetadata::of(&Value::from(vec![1, 2, 3]));
        let paths = SORT_ALONG_AXIS
            .backwards_translate(&call, &Path::of(0), Some(&meta))
            .ok()
            .unwrap();
        match &paths[&SourceId(0)][0].index {
            Index::Mask(m) => assert!(m.all()),
            other => panic!("unexpected {other:?}"),
        }
    }
}
