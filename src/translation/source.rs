//! Sources: transient handles on the quib-valued argument positions of one
//! function call, used while translating paths or inverting assignments.

use super::Untranslatable;
use crate::array::Value;
use crate::function_definitions::{Arg, ArgumentRef, CallArgs, Func, FuncDefinition};
use crate::quib::QuibId;
use crate::quib_error::QuibError;
use std::fmt;
use std::sync::Arc;

/// Position of a source in [`SourceFuncCall::sources`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(pub usize);

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "source#{}", self.0)
    }
}

/// Where a source sits: its argument, and its item within a list argument.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceLocation {
    pub argument: ArgumentRef,
    pub item: Option<usize>,
}

/// One quib occurrence in a call.
///
/// `value` is `None` when the call was built without metadata; translators
/// that need shapes answer `NeedsMetadata` in that case.
#[derive(Clone, Debug, PartialEq)]
pub struct Source {
    pub id: SourceId,
    pub value: Option<Value>,
    pub location: SourceLocation,
    /// Data sources can appear in the output; parameter sources only steer
    /// the computation.
    pub is_data: bool,
}

/// A call argument with quibs replaced by source handles.
#[derive(Clone, Debug, PartialEq)]
pub enum SourceArg {
    Source(SourceId),
    Value(Value),
    List(Vec<SourceArg>),
}

/// A function call as seen by translators and inverters.
#[derive(Clone, Debug)]
pub struct SourceFuncCall {
    pub func: Func,
    pub definition: Arc<FuncDefinition>,
    pub args: CallArgs<SourceArg>,
    pub sources: Vec<Source>,
}

impl SourceFuncCall {
    /// Build from quib-level arguments. `fetch` supplies the current value of
    /// each quib, or `None` to build a metadata-free call.
    ///
    /// Returns the call together with the quib behind every source, indexed
    /// by [`SourceId`].
    pub fn from_args(
        func: Func,
        definition: Arc<FuncDefinition>,
        args: &CallArgs<Arg>,
        mut fetch: impl FnMut(QuibId) -> Option<Value>,
    ) -> (SourceFuncCall, Vec<QuibId>) {
        let mut sources = Vec::new();
        let mut quibs = Vec::new();
        let args = args.map(|at, arg| {
            let data = definition.data_argument(at);
            match arg {
                Arg::List(items) => SourceArg::List(
                    items
                        .iter()
                        .enumerate()
                        .map(|(k, item)| {
                            let is_data = data.is_some_and(|d| d.is_multi_arg);
                            convert(item, at, Some(k), is_data, &mut sources, &mut quibs, &mut fetch)
                        })
                        .collect(),
                ),
                other => convert(other, at, None, data.is_some(), &mut sources, &mut quibs, &mut fetch),
            }
        });
        (
            SourceFuncCall {
                func,
                definition,
                args,
                sources,
            },
            quibs,
        )
    }

    pub fn source(&self, id: SourceId) -> &Source {
        &self.sources[id.0]
    }

    pub fn data_sources(&self) -> impl Iterator<Item = &Source> {
        self.sources.iter().filter(|s| s.is_data)
    }

    pub fn parameter_sources(&self) -> impl Iterator<Item = &Source> {
        self.sources.iter().filter(|s| !s.is_data)
    }

    /// True when every source carries its value.
    pub fn has_values(&self) -> bool {
        self.sources.iter().all(|s| s.value.is_some())
    }

    pub(crate) fn value_of(&self, id: SourceId) -> Result<&Value, Untranslatable> {
        self.source(id).value.as_ref().ok_or(Untranslatable::NeedsMetadata)
    }

    /// Concrete value of an argument (sources must carry values).
    pub(crate) fn concrete(&self, arg: &SourceArg) -> Result<Value, Untranslatable> {
        Ok(match arg {
            SourceArg::Source(id) => self.value_of(*id)?.clone(),
            SourceArg::Value(v) => v.clone(),
            SourceArg::List(items) => Value::List(
                items
                    .iter()
                    .map(|a| self.concrete(a))
                    .collect::<Result<_, _>>()?,
            ),
        })
    }

    /// Value of a parameter given positionally or by keyword, if present.
    pub(crate) fn param_value(&self, position: usize, name: &str) -> Result<Option<Value>, Untranslatable> {
        self.args.param(position, name).map(|a| self.concrete(a)).transpose()
    }

    /// Replace every argument through `f`, which sees sources and plain data
    /// leaves along with whether they sit in a data position.
    pub(crate) fn map_args(
        &self,
        f: &mut impl FnMut(&SourceArg, bool) -> Result<Value, Untranslatable>,
    ) -> Result<CallArgs<Value>, Untranslatable> {
        self.args.try_map(|at, arg| {
            let data = self.definition.data_argument(at);
            match arg {
                SourceArg::List(items) if data.is_some_and(|d| d.is_multi_arg) => Ok(Value::List(
                    items.iter().map(|a| f(a, true)).collect::<Result<_, _>>()?,
                )),
                SourceArg::List(_) => self.concrete(arg),
                other => f(other, data.is_some()),
            }
        })
    }

    /// Run the function with arguments built by [`map_args`](Self::map_args).
    pub(crate) fn run_mapped(
        &self,
        mut f: impl FnMut(&SourceArg, bool) -> Result<Value, Untranslatable>,
    ) -> Result<Value, Untranslatable> {
        let args = self.map_args(&mut f)?;
        Ok(self.func.call(&args)?)
    }

    /// Shape of the argument at `at`, or `None` if the call omits it.
    pub(crate) fn arg_shape(&self, at: &ArgumentRef) -> Result<Option<Vec<usize>>, Untranslatable> {
        let Some(arg) = self.args.get(at) else {
            return Ok(None);
        };
        let value = self.concrete(arg)?;
        value.shape().map(Some).ok_or(Untranslatable::Failed)
    }

    /// Shapes of every data argument, in declaration order.
    pub(crate) fn data_arg_shapes(&self) -> Result<Vec<Vec<usize>>, Untranslatable> {
        let mut out = Vec::new();
        for d in &self.definition.data_arguments {
            if let Some(shape) = self.arg_shape(&d.argument)? {
                out.push(shape);
            }
        }
        Ok(out)
    }

    /// True when the argument at `at` is a plain (non-quib) scalar.
    pub(crate) fn is_plain_scalar(&self, at: &ArgumentRef) -> bool {
        matches!(self.args.get(at), Some(SourceArg::Value(Value::Scalar(_))) | None)
    }

    /// Resolve to concrete arguments, fetching source values through `fetch`.
    pub fn resolve(
        &self,
        fetch: &mut impl FnMut(&Source) -> Result<Value, QuibError>,
    ) -> Result<CallArgs<Value>, QuibError> {
        self.args.try_map(|_, arg| self.resolve_arg(arg, fetch))
    }

    fn resolve_arg(
        &self,
        arg: &SourceArg,
        fetch: &mut impl FnMut(&Source) -> Result<Value, QuibError>,
    ) -> Result<Value, QuibError> {
        Ok(match arg {
            SourceArg::Source(id) => fetch(self.source(*id))?,
            SourceArg::Value(v) => v.clone(),
            SourceArg::List(items) => Value::List(
                items
                    .iter()
                    .map(|a| self.resolve_arg(a, fetch))
                    .collect::<Result<_, _>>()?,
            ),
        })
    }
}

fn convert(
    arg: &Arg,
    at: &ArgumentRef,
    item: Option<usize>,
    is_data: bool,
    sources: &mut Vec<Source>,
    quibs: &mut Vec<QuibId>,
    fetch: &mut impl FnMut(QuibId) -> Option<Value>,
) -> SourceArg {
    match arg {
        Arg::Quib(q) => {
            let id = SourceId(sources.len());
            sources.push(Source {
                id,
                value: fetch(*q),
                location: SourceLocation {
                    argument: at.clone(),
                    item,
                },
                is_data,
            });
            quibs.push(*q);
            SourceArg::Source(id)
        }
        Arg::Value(v) => SourceArg::Value(v.clone()),
        // deeper nesting never carries data
        Arg::List(items) => SourceArg::List(
            items
                .iter()
                .map(|a| convert(a, at, item, false, sources, quibs, fetch))
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function_definitions::FuncDefinition;

    fn concat_like() -> (Func, Arc<FuncDefinition>) {
        let def = Arc::new(FuncDefinition::builder("concatenate").multi_data_arg(0).build());
        (Func::new("concatenate", |_| Ok(Value::from(0))), def)
    }

    #[test]
    fn quibs_in_multi_arg_lists_are_data() {
        let (func, def) = concat_like();
        let args = CallArgs::new(vec![Arg::List(vec![Arg::Quib(QuibId(3)), Arg::Quib(QuibId(5))])])
            .with_kwarg("axis", Arg::Quib(QuibId(7)));
        let (call, quibs) = SourceFuncCall::from_args(func, def, &args, |_| None);
        assert_eq!(quibs, vec![QuibId(3), QuibId(5), QuibId(7)]);
        assert_eq!(call.data_sources().count(), 2);
        assert_eq!(call.parameter_sources().count(), 1);
        assert_eq!(call.source(SourceId(1)).location.item, Some(1));
        assert!(!call.has_values());
    }

    #[test]
    fn resolve_substitutes_values() {
        let (func, def) = concat_like();
        let args = CallArgs::new(vec![Arg::List(vec![Arg::Quib(QuibId(0)), Arg::value(2)])]);
        let (call, _) = SourceFuncCall::from_args(func, def, &args, |_| Some(Value::from(1)));
        let resolved = call
            .resolve(&mut |s| Ok(s.value.clone().unwrap_or(Value::from(0))))
            .unwrap();
        assert_eq!(resolved.args[0], Value::List(vec![Value::from(1), Value::from(2)]));
    }
}
