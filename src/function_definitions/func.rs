//! Callables, their arguments, and argument positions.

use super::definition::FuncDefinition;
use crate::array::{Scalar, Value};
use crate::quib::QuibId;
use crate::quib_error::QuibError;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Signature of a wrapped function: concrete arguments in, value out.
pub type FuncImpl = dyn Fn(&CallArgs<Value>) -> Result<Value, QuibError> + Send + Sync;

/// A named callable. The name is the stable identity used to look up its
/// [`FuncDefinition`]; a function may also carry its own definition.
#[derive(Clone)]
pub struct Func {
    name: Arc<str>,
    implementation: Arc<FuncImpl>,
    definition: Option<Arc<FuncDefinition>>,
}

impl Func {
    pub fn new(
        name: impl Into<Arc<str>>,
        implementation: impl Fn(&CallArgs<Value>) -> Result<Value, QuibError> + Send + Sync + 'static,
    ) -> Self {
        Func {
            name: name.into(),
            implementation: Arc::new(implementation),
            definition: None,
        }
    }

    /// Attach a definition that takes precedence over the registry.
    pub fn with_definition(mut self, definition: FuncDefinition) -> Self {
        self.definition = Some(Arc::new(definition));
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn definition(&self) -> Option<&Arc<FuncDefinition>> {
        self.definition.as_ref()
    }

    /// Run the function on concrete arguments.
    pub fn call(&self, args: &CallArgs<Value>) -> Result<Value, QuibError> {
        (self.implementation)(args)
    }
}

impl fmt::Debug for Func {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Func").field("name", &self.name).finish_non_exhaustive()
    }
}

/// Where an argument sits in a call.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ArgumentRef {
    Positional(usize),
    Keyword(String),
}

impl fmt::Display for ArgumentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgumentRef::Positional(i) => write!(f, "#{i}"),
            ArgumentRef::Keyword(k) => write!(f, "{k}="),
        }
    }
}

/// Positional and keyword arguments of a call.
#[derive(Clone, Debug, PartialEq)]
pub struct CallArgs<A> {
    pub args: Vec<A>,
    pub kwargs: BTreeMap<String, A>,
}

impl<A> Default for CallArgs<A> {
    fn default() -> Self {
        CallArgs {
            args: Vec::new(),
            kwargs: BTreeMap::new(),
        }
    }
}

impl<A> CallArgs<A> {
    pub fn new(args: Vec<A>) -> Self {
        CallArgs {
            args,
            kwargs: BTreeMap::new(),
        }
    }

    pub fn with_kwarg(mut self, name: impl Into<String>, value: A) -> Self {
        self.kwargs.insert(name.into(), value);
        self
    }

    pub fn get(&self, at: &ArgumentRef) -> Option<&A> {
        match at {
            ArgumentRef::Positional(i) => self.args.get(*i),
            ArgumentRef::Keyword(k) => self.kwargs.get(k),
        }
    }

    /// Argument given either positionally at `position` or as `name=`.
    pub fn param(&self, position: usize, name: &str) -> Option<&A> {
        self.args.get(position).or_else(|| self.kwargs.get(name))
    }

    /// Every argument with its position, positional ones first.
    pub fn iter(&self) -> impl Iterator<Item = (ArgumentRef, &A)> {
        self.args
            .iter()
            .enumerate()
            .map(|(i, a)| (ArgumentRef::Positional(i), a))
            .chain(self.kwargs.iter().map(|(k, a)| (ArgumentRef::Keyword(k.clone()), a)))
    }

    /// Convert every argument.
    pub fn map<B>(&self, mut f: impl FnMut(&ArgumentRef, &A) -> B) -> CallArgs<B> {
        let args = self
            .args
            .iter()
            .enumerate()
            .map(|(i, a)| f(&ArgumentRef::Positional(i), a))
            .collect();
        let kwargs = self
            .kwargs
            .iter()
            .map(|(k, a)| (k.clone(), f(&ArgumentRef::Keyword(k.clone()), a)))
            .collect();
        CallArgs { args, kwargs }
    }

    /// Convert every argument, stopping at the first error.
    pub fn try_map<B, E>(&self, mut f: impl FnMut(&ArgumentRef, &A) -> Result<B, E>) -> Result<CallArgs<B>, E> {
        let mut args = Vec::with_capacity(self.args.len());
        for (i, a) in self.args.iter().enumerate() {
            args.push(f(&ArgumentRef::Positional(i), a)?);
        }
        let mut kwargs = BTreeMap::new();
        for (k, a) in &self.kwargs {
            kwargs.insert(k.clone(), f(&ArgumentRef::Keyword(k.clone()), a)?);
        }
        Ok(CallArgs { args, kwargs })
    }
}

/// An argument of a quib call: another quib, a plain value, or a list that
/// may itself contain quibs (e.g. the sequence given to `concatenate`).
#[derive(Clone, Debug, PartialEq)]
pub enum Arg {
    Quib(QuibId),
    Value(Value),
    List(Vec<Arg>),
}

impl Arg {
    pub fn value(v: impl Into<Value>) -> Self {
        Arg::Value(v.into())
    }

    /// Quibs referenced anywhere inside this argument, in order.
    pub fn quibs(&self) -> Vec<QuibId> {
        let mut out = Vec::new();
        self.collect_quibs(&mut out);
        out
    }

    fn collect_quibs(&self, out: &mut Vec<QuibId>) {
        match self {
            Arg::Quib(q) => out.push(*q),
            Arg::Value(_) => {}
            Arg::List(items) => items.iter().for_each(|a| a.collect_quibs(out)),
        }
    }

    /// Resolve to a concrete value, fetching quibs through `fetch`.
    pub fn resolve(&self, fetch: &mut impl FnMut(QuibId) -> Result<Value, QuibError>) -> Result<Value, QuibError> {
        match self {
            Arg::Quib(q) => fetch(*q),
            Arg::Value(v) => Ok(v.clone()),
            Arg::List(items) => Ok(Value::List(
                items.iter().map(|a| a.resolve(fetch)).collect::<Result<_, _>>()?,
            )),
        }
    }
}

impl From<QuibId> for Arg {
    fn from(q: QuibId) -> Self {
        Arg::Quib(q)
    }
}

impl From<Value> for Arg {
    fn from(v: Value) -> Self {
        Arg::Value(v)
    }
}

impl From<Scalar> for Arg {
    fn from(s: Scalar) -> Self {
        Arg::Value(Value::Scalar(s))
    }
}

impl From<i32> for Arg {
    fn from(i: i32) -> Self {
        Arg::value(i)
    }
}

impl From<f64> for Arg {
    fn from(x: f64) -> Self {
        Arg::value(x)
    }
}

impl From<Vec<Arg>> for Arg {
    fn from(items: Vec<Arg>) -> Self {
        Arg::List(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn param_prefers_positional() {
        let args = CallArgs::new(vec![1, 2]).with_kwarg("axis", 9);
        assert_eq!(args.param(1, "axis"), Some(&2));
        assert_eq!(args.param(2, "axis"), Some(&9));
        assert_eq!(args.param(3, "missing"), None);
    }

    #[test]
    fn nested_quibs_are_found() {
        let arg = Arg::List(vec![Arg::Quib(QuibId(0)), Arg::value(1), Arg::List(vec![Arg::Quib(QuibId(2))])]);
        assert_eq!(arg.quibs(), vec![QuibId(0), QuibId(2)]);
    }
}
