//! `FuncDefinition`: what the engine knows about a function category.

use super::func::ArgumentRef;
use super::signature::Signature;
use crate::array::ValueKind;
use crate::inversion::Inverter;
use crate::translation::{BackwardsPathTranslator, ForwardsPathTranslator};
use std::fmt;
use std::sync::Arc;

/// Argument position whose content can appear in the output.
///
/// A multi-arg data argument is a list of data (e.g. the sequence given to
/// `concatenate`); quibs inside it are data sources too.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataArgument {
    pub argument: ArgumentRef,
    pub is_multi_arg: bool,
}

/// Closed-form element inverse: `(new_result, previous_args) -> new_arg`,
/// where `previous_args` holds the previous value of every data argument at
/// the same broadcast position.
pub type ElementwiseInverseFn = dyn Fn(f64, &[f64]) -> f64 + Send + Sync;

/// Inverse of an element-wise function with respect to one positional
/// argument.
#[derive(Clone)]
pub struct ElementwiseInverse {
    pub argument: usize,
    pub func: Arc<ElementwiseInverseFn>,
}

impl ElementwiseInverse {
    pub fn new(argument: usize, func: impl Fn(f64, &[f64]) -> f64 + Send + Sync + 'static) -> Self {
        ElementwiseInverse {
            argument,
            func: Arc::new(func),
        }
    }
}

impl fmt::Debug for ElementwiseInverse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ElementwiseInverse(#{})", self.argument)
    }
}

/// Static metadata for one function or function category.
///
/// Strategies are composed rather than inherited: translators and
/// inverters are tried in order, first success wins.
#[derive(Clone)]
pub struct FuncDefinition {
    pub name: String,
    pub data_arguments: Vec<DataArgument>,
    pub is_random: bool,
    pub is_file_loading: bool,
    pub is_graphics: bool,
    pub backwards_translators: Vec<&'static dyn BackwardsPathTranslator>,
    pub forwards_translators: Vec<&'static dyn ForwardsPathTranslator>,
    pub inverters: Vec<&'static dyn Inverter>,
    pub inverse_funcs: Vec<ElementwiseInverse>,
    /// Kind of the result when it is known without running the function.
    pub result_kind: Option<ValueKind>,
    /// Core dimensions of a vectorized function.
    pub signature: Option<Signature>,
}

impl FuncDefinition {
    pub fn builder(name: impl Into<String>) -> FuncDefinitionBuilder {
        FuncDefinitionBuilder {
            definition: FuncDefinition {
                name: name.into(),
                data_arguments: Vec::new(),
                is_random: false,
                is_file_loading: false,
                is_graphics: false,
                backwards_translators: Vec::new(),
                forwards_translators: Vec::new(),
                inverters: Vec::new(),
                inverse_funcs: Vec::new(),
                result_kind: None,
                signature: None,
            },
        }
    }

    /// Results may change between runs with identical arguments.
    pub fn is_impure(&self) -> bool {
        self.is_random || self.is_file_loading
    }

    pub fn data_argument(&self, at: &ArgumentRef) -> Option<&DataArgument> {
        self.data_arguments.iter().find(|d| &d.argument == at)
    }

    pub fn inverse_for(&self, argument: usize) -> Option<&ElementwiseInverse> {
        self.inverse_funcs.iter().find(|inv| inv.argument == argument)
    }
}

impl fmt::Debug for FuncDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FuncDefinition")
            .field("name", &self.name)
            .field("data_arguments", &self.data_arguments)
            .field("is_random", &self.is_random)
            .field("is_file_loading", &self.is_file_loading)
            .field("is_graphics", &self.is_graphics)
            .field(
                "backwards_translators",
                &self.backwards_translators.iter().map(|t| t.name()).collect::<Vec<_>>(),
            )
            .field(
                "forwards_translators",
                &self.forwards_translators.iter().map(|t| t.name()).collect::<Vec<_>>(),
            )
            .field("inverters", &self.inverters.iter().map(|i| i.name()).collect::<Vec<_>>())
            .field("signature", &self.signature)
            .finish_non_exhaustive()
    }
}

/// Fluent construction of a [`FuncDefinition`].
pub struct FuncDefinitionBuilder {
    definition: FuncDefinition,
}

impl FuncDefinitionBuilder {
    /// Positional data arguments.
    pub fn data_args(mut self, positions: impl IntoIterator<Item = usize>) -> Self {
        self.definition.data_arguments.extend(positions.into_iter().map(|i| DataArgument {
            argument: ArgumentRef::Positional(i),
            is_multi_arg: false,
        }));
        self
    }

    pub fn data_kwarg(mut self, name: impl Into<String>) -> Self {
        self.definition.data_arguments.push(DataArgument {
            argument: ArgumentRef::Keyword(name.into()),
            is_multi_arg: false,
        });
        self
    }

    /// A positional argument holding a list of data.
    pub fn multi_data_arg(mut self, position: usize) -> Self {
        self.definition.data_arguments.push(DataArgument {
            argument: ArgumentRef::Positional(position),
            is_multi_arg: true,
        });
        self
    }

    pub fn random(mut self) -> Self {
        self.definition.is_random = true;
        self
    }

    pub fn file_loading(mut self) -> Self {
        self.definition.is_file_loading = true;
        self
    }

    pub fn graphics(mut self) -> Self {
        self.definition.is_graphics = true;
        self
    }

    pub fn backwards(mut self, translator: &'static dyn BackwardsPathTranslator) -> Self {
        self.definition.backwards_translators.push(translator);
        self
    }

    pub fn forwards(mut self, translator: &'static dyn ForwardsPathTranslator) -> Self {
        self.definition.forwards_translators.push(translator);
        self
    }

    pub fn inverter(mut self, inverter: &'static dyn Inverter) -> Self {
        self.definition.inverters.push(inverter);
        self
    }

    pub fn inverse(mut self, inverse: ElementwiseInverse) -> Self {
        self.definition.inverse_funcs.push(inverse);
        self
    }

    pub fn result_kind(mut self, kind: ValueKind) -> Self {
        self.definition.result_kind = Some(kind);
        self
    }

    pub fn signature(mut self, signature: Signature) -> Self {
        self.definition.signature = Some(signature);
        self
    }

    pub fn build(self) -> FuncDefinition {
        self.definition
    }
}
