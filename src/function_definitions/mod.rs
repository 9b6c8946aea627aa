//! Functions, their definitions, and the registry that maps one to the
//! other.

pub mod builtins;
pub mod definition;
pub mod func;
pub mod registry;
pub mod signature;

pub use builtins::{getitem, loadtxt, vectorize, vectorize_with_signature};
pub use definition::{DataArgument, ElementwiseInverse, ElementwiseInverseFn, FuncDefinition, FuncDefinitionBuilder};
pub use func::{Arg, ArgumentRef, CallArgs, Func, FuncImpl};
pub use registry::FuncRegistry;
pub use signature::Signature;
