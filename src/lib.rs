#![cfg_attr(docsrs, feature(doc_cfg))]
//! # quibbler
//!
//! quibbler keeps a graph of *quibs*: function calls whose arguments may
//! themselves be quibs. Values are computed lazily and cached per region, so
//! asking for one element of a large result only computes what that element
//! needs. Changing an input invalidates exactly the regions that depend on
//! it. Assigning into a derived quib works backwards: the change is inverted
//! through the functions that produced it and recorded as an override on
//! the input (or intermediate quib) it should live on.
//!
//! ## Features
//! - Path-aware caches that track validity per element or item
//! - Backward and forward path translation for elementwise, axis-wise,
//!   transpositional and vectorized functions
//! - Inversion of assignments through invertible functions
//! - Ordered overrides with undo/redo and override-target choice
//! - Aggregated redraw notifications for a graphics layer
//!
//! ## Usage
//!
//! ```rust
//! use quibbler::prelude::*;
//!
//! let mut graph = QuibGraph::new();
//! let xs = graph.iquib(vec![1.0, 2.0, 3.0]);
//! let ys = graph.call("multiply", vec![xs.into(), Arg::value(2.0)])?;
//! let total = graph.call("sum", vec![ys.into()])?;
//! assert_eq!(graph.get_value(total)?, Value::from(12.0));
//!
//! // Drag ys[0] to 10: the input follows.
//! graph.assign(ys, Assignment::new(Path::of(0), 10.0))?;
//! assert_eq!(graph.get_value(xs)?, Value::from(vec![5.0, 2.0, 3.0]));
//! assert_eq!(graph.get_value(total)?, Value::from(20.0));
//!
//! graph.undo()?;
//! assert_eq!(graph.get_value(total)?, Value::from(12.0));
//! # Ok::<(), QuibError>(())
//! ```
//!
//! ## Logging
//! The crate logs through the [`log`] facade and never installs a logger.
//! Cache decisions and translation fallbacks go to `debug`, stale overrides
//! to `warn`.

pub mod array;
pub mod assignment;
pub mod cache;
pub mod config;
pub mod debug_invariants;
pub mod function_definitions;
pub mod inversion;
pub mod path;
pub mod project;
pub mod quib;
pub mod quib_error;
pub mod translation;

pub use debug_invariants::DebugInvariants;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    pub use crate::array::{NdArray, Scalar, ScalarKind, Value, ValueKind};
    pub use crate::assignment::{
        Assignment, AssignmentTemplate, AssignmentToQuib, FirstOptionChooser, OverrideChoice, OverrideChooser,
        OverrideGroup, OverrideOption, OverrideRemoval, Overrider,
    };
    pub use crate::cache::CacheStatus;
    pub use crate::config::QuibConfig;
    pub use crate::debug_invariants::DebugInvariants;
    pub use crate::function_definitions::{
        Arg, CallArgs, Func, FuncDefinition, FuncRegistry, Signature, getitem, loadtxt, vectorize,
        vectorize_with_signature,
    };
    pub use crate::path::{Index, Path, PathComponent, Slice, deep_assign, deep_get};
    pub use crate::quib::{CacheBehavior, GraphicsObserver, QuibGraph, QuibId};
    pub use crate::quib_error::{CallFrame, QuibError};
}
