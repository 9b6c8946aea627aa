//! QuibError: Unified error type for quibbler public APIs
//!
//! Every fallible operation in the crate (deep path access, caching, path
//! translation, inversion, override resolution and graph bookkeeping) reports
//! failures through this one enum.

use crate::path::Path;
use crate::quib::QuibId;
use std::fmt;
use thiserror::Error;

/// One level of a nested quib computation, recorded when an error escapes a
/// function run so the user sees a readable call chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallFrame {
    pub quib: QuibId,
    pub name: String,
    pub request: String,
}

impl fmt::Display for CallFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.name, self.quib, self.request)
    }
}

/// Unified error type for quib graph operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QuibError {
    /// A path component cannot be applied to a value of this kind
    /// (e.g. indexing into a scalar).
    #[error("cannot apply path component `{component}` to a value of kind {kind}")]
    PathCannotHaveComponents { kind: String, component: String },
    /// Writing at a path failed; wraps the root cause.
    #[error("failed to assign at path {path}: {source}")]
    FailedToDeepAssign {
        path: Path,
        #[source]
        source: Box<QuibError>,
    },
    #[error("index {index} is out of bounds for axis of size {len}")]
    IndexOutOfBounds { index: isize, len: usize },
    #[error("shape mismatch: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        found: Vec<usize>,
    },
    /// No registered translator could localize a path through `func`.
    #[error("no path translator succeeded for function `{func}`")]
    NoTranslatorsFound { func: String },
    /// `func` declares no inverter that could handle the assignment.
    #[error("no inverter found for function `{func}`")]
    NoInvertersFound { func: String },
    /// The inverter matched but the specific step has no closed-form inverse.
    #[error("failed to invert function `{func}`")]
    FailedToInvert { func: String },
    /// No node in the inversion chain accepts the assignment.
    #[error("assignment at {path} to {quib} is not possible: no overridable quib was found")]
    AssignmentNotPossible { quib: String, path: Path },
    /// The node disallows overriding and nothing upstream can take the change.
    #[error("overriding is not allowed for {quib} (attempted assignment at {path})")]
    OverridingNotAllowed { quib: String, path: Path },
    #[error("assignment cancelled by user")]
    AssignmentCancelledByUser,
    /// A quib was found inside a plain container argument where it cannot be
    /// tracked (checked in debug mode only).
    #[error("quib found nested inside argument {argument} of `{func}`")]
    NestedQuib { func: String, argument: String },
    #[error("invalid type: expected {expected}, found {found}")]
    InvalidType { expected: String, found: String },
    /// Random and graphics functions must keep caching on.
    #[error("cache behavior {requested} is not allowed for {quib}")]
    InvalidCacheBehavior { quib: String, requested: String },
    #[error("invalid quib name `{0}`: names must start with a letter and contain only letters, digits, spaces or underscores")]
    InvalidName(String),
    #[error("unknown quib {0}")]
    UnknownQuib(QuibId),
    #[error("{0} still has children and cannot be removed")]
    QuibHasChildren(QuibId),
    #[error("unknown function `{0}`")]
    UnknownFunction(String),
    /// The wrapped function itself reported an error.
    #[error("function `{func}` failed: {message}")]
    ExternalCallFailed { func: String, message: String },
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("no assignment found at path {path}")]
    NoAssignmentFoundAtPath { path: Path },
    #[error("nothing to undo")]
    NothingToUndo,
    #[error("nothing to redo")]
    NothingToRedo,
    #[error("I/O error: {0}")]
    Io(String),
    /// An error raised while computing nested quibs; `trace` lists the
    /// computations from outermost to innermost.
    #[error("{}{source}", format_trace(.trace))]
    QuibCallFailed {
        trace: Vec<CallFrame>,
        #[source]
        source: Box<QuibError>,
    },
}

fn format_trace(trace: &[CallFrame]) -> String {
    let mut out = String::from("error while computing quibs:\n");
    for frame in trace {
        out.push_str("  ");
        out.push_str(&frame.to_string());
        out.push('\n');
    }
    out
}

impl QuibError {
    /// Add `frame` as the new outermost level of the call chain.
    pub fn with_frame(self, frame: CallFrame) -> Self {
        match self {
            QuibError::QuibCallFailed { mut trace, source } => {
                trace.insert(0, frame);
                QuibError::QuibCallFailed { trace, source }
            }
            other => QuibError::QuibCallFailed {
                trace: vec![frame],
                source: Box::new(other),
            },
        }
    }

    /// The error with any call-chain wrapping removed.
    pub fn root_cause(&self) -> &QuibError {
        match self {
            QuibError::QuibCallFailed { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// The recorded call chain, outermost first (empty if not wrapped).
    pub fn trace(&self) -> &[CallFrame] {
        match self {
            QuibError::QuibCallFailed { trace, .. } => trace,
            _ => &[],
        }
    }

    pub(crate) fn deep_assign_failed(path: &Path, source: QuibError) -> Self {
        QuibError::FailedToDeepAssign {
            path: path.clone(),
            source: Box::new(source),
        }
    }

    /// True for the path/shape mismatch family, which callers recover from by
    /// falling back to whole-value treatment.
    pub fn is_path_mismatch(&self) -> bool {
        matches!(
            self.root_cause(),
            QuibError::PathCannotHaveComponents { .. }
                | QuibError::FailedToDeepAssign { .. }
                | QuibError::IndexOutOfBounds { .. }
                | QuibError::ShapeMismatch { .. }
        )
    }
}
