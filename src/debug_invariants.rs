//! Structural self-checks for caches, overriders and the quib graph.
//!
//! `validate_invariants` is always available and reports the first broken
//! invariant as a [`QuibError`]. The [`debug_invariants!`](crate::debug_invariants)
//! macro turns such a report into a panic, but only in debug builds or with
//! the `check-invariants` feature.

use crate::quib_error::QuibError;

pub trait DebugInvariants {
    /// Panic on a broken invariant when checks are compiled in.
    fn debug_assert_invariants(&self);
    /// The first broken invariant, if any.
    fn validate_invariants(&self) -> Result<(), QuibError>;
}

/// `debug_invariants!(check, "context")` panics with `context` and the error
/// when `check` is `Err` and invariant checks are compiled in.
#[macro_export]
macro_rules! debug_invariants {
    ($check:expr, $($ctx:tt)*) => {
        #[cfg(any(debug_assertions, feature = "check-invariants"))]
        if let Err(err) = $check {
            panic!(concat!("broken invariant in ", $($ctx)*, ": {}"), err);
        }
    };
}
