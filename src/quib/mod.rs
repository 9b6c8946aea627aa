//! The quib graph: nodes, lazy path-aware computation, invalidation and
//! assignment.
//!
//! A [`QuibGraph`] owns every node in an arena addressed by [`QuibId`].
//! Parent and child links are ids, so removing a node is an explicit graph
//! operation rather than a side effect of dropping a handle.

pub mod assign;
pub mod compute;
pub mod graph;
pub mod graphics;
pub mod invalidation;
pub mod node;

pub use graph::QuibGraph;
pub use graphics::{GraphicsObserver, NoGraphics};
pub use node::QuibNode;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Handle of a node in a [`QuibGraph`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QuibId(pub usize);

impl fmt::Display for QuibId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "quib#{}", self.0)
    }
}

/// Whether a node keeps its computed values.
///
/// `Auto` keeps them only when recomputing is slow relative to the size of
/// the result. Random and graphics functions are always cached.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CacheBehavior {
    On,
    Off,
    #[default]
    Auto,
}

#[cfg(test)]
mod tests {
    use super::*;
    use static_assertions::{assert_eq_size, assert_impl_all};

    assert_eq_size!(QuibId, usize);
    assert_impl_all!(QuibId: Copy, Send, Sync, std::hash::Hash, Ord);
    assert_impl_all!(CacheBehavior: Copy, Default);

    #[test]
    fn ids_display_with_their_index() {
        assert_eq!(QuibId(7).to_string(), "quib#7");
        assert_eq!(CacheBehavior::default(), CacheBehavior::Auto);
    }
}
