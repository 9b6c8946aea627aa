//! Path model: addressing routes into nested values and the deep get/assign
//! substrate every other component is built on.

pub mod access;
pub mod component;
pub mod selection;

pub use access::{bool_mask_at_path, deep_assign, deep_assigned, deep_get, split_path_at_end_of_array};
pub use component::{Index, Path, PathComponent, Slice};
pub use selection::{Selection, select, select_path};
