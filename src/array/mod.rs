//! Value model: scalars, generic n-d arrays, broadcasting and the `Value`
//! tree that quibs compute.

pub mod broadcast;
pub mod ndarray;
pub mod scalar;
pub mod value;

pub use broadcast::{broadcast_shapes, broadcast_source_position, unbroadcast_mask};
pub use ndarray::{NdArray, for_each_index, normalize_axis, ravel_index, shape_size, unravel_index};
pub use scalar::{Scalar, ScalarKind};
pub use value::{Value, ValueKind};
