//! Translator implementations, one static instance per strategy.

pub mod axiswise;
pub mod elementwise;
pub mod shape_only;
pub mod transpositional;
pub mod vectorize;

pub use axiswise::{ACCUMULATION, AxisParam, DIFF_ALONG_AXIS, REDUCTION, SORT_ALONG_AXIS};
pub use elementwise::ELEMENTWISE;
pub use shape_only::SHAPE_ONLY;
pub use transpositional::TRANSPOSITIONAL;
pub use vectorize::VECTORIZE;
