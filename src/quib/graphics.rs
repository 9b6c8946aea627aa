//! Hook for a graphics layer that draws quib values.

use super::QuibId;
use crate::array::Value;

/// Receives drawing events from the graph. Both methods default to doing
/// nothing.
pub trait GraphicsObserver {
    /// A graphics function just ran and produced `value`.
    fn artists_created(&mut self, _quib: QuibId, _value: &Value) {}

    /// Graphics quibs invalidated during one aggregate scope, each listed
    /// once.
    fn redraw(&mut self, _quibs: &[QuibId]) {}
}

/// Observer for sessions with no graphics.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoGraphics;

impl GraphicsObserver for NoGraphics {}
