//! Inversion: turning an assignment into a function's result into
//! assignments into its data sources.
//!
//! Each function category registers an ordered list of [`Inverter`]s; the
//! first that succeeds wins. `FailedToInvert` from one inverter lets the
//! next one try.

pub mod elementwise;
pub mod inverse_funcs;
pub mod transpositional;
pub mod vectorize;

pub use elementwise::ELEMENTWISE_INVERTER;
pub use transpositional::TRANSPOSITIONAL_INVERTER;
pub use vectorize::VECTORIZE_INVERTER;

use crate::array::Value;
use crate::assignment::Assignment;
use crate::quib_error::QuibError;
use crate::translation::{SourceFuncCall, SourceId};

/// An assignment into one source of a call.
#[derive(Clone, Debug, PartialEq)]
pub struct Inversal {
    pub source: SourceId,
    pub assignment: Assignment,
}

impl Inversal {
    pub fn new(source: SourceId, assignment: Assignment) -> Self {
        Inversal { source, assignment }
    }
}

/// Strategy inverting one function category.
pub trait Inverter: Send + Sync {
    fn name(&self) -> &'static str;

    /// Assignments into the call's sources that reproduce `assignment` on
    /// the result. `previous_result` is the full value before the change.
    ///
    /// # Errors
    /// `FailedToInvert` when this inverter does not apply to the call.
    fn invert(
        &self,
        call: &SourceFuncCall,
        assignment: &Assignment,
        previous_result: &Value,
    ) -> Result<Vec<Inversal>, QuibError>;
}

pub(crate) fn failed(call: &SourceFuncCall) -> QuibError {
    QuibError::FailedToInvert {
        func: call.func.name().to_string(),
    }
}

/// Run the call's inverters in order.
///
/// # Errors
/// `NoInvertersFound` when the function declares none, otherwise the last
/// `FailedToInvert`; any other error is passed through.
pub fn invert(call: &SourceFuncCall, assignment: &Assignment, previous_result: &Value) -> Result<Vec<Inversal>, QuibError> {
    let mut last = QuibError::NoInvertersFound {
        func: call.func.name().to_string(),
    };
    for inverter in &call.definition.inverters {
        match inverter.invert(call, assignment, previous_result) {
            Ok(inversals) => return Ok(inversals),
            Err(e @ QuibError::FailedToInvert { .. }) => {
                log::trace!("{} cannot invert {}: {e}", inverter.name(), call.func.name());
                last = e;
            }
            Err(e) => return Err(e),
        }
    }
    Err(last)
}
