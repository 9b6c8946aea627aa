//! Assignments, the per-quib override record, and override groups.

#[allow(clippy::module_inception)]
pub mod assignment;
pub mod override_choice;
pub mod override_group;
pub mod overrider;
pub mod template;

pub use assignment::{Assignment, AssignmentValue};
pub use override_choice::{
    ChoiceCache, ChoiceContext, FirstOptionChooser, OverrideChoice, OverrideChooser, OverrideOption,
    OverrideOptionsTree, resolve,
};
pub use override_group::{AssignmentToQuib, OverrideGroup, OverrideRemoval};
pub use overrider::Overrider;
pub use template::AssignmentTemplate;
