//! Choosing where an assignment lands when several quibs could take it.
//!
//! Walking up from the assigned quib through successive inversions yields
//! an [`OverrideOptionsTree`]: the quibs along a single chain that accept
//! overrides are its options, and a call with several invertible data
//! sources splits the walk into child trees. [`resolve`] turns the tree into
//! an [`OverrideGroup`], asking an [`OverrideChooser`] only when the choice
//! is genuinely ambiguous and remembering its answers per context.

use super::assignment::Assignment;
use super::override_group::{AssignmentToQuib, OverrideGroup, OverrideRemoval};
use crate::quib::QuibId;
use crate::quib_error::QuibError;
use hashbrown::HashMap;

/// One quib that could receive the assignment, with the removals needed on
/// the quibs bypassed on the way to it.
#[derive(Clone, Debug, PartialEq)]
pub struct OverrideOption {
    pub quib: QuibId,
    pub assignment: Assignment,
    pub removals: Vec<OverrideRemoval>,
}

impl OverrideOption {
    fn into_group(self) -> OverrideGroup {
        OverrideGroup::new(vec![AssignmentToQuib::new(self.quib, self.assignment)], self.removals)
    }
}

/// Why a tree with nothing to offer cannot take the assignment.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Blocked {
    /// The walk never got past the tree's top quib.
    pub stayed_at_top: bool,
    pub top_allows_overriding: bool,
    pub top_label: String,
}

/// Override points reachable from one quib.
#[derive(Clone, Debug, PartialEq)]
pub struct OverrideOptionsTree {
    pub top: QuibId,
    /// The assignment as made on `top`.
    pub assignment: Assignment,
    /// Overridable quibs along the chain, nearest first.
    pub options: Vec<OverrideOption>,
    /// Removals for every quib up to and including the one where the walk
    /// split; applied when the choice is to diverge.
    pub diverged_removals: Vec<OverrideRemoval>,
    /// One tree per data source at the split, empty when the walk ended on
    /// a single chain.
    pub children: Vec<OverrideOptionsTree>,
    pub(crate) blocked: Blocked,
}

impl OverrideOptionsTree {
    /// Diverging is possible when every branch can itself be resolved.
    pub fn can_diverge(&self) -> bool {
        !self.children.is_empty()
            && self
                .children
                .iter()
                .all(|c| !c.options.is_empty() || c.can_diverge())
    }

    pub fn context(&self) -> ChoiceContext {
        ChoiceContext {
            options: self.options.iter().map(|o| o.quib).collect(),
            can_diverge: self.can_diverge(),
        }
    }

    fn not_possible(&self) -> QuibError {
        let path = self.assignment.path.clone();
        let quib = self.blocked.top_label.clone();
        if self.blocked.stayed_at_top && !self.blocked.top_allows_overriding {
            QuibError::OverridingNotAllowed { quib, path }
        } else {
            QuibError::AssignmentNotPossible { quib, path }
        }
    }
}

/// What a choice was made between; cached choices apply only while the
/// context is unchanged.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ChoiceContext {
    pub options: Vec<QuibId>,
    pub can_diverge: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OverrideChoice {
    /// Override the option at this index.
    Override(usize),
    /// Push the assignment into every branch.
    Diverge,
}

/// Disambiguation collaborator (typically a dialog).
///
/// Returning `Err(QuibError::AssignmentCancelledByUser)` abandons the whole
/// assignment; nothing is applied and the choice is not remembered.
pub trait OverrideChooser {
    fn choose(&mut self, options: &[OverrideOption], can_diverge: bool) -> Result<OverrideChoice, QuibError>;
}

/// Non-interactive default: the nearest option, else diverge.
#[derive(Clone, Copy, Debug, Default)]
pub struct FirstOptionChooser;

impl OverrideChooser for FirstOptionChooser {
    fn choose(&mut self, options: &[OverrideOption], _can_diverge: bool) -> Result<OverrideChoice, QuibError> {
        Ok(if options.is_empty() {
            OverrideChoice::Diverge
        } else {
            OverrideChoice::Override(0)
        })
    }
}

/// Remembered choices keyed by the tree's top quib and context.
#[derive(Clone, Debug, Default)]
pub struct ChoiceCache {
    choices: HashMap<(QuibId, ChoiceContext), OverrideChoice>,
}

impl ChoiceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, quib: QuibId, context: &ChoiceContext) -> Option<OverrideChoice> {
        self.choices.get(&(quib, context.clone())).copied()
    }

    pub fn insert(&mut self, quib: QuibId, context: ChoiceContext, choice: OverrideChoice) {
        self.choices.insert((quib, context), choice);
    }

    pub fn len(&self) -> usize {
        self.choices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.choices.is_empty()
    }

    pub fn clear(&mut self) {
        self.choices.clear();
    }
}

fn decide(
    tree: &OverrideOptionsTree,
    chooser: &mut dyn OverrideChooser,
    cache: &mut ChoiceCache,
) -> Result<OverrideChoice, QuibError> {
    let can_diverge = tree.can_diverge();
    match (tree.options.len(), can_diverge) {
        (1, false) => return Ok(OverrideChoice::Override(0)),
        (0, true) => return Ok(OverrideChoice::Diverge),
        (0, false) => return Err(tree.not_possible()),
        _ => {}
    }
    let context = tree.context();
    if let Some(choice) = cache.get(tree.top, &context) {
        log::debug!("reusing override choice {choice:?} for {}", tree.top);
        return Ok(choice);
    }
    let choice = chooser.choose(&tree.options, can_diverge)?;
    match choice {
        OverrideChoice::Override(i) if i >= tree.options.len() => {
            return Err(QuibError::InvalidArgument(format!(
                "override option {i} is out of range for {} options",
                tree.options.len()
            )));
        }
        OverrideChoice::Diverge if !can_diverge => {
            return Err(QuibError::InvalidArgument("cannot diverge here".into()));
        }
        _ => {}
    }
    cache.insert(tree.top, context, choice);
    Ok(choice)
}

/// Pick the override point(s) in `tree` and collect the group to apply.
///
/// # Errors
/// - `AssignmentNotPossible` / `OverridingNotAllowed` when no quib can take
///   the assignment.
/// - Whatever the chooser returns, typically `AssignmentCancelledByUser`.
pub fn resolve(
    tree: OverrideOptionsTree,
    chooser: &mut dyn OverrideChooser,
    cache: &mut ChoiceCache,
) -> Result<OverrideGroup, QuibError> {
    match decide(&tree, chooser, cache)? {
        OverrideChoice::Override(i) => {
            let mut options = tree.options;
            Ok(options.swap_remove(i).into_group())
        }
        OverrideChoice::Diverge => {
            let mut group = OverrideGroup::new(Vec::new(), tree.diverged_removals);
            for child in tree.children {
                group.extend(resolve(child, chooser, cache)?);
            }
            Ok(group)
        }
    }
}
