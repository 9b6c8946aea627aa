mod util;
use quibbler::prelude::*;
use std::error::Error;
use util::*;

/// `a -> b = a + 1`, with `b` accepting overrides.
fn overridable_chain(chooser: &ScriptedChooser) -> (QuibGraph, QuibId, QuibId) {
    let mut g = QuibGraph::new();
    g.set_chooser(chooser.clone());
    let a = g.iquib(vec![1, 2]);
    let b = g.call("add", vec![a.into(), Arg::value(1)]).unwrap();
    g.set_allow_overriding(b, true).unwrap();
    (g, a, b)
}

#[test]
fn chooser_sees_nearest_option_first() -> Result<(), Box<dyn Error>> {
    let chooser = ScriptedChooser::new([Ok(OverrideChoice::Override(1))]);
    let (mut g, a, b) = overridable_chain(&chooser);
    g.assign(b, Assignment::new(Path::of(0), 10))?;
    assert_eq!(*chooser.offered.borrow(), vec![(vec![b, a], false)]);
    assert_eq!(g.get_value(a)?, Value::from(vec![9, 2]));
    assert!(g.override_list(b)?.is_empty());
    Ok(())
}

#[test]
fn choosing_the_quib_itself_keeps_the_input() -> Result<(), Box<dyn Error>> {
    let chooser = ScriptedChooser::new([Ok(OverrideChoice::Override(0))]);
    let (mut g, a, b) = overridable_chain(&chooser);
    g.assign(b, Assignment::new(Path::of(0), 10))?;
    assert_eq!(g.get_value(a)?, Value::from(vec![1, 2]));
    assert_eq!(g.get_value(b)?, Value::from(vec![10, 3]));
    Ok(())
}

#[test]
fn choices_are_reused_for_the_same_options() -> Result<(), Box<dyn Error>> {
    let chooser = ScriptedChooser::new([Ok(OverrideChoice::Override(1))]);
    let (mut g, a, b) = overridable_chain(&chooser);
    g.assign(b, Assignment::new(Path::of(0), 10))?;
    g.assign(b, Assignment::new(Path::of(1), 20))?;
    assert_eq!(chooser.times_asked(), 1);
    assert_eq!(g.get_value(a)?, Value::from(vec![9, 19]));
    assert_eq!(g.choice_cache().len(), 1);
    Ok(())
}

#[test]
fn cancelling_applies_nothing() -> Result<(), Box<dyn Error>> {
    let chooser = ScriptedChooser::new([Err(QuibError::AssignmentCancelledByUser)]);
    let (mut g, a, b) = overridable_chain(&chooser);
    let err = g.assign(b, Assignment::new(Path::of(0), 10)).unwrap_err();
    assert_eq!(err, QuibError::AssignmentCancelledByUser);
    assert!(g.override_list(a)?.is_empty());
    assert!(g.override_list(b)?.is_empty());
    assert!(!g.can_undo());
    assert!(g.choice_cache().is_empty());
    Ok(())
}

#[test]
fn assigned_quibs_narrow_the_options() -> Result<(), Box<dyn Error>> {
    let chooser = ScriptedChooser::new([]);
    let (mut g, a, b) = overridable_chain(&chooser);
    g.set_assigned_quibs(b, Some(vec![a]))?;
    g.assign(b, Assignment::new(Path::of(1), 7))?;
    assert_eq!(chooser.times_asked(), 0);
    assert_eq!(g.get_value(a)?, Value::from(vec![1, 6]));
    Ok(())
}

fn concatenated() -> Result<(QuibGraph, QuibId, QuibId, QuibId), QuibError> {
    let mut g = QuibGraph::new();
    let a = g.iquib(vec![1, 2]);
    let b = g.iquib(vec![3, 4]);
    let c = g.call("concatenate", vec![Arg::List(vec![a.into(), b.into()])])?;
    Ok((g, a, b, c))
}

#[test]
fn split_assignment_diverges_into_every_source() -> Result<(), Box<dyn Error>> {
    let (mut g, a, b, c) = concatenated()?;
    let middle = Path::of(Index::slice(Some(1), Some(3)));
    let tree = g.get_override_options_tree(c, Assignment::new(middle.clone(), vec![20, 30]))?;
    assert!(tree.options.is_empty());
    assert_eq!(tree.children.len(), 2);
    assert!(tree.can_diverge());

    g.assign(c, Assignment::new(middle, vec![20, 30]))?;
    assert_eq!(g.get_value(a)?, Value::from(vec![1, 20]));
    assert_eq!(g.get_value(b)?, Value::from(vec![30, 4]));
    assert_eq!(g.get_value(c)?, Value::from(vec![1, 20, 30, 4]));
    Ok(())
}

#[test]
fn divergence_competes_with_overriding_the_result() -> Result<(), Box<dyn Error>> {
    let chooser = ScriptedChooser::new([Ok(OverrideChoice::Diverge)]);
    let (mut g, a, b, c) = concatenated()?;
    g.set_chooser(chooser.clone());
    g.set_allow_overriding(c, true)?;
    g.assign(c, Assignment::new(Path::of(Index::slice(Some(1), Some(3))), vec![20, 30]))?;
    assert_eq!(*chooser.offered.borrow(), vec![(vec![c], true)]);
    assert_eq!(g.get_value(a)?, Value::from(vec![1, 20]));
    assert_eq!(g.get_value(b)?, Value::from(vec![30, 4]));
    assert!(g.override_list(c)?.is_empty());
    Ok(())
}

#[test]
fn nothing_overridable_upstream_is_not_possible() -> Result<(), Box<dyn Error>> {
    let mut g = QuibGraph::with_config(QuibConfig {
        allow_overriding_inputs: false,
        ..Default::default()
    });
    let a = g.iquib(vec![1, 2]);
    let b = g.call("negative", vec![a.into()])?;
    let err = g.assign(b, Assignment::new(Path::of(0), 5)).unwrap_err();
    assert!(matches!(err, QuibError::AssignmentNotPossible { .. }));
    Ok(())
}
