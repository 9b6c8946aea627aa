mod util;
use quibbler::prelude::*;
use std::error::Error;
use util::*;

#[test]
fn undo_and_redo_walk_the_history() -> Result<(), Box<dyn Error>> {
    let mut g = QuibGraph::new();
    let a = g.iquib(vec![1, 2, 3]);
    let b = g.call("negative", vec![a.into()])?;
    g.assign(b, Assignment::new(Path::of(0), -10))?;
    assert_eq!(g.get_value(a)?, Value::from(vec![10, 2, 3]));

    g.undo()?;
    assert_eq!(g.get_value(a)?, Value::from(vec![1, 2, 3]));
    assert_eq!(g.get_value(b)?, Value::from(vec![-1, -2, -3]));
    assert!(g.can_redo());

    g.redo()?;
    assert_eq!(g.get_value(b)?, Value::from(vec![-10, -2, -3]));
    assert!(!g.can_redo());
    Ok(())
}

#[test]
fn empty_history_reports_nothing_to_do() {
    let mut g = QuibGraph::new();
    g.iquib(vec![1]);
    assert_eq!(g.undo().unwrap_err(), QuibError::NothingToUndo);
    assert_eq!(g.redo().unwrap_err(), QuibError::NothingToRedo);
}

#[test]
fn a_new_change_clears_redo() -> Result<(), Box<dyn Error>> {
    let mut g = QuibGraph::new();
    let a = g.iquib(vec![0, 0]);
    g.assign(a, Assignment::new(Path::of(0), 1))?;
    g.undo()?;
    g.assign(a, Assignment::new(Path::of(1), 2))?;
    assert!(!g.can_redo());
    assert_eq!(g.redo().unwrap_err(), QuibError::NothingToRedo);
    assert_eq!(g.get_value(a)?, Value::from(vec![0, 2]));
    Ok(())
}

#[test]
fn grouped_assignments_undo_together() -> Result<(), Box<dyn Error>> {
    let mut g = QuibGraph::new();
    let a = g.iquib(vec![0, 0, 0]);
    g.with_undo_group(|g| {
        g.assign(a, Assignment::new(Path::of(0), 1))?;
        g.assign(a, Assignment::new(Path::of(2), 3))
    })?;
    assert_eq!(g.get_value(a)?, Value::from(vec![1, 0, 3]));
    g.undo()?;
    assert_eq!(g.get_value(a)?, Value::from(vec![0, 0, 0]));
    assert!(!g.can_undo());
    Ok(())
}

#[test]
fn undo_restores_the_bypassed_override() -> Result<(), Box<dyn Error>> {
    let chooser = ScriptedChooser::new([Ok(OverrideChoice::Override(1))]);
    let mut g = QuibGraph::new();
    g.set_chooser(chooser);
    let a = g.iquib(vec![1, 2]);
    let b = g.call("add", vec![a.into(), Arg::value(1)])?;
    g.set_allow_overriding(b, true)?;
    g.override_quib(b, Assignment::new(Path::of(0), 5))?;
    assert_eq!(g.get_value(b)?, Value::from(vec![5, 3]));

    g.assign(b, Assignment::new(Path::of(0), 10))?;
    assert_eq!(g.get_value(a)?, Value::from(vec![9, 2]));
    assert_eq!(g.get_value(b)?, Value::from(vec![10, 3]));

    g.undo()?;
    assert_eq!(g.get_value(a)?, Value::from(vec![1, 2]));
    assert_eq!(g.get_value(b)?, Value::from(vec![5, 3]));
    Ok(())
}

#[test]
fn undo_invalidates_cached_dependants() -> Result<(), Box<dyn Error>> {
    let mut g = caching_graph();
    let a = g.iquib(vec![1, 2, 3]);
    let b = g.call("multiply", vec![a.into(), Arg::value(3)])?;
    g.assign(a, Assignment::new(Path::of(1), 7))?;
    assert_eq!(g.get_value(b)?, Value::from(vec![3, 21, 9]));
    assert_eq!(g.cache_status(b)?, CacheStatus::AllValid);
    g.undo()?;
    assert!(g.uncached_paths(b, &Path::of(0))?.is_empty());
    assert!(!g.uncached_paths(b, &Path::of(1))?.is_empty());
    assert_eq!(g.get_value(b)?, Value::from(vec![3, 6, 9]));
    Ok(())
}

#[test]
fn undo_redraws_once() -> Result<(), Box<dyn Error>> {
    let mut g = QuibGraph::new();
    g.registry_mut().register(
        Func::new("plot", |args: &CallArgs<Value>| Ok(args.args[0].clone())),
        FuncDefinition::builder("plot").graphics().build(),
    );
    let log = RedrawLog::default();
    g.set_graphics_observer(log.clone());
    let a = g.iquib(vec![1, 2]);
    let p = g.call("plot", vec![a.into()])?;
    g.with_undo_group(|g| {
        g.assign(a, Assignment::new(Path::of(0), 3))?;
        g.assign(a, Assignment::new(Path::of(1), 4))
    })?;
    g.undo()?;
    assert_eq!(log.0.borrow().last(), Some(&vec![p]));
    Ok(())
}
