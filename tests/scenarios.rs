mod util;
use quibbler::prelude::*;
use std::error::Error;
use util::*;

#[test]
fn assignment_to_doubled_input_lands_on_the_input() -> Result<(), Box<dyn Error>> {
    let mut g = QuibGraph::new();
    let input = g.iquib(vec![1, 2, 3]);
    let doubled = g.call("multiply", vec![input.into(), Arg::value(2)])?;
    g.assign(doubled, Assignment::new(Path::of(1), 6))?;
    assert_eq!(g.get_value(input)?, Value::from(vec![1, 3, 3]));
    assert_eq!(g.get_value(doubled)?, Value::from(vec![2, 6, 6]));
    let overrides: Vec<&Assignment> = g.override_list(input)?.iter().collect();
    assert_eq!(overrides.len(), 1);
    assert_eq!(overrides[0].path, Path::of(1));
    Ok(())
}

#[test]
fn reshape_invalidates_a_single_cell() -> Result<(), Box<dyn Error>> {
    let mut g = caching_graph();
    let input = g.iquib(Value::from_shape(&[2, 3], vec![1, 2, 3, 4, 5, 6])?);
    let r = g.call("reshape", vec![input.into(), Arg::value(vec![3, 2])])?;
    g.get_value(r)?;
    assert_eq!(g.cache_status(r)?, CacheStatus::AllValid);

    g.assign(input, Assignment::new(Path::at(&[0, 0]), 100))?;
    assert_eq!(uncached_cells(&g, r, 3, 2), vec![(0, 0)]);
    assert_eq!(
        g.get_value(r)?,
        Value::from_shape(&[3, 2], vec![100, 2, 3, 4, 5, 6])?
    );
    Ok(())
}

#[test]
fn concatenate_assignment_targets_the_second_array() -> Result<(), Box<dyn Error>> {
    let mut g = QuibGraph::new();
    let a = g.iquib(vec![1, 2]);
    let b = g.iquib(vec![3, 4]);
    let c = g.call("concatenate", vec![Arg::List(vec![a.into(), b.into()])])?;
    g.assign(c, Assignment::new(Path::of(2), 99))?;
    assert_eq!(g.get_value(a)?, Value::from(vec![1, 2]));
    assert!(g.override_list(a)?.is_empty());
    assert_eq!(g.get_value(b)?, Value::from(vec![99, 4]));
    assert_eq!(g.get_value(c)?, Value::from(vec![1, 2, 99, 4]));
    Ok(())
}

#[test]
fn repeated_assignment_keeps_the_latest_value() -> Result<(), Box<dyn Error>> {
    let mut g = QuibGraph::new();
    let a = g.iquib(vec![0, 0, 0]);
    g.assign(a, Assignment::new(Path::of(1), 5))?;
    g.assign(a, Assignment::new(Path::of(1), 7))?;
    let overrider = g.override_list(a)?;
    assert_eq!(overrider.len(), 1);
    assert_eq!(overrider.get(&Path::of(1)).and_then(Assignment::value), Some(&Value::from(7)));
    assert_eq!(g.get_value(a)?, Value::from(vec![0, 7, 0]));
    Ok(())
}

#[test]
fn refused_assignment_leaves_the_quib_untouched() -> Result<(), Box<dyn Error>> {
    let mut g = caching_graph();
    let a = g.iquib(vec![1, 2, 3]);
    let total = g.call("sum", vec![a.into()])?;
    assert_eq!(g.get_value(total)?, Value::from(6));
    let err = g.assign_value(total, 10).unwrap_err();
    assert!(matches!(err, QuibError::OverridingNotAllowed { .. }));
    assert!(g.override_list(total)?.is_empty());
    assert_eq!(g.cache_status(total)?, CacheStatus::AllValid);
    assert!(!g.can_undo());
    Ok(())
}

#[test]
fn override_mask_marks_overridden_cells() -> Result<(), Box<dyn Error>> {
    let mut g = QuibGraph::new();
    let a = g.iquib(vec![10, 20, 30]);
    g.assign(a, Assignment::new(Path::of(1), 0))?;
    assert_eq!(g.get_override_mask(a)?, Value::from(vec![false, true, false]));
    Ok(())
}

#[test]
fn partial_request_leaves_other_cells_uncomputed() -> Result<(), Box<dyn Error>> {
    let mut g = caching_graph();
    let a = g.iquib(vec![1.0, 4.0, 9.0]);
    let roots = g.call("sqrt", vec![a.into()])?;
    let first = g.getitem(roots, 0)?;
    assert_eq!(g.get_value(first)?, Value::from(1.0));
    assert_eq!(g.cache_status(roots)?, CacheStatus::Partial);
    assert!(!g.uncached_paths(roots, &Path::of(2))?.is_empty());
    Ok(())
}

#[test]
fn assignment_through_a_chain_reaches_the_input() -> Result<(), Box<dyn Error>> {
    let mut g = QuibGraph::new();
    let a = g.iquib(vec![1.0, 2.0, 3.0, 4.0]);
    let shifted = g.call("add", vec![a.into(), Arg::value(1.0)])?;
    let grid = g.call("reshape", vec![shifted.into(), Arg::value(vec![2, 2])])?;
    let flipped = g.call("transpose", vec![grid.into()])?;
    g.assign(flipped, Assignment::new(Path::at(&[0, 1]), 10.0))?;
    assert_eq!(g.get_value(a)?, Value::from(vec![1.0, 2.0, 9.0, 4.0]));
    assert_eq!(
        g.get_value(flipped)?,
        Value::from_shape(&[2, 2], vec![2.0, 10.0, 3.0, 5.0])?
    );
    Ok(())
}

#[test]
fn assignment_template_clips_assigned_values() -> Result<(), Box<dyn Error>> {
    let mut g = QuibGraph::new();
    let a = g.iquib(vec![1, 2, 3]);
    g.set_assignment_template(
        a,
        Some(AssignmentTemplate::Bound {
            min: Scalar::Int(0),
            max: Scalar::Int(10),
        }),
    )?;
    g.assign(a, Assignment::new(Path::of(0), 50))?;
    assert_eq!(g.get_value(a)?, Value::from(vec![10, 2, 3]));
    Ok(())
}

#[test]
fn replacing_assignments_invalidates_changed_paths() -> Result<(), Box<dyn Error>> {
    let mut g = caching_graph();
    let a = g.iquib(vec![1, 2, 3]);
    let b = g.call("negative", vec![a.into()])?;
    g.get_value(b)?;
    let changed = g.replace_assignments(a, vec![Assignment::new(Path::of(2), 30)])?;
    assert_eq!(changed, vec![Path::of(2)]);
    assert!(g.uncached_paths(b, &Path::of(0))?.is_empty());
    assert!(!g.uncached_paths(b, &Path::of(2))?.is_empty());
    assert_eq!(g.get_value(b)?, Value::from(vec![-1, -2, -30]));
    Ok(())
}

#[test]
fn refreshing_impure_quibs_draws_again() -> Result<(), Box<dyn Error>> {
    let mut g = QuibGraph::new();
    let r = g.call("random", vec![Arg::value(vec![4])])?;
    let first = g.get_value(r)?;
    assert_eq!(g.get_value(r)?, first);
    g.refresh_impure_quibs()?;
    assert_eq!(g.cache_status(r)?, CacheStatus::AllInvalid);
    assert_ne!(g.get_value(r)?, first);
    Ok(())
}

#[test]
fn graphics_quibs_are_redrawn_once_per_assignment() -> Result<(), Box<dyn Error>> {
    let mut g = QuibGraph::new();
    g.registry_mut().register(
        Func::new("plot", |args: &CallArgs<Value>| Ok(args.args[0].clone())),
        FuncDefinition::builder("plot").graphics().build(),
    );
    let log = RedrawLog::default();
    g.set_graphics_observer(log.clone());
    let a = g.iquib(vec![1, 2, 3]);
    let b = g.call("multiply", vec![a.into(), Arg::value(2)])?;
    let plot_a = g.call("plot", vec![a.into()])?;
    let plot_b = g.call("plot", vec![b.into()])?;
    g.assign(b, Assignment::new(Path::of(0), 8))?;
    // b is reached (and its plot queued) before a's own plot
    assert_eq!(*log.0.borrow(), vec![vec![plot_b, plot_a]]);
    Ok(())
}

fn row_then_column(row: isize, col: isize) -> Path {
    Path::of(row).with(PathComponent::new(col))
}

#[test]
fn chained_indices_assign_into_a_grid() -> Result<(), Box<dyn Error>> {
    let mut g = QuibGraph::new();
    let a = g.iquib(Value::from_shape(&[2, 2], vec![1, 2, 3, 4])?);
    g.assign(a, Assignment::new(row_then_column(1, 0), 30))?;
    assert_eq!(g.get_value(a)?, Value::from_shape(&[2, 2], vec![1, 2, 30, 4])?);
    Ok(())
}

#[test]
fn chained_indices_invert_through_multiply() -> Result<(), Box<dyn Error>> {
    let mut g = QuibGraph::new();
    let a = g.iquib(Value::from_shape(&[2, 2], vec![1.0, 2.0, 3.0, 4.0])?);
    let doubled = g.call("multiply", vec![a.into(), Arg::value(2.0)])?;
    g.assign(doubled, Assignment::new(row_then_column(0, 1), 10.0))?;
    assert!(g.override_list(doubled)?.is_empty());
    assert_eq!(g.get_value(a)?, Value::from_shape(&[2, 2], vec![1.0, 5.0, 3.0, 4.0])?);
    assert_eq!(g.get_value(doubled)?, Value::from_shape(&[2, 2], vec![2.0, 10.0, 6.0, 8.0])?);
    Ok(())
}

#[test]
fn chained_indices_invert_through_transpose() -> Result<(), Box<dyn Error>> {
    let mut g = QuibGraph::new();
    let a = g.iquib(Value::from_shape(&[2, 2], vec![1, 2, 3, 4])?);
    let t = g.call("transpose", vec![a.into()])?;
    g.assign(t, Assignment::new(row_then_column(0, 1), 30))?;
    assert_eq!(g.get_value(a)?, Value::from_shape(&[2, 2], vec![1, 2, 30, 4])?);
    assert_eq!(g.get_value(t)?, Value::from_shape(&[2, 2], vec![1, 30, 2, 4])?);
    Ok(())
}

#[test]
fn vectorized_row_totals_follow_their_rows() -> Result<(), Box<dyn Error>> {
    let mut g = caching_graph();
    let rows = g.iquib(Value::from_shape(&[2, 3], vec![1, 2, 3, 4, 5, 6])?);
    let total = vectorize_with_signature(
        "row_total",
        "(n)->()",
        |core: &[NdArray<f64>]| Ok(NdArray::scalar(core[0].data().iter().sum())),
        Vec::new(),
    )?;
    let totals = g.create_quib(total, CallArgs::new(vec![rows.into()]))?;
    assert_eq!(g.get_value(totals)?, Value::from(vec![6.0, 15.0]));

    g.assign(rows, Assignment::new(Path::at(&[1, 2]), 10))?;
    assert!(g.uncached_paths(totals, &Path::of(0))?.is_empty());
    assert!(!g.uncached_paths(totals, &Path::of(1))?.is_empty());
    assert_eq!(g.get_value(totals)?, Value::from(vec![6.0, 19.0]));
    Ok(())
}
