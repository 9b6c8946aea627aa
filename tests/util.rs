#![allow(dead_code)]
use quibbler::prelude::*;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

/// Chooser answering from a script and logging what it was offered.
#[derive(Clone, Default)]
pub struct ScriptedChooser {
    pub answers: Rc<RefCell<VecDeque<Result<OverrideChoice, QuibError>>>>,
    pub offered: Rc<RefCell<Vec<(Vec<QuibId>, bool)>>>,
}

impl ScriptedChooser {
    pub fn new(answers: impl IntoIterator<Item = Result<OverrideChoice, QuibError>>) -> Self {
        ScriptedChooser {
            answers: Rc::new(RefCell::new(answers.into_iter().collect())),
            offered: Rc::default(),
        }
    }

    pub fn times_asked(&self) -> usize {
        self.offered.borrow().len()
    }
}

impl OverrideChooser for ScriptedChooser {
    fn choose(&mut self, options: &[OverrideOption], can_diverge: bool) -> Result<OverrideChoice, QuibError> {
        self.offered
            .borrow_mut()
            .push((options.iter().map(|o| o.quib).collect(), can_diverge));
        self.answers
            .borrow_mut()
            .pop_front()
            .unwrap_or(Err(QuibError::AssignmentCancelledByUser))
    }
}

/// Graphics observer recording every redraw batch.
#[derive(Clone, Default)]
pub struct RedrawLog(pub Rc<RefCell<Vec<Vec<QuibId>>>>);

impl GraphicsObserver for RedrawLog {
    fn redraw(&mut self, quibs: &[QuibId]) {
        self.0.borrow_mut().push(quibs.to_vec());
    }
}

/// A graph whose computed quibs always keep their caches.
pub fn caching_graph() -> QuibGraph {
    QuibGraph::with_config(QuibConfig {
        default_cache_behavior: CacheBehavior::On,
        ..Default::default()
    })
}

/// Cells of a 2-d quib still needing computation.
pub fn uncached_cells(graph: &QuibGraph, quib: QuibId, rows: usize, cols: usize) -> Vec<(usize, usize)> {
    let mut out = Vec::new();
    for i in 0..rows {
        for j in 0..cols {
            let path = Path::at(&[i as isize, j as isize]);
            if !graph.uncached_paths(quib, &path).unwrap().is_empty() {
                out.push((i, j));
            }
        }
    }
    out
}
