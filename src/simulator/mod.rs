pub mod command;
pub mod tasks;

pub use self::command::CommandSimulator;
pub use self::tasks::TaskSet;

use crate::error::TfResult;
use crate::scorer::ResultArtifacts;
use crate::weights::WeightVector;
use std::fmt;

/// Which evaluation of a trial is being run. Decides file names and the
/// results directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunKind {
    /// Iteration 0, unperturbed template weights
    Baseline,
    Iteration(usize),
    /// Confirmation run with the selected best weights
    Final,
}

impl RunKind {
    /// Name the tool gives its output files. Search iterations share one
    /// name so each run overwrites the last one's results.
    pub fn run_name(&self) -> &'static str {
        match self {
            RunKind::Baseline => "optItr_0",
            RunKind::Iteration(_) => "optItr",
            RunKind::Final => "RRA",
        }
    }

    pub fn tasks_file_name(&self) -> String {
        match self {
            RunKind::Baseline => "optItr_0_Tasks.xml".to_string(),
            RunKind::Iteration(i) => format!("optItr_{}_Tasks.xml", i),
            RunKind::Final => "RRA_Final_Tasks.xml".to_string(),
        }
    }

    pub fn setup_file_name(&self) -> String {
        match self {
            RunKind::Baseline => "optItr_0_Setup.xml".to_string(),
            RunKind::Iteration(i) => format!("optItr_{}_Setup.xml", i),
            RunKind::Final => "RRA_Final_Setup.xml".to_string(),
        }
    }
}

impl fmt::Display for RunKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunKind::Baseline => write!(f, "baseline"),
            RunKind::Iteration(i) => write!(f, "iteration {}", i),
            RunKind::Final => write!(f, "final"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed(ResultArtifacts),
    Failed { reason: String },
}

impl RunOutcome {
    pub fn artifacts(&self) -> Option<&ResultArtifacts> {
        match self {
            RunOutcome::Completed(a) => Some(a),
            RunOutcome::Failed { .. } => None,
        }
    }
}

/// The external simulation, seen as a black-box objective.
///
/// Implementations materialize `weights`, run to completion and report where
/// the results are. A run that produced no results is a `Failed` outcome,
/// not an error; `Err` is reserved for problems that should stop the search.
pub trait Simulator {
    fn run(&mut self, weights: &WeightVector, kind: RunKind) -> TfResult<RunOutcome>;
}

impl<S: Simulator + ?Sized> Simulator for Box<S> {
    fn run(&mut self, weights: &WeightVector, kind: RunKind) -> TfResult<RunOutcome> {
        (**self).run(weights, kind)
    }
}
