use crate::reports;
use clap::Args;
use std::path::PathBuf;
use trackforge::config::TrialLayout;
use trackforge::optimizer::{CheckpointStore, FileCheckpoint};
use trackforge::{TfResult, TrackForgeError};

#[derive(Args, Debug, Clone)]
pub struct ReportArgs {
    #[command(flatten)]
    pub trial: TrialLayout,

    /// Read this checkpoint instead of the trial's default one
    #[arg(long)]
    pub checkpoint: Option<PathBuf>,
}

pub fn run(args: ReportArgs) -> TfResult<()> {
    let path = args
        .checkpoint
        .unwrap_or_else(|| args.trial.checkpoint_path());
    let mut store = FileCheckpoint::new(&path);
    let state = store.load()?.ok_or_else(|| {
        TrackForgeError::Config(format!("No saved progress at {}", path.display()))
    })?;

    reports::print_history(&state);
    let best = &state.history[state.best_index()];
    let mut weights = state.current_best.clone();
    weights.set_values(&best.weights)?;
    reports::print_weights(&weights, state.history.first().map(|h| h.weights.as_slice()));
    Ok(())
}
