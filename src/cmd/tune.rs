use crate::reports;
use clap::Args;
use tracing::info;
use trackforge::config::Config;
use trackforge::optimizer::{Controller, FileCheckpoint};
use trackforge::scorer::{ResidualNorms, Scorer};
use trackforge::simulator::{CommandSimulator, TaskSet};
use trackforge::weights::NormFactors;
use trackforge::TfResult;

#[derive(Args, Debug, Clone)]
pub struct TuneArgs {
    #[command(flatten)]
    pub config: Config,
}

pub fn run(config: Config) -> TfResult<()> {
    let trial = &config.trial;
    info!("🚀 Tuning trial {}", trial.trial_path.display());

    let template = TaskSet::load(trial.template_path())?;
    let initial = template.initial_weights(&NormFactors::from_config(&config.norm))?;

    let norms = ResidualNorms::from_config(&config.norm);
    info!(
        "⚖️  Residual normalization: force {:.3} N, moment {:.3} Nm",
        norms.force, norms.moment
    );
    let scorer = Scorer::new(norms, &config.tune);

    let simulator = CommandSimulator::new(template, trial, &config.tool)?;
    let store = FileCheckpoint::new(trial.checkpoint_path());

    let mut controller = Controller::new(config.tune.clone(), scorer, initial.clone(), simulator, store);
    let result = controller.run()?;

    reports::print_weights(&result.best_weights, Some(initial.values()));
    reports::print_result(&result);
    Ok(())
}
