use crate::reports;
use clap::Args;
use std::path::PathBuf;
use tracing::info;
use trackforge::config::Config;
use trackforge::scorer::loader::load_storage;
use trackforge::scorer::{residual_rms, ResidualNorms, Scorer};
use trackforge::simulator::TaskSet;
use trackforge::weights::{NormFactors, WeightVector};
use trackforge::TfResult;

#[derive(Args, Debug, Clone)]
pub struct ScoreArgs {
    /// Residual actuator forces (`*_Actuation_force.sto`)
    #[arg(long)]
    pub residuals: PathBuf,

    /// Tracking errors (`*_pErr.sto`)
    #[arg(long)]
    pub errors: PathBuf,

    /// Score only the coordinates of this task set. Defaults to every
    /// column of the error file.
    #[arg(long)]
    pub tasks: Option<PathBuf>,

    #[command(flatten)]
    pub config: Config,
}

pub fn run(args: &ScoreArgs, config: Config) -> TfResult<()> {
    let residuals = load_storage(&args.residuals)?;
    let errors = load_storage(&args.errors)?;
    let norm = NormFactors::from_config(&config.norm);

    let mut weights = match &args.tasks {
        Some(path) => TaskSet::load(path)?.initial_weights(&norm)?,
        None => {
            let names: Vec<String> = errors
                .columns
                .iter()
                .filter(|c| !c.eq_ignore_ascii_case("time"))
                .cloned()
                .collect();
            let ones = vec![1.0; names.len()];
            WeightVector::new(names, ones, &norm)?
        }
    };
    info!("Scoring {} coordinates", weights.len());

    let scorer = Scorer::new(ResidualNorms::from_config(&config.norm), &config.tune);
    let details = scorer.score_tables(&residuals, &errors, &mut weights)?;
    let rms = residual_rms(&residuals)?;

    reports::print_score(&details, &rms, &scorer);
    reports::print_weights(&weights, None);
    Ok(())
}
