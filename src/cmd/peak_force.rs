use clap::Args;
use std::path::PathBuf;
use tracing::info;
use trackforge::scorer::loader::{load_storage, peak_vertical_force};
use trackforge::scorer::ResidualNorms;
use trackforge::TfResult;

#[derive(Args, Debug, Clone)]
pub struct PeakForceArgs {
    /// Ground reaction force file (`.mot`)
    pub grf: PathBuf,
}

pub fn run(args: PeakForceArgs) -> TfResult<()> {
    let table = load_storage(&args.grf)?;
    let peak = peak_vertical_force(&table)?;
    let norms = ResidualNorms::from_peak_force(peak);
    info!(
        "Residual limits: force {:.3} N, moment {:.3} Nm",
        norms.force, norms.moment
    );
    println!("peak_vertical_force\t{:.6}", peak);
    Ok(())
}
