use crate::serde_inf;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The two time-series files one simulation run leaves behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultArtifacts {
    pub residuals: PathBuf,
    pub errors: PathBuf,
}

impl ResultArtifacts {
    /// Standard file names the tracking tool writes for a run called `name`.
    pub fn for_run(results_dir: &std::path::Path, name: &str) -> Self {
        Self {
            residuals: results_dir.join(format!("{}_Actuation_force.sto", name)),
            errors: results_dir.join(format!("{}_pErr.sto", name)),
        }
    }

    pub fn exist(&self) -> bool {
        self.residuals.is_file() && self.errors.is_file()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreDetails {
    // Top-line score
    #[serde(with = "serde_inf")]
    pub objective: f64,

    // Residual terms (normalized, raised to p_res)
    #[serde(with = "serde_inf")]
    pub sum_rms_residuals: f64,
    #[serde(with = "serde_inf")]
    pub sum_rms_forces: f64,
    #[serde(with = "serde_inf")]
    pub sum_rms_moments: f64,

    // Tracking terms (normalized, raised to p_err)
    #[serde(with = "serde_inf")]
    pub sum_rms_errors: f64,
}

impl ScoreDetails {
    /// Score of a run that produced no usable output.
    pub fn failed() -> Self {
        Self {
            objective: f64::INFINITY,
            sum_rms_residuals: f64::INFINITY,
            sum_rms_forces: f64::INFINITY,
            sum_rms_moments: f64::INFINITY,
            sum_rms_errors: f64::INFINITY,
        }
    }

    pub fn is_failure(&self) -> bool {
        self.objective == f64::INFINITY
    }
}

/// Raw RMS of the six residual actuator channels, before normalization.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ResidualRms {
    pub forces: [f64; 3],
    pub moments: [f64; 3],
}
