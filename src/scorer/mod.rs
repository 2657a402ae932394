pub mod loader;
pub mod types;

pub use self::types::{ResidualRms, ResultArtifacts, ScoreDetails};

use self::loader::StorageTable;
use crate::config::{Normalization, TuneParams};
use crate::error::TfResult;
use crate::weights::WeightVector;
use tracing::{debug, warn};

pub const GRAVITY: f64 = 9.81;
pub const FORCE_CHANNELS: [&str; 3] = ["FX", "FY", "FZ"];
pub const MOMENT_CHANNELS: [&str; 3] = ["MX", "MY", "MZ"];
pub const NUM_RESIDUALS: usize = 6;

/// Divisors that turn residual RMS values into multiples of the
/// recommended residual limits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResidualNorms {
    pub force: f64,
    pub moment: f64,
}

impl ResidualNorms {
    /// Peak force is taken as ~1.3 body weights. Forces are judged against
    /// 5% of that peak, moments against 1%.
    pub fn from_mass(mass: f64) -> Self {
        Self::from_peak_force(1.3 * GRAVITY * mass)
    }

    pub fn from_peak_force(peak: f64) -> Self {
        let force = peak * 0.05;
        Self {
            force,
            moment: force / 5.0,
        }
    }

    pub fn from_config(norm: &Normalization) -> Self {
        match norm.residual_norm {
            Some(peak) => Self::from_peak_force(peak),
            None => Self::from_mass(norm.mass),
        }
    }
}

/// Objective evaluator: turns one run's result files into a scalar cost.
#[derive(Debug, Clone)]
pub struct Scorer {
    pub norms: ResidualNorms,
    pub w_res: f64,
    pub p_res: f64,
    pub w_err: f64,
    pub p_err: f64,
}

impl Scorer {
    pub fn new(norms: ResidualNorms, params: &TuneParams) -> Self {
        Self {
            norms,
            w_res: params.w_res,
            p_res: params.p_res,
            w_err: params.w_err,
            p_err: params.p_err,
        }
    }

    /// Scores a run. Missing or unreadable results score `+inf` and mark
    /// every coordinate's error as unbounded; this never fails.
    pub fn evaluate(
        &self,
        artifacts: Option<&ResultArtifacts>,
        weights: &mut WeightVector,
    ) -> ScoreDetails {
        let Some(artifacts) = artifacts.filter(|a| a.exist()) else {
            weights.mark_unbounded();
            return ScoreDetails::failed();
        };

        match self.try_evaluate(artifacts, weights) {
            Ok(details) if details.objective.is_finite() => details,
            Ok(details) => {
                warn!("⚠️  Objective is not finite ({}). Scoring as failure.", details.objective);
                weights.mark_unbounded();
                ScoreDetails::failed()
            }
            Err(e) => {
                warn!("⚠️  Could not score run: {}", e);
                weights.mark_unbounded();
                ScoreDetails::failed()
            }
        }
    }

    /// Strict variant of [`Scorer::evaluate`] that reports parse problems.
    pub fn try_evaluate(
        &self,
        artifacts: &ResultArtifacts,
        weights: &mut WeightVector,
    ) -> TfResult<ScoreDetails> {
        let residuals = loader::load_storage(&artifacts.residuals)?;
        let errors = loader::load_storage(&artifacts.errors)?;
        self.score_tables(&residuals, &errors, weights)
    }

    pub fn score_tables(
        &self,
        residuals: &StorageTable,
        errors: &StorageTable,
        weights: &mut WeightVector,
    ) -> TfResult<ScoreDetails> {
        let rms = residual_rms(residuals)?;

        let sum_rms_forces: f64 = rms
            .forces
            .iter()
            .map(|f| (f / self.norms.force).powf(self.p_res))
            .sum();
        let sum_rms_moments: f64 = rms
            .moments
            .iter()
            .map(|m| (m / self.norms.moment).powf(self.p_res))
            .sum();
        let sum_rms_residuals = sum_rms_forces + sum_rms_moments;

        // Compute all coordinate errors before touching the weight vector so
        // a missing column leaves it unchanged.
        let mut coord_rms = Vec::with_capacity(weights.len());
        for name in weights.names() {
            coord_rms.push(errors.rms(name)?);
        }

        let mut sum_rms_errors = 0.0;
        for (i, rms) in coord_rms.into_iter().enumerate() {
            sum_rms_errors += (rms / weights.rms_norm_factor()[i]).powf(self.p_err);
            weights.record_rms_err(i, rms);
        }

        let n_coords = weights.len() as f64;
        let objective = self.w_res * sum_rms_residuals / NUM_RESIDUALS as f64
            + self.w_err * sum_rms_errors / n_coords;

        debug!(
            "Residuals {:.4} (F {:.4} / M {:.4}) | Errors {:.4} | Objective {:.4}",
            sum_rms_residuals, sum_rms_forces, sum_rms_moments, sum_rms_errors, objective
        );

        Ok(ScoreDetails {
            objective,
            sum_rms_residuals,
            sum_rms_forces,
            sum_rms_moments,
            sum_rms_errors,
        })
    }
}

pub fn residual_rms(table: &StorageTable) -> TfResult<ResidualRms> {
    let mut out = ResidualRms::default();
    for (i, ch) in FORCE_CHANNELS.iter().enumerate() {
        out.forces[i] = table.rms(ch)?;
    }
    for (i, ch) in MOMENT_CHANNELS.iter().enumerate() {
        out.moments[i] = table.rms(ch)?;
    }
    Ok(out)
}
