use super::state::TestedSolutions;
use crate::error::{TfResult, TrackForgeError};
use crate::weights::{is_translational, WeightVector};
use fastrand::Rng;
use strum_macros::{Display, EnumIter};
use tracing::{debug, warn};

/// Plain redraws before step magnitudes are doubled.
pub const REDRAW_LIMIT: usize = 256;
/// Widened redraws before falling back to deterministic escalation.
pub const WIDEN_LIMIT: usize = 256;

/// Acceptable RMS tracking error for a translational coordinate (m).
pub const TRANSLATION_BAND: (f64, f64) = (0.01, 0.03);
/// Acceptable RMS tracking error for a rotational coordinate (deg).
pub const ROTATION_BAND_DEG: (f64, f64) = (1.0, 3.0);

/// Where a coordinate's last tracking error sits relative to its band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
pub enum ErrorBand {
    /// Tracked tighter than needed; the weight may come down
    Under,
    Balanced,
    /// Tracked too loosely; the weight should go up
    Over,
}

impl ErrorBand {
    pub fn classify(rms_err: f64, (lb, ub): (f64, f64)) -> Self {
        if rms_err < lb {
            ErrorBand::Under
        } else if rms_err > ub {
            ErrorBand::Over
        } else {
            ErrorBand::Balanced
        }
    }

    /// Exponent pool. Duplicated entries skew the draw.
    pub fn steps(&self) -> &'static [i32] {
        match self {
            ErrorBand::Under => &[-2, -1, -1, 0, 1],
            ErrorBand::Over => &[-1, 0, 1, 1, 2],
            ErrorBand::Balanced => &[-2, 0, -1, 0, 1, 0, 2],
        }
    }
}

/// Error band for a coordinate, in the same units as its recorded error.
pub fn error_bounds(name: &str) -> (f64, f64) {
    if is_translational(name) {
        TRANSLATION_BAND
    } else {
        (
            ROTATION_BAND_DEG.0.to_radians(),
            ROTATION_BAND_DEG.1.to_radians(),
        )
    }
}

/// Multiplicative step base. Coarse for the first half of the budget,
/// finer afterwards.
pub fn resolution_base(iteration: usize, max_iterations: usize) -> f64 {
    if iteration <= max_iterations / 2 {
        1.5
    } else if iteration <= 3 * max_iterations / 4 {
        1.25
    } else {
        1.1
    }
}

/// Error-biased random walk around the current best.
pub struct Perturber {
    rng: Rng,
}

impl Perturber {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = if let Some(s) = seed {
            Rng::with_seed(s)
        } else {
            Rng::new()
        };
        Self { rng }
    }

    /// Proposes a weight vector not in `tested`.
    ///
    /// The whole vector is redrawn on a duplicate. After [`REDRAW_LIMIT`]
    /// draws the steps are doubled; after [`WIDEN_LIMIT`] more, single
    /// coordinates are scaled by growing powers of the base until an
    /// untested vector turns up.
    pub fn propose(
        &mut self,
        best: &WeightVector,
        iteration: usize,
        max_iterations: usize,
        tested: &TestedSolutions,
    ) -> TfResult<WeightVector> {
        let base = resolution_base(iteration, max_iterations);

        for attempt in 0..REDRAW_LIMIT + WIDEN_LIMIT {
            let widen = if attempt < REDRAW_LIMIT { 1 } else { 2 };
            let values = self.draw(best, base, widen);
            if !tested.contains(&values) {
                return with_values(best, &values);
            }
            debug!("Candidate {} already tested, redrawing", attempt + 1);
        }

        warn!(
            "⚠️  No new candidate after {} draws. Escalating deterministically.",
            REDRAW_LIMIT + WIDEN_LIMIT
        );
        // Exponents 1..=n+1 give n+1 distinct vectors per coordinate, so at
        // least one is untested.
        for i in 0..best.len() {
            let w = best.values()[i];
            if !(w.is_finite() && w > 0.0) {
                continue;
            }
            for k in 1..=tested.len() + 1 {
                let mut values = best.values().to_vec();
                values[i] = w * base.powi(k as i32);
                if values[i].is_finite() && !tested.contains(&values) {
                    return with_values(best, &values);
                }
            }
        }

        Err(TrackForgeError::CandidateSpaceExhausted {
            attempts: REDRAW_LIMIT + WIDEN_LIMIT,
        })
    }

    fn draw(&mut self, best: &WeightVector, base: f64, widen: i32) -> Vec<f64> {
        best.names()
            .iter()
            .zip(best.values())
            .zip(best.rms_err())
            .map(|((name, &w), &err)| {
                let band = ErrorBand::classify(err, error_bounds(name));
                let pool = band.steps();
                let step = pool[self.rng.usize(0..pool.len())] * widen;
                w * base.powi(step)
            })
            .collect()
    }
}

fn with_values(best: &WeightVector, values: &[f64]) -> TfResult<WeightVector> {
    let mut candidate = best.clone();
    candidate.set_values(values)?;
    Ok(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weights::NormFactors;
    use proptest::prelude::*;

    fn vector(values: Vec<f64>) -> WeightVector {
        let names = (0..values.len()).map(|i| format!("coord_{}", i)).collect();
        WeightVector::new(names, values, &NormFactors::default()).unwrap()
    }

    #[test]
    fn test_unevaluated_weights_only_move_up_or_stay() {
        // rms_err starts unbounded, which reads as Over
        let best = vector(vec![1.0, 4.0, 10.0]);
        let mut p = Perturber::new(Some(7));
        let tested = TestedSolutions::default();

        for _ in 0..50 {
            let c = p.propose(&best, 1, 10, &tested).unwrap();
            for (new, old) in c.values().iter().zip(best.values()) {
                let step = (new / old).ln() / 1.5f64.ln();
                assert!(step > -1.0 - 1e-9 && step < 2.0 + 1e-9, "step {}", step);
                assert!((step - step.round()).abs() < 1e-9);
            }
        }
    }

    proptest! {
        #[test]
        fn prop_same_seed_same_candidate(seed in any::<u64>()) {
            let best = vector(vec![2.0, 3.0]);
            let tested = TestedSolutions::default();
            let a = Perturber::new(Some(seed)).propose(&best, 3, 10, &tested).unwrap();
            let b = Perturber::new(Some(seed)).propose(&best, 3, 10, &tested).unwrap();
            prop_assert_eq!(a.values(), b.values());
        }
    }
}
