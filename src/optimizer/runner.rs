use super::mutation::Perturber;
use super::state::{CheckpointStore, OptimizationState};
use crate::config::TuneParams;
use crate::error::{TfResult, TrackForgeError};
use crate::scorer::{ScoreDetails, Scorer};
use crate::simulator::{RunKind, RunOutcome, Simulator};
use crate::weights::WeightVector;
use tracing::{info, warn};

pub struct OptimizationResult {
    /// Index into history of the selected solution
    pub best_index: usize,
    pub best_weights: WeightVector,
    pub best_cost: f64,
    /// Iterations evaluated (baseline excluded)
    pub iterations: usize,
    pub final_outcome: RunOutcome,
    pub final_details: ScoreDetails,
}

/// Drives the search for one trial: baseline, perturb/evaluate loop and the
/// confirmation run. State is checkpointed after every evaluation.
pub struct Controller<S: Simulator, C: CheckpointStore> {
    params: TuneParams,
    scorer: Scorer,
    initial: WeightVector,
    simulator: S,
    store: C,
    perturber: Perturber,
    last_checkpoint: Option<usize>,
}

impl<S: Simulator, C: CheckpointStore> Controller<S, C> {
    pub fn new(
        params: TuneParams,
        scorer: Scorer,
        initial: WeightVector,
        simulator: S,
        store: C,
    ) -> Self {
        let perturber = Perturber::new(params.seed);
        Self {
            params,
            scorer,
            initial,
            simulator,
            store,
            perturber,
            last_checkpoint: None,
        }
    }

    pub fn simulator(&self) -> &S {
        &self.simulator
    }

    pub fn store(&self) -> &C {
        &self.store
    }

    /// Runs the trial to completion. Any fatal error is wrapped in
    /// [`TrackForgeError::Halted`] with the last iteration safely on disk.
    pub fn run(&mut self) -> TfResult<OptimizationResult> {
        match self.run_to_end() {
            Ok(result) => Ok(result),
            Err(e) => Err(TrackForgeError::Halted {
                last_checkpoint: self.last_checkpoint,
                source: Box::new(e),
            }),
        }
    }

    fn run_to_end(&mut self) -> TfResult<OptimizationResult> {
        let mut state = self.init()?;
        self.iterate(&mut state)?;
        self.finalize(&state)
    }

    /// Loads saved progress, or evaluates the baseline and saves it.
    pub fn init(&mut self) -> TfResult<OptimizationState> {
        if self.params.overwrite {
            self.store.clear()?;
        }

        if let Some(state) = self.store.load()? {
            if state.current_best.names() != self.initial.names() {
                return Err(TrackForgeError::Validation(
                    "Saved progress tracks different coordinates than the task template".to_string(),
                ));
            }
            if state.params != self.params {
                warn!("⚠️  Settings differ from the saved trial. Continuing with the saved settings.");
            }
            self.params = state.params.clone();
            self.scorer = Scorer::new(self.scorer.norms, &self.params);
            self.perturber = Perturber::new(self.params.seed);
            self.last_checkpoint = Some(state.iteration);
            return Ok(state);
        }

        info!("📏 Evaluating baseline weights");
        let mut baseline = self.initial.clone();
        let details = self.evaluate(&mut baseline, RunKind::Baseline)?;
        info!("Baseline objective: {:.4}", details.objective);

        let state = OptimizationState::from_baseline(self.params.clone(), baseline, details);
        self.save(&state)?;
        Ok(state)
    }

    /// Runs iterations until convergence or the iteration cap.
    pub fn iterate(&mut self, state: &mut OptimizationState) -> TfResult<()> {
        let max = state.params.max_iterations;

        while state.iteration < max {
            if state.has_converged() {
                info!(
                    "✅ Converged at iteration {} (best {:.4} < {})",
                    state.iteration,
                    state.min_objective(),
                    state.params.threshold
                );
                return Ok(());
            }

            info!(
                "🔁 Iteration {}/{} | current {:.4} | initial {:.4}",
                state.iteration + 1,
                max,
                state.current_cost,
                state.initial_cost()
            );

            let next = state.iteration + 1;
            let mut candidate =
                self.perturber
                    .propose(&state.current_best, next, max, &state.tested)?;
            let details = self.evaluate(&mut candidate, RunKind::Iteration(next))?;

            info!(
                "   Weights {} -> cost {:.4}",
                format_weights(&candidate),
                details.objective
            );

            if state.record(candidate, details) {
                info!("   ⭐ New best {:.4}", details.objective);
            }
            self.save(state)?;
        }

        info!("Reached the iteration cap ({})", max);
        Ok(())
    }

    /// Picks the best solution in history and runs it once more into the
    /// final results directory.
    pub fn finalize(&mut self, state: &OptimizationState) -> TfResult<OptimizationResult> {
        let best_index = state.best_index();
        let entry = &state.history[best_index];
        let mut best_weights = state.current_best.clone();
        best_weights.set_values(&entry.weights)?;

        info!(
            "🏁 Best solution from iteration {} (cost {:.4})",
            entry.iteration, entry.details.objective
        );

        let final_outcome = self.simulator.run(&best_weights, RunKind::Final)?;
        if let RunOutcome::Failed { reason } = &final_outcome {
            warn!("⚠️  Final run failed: {}", reason);
        }
        let mut confirmed = best_weights.clone();
        let final_details = self.scorer.evaluate(final_outcome.artifacts(), &mut confirmed);

        Ok(OptimizationResult {
            best_index,
            best_weights,
            best_cost: entry.details.objective,
            iterations: state.iteration,
            final_outcome,
            final_details,
        })
    }

    fn evaluate(&mut self, weights: &mut WeightVector, kind: RunKind) -> TfResult<ScoreDetails> {
        let outcome = self.simulator.run(weights, kind)?;
        if let RunOutcome::Failed { reason } = &outcome {
            warn!("⚠️  {} failed: {}. Scoring as +inf.", kind, reason);
        }
        Ok(self.scorer.evaluate(outcome.artifacts(), weights))
    }

    fn save(&mut self, state: &OptimizationState) -> TfResult<()> {
        self.store.save(state)?;
        self.last_checkpoint = Some(state.iteration);
        Ok(())
    }
}

fn format_weights(w: &WeightVector) -> String {
    let parts: Vec<String> = w
        .names()
        .iter()
        .zip(w.values())
        .map(|(n, v)| format!("{}={:.3}", n, v))
        .collect();
    format!("[{}]", parts.join(", "))
}
