use crate::config::TuneParams;
use crate::error::{TfResult, TrackForgeError};
use crate::scorer::ScoreDetails;
use crate::serde_inf;
use crate::weights::WeightVector;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const STATE_VERSION: u32 = 1;

/// One evaluated iteration, as shown in reports and used for final selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub iteration: usize,
    pub weights: Vec<f64>,
    pub details: ScoreDetails,
}

/// Every weight vector ever sent to the simulator. Membership is exact
/// element-wise equality.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TestedSolutions(Vec<Vec<f64>>);

impl TestedSolutions {
    pub fn contains(&self, values: &[f64]) -> bool {
        self.0.iter().any(|v| v.as_slice() == values)
    }

    /// Returns false (and stores nothing) if `values` is already present.
    pub fn insert(&mut self, values: Vec<f64>) -> bool {
        if self.contains(&values) {
            return false;
        }
        self.0.push(values);
        true
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &[f64]> {
        self.0.iter().map(Vec::as_slice)
    }
}

/// Everything needed to continue a trial's search after a restart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationState {
    pub version: u32,
    pub params: TuneParams,
    pub iteration: usize,
    pub current_best: WeightVector,
    #[serde(with = "serde_inf")]
    pub current_cost: f64,
    pub candidate: WeightVector,
    pub history: Vec<HistoryEntry>,
    pub tested: TestedSolutions,
}

impl OptimizationState {
    /// Fresh state seeded by the iteration 0 evaluation.
    pub fn from_baseline(params: TuneParams, baseline: WeightVector, details: ScoreDetails) -> Self {
        let mut tested = TestedSolutions::default();
        tested.insert(baseline.values().to_vec());
        Self {
            version: STATE_VERSION,
            params,
            iteration: 0,
            current_cost: details.objective,
            history: vec![HistoryEntry {
                iteration: 0,
                weights: baseline.values().to_vec(),
                details,
            }],
            candidate: baseline.clone(),
            current_best: baseline,
            tested,
        }
    }

    /// Books one evaluated candidate as the next iteration. Returns whether
    /// it replaced the current best.
    pub fn record(&mut self, candidate: WeightVector, details: ScoreDetails) -> bool {
        self.iteration += 1;
        self.history.push(HistoryEntry {
            iteration: self.iteration,
            weights: candidate.values().to_vec(),
            details,
        });
        self.tested.insert(candidate.values().to_vec());

        let accepted = details.objective < self.current_cost;
        if accepted {
            self.current_best = candidate.clone();
            self.current_cost = details.objective;
        }
        self.candidate = candidate;
        accepted
    }

    pub fn initial_cost(&self) -> f64 {
        self.history
            .first()
            .map(|h| h.details.objective)
            .unwrap_or(f64::INFINITY)
    }

    pub fn min_objective(&self) -> f64 {
        self.history
            .iter()
            .map(|h| h.details.objective)
            .fold(f64::INFINITY, f64::min)
    }

    /// First index of the lowest objective in history.
    pub fn best_index(&self) -> usize {
        let mut best = 0;
        for (i, h) in self.history.iter().enumerate() {
            if h.details.objective < self.history[best].details.objective {
                best = i;
            }
        }
        best
    }

    pub fn has_converged(&self) -> bool {
        self.iteration >= self.params.min_iterations
            && self.min_objective() < self.params.threshold
    }

    fn check_invariants(&self) -> Result<(), String> {
        self.current_best.check_invariants().map_err(|e| e.to_string())?;
        self.candidate.check_invariants().map_err(|e| e.to_string())?;
        if self.candidate.names() != self.current_best.names() {
            return Err("candidate and best name different coordinates".to_string());
        }
        let n = self.current_best.len();
        let Some(last) = self.history.last() else {
            return Err("history is empty".to_string());
        };
        if last.iteration != self.iteration || self.history.len() != self.iteration + 1 {
            return Err(format!(
                "iteration {} does not match {} history entries",
                self.iteration,
                self.history.len()
            ));
        }
        if self.history.iter().any(|h| h.weights.len() != n) || self.tested.iter().any(|t| t.len() != n) {
            return Err("stored weight vectors have the wrong length".to_string());
        }
        Ok(())
    }
}

/// Durable home of the optimization state between iterations.
pub trait CheckpointStore {
    fn load(&mut self) -> TfResult<Option<OptimizationState>>;
    fn save(&mut self, state: &OptimizationState) -> TfResult<()>;
    fn clear(&mut self) -> TfResult<()>;
}

fn decode(json: &str, origin: &Path) -> TfResult<OptimizationState> {
    let corrupt = |reason: String| TrackForgeError::Checkpoint {
        path: origin.to_path_buf(),
        reason,
    };

    let raw: serde_json::Value = serde_json::from_str(json).map_err(|e| corrupt(e.to_string()))?;
    let found = raw
        .get("version")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| corrupt("missing schema version".to_string()))?;
    if found != STATE_VERSION as u64 {
        return Err(TrackForgeError::CheckpointVersion {
            found: found.min(u32::MAX as u64) as u32,
            expected: STATE_VERSION,
        });
    }

    let state: OptimizationState =
        serde_json::from_value(raw).map_err(|e| corrupt(e.to_string()))?;
    state.check_invariants().map_err(corrupt)?;
    Ok(state)
}

/// JSON checkpoint on disk. Saves go through a temp file and a rename so a
/// crash mid-write leaves the previous checkpoint intact.
#[derive(Debug, Clone)]
pub struct FileCheckpoint {
    path: PathBuf,
}

impl FileCheckpoint {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl CheckpointStore for FileCheckpoint {
    fn load(&mut self) -> TfResult<Option<OptimizationState>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(&self.path)?;
        let state = decode(&json, &self.path)?;
        info!(
            "📂 Resuming from {} at iteration {}",
            self.path.display(),
            state.iteration
        );
        Ok(Some(state))
    }

    fn save(&mut self, state: &OptimizationState) -> TfResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.temp_path();
        fs::write(&tmp, serde_json::to_string_pretty(state)?)?;
        fs::rename(&tmp, &self.path)?;
        debug!("Checkpoint written (iteration {})", state.iteration);
        Ok(())
    }

    fn clear(&mut self) -> TfResult<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
            info!("🗑️  Removed checkpoint {}", self.path.display());
        }
        Ok(())
    }
}

/// Keeps the serialized checkpoint in memory. Goes through the same JSON
/// encoding as [`FileCheckpoint`].
#[derive(Debug, Clone, Default)]
pub struct MemoryCheckpoint {
    json: Option<String>,
    pub saves: usize,
}

impl MemoryCheckpoint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: impl Into<String>) -> Self {
        Self {
            json: Some(json.into()),
            saves: 0,
        }
    }

    pub fn json(&self) -> Option<&str> {
        self.json.as_deref()
    }
}

impl CheckpointStore for MemoryCheckpoint {
    fn load(&mut self) -> TfResult<Option<OptimizationState>> {
        match &self.json {
            Some(json) => decode(json, Path::new("<memory>")).map(Some),
            None => Ok(None),
        }
    }

    fn save(&mut self, state: &OptimizationState) -> TfResult<()> {
        self.json = Some(serde_json::to_string(state)?);
        self.saves += 1;
        Ok(())
    }

    fn clear(&mut self) -> TfResult<()> {
        self.json = None;
        Ok(())
    }
}
