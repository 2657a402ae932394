use crate::error::{TfResult, TrackForgeError};
use crate::serde_inf;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Coordinates whose tracking error is a distance (m) rather than an angle.
pub const TRANSLATIONAL_COORDS: [&str; 3] = ["pelvis_tx", "pelvis_ty", "pelvis_tz"];

pub fn is_translational(name: &str) -> bool {
    TRANSLATIONAL_COORDS.contains(&name)
}

/// Per-coordinate RMS error normalization constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormFactors {
    pub translation: f64,
    /// Radians
    pub rotation: f64,
}

impl Default for NormFactors {
    fn default() -> Self {
        Self {
            translation: 0.02,
            rotation: 2.0_f64.to_radians(),
        }
    }
}

impl NormFactors {
    pub fn from_config(norm: &crate::config::Normalization) -> Self {
        Self {
            translation: norm.translation_norm,
            rotation: norm.rotation_norm_deg.to_radians(),
        }
    }

    pub fn for_coord(&self, name: &str) -> f64 {
        if is_translational(name) {
            self.translation
        } else {
            self.rotation
        }
    }
}

/// Ordered tracking weights for one candidate solution.
///
/// The four per-coordinate sequences are index-aligned and never change
/// length after construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightVector {
    names: Vec<String>,
    values: Vec<f64>,
    #[serde(with = "serde_inf::vec")]
    rms_err: Vec<f64>,
    rms_norm_factor: Vec<f64>,
}

impl WeightVector {
    pub fn new(names: Vec<String>, values: Vec<f64>, norm: &NormFactors) -> TfResult<Self> {
        if names.is_empty() {
            return Err(TrackForgeError::Validation(
                "Weight set has 0 coordinates".to_string(),
            ));
        }
        if names.len() != values.len() {
            return Err(TrackForgeError::Validation(format!(
                "{} coordinate names but {} weights",
                names.len(),
                values.len()
            )));
        }
        let mut seen = HashSet::new();
        for n in &names {
            if !seen.insert(n.as_str()) {
                return Err(TrackForgeError::Validation(format!(
                    "Duplicate coordinate '{}'",
                    n
                )));
            }
        }

        let rms_norm_factor = names.iter().map(|n| norm.for_coord(n)).collect();
        let rms_err = vec![f64::INFINITY; names.len()];

        Ok(Self {
            names,
            values,
            rms_err,
            rms_norm_factor,
        })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn rms_err(&self) -> &[f64] {
        &self.rms_err
    }

    pub fn rms_norm_factor(&self) -> &[f64] {
        &self.rms_norm_factor
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.index_of(name).map(|i| self.values[i])
    }

    pub fn set(&mut self, name: &str, value: f64) -> TfResult<()> {
        let idx = self.index_of(name).ok_or_else(|| {
            TrackForgeError::Validation(format!("Unknown coordinate '{}'", name))
        })?;
        self.values[idx] = value;
        Ok(())
    }

    pub fn set_at(&mut self, idx: usize, value: f64) -> TfResult<()> {
        let len = self.values.len();
        let slot = self.values.get_mut(idx).ok_or_else(|| {
            TrackForgeError::Validation(format!("Index {} out of range for {} weights", idx, len))
        })?;
        *slot = value;
        Ok(())
    }

    /// Replaces every weight at once. Names and error bookkeeping stay put.
    pub fn set_values(&mut self, values: &[f64]) -> TfResult<()> {
        if values.len() != self.values.len() {
            return Err(TrackForgeError::Validation(format!(
                "Expected {} weights, got {}",
                self.values.len(),
                values.len()
            )));
        }
        self.values.copy_from_slice(values);
        Ok(())
    }

    pub(crate) fn record_rms_err(&mut self, idx: usize, rms: f64) {
        self.rms_err[idx] = rms;
    }

    pub(crate) fn mark_unbounded(&mut self) {
        self.rms_err.iter_mut().for_each(|e| *e = f64::INFINITY);
    }

    /// Exact element-wise comparison of weights, used for duplicate detection.
    pub fn same_values(&self, other: &[f64]) -> bool {
        self.values.as_slice() == other
    }

    /// Checkpoints are data from disk; the constructor invariants are
    /// re-checked after deserialization.
    pub(crate) fn check_invariants(&self) -> TfResult<()> {
        let n = self.names.len();
        if n == 0
            || self.values.len() != n
            || self.rms_err.len() != n
            || self.rms_norm_factor.len() != n
        {
            return Err(TrackForgeError::Validation(
                "Weight vector sequences are misaligned".to_string(),
            ));
        }
        Ok(())
    }
}

/// Two weight vectors are the same candidate when their values match exactly.
impl PartialEq for WeightVector {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values
    }
}
