use crate::error::{TfResult, TrackForgeError};
use clap::{parser::ValueSource, ArgMatches, Args};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Args, Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    #[command(flatten)]
    pub tune: TuneParams,
    #[command(flatten)]
    pub norm: Normalization,
    #[command(flatten)]
    pub trial: TrialLayout,
    #[command(flatten)]
    pub tool: ToolSettings,
}

/// Stopping rule and cost-function shape. These are frozen into the
/// checkpoint on the first run of a trial.
#[derive(Args, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TuneParams {
    #[arg(long, default_value_t = 25)]
    pub min_iterations: usize,
    #[arg(long, default_value_t = 75)]
    pub max_iterations: usize,
    #[arg(long, default_value_t = 2.0)]
    pub threshold: f64,

    // === COST FUNCTION ===
    #[arg(long, default_value_t = 2.0)]
    pub w_res: f64,
    #[arg(long, default_value_t = 3.0)]
    pub p_res: f64,
    #[arg(long, default_value_t = 1.0)]
    pub w_err: f64,
    #[arg(long, default_value_t = 3.0)]
    pub p_err: f64,

    /// Delete saved progress and restart the trial from iteration 0
    #[arg(long, default_value_t = false)]
    #[serde(skip)]
    pub overwrite: bool,

    #[arg(short = 'S', long)]
    pub seed: Option<u64>,
}

impl Default for TuneParams {
    fn default() -> Self {
        Self {
            min_iterations: 25,
            max_iterations: 75,
            threshold: 2.0,
            w_res: 2.0,
            p_res: 3.0,
            w_err: 1.0,
            p_err: 3.0,
            overwrite: false,
            seed: None,
        }
    }
}

#[derive(Args, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Normalization {
    /// Body mass (kg) used to derive residual normalization
    #[arg(long, default_value_t = 75.0)]
    pub mass: f64,

    /// Peak external force (N). Overrides the 1.3 body-weight estimate.
    #[arg(long)]
    pub residual_norm: Option<f64>,

    #[arg(long, default_value_t = 2.0)]
    pub rotation_norm_deg: f64,
    #[arg(long, default_value_t = 0.02)]
    pub translation_norm: f64,
}

impl Default for Normalization {
    fn default() -> Self {
        Self {
            mass: 75.0,
            residual_norm: None,
            rotation_norm_deg: 2.0,
            translation_norm: 0.02,
        }
    }
}

#[derive(Args, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrialLayout {
    #[arg(long, default_value = ".")]
    pub trial_path: PathBuf,
    #[arg(long, default_value = "RRA_tasks.xml")]
    pub task_template: String,
    #[arg(long, default_value = "RRA_optWeights")]
    pub opt_dir: String,
    #[arg(long, default_value = "RRA_Final")]
    pub final_dir: String,
}

impl Default for TrialLayout {
    fn default() -> Self {
        Self {
            trial_path: PathBuf::from("."),
            task_template: "RRA_tasks.xml".to_string(),
            opt_dir: "RRA_optWeights".to_string(),
            final_dir: "RRA_Final".to_string(),
        }
    }
}

impl TrialLayout {
    pub fn template_path(&self) -> PathBuf {
        self.trial_path.join(&self.task_template)
    }

    pub fn opt_path(&self) -> PathBuf {
        self.trial_path.join(&self.opt_dir)
    }

    pub fn final_path(&self) -> PathBuf {
        self.trial_path.join(&self.final_dir)
    }

    pub fn checkpoint_path(&self) -> PathBuf {
        self.opt_path().join("opt_results.json")
    }
}

#[derive(Args, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolSettings {
    #[arg(long, default_value = "opensim-cmd")]
    pub tool_program: String,

    /// Comma separated. Placeholders: {setup} {tasks} {results} {name}
    #[arg(long, default_value = "run-tool,{setup}")]
    pub tool_args: String,

    /// Setup file copied per run with the same placeholders substituted
    #[arg(long)]
    pub setup_template: Option<PathBuf>,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            tool_program: "opensim-cmd".to_string(),
            tool_args: "run-tool,{setup}".to_string(),
            setup_template: None,
        }
    }
}

impl ToolSettings {
    pub fn get_tool_args(&self) -> Vec<String> {
        self.tool_args
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> TfResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            TrackForgeError::Config(format!("Failed to read config '{}': {}", path.display(), e))
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Overlays every option the user typed explicitly onto `self`.
    pub fn merge_from_cli(&mut self, cli: &Config, matches: &ArgMatches) {
        macro_rules! update_if_present {
            ($group:ident . $field:ident) => {
                if matches.value_source(stringify!($field)) == Some(ValueSource::CommandLine) {
                    self.$group.$field = cli.$group.$field.clone();
                }
            };
        }

        update_if_present!(tune.min_iterations);
        update_if_present!(tune.max_iterations);
        update_if_present!(tune.threshold);
        update_if_present!(tune.w_res);
        update_if_present!(tune.p_res);
        update_if_present!(tune.w_err);
        update_if_present!(tune.p_err);
        update_if_present!(tune.overwrite);
        update_if_present!(tune.seed);

        update_if_present!(norm.mass);
        update_if_present!(norm.residual_norm);
        update_if_present!(norm.rotation_norm_deg);
        update_if_present!(norm.translation_norm);

        update_if_present!(trial.trial_path);
        update_if_present!(trial.task_template);
        update_if_present!(trial.opt_dir);
        update_if_present!(trial.final_dir);

        update_if_present!(tool.tool_program);
        update_if_present!(tool.tool_args);
        update_if_present!(tool.setup_template);
    }

    pub fn validate(&self) -> TfResult<()> {
        let t = &self.tune;
        if t.max_iterations < t.min_iterations {
            return Err(TrackForgeError::Config(format!(
                "max_iterations ({}) must not be below min_iterations ({})",
                t.max_iterations, t.min_iterations
            )));
        }
        if self.norm.mass <= 0.0 {
            return Err(TrackForgeError::Config("mass must be positive".to_string()));
        }
        if let Some(peak) = self.norm.residual_norm {
            if peak <= 0.0 {
                return Err(TrackForgeError::Config(
                    "residual_norm must be positive".to_string(),
                ));
            }
        }
        if self.norm.rotation_norm_deg <= 0.0 || self.norm.translation_norm <= 0.0 {
            return Err(TrackForgeError::Config(
                "error normalization factors must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
