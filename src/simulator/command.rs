use super::{RunKind, RunOutcome, Simulator, TaskSet};
use crate::config::{ToolSettings, TrialLayout};
use crate::error::{TfResult, TrackForgeError};
use crate::scorer::ResultArtifacts;
use crate::weights::WeightVector;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, error, info, warn};

const SETUP_PLACEHOLDER: &str = "{setup}";

/// Runs a user-configured command line once per evaluation.
///
/// Per run: the task set is written to `<opt>/Tasks/`, an optional setup
/// file is rendered to `<opt>/`, and the program is started inside the
/// results directory and waited on.
pub struct CommandSimulator {
    template: TaskSet,
    program: String,
    args: Vec<String>,
    setup_template: Option<String>,
    opt_path: PathBuf,
    final_path: PathBuf,
}

impl CommandSimulator {
    pub fn new(template: TaskSet, trial: &TrialLayout, tool: &ToolSettings) -> TfResult<Self> {
        let args = tool.get_tool_args();
        if tool.tool_program.trim().is_empty() {
            return Err(TrackForgeError::Config("tool_program is empty".to_string()));
        }

        let setup_template = match &tool.setup_template {
            Some(path) => Some(fs::read_to_string(path).map_err(|e| {
                TrackForgeError::Config(format!(
                    "Could not read setup template '{}': {}",
                    path.display(),
                    e
                ))
            })?),
            None => None,
        };
        if setup_template.is_none() && args.iter().any(|a| a.contains(SETUP_PLACEHOLDER)) {
            return Err(TrackForgeError::Config(format!(
                "tool_args reference {} but no setup_template is configured",
                SETUP_PLACEHOLDER
            )));
        }

        let sim = Self {
            template,
            program: tool.tool_program.clone(),
            args,
            setup_template,
            opt_path: trial.opt_path(),
            final_path: trial.final_path(),
        };
        sim.prepare_dirs()?;
        Ok(sim)
    }

    fn prepare_dirs(&self) -> TfResult<()> {
        fs::create_dir_all(self.opt_path.join("Tasks"))?;
        fs::create_dir_all(self.opt_path.join("Results"))?;
        fs::create_dir_all(&self.final_path)?;
        Ok(())
    }

    pub fn results_dir(&self, kind: RunKind) -> PathBuf {
        match kind {
            RunKind::Final => self.final_path.clone(),
            _ => self.opt_path.join("Results"),
        }
    }

    pub fn tasks_path(&self, kind: RunKind) -> PathBuf {
        self.opt_path.join("Tasks").join(kind.tasks_file_name())
    }

    fn render_setup(&self, kind: RunKind, vars: &Placeholders) -> TfResult<Option<PathBuf>> {
        let Some(template) = &self.setup_template else {
            return Ok(None);
        };
        let path = self.opt_path.join(kind.setup_file_name());
        fs::write(&path, vars.substitute(template))?;
        Ok(Some(path))
    }
}

impl Simulator for CommandSimulator {
    fn run(&mut self, weights: &WeightVector, kind: RunKind) -> TfResult<RunOutcome> {
        let tasks_path = self.tasks_path(kind);
        self.template.write(weights, &tasks_path)?;

        let results_dir = self.results_dir(kind);
        fs::create_dir_all(&results_dir)?;

        // Results from an earlier run under the same name must not be
        // mistaken for this run's output.
        let artifacts = ResultArtifacts::for_run(&results_dir, kind.run_name());
        remove_if_present(&artifacts.residuals)?;
        remove_if_present(&artifacts.errors)?;

        let mut vars = Placeholders {
            setup: None,
            tasks: tasks_path,
            results: results_dir.clone(),
            name: kind.run_name().to_string(),
        };
        vars.setup = self.render_setup(kind, &vars)?;

        let args: Vec<String> = self.args.iter().map(|a| vars.substitute(a)).collect();
        info!("🏃 Running {} : {} {}", kind, self.program, args.join(" "));

        let output = match Command::new(&self.program)
            .args(&args)
            .current_dir(&results_dir)
            .output()
        {
            Ok(o) => o,
            Err(e) => {
                error!("❌ Could not start '{}': {}", self.program, e);
                return Ok(RunOutcome::Failed {
                    reason: format!("spawn failed: {}", e),
                });
            }
        };

        let log_path = results_dir.join(format!("{}.log", kind.run_name()));
        let mut log = output.stdout.clone();
        log.extend_from_slice(&output.stderr);
        if let Err(e) = fs::write(&log_path, log) {
            warn!("Could not save tool output to {}: {}", log_path.display(), e);
        }

        if !output.status.success() {
            return Ok(RunOutcome::Failed {
                reason: format!("tool exited with {}", output.status),
            });
        }
        if !artifacts.exist() {
            return Ok(RunOutcome::Failed {
                reason: "tool finished without writing results".to_string(),
            });
        }

        debug!("Results ready in {}", results_dir.display());
        Ok(RunOutcome::Completed(artifacts))
    }
}

struct Placeholders {
    setup: Option<PathBuf>,
    tasks: PathBuf,
    results: PathBuf,
    name: String,
}

impl Placeholders {
    fn substitute(&self, s: &str) -> String {
        let mut out = s
            .replace("{tasks}", &self.tasks.to_string_lossy())
            .replace("{results}", &self.results.to_string_lossy())
            .replace("{name}", &self.name);
        if let Some(setup) = &self.setup {
            out = out.replace(SETUP_PLACEHOLDER, &setup.to_string_lossy());
        }
        out
    }
}

fn remove_if_present(path: &Path) -> TfResult<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
