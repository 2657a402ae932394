#![cfg(unix)]

use std::fs;
use std::path::Path;
use tempfile::TempDir;
use trackforge::config::{ToolSettings, TrialLayout};
use trackforge::simulator::{CommandSimulator, RunKind, RunOutcome, Simulator, TaskSet};
use trackforge::weights::NormFactors;
use trackforge::TrackForgeError;

const TEMPLATE: &str = r#"<CMC_TaskSet name="t"><objects>
<CMC_Joint name="pelvis_tx"><weight>5 1 1</weight></CMC_Joint>
<CMC_Joint name="knee_angle_r"><weight>10 1 1</weight></CMC_Joint>
</objects></CMC_TaskSet>"#;

const RESULTS: &str = "x\nendheader\ntime\tFX\n0\t1\n";

fn layout(dir: &Path) -> TrialLayout {
    TrialLayout {
        trial_path: dir.to_path_buf(),
        ..Default::default()
    }
}

/// `sh -c <script>` as the tool. Scripts must not contain commas.
fn shell(script: &str) -> ToolSettings {
    ToolSettings {
        tool_program: "sh".to_string(),
        tool_args: format!("-c,{}", script),
        setup_template: None,
    }
}

fn writes_results() -> ToolSettings {
    shell(&format!(
        "printf '{r}' > {{name}}_Actuation_force.sto; printf '{r}' > {{name}}_pErr.sto",
        r = RESULTS.replace('\n', "\\n").replace('\t', "\\t")
    ))
}

fn template() -> TaskSet {
    TaskSet::parse(TEMPLATE.to_string()).unwrap()
}

#[test]
fn test_successful_run_locates_results() {
    let dir = TempDir::new().unwrap();
    let trial = layout(dir.path());
    let mut sim = CommandSimulator::new(template(), &trial, &writes_results()).unwrap();
    let mut w = template().initial_weights(&NormFactors::default()).unwrap();
    w.set("knee_angle_r", 12.5).unwrap();

    let outcome = sim.run(&w, RunKind::Iteration(3)).unwrap();
    let artifacts = outcome.artifacts().expect("run should complete").clone();
    assert_eq!(
        artifacts.errors,
        trial.opt_path().join("Results").join("optItr_pErr.sto")
    );

    let tasks = fs::read_to_string(trial.opt_path().join("Tasks").join("optItr_3_Tasks.xml")).unwrap();
    assert!(tasks.contains("<weight>12.5 1 1</weight>"));
    // Tool output is kept next to the results
    assert!(trial.opt_path().join("Results").join("optItr.log").exists());
}

#[test]
fn test_final_run_writes_to_final_dir() {
    let dir = TempDir::new().unwrap();
    let trial = layout(dir.path());
    let mut sim = CommandSimulator::new(template(), &trial, &writes_results()).unwrap();
    let w = template().initial_weights(&NormFactors::default()).unwrap();

    let outcome = sim.run(&w, RunKind::Final).unwrap();
    let a = outcome.artifacts().unwrap();
    assert_eq!(a.residuals, trial.final_path().join("RRA_Actuation_force.sto"));
    assert!(trial.opt_path().join("Tasks").join("RRA_Final_Tasks.xml").exists());
}

#[test]
fn test_stale_results_are_not_reused() {
    let dir = TempDir::new().unwrap();
    let trial = layout(dir.path());
    let mut sim = CommandSimulator::new(template(), &trial, &shell("true")).unwrap();
    let results = trial.opt_path().join("Results");
    fs::write(results.join("optItr_Actuation_force.sto"), RESULTS).unwrap();
    fs::write(results.join("optItr_pErr.sto"), RESULTS).unwrap();

    let w = template().initial_weights(&NormFactors::default()).unwrap();
    let outcome = sim.run(&w, RunKind::Iteration(2)).unwrap();
    assert!(matches!(outcome, RunOutcome::Failed { .. }));
    assert!(!results.join("optItr_pErr.sto").exists());
}

#[test]
fn test_non_zero_exit_fails_the_run() {
    let dir = TempDir::new().unwrap();
    let trial = layout(dir.path());
    let script = format!("{}; exit 3", writes_results().tool_args.trim_start_matches("-c,"));
    let mut sim = CommandSimulator::new(template(), &trial, &shell(&script)).unwrap();
    let w = template().initial_weights(&NormFactors::default()).unwrap();

    match sim.run(&w, RunKind::Baseline).unwrap() {
        RunOutcome::Failed { reason } => assert!(reason.contains("exit")),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_missing_program_fails_the_run() {
    let dir = TempDir::new().unwrap();
    let trial = layout(dir.path());
    let tool = ToolSettings {
        tool_program: "trackforge-no-such-tool".to_string(),
        tool_args: "{tasks}".to_string(),
        setup_template: None,
    };
    let mut sim = CommandSimulator::new(template(), &trial, &tool).unwrap();
    let w = template().initial_weights(&NormFactors::default()).unwrap();
    assert!(matches!(
        sim.run(&w, RunKind::Baseline).unwrap(),
        RunOutcome::Failed { .. }
    ));
}

#[test]
fn test_placeholders_and_setup_template() {
    let dir = TempDir::new().unwrap();
    let trial = layout(dir.path());
    let setup_path = dir.path().join("setup_template.xml");
    fs::write(&setup_path, "<RRATool name=\"{name}\"><tasks>{tasks}</tasks><dir>{results}</dir></RRATool>").unwrap();

    let tool = ToolSettings {
        tool_program: "sh".to_string(),
        tool_args: "-c,cp {setup} used_setup.xml".to_string(),
        setup_template: Some(setup_path),
    };
    let mut sim = CommandSimulator::new(template(), &trial, &tool).unwrap();
    let w = template().initial_weights(&NormFactors::default()).unwrap();
    sim.run(&w, RunKind::Iteration(1)).unwrap();

    let rendered = fs::read_to_string(trial.opt_path().join("optItr_1_Setup.xml")).unwrap();
    assert!(rendered.contains("name=\"optItr\""));
    assert!(rendered.contains("optItr_1_Tasks.xml"));
    assert!(rendered.contains("Results"));
    let copied = fs::read_to_string(trial.opt_path().join("Results").join("used_setup.xml")).unwrap();
    assert_eq!(copied, rendered);
}

#[test]
fn test_setup_placeholder_needs_template() {
    let dir = TempDir::new().unwrap();
    let err = CommandSimulator::new(template(), &layout(dir.path()), &ToolSettings::default())
        .err()
        .unwrap();
    assert!(matches!(err, TrackForgeError::Config(_)));
}
