use clap::{CommandFactory, FromArgMatches, Parser};
use std::fs;
use tempfile::TempDir;
use trackforge::config::{Config, ToolSettings, TrialLayout, TuneParams};

#[derive(Parser, Debug)]
struct TestCli {
    #[command(flatten)]
    config: Config,
}

fn parse(args: &[&str]) -> (Config, clap::ArgMatches) {
    let mut argv = vec!["trackforge"];
    argv.extend_from_slice(args);
    let matches = TestCli::command().get_matches_from(argv);
    let cli = TestCli::from_arg_matches(&matches).unwrap();
    (cli.config, matches)
}

#[test]
fn test_defaults() {
    let t = TuneParams::default();
    assert_eq!((t.min_iterations, t.max_iterations), (25, 75));
    assert_eq!(t.threshold, 2.0);
    assert_eq!((t.w_res, t.p_res, t.w_err, t.p_err), (2.0, 3.0, 1.0, 3.0));
    assert!(!t.overwrite);

    // clap defaults agree with Default
    let (cli, _) = parse(&[]);
    assert_eq!(cli.tune, t);
    assert_eq!(cli.norm.mass, 75.0);
    assert_eq!(cli.trial, TrialLayout::default());
    assert_eq!(cli.tool, ToolSettings::default());
}

#[test]
fn test_layout_paths() {
    let trial = TrialLayout {
        trial_path: "/data/S01/walk_1".into(),
        ..Default::default()
    };
    assert_eq!(trial.template_path().to_str(), Some("/data/S01/walk_1/RRA_tasks.xml"));
    assert_eq!(
        trial.checkpoint_path().to_str(),
        Some("/data/S01/walk_1/RRA_optWeights/opt_results.json")
    );
    assert_eq!(trial.final_path().to_str(), Some("/data/S01/walk_1/RRA_Final"));
}

#[test]
fn test_tool_args_split_on_commas() {
    let tool = ToolSettings {
        tool_args: "run-tool, {setup} ,,--verbose".to_string(),
        ..Default::default()
    };
    assert_eq!(tool.get_tool_args(), vec!["run-tool", "{setup}", "--verbose"]);
}

#[test]
fn test_partial_json_fills_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.json");
    fs::write(&path, r#"{ "tune": { "max_iterations": 50 }, "norm": { "mass": 82.5 } }"#).unwrap();

    let cfg = Config::load_from_file(&path).unwrap();
    assert_eq!(cfg.tune.max_iterations, 50);
    assert_eq!(cfg.tune.min_iterations, 25);
    assert_eq!(cfg.norm.mass, 82.5);
    assert_eq!(cfg.trial.opt_dir, "RRA_optWeights");
}

#[test]
fn test_explicit_cli_values_override_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.json");
    fs::write(
        &path,
        r#"{ "tune": { "min_iterations": 5, "max_iterations": 50 }, "norm": { "mass": 60.0 } }"#,
    )
    .unwrap();

    let (cli, matches) = parse(&["--max-iterations", "10", "--residual-norm", "900"]);
    let mut cfg = Config::load_from_file(&path).unwrap();
    cfg.merge_from_cli(&cli, &matches);

    assert_eq!(cfg.tune.max_iterations, 10);
    assert_eq!(cfg.norm.residual_norm, Some(900.0));
    // Untouched on the command line, so the file wins over clap defaults
    assert_eq!(cfg.tune.min_iterations, 5);
    assert_eq!(cfg.norm.mass, 60.0);
}

#[test]
fn test_validation() {
    let mut cfg = Config::default();
    assert!(cfg.validate().is_ok());

    cfg.tune.max_iterations = 3;
    cfg.tune.min_iterations = 4;
    assert!(cfg.validate().is_err());

    let mut cfg = Config::default();
    cfg.norm.mass = 0.0;
    assert!(cfg.validate().is_err());

    let mut cfg = Config::default();
    cfg.norm.residual_norm = Some(-1.0);
    assert!(cfg.validate().is_err());
}

#[test]
fn test_missing_config_file() {
    assert!(Config::load_from_file("/definitely/not/here.json").is_err());
}
