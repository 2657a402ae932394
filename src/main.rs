use clap::{CommandFactory, FromArgMatches, Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use tracing::{error, Level};

mod cmd;
mod reports;

#[derive(Parser, Debug)]
#[command(author, version, about = "Tracking-weight tuner for residual reduction runs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON settings file. Options given on the command line win.
    #[arg(global = true, short = 'c', long = "config", id = "config_file")]
    config_file: Option<PathBuf>,

    #[arg(global = true, long, default_value_t = false)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Optimize the tracking weights of one trial
    Tune(cmd::tune::TuneArgs),
    /// Show the saved progress of a trial
    Report(cmd::report::ReportArgs),
    /// Score one residual / tracking-error file pair
    Score(cmd::score::ScoreArgs),
    /// Peak vertical external force of a ground reaction file
    PeakForce(cmd::peak_force::PeakForceArgs),
}

fn main() {
    let matches = Cli::command().get_matches();
    let cli = Cli::from_arg_matches(&matches).unwrap_or_else(|e| e.exit());

    let level = if cli.debug { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let config_file = cli.config_file.as_deref();
    let result = match cli.command {
        Commands::Tune(args) => {
            let sub = matches.subcommand_matches("tune");
            cmd::resolve_config(&args.config, config_file, sub).and_then(cmd::tune::run)
        }
        Commands::Report(args) => cmd::report::run(args),
        Commands::Score(args) => {
            let sub = matches.subcommand_matches("score");
            cmd::resolve_config(&args.config, config_file, sub)
                .and_then(|config| cmd::score::run(&args, config))
        }
        Commands::PeakForce(args) => cmd::peak_force::run(args),
    };

    if let Err(e) = result {
        error!("❌ {}", e);
        process::exit(1);
    }
}
