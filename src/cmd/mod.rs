pub mod peak_force;
pub mod report;
pub mod score;
pub mod tune;

use clap::ArgMatches;
use std::path::Path;
use tracing::info;
use trackforge::config::Config;
use trackforge::TfResult;

/// Settings for a subcommand: the JSON file (if any) as the base, with
/// explicitly typed options layered on top.
pub fn resolve_config(
    cli: &Config,
    file: Option<&Path>,
    matches: Option<&ArgMatches>,
) -> TfResult<Config> {
    let config = match file {
        Some(path) => {
            info!("⚙️  Loading settings from {}", path.display());
            let mut base = Config::load_from_file(path)?;
            if let Some(m) = matches {
                base.merge_from_cli(cli, m);
            }
            base
        }
        None => cli.clone(),
    };
    config.validate()?;
    Ok(config)
}
