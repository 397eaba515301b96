//! # ccon — minimal Open Container Specification runtime.
//!
//! Reads a JSON container configuration, launches the container process
//! inside the configured namespaces, runs lifecycle hooks, and exits with
//! the container's status.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use ccon_common::config::Config;
use ccon_common::constants::{APP_NAME, DEFAULT_CONFIG_PATH, VERSION};

/// Launch a container process inside a fresh set of Linux namespaces.
#[derive(Parser, Debug)]
#[command(name = "ccon", disable_version_flag = true, about, long_about = None)]
struct Cli {
    /// Override config.json with an alternate path.
    #[arg(short = 'c', long, value_name = "PATH", default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    /// Specify the config JSON on the command line, overriding --config and
    /// its PATH.
    #[arg(short = 's', long, value_name = "JSON")]
    config_string: Option<String>,

    /// Enable debug logging to stderr.
    #[arg(short = 'V', long)]
    verbose: bool,

    /// Print version information and exit.
    #[arg(short = 'v', long)]
    version: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.version {
        println!("{APP_NAME} {VERSION}");
        return ExitCode::SUCCESS;
    }

    init_logging(cli.verbose);

    match run(&cli) {
        Ok(status) => ExitCode::from(u8::try_from(status).unwrap_or(1)),
        Err(err) => {
            tracing::error!(error = %err, "container run failed");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<i32> {
    let config = match &cli.config_string {
        Some(json) => Config::from_json(json)?,
        None => Config::load(Path::new(&cli.config))?,
    };
    config.validate()?;
    Ok(ccon_runtime::host::run(&config)?)
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}
