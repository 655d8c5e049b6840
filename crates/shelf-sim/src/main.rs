//! Binary entrypoint for the shelf session simulator.
use std::{
    io::{self, Write},
    path::{Path, PathBuf},
    process,
};

use clap::{Parser, Subcommand};
use logging::LogArgs;
use shelf_engine::EngineCfg;
use tokio::runtime::Builder;
use tracing::{debug, info};

mod error;
mod runner;
mod scenario;

use crate::{
    error::{Error, Result, print_hints},
    runner::Runner,
    scenario::Scenario,
};

/// Command-line interface for the `shelf-sim` binary.
#[derive(Parser, Debug)]
#[command(
    name = "shelf-sim",
    about = "Replay scripted shelf editing sessions against an in-memory store",
    version
)]
struct Cli {
    /// Logging controls
    #[command(flatten)]
    log: LogArgs,

    /// Which subcommand to run
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
/// Top-level CLI subcommands.
enum Command {
    /// Run a scenario and print one JSON report line per commit, refresh and show step.
    Run {
        /// Scenario file (RON)
        path: PathBuf,

        /// Engine configuration file (RON); overrides the scenario's `config`
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Exit with status 3 when any write failed
        #[arg(long)]
        strict: bool,
    },
    /// Parse a scenario and exit.
    Check {
        /// Scenario file (RON)
        path: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    logging::init(&cli.log);
    process::exit(exit_code(execute(cli.command)));
}

/// Map a command outcome to the process exit code, reporting errors on stderr.
fn exit_code(outcome: Result<i32>) -> i32 {
    match outcome {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            print_hints(&e);
            1
        }
    }
}

/// Load a scenario, letting an engine config file replace its `config`.
fn prepare(path: &Path, config: Option<&Path>) -> Result<Scenario> {
    let mut scenario = Scenario::load(path)?;
    if let Some(cfg_path) = config {
        debug!(path = %cfg_path.display(), "loading engine config");
        scenario.config = Some(EngineCfg::load(cfg_path)?);
    }
    Ok(scenario)
}

/// Run the selected subcommand, returning the process exit code.
fn execute(command: Command) -> Result<i32> {
    match command {
        Command::Check { path } => {
            let scenario = Scenario::load(&path)?;
            println!("OK: {} steps", scenario.steps.len());
            Ok(0)
        }
        Command::Run {
            path,
            config,
            strict,
        } => {
            let scenario = prepare(&path, config.as_deref())?;
            let rt = Builder::new_current_thread().enable_all().build()?;
            let summary = rt.block_on(async {
                let mut runner = Runner::new(&scenario)?;
                let stdout = io::stdout();
                let mut out = stdout.lock();
                let summary = runner.run(&scenario.steps, &mut out).await?;
                out.flush()?;
                Ok::<_, Error>(summary)
            })?;
            info!(?summary, "scenario finished");
            Ok(if strict && summary.failed > 0 { 3 } else { 0 })
        }
    }
}
