mod cli;
mod output;

use std::io::{self, Write};
use std::process::ExitCode;

use clap::Parser;
use cli::Cli;
use output::LazyFile;
use synthe_core::{EngineKind, FrontEnd, Outcome, SyntheConfig};
use synthe_engine::{CommandEngine, LibraryEngine};
use tracing::{debug, error, info};

/// Exit status for anything that fails before or around synthesis
/// (config, engine setup, input policy, output I/O).
const SETUP_FAILURE_EXIT: u8 = 1;

fn main() -> ExitCode {
    // Logging / tracing (silent unless SYNTHE_LOG is set)
    synthe_core::telemetry::init_tracing();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(outcome) => {
            debug!(target: "synthe", ?outcome, "Finished");
            ExitCode::from(outcome.exit_code())
        }
        Err(e) => {
            error!(target: "synthe", error = %e, "Invocation failed");
            eprintln!("synthe: {}", e);
            ExitCode::from(SETUP_FAILURE_EXIT)
        }
    }
}

fn run(cli: &Cli) -> synthe_core::Result<Outcome> {
    // Defaults + env + optional TOML, then flags
    let mut cfg = SyntheConfig::load(cli.config.as_deref())?;
    cli.apply(&mut cfg);

    if cli.print_config {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        serde_json::to_writer_pretty(&mut out, &cfg)?;
        writeln!(out)?;
        return Ok(Outcome::Empty);
    }

    let speed = cfg.resolve_speed(cli.speed.as_deref())?;
    let frontend = FrontEnd::new(cfg.overflow_policy);
    info!(target: "synthe", engine = ?cfg.engine, speed = speed.value(), "Starting");

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let stderr = io::stderr();
    let mut err = stderr.lock();
    let mut out: Box<dyn Write> = match &cli.output {
        Some(path) => Box::new(LazyFile::new(path.clone())),
        None => Box::new(io::stdout().lock()),
    };

    match cfg.engine {
        EngineKind::Library => frontend.run(
            &mut input,
            speed,
            || {
                let path = cfg.library_path()?;
                Ok(LibraryEngine::load(&path, &cfg.library)?)
            },
            &mut out,
            &mut err,
        ),
        EngineKind::Command => frontend.run(
            &mut input,
            speed,
            || Ok(CommandEngine::new(&cfg.command)?),
            &mut out,
            &mut err,
        ),
    }
}
