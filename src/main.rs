//! Orchestr - Main entry point
//!
//! Parses the command line, wires the terminal console and the built-in
//! action kinds into the command flows and maps their results to exit codes.

use anyhow::{Context, Result};
use std::process::ExitCode;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use orchestr::actions::ActionRegistry;
use orchestr::cli::{Cli, Commands};
use orchestr::commands::{self, InitOptions};
use orchestr::config::Settings;
use orchestr::console::{Console, TerminalConsole};
use orchestr::process_guard::{self, ProcessGuard};

/// Initialize logging on stderr. `RUST_LOG` overrides the default `warn` level.
fn init_logger() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    init_logger();
    info!("Orchestr starting up");

    if let Err(e) = process_guard::init_signal_handlers() {
        // Children are still cleaned up by the guard's Drop
        warn!("Failed to initialize signal handlers: {}", e);
    }
    let _guard = ProcessGuard::new();

    let cli = Cli::parse_args();
    debug!("CLI arguments parsed: {:?}", cli);

    let mut console = TerminalConsole::new();
    match dispatch(cli, &mut console) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!("{:#}", e);
            console.failure(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn dispatch(cli: Cli, console: &mut dyn Console) -> Result<u8> {
    let settings = Settings::resolve(cli.dir);
    let registry = ActionRegistry::with_builtins();

    match cli.command {
        Commands::Run { args } => {
            let (name, tokens) = args
                .split_first()
                .context("Make sure to provide a script name.")?;
            let outcome = commands::run(&settings, &registry, console, name, tokens)
                .with_context(|| format!("Could not run script '{}'", name))?;
            Ok(outcome.exit_code())
        }
        Commands::Validate { script } => {
            let report = commands::validate(&settings, &registry, console, &script)
                .with_context(|| format!("Could not validate script '{}'", script))?;
            Ok(if report.is_valid() { 0 } else { 1 })
        }
        Commands::List => {
            commands::list(&settings, console).context("Could not list scripts")?;
            Ok(0)
        }
        Commands::Init {
            name,
            description,
            args,
            vars,
        } => {
            let options = InitOptions {
                name,
                description,
                args,
                vars,
            };
            commands::init(&settings, console, &options).context("Could not create script")?;
            Ok(0)
        }
    }
}
