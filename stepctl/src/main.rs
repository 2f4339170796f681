//! # stepctl Binary
//!
//! Drives one stepper axis from integer commands, one per input line.
//!
//! # Usage
//!
//! ```bash
//! # Commands from stdin, simulation driver, default configuration
//! echo -e "100\n-2\n100" | stepctl
//!
//! # Commands from a file with a configuration file
//! stepctl --config /etc/stepctl/stepctl.toml --input commands.txt
//!
//! # Verbose logging (driver telemetry) in JSON
//! stepctl -v --json
//! ```
//!
//! Exit codes: 0 at end of input, 1 on any fatal error, 130 on Ctrl-C.

use clap::Parser;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use stepctl::dispatcher::CommandDispatcher;
use stepctl::driver_registry::DriverRegistry;
use stepctl::error::ControlError;
use stepctl::events::TracingEvents;
use stepctl_common::command::CommandKind;
use stepctl_common::config::{ConfigError, ControllerConfig, LogLevel};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

/// Longest wait for an in-flight move when a shutdown signal arrives.
const SIGNAL_TEARDOWN_WAIT: Duration = Duration::from_secs(5);

/// stepctl - single-axis stepper command controller
#[derive(Parser, Debug)]
#[command(name = "stepctl")]
#[command(version)]
#[command(about = "Single-axis stepper controller driven by integer commands")]
#[command(long_about = None)]
struct Args {
    /// Path to configuration file (stepctl.toml). Built-in defaults when omitted.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Read commands from FILE instead of stdin
    #[arg(short, long, value_name = "FILE")]
    input: Option<PathBuf>,

    /// Driver to load (overrides the config file)
    #[arg(short, long)]
    driver: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json: bool,
}

/// Set by the signal handler before it releases the motor.
static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// Process exit status once the command loop is over.
///
/// After a shutdown signal every outcome maps to 130: the handler has
/// closed the controller, so a failing command is the expected fallout.
fn exit_status(result: &Result<(), ControlError>, interrupted: bool) -> i32 {
    match (interrupted, result) {
        (true, _) => 130,
        (false, Ok(())) => 0,
        (false, Err(_)) => 1,
    }
}

fn main() {
    let result = run();
    let interrupted = INTERRUPTED.load(Ordering::SeqCst);
    if let Err(e) = &result {
        if interrupted {
            debug!("Command loop ended after shutdown signal: {}", e);
        } else {
            error!("Fatal error {}: {}", e.code(), e);
            error!("Exiting...");
        }
    }
    std::process::exit(exit_status(&result, interrupted));
}

fn run() -> Result<(), ControlError> {
    let args = Args::parse();

    let loaded = load_config(&args);
    let log_level = loaded
        .as_ref()
        .map(|c| c.shared.log_level)
        .unwrap_or_default();
    setup_tracing(&args, log_level);

    let config = loaded?;
    info!(
        "{} v{} starting...",
        config.shared.service_name,
        env!("CARGO_PKG_VERSION")
    );
    if let Ok(dump) = toml::to_string(&config) {
        debug!("Effective configuration:\n{}", dump);
    }

    let registry = DriverRegistry::with_builtin();
    debug!("Available drivers: {:?}", registry.list_drivers());
    let mut dispatcher = CommandDispatcher::init(&registry, &config, Arc::new(TracingEvents))?;

    let controller = dispatcher.controller();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        INTERRUPTED.store(true, Ordering::SeqCst);
        match controller.try_shutdown_for(SIGNAL_TEARDOWN_WAIT) {
            Ok(true) => {}
            Ok(false) => warn!("Move still in flight, exiting without releasing the motor"),
            Err(e) => error!("Teardown failed ({}): {}", e.code(), e),
        }
        std::process::exit(130);
    }) {
        warn!("Unable to install shutdown handler: {}", e);
    }

    let result = dispatcher.run(open_input(&args)?);

    if let Err(e) = dispatcher.teardown() {
        warn!("Teardown incomplete: {}", e);
    }

    let summary = result?;
    info!(
        "Handled {} commands ({} moves, {} resets, {} noise)",
        summary.total(),
        summary.count(CommandKind::MoveTo),
        summary.count(CommandKind::Reset),
        summary.count(CommandKind::MakeNoise)
    );
    info!("stepctl shutdown complete");
    Ok(())
}

/// Load the configuration file, or defaults when none is given.
fn load_config(args: &Args) -> Result<ControllerConfig, ConfigError> {
    let mut config = match &args.config {
        Some(path) => ControllerConfig::load_validated(path)?,
        None => ControllerConfig::default(),
    };
    if let Some(driver) = &args.driver {
        config.driver.name = driver.clone();
        config.validate()?;
    }
    Ok(config)
}

/// Command source: `--input` file or stdin.
fn open_input(args: &Args) -> Result<Box<dyn BufRead>, ControlError> {
    match &args.input {
        Some(path) => {
            info!("Reading commands from {:?}", path);
            Ok(Box::new(BufReader::new(File::open(path)?)))
        }
        None => Ok(Box::new(io::stdin().lock())),
    }
}

/// Setup tracing subscriber based on CLI arguments and configured level.
fn setup_tracing(args: &Args, level: LogLevel) {
    let level = if args.verbose { LogLevel::Debug } else { level };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
