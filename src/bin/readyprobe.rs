//! readyprobe: wait until file descriptors inherited from the shell become
//! readable.
//!
//! ```bash
//! readyprobe                       # wait for stdin
//! readyprobe 0 3 --timeout-ms 500  # stdin or fd 3, give up after 500ms
//! readyprobe --strategy select,poll --json 0
//! ```
//!
//! Exit status: 0 if at least one descriptor is ready, 1 on timeout, 2 on
//! error.

use clap::{ArgAction, Parser};
use readyprobe::config::parse_chain;
use readyprobe::{ProbeConfig, Prober};
use std::os::fd::RawFd;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "readyprobe",
    version,
    about = "Wait until file descriptors become readable",
    long_about = "Waits once for read readiness on the given descriptors, trying the\n\
        event-notification facility, then select(2), then poll(2).\n\n\
        Environment: READYPROBE_STRATEGIES, READYPROBE_SELECT_CAPACITY, RUST_LOG."
)]
struct Cli {
    /// Descriptors to watch
    #[arg(default_value = "0", allow_negative_numbers = true)]
    fds: Vec<RawFd>,

    /// Give up after this many milliseconds (default: wait forever)
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Strategy chain, comma-separated (notify, select, poll)
    #[arg(long)]
    strategy: Option<String>,

    /// Treat descriptors at or above this value as out of range for select
    #[arg(long)]
    select_capacity: Option<usize>,

    /// Load configuration from a TOML file; READYPROBE_* variables and flags
    /// still override it
    #[cfg(feature = "config-file")]
    #[arg(long)]
    config: Option<std::path::PathBuf>,

    /// Print the ready descriptors as a JSON array
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_config(cli: &Cli) -> Result<ProbeConfig, String> {
    #[cfg(feature = "config-file")]
    let mut config = match &cli.config {
        Some(path) => {
            let source = std::fs::read_to_string(path)
                .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
            ProbeConfig::from_toml_str(&source)
                .and_then(ProbeConfig::overlay_env)
                .map_err(|e| e.to_string())?
        }
        None => ProbeConfig::from_env().map_err(|e| e.to_string())?,
    };
    #[cfg(not(feature = "config-file"))]
    let mut config = ProbeConfig::from_env().map_err(|e| e.to_string())?;

    if let Some(chain) = &cli.strategy {
        config.strategies = parse_chain(chain).map_err(|e| e.to_string())?;
    }
    if let Some(capacity) = cli.select_capacity {
        config.select_capacity = capacity;
    }
    Ok(config)
}

fn run(cli: &Cli) -> Result<Vec<RawFd>, String> {
    let config = load_config(cli)?;
    tracing::debug!(strategies = ?config.strategies, fds = ?cli.fds, "probing");
    let prober = Prober::new(config).map_err(|e| e.to_string())?;
    let timeout = cli.timeout_ms.map(Duration::from_millis);
    let ready = prober
        .probe(&cli.fds, timeout)
        .map_err(|e| format!("probe failed: {e}"))?;
    Ok(ready.into_iter().copied().collect())
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    match run(&cli) {
        Ok(ready) => {
            if cli.json {
                println!(
                    "{}",
                    serde_json::to_string(&ready).unwrap_or_else(|_| "[]".to_string())
                );
            } else {
                for fd in &ready {
                    println!("{fd}");
                }
            }
            if ready.is_empty() {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(msg) => {
            eprintln!("Error: {msg}");
            ExitCode::from(2)
        }
    }
}
