//! CLI module for Restify
//!
//! Provides command-line interface for:
//! - serve: expose every configured model over HTTP
//! - routes: print the generated route table

mod args;
mod commands;
mod errors;
mod io;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

pub use args::{Cli, Command};
pub use commands::{routes, run_command, serve, Config, ModelConfig};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{print_routes, write_routes};

const DEFAULT_LOG_FILTER: &str = "restify=info,tower_http=info";

/// Parse arguments, install logging and run the command
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    init_tracing();
    run_command(cli.command)
}

/// Log to stderr, filtered by `RUST_LOG`
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    // A subscriber may already be installed when embedded; keep it.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}
