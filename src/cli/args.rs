//! CLI argument definitions using clap
//!
//! Commands:
//! - restify serve --config <path> [--host <host>] [--port <port>]
//! - restify routes --config <path> [--json]

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Restify - REST resource APIs generated from model schemas
#[derive(Parser, Debug)]
#[command(name = "restify")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve every configured model over HTTP
    Serve {
        /// Path to configuration file
        #[arg(long, default_value = "./restify.json")]
        config: PathBuf,

        /// Override the configured bind host
        #[arg(long)]
        host: Option<String>,

        /// Override the configured port
        #[arg(long)]
        port: Option<u16>,
    },

    /// Print the generated route table and exit
    Routes {
        /// Path to configuration file
        #[arg(long, default_value = "./restify.json")]
        config: PathBuf,

        /// Print as JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
