//! CLI module for taskrow
//!
//! Provides the command-line interface:
//! - serve: apply migrations and run the HTTP server
//! - migrate: apply migrations against a fresh engine and exit

mod args;
mod commands;
mod errors;

pub use args::{Cli, Command};
pub use errors::{CliError, CliResult};

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;

/// Parse arguments, initialize tracing and dispatch to the chosen command.
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    init_tracing();

    let config = AppConfig::from_env();
    match cli.command {
        Command::Serve => commands::serve(config),
        Command::Migrate => commands::migrate(config),
    }
}

/// Honors RUST_LOG when set, otherwise logs at info.
fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();
}
