//! CLI argument definitions using clap
//!
//! Commands:
//! - taskrow serve
//! - taskrow migrate

use clap::{Parser, Subcommand};

/// Taskrow - a task tracker backed by a wide-column store
#[derive(Parser, Debug)]
#[command(name = "taskrow")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Apply schema migrations and start the HTTP server
    Serve,

    /// Apply schema migrations against a fresh engine and exit
    Migrate,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
