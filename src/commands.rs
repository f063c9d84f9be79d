//! CLI command definitions
//!
//! Defines the clap commands for the verifier CLI.

use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Run the workflow against the service
    Run {
        /// Base URL of the service API (overrides the config file)
        #[arg(long)]
        base_url: Option<String>,

        /// Seconds to wait before the first request (overrides the config file)
        #[arg(long)]
        ready_delay: Option<u64>,

        /// YAML file with scenario data (default: built-in scenario)
        #[arg(long)]
        scenario: Option<PathBuf>,
    },

    /// Print the ordered step list without contacting the service
    Plan,

    /// Show the effective configuration
    Config,
}
