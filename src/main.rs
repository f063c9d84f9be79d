//! Course workflow verifier
//!
//! Runs the teacher/student course workflow against a live service and exits
//! non-zero at the first step that does not behave as expected.

use std::path::PathBuf;

use clap::Parser;
use colored::Colorize;
use course_verify::commands::Commands;
use course_verify::{cli, common::logging};

#[derive(Parser)]
#[command(name = "course-verify", about = "End-to-end verifier for the course-management backend")]
#[command(version, long_about = None)]
struct Cli {
    /// Configuration file (default: platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print step details and debug logs
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    logging::init_cli(cli.verbose);

    if let Err(e) = cli::dispatch(cli.command, cli.config.as_deref(), cli.verbose).await {
        eprintln!("{} [{} failure] {e}", "Error:".red().bold(), e.kind());
        std::process::exit(1);
    }
}
