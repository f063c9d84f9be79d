//! CLI command handling
//!
//! Dispatches CLI commands and formats their output.

use std::path::Path;

use crate::commands::Commands;
use crate::common::config::Config;
use crate::common::{paths, Result};
use crate::testing::{Runner, TestScenario};

/// Dispatch a CLI command
pub async fn dispatch(command: Commands, config_file: Option<&Path>, verbose: bool) -> Result<()> {
    let config = Config::load(config_file)?;

    match command {
        Commands::Run {
            base_url,
            ready_delay,
            scenario,
        } => {
            let config = config.with_overrides(base_url, ready_delay)?;
            let scenario = match scenario {
                Some(path) => TestScenario::load(&path)?,
                None => TestScenario::default(),
            };

            tracing::info!(base_url = %config.server.base_url, scenario = %scenario.name, "Starting run");
            let report = Runner::new(config, scenario)?.verbose(verbose).run().await?;
            tracing::info!(
                steps = report.steps.len(),
                soft = report.soft_passes(),
                elapsed_ms = report.elapsed.as_millis() as u64,
                "Run completed"
            );
            Ok(())
        }

        Commands::Plan => {
            for (i, step) in crate::testing::plan(&config.checks).iter().enumerate() {
                println!("{:>2}. {}", i + 1, step);
            }
            Ok(())
        }

        Commands::Config => {
            match config_file.map(Path::to_path_buf).or_else(paths::config_path) {
                Some(path) => println!("# {}", path.display()),
                None => println!("# no config directory available"),
            }
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}
