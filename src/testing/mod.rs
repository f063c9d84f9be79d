//! Workflow runner
//!
//! Executes the course workflow against a running service, threading ids
//! and tokens from step to step, and stops at the first unmet condition.

mod config;
mod conflict;
mod runner;

pub use config::*;
pub use conflict::BenignConflict;
pub use runner::{plan, RunReport, Runner, Step, StepOutcome, StepRecord};
