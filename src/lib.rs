//! Course workflow verifier
//!
//! Drives the course-management backend through a teacher/student workflow
//! over HTTP and checks that every step leaves the expected state behind.

pub mod api;
pub mod cli;
pub mod commands;
pub mod common;
pub mod testing;

// Re-export commonly used types for tests
pub use common::{Error, FailureKind, Result};
pub use testing::{Runner, TestScenario};
