//! Client side of the course-management HTTP API

pub mod client;
pub mod envelope;
pub mod protocol;

pub use client::{ApiClient, Request, Response};
pub use envelope::Envelope;
