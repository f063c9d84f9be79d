//! Error types for the workflow verifier
//!
//! Every variant belongs to exactly one [`FailureKind`]. The runner never
//! recovers from any of them: the first error ends the run.

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse failure classification reported for every aborted run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Connection, timeout or an undecodable response body
    Transport,
    /// The service answered, but refused the operation
    BusinessRule,
    /// The service accepted the operation, but a checked value is wrong
    Assertion,
    /// Local configuration or scenario problems
    Setup,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FailureKind::Transport => "transport",
            FailureKind::BusinessRule => "business rule",
            FailureKind::Assertion => "assertion",
            FailureKind::Setup => "setup",
        };
        f.write_str(name)
    }
}

/// Main error type for the verifier
#[derive(Error, Debug)]
pub enum Error {
    // === Transport Errors ===
    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Invalid URL '{0}'")]
    InvalidUrl(String),

    #[error("Could not decode {context}: {reason}")]
    Decode { context: String, reason: String },

    // === Business Rule Errors ===
    #[error("{operation} rejected (HTTP {status}, code {code}): {message}")]
    Rejected {
        operation: String,
        status: u16,
        code: String,
        message: String,
    },

    // === Assertion Errors ===
    #[error("{what}: expected {expected}, got {actual}")]
    Mismatch {
        what: String,
        expected: String,
        actual: String,
    },

    #[error("Test assertion failed: {0}")]
    TestAssertion(String),

    // === Run Errors ===
    #[error("No {0} available from an earlier step")]
    MissingBinding(&'static str),

    #[error("Step {number} ({step}) failed: {source}")]
    StepFailed {
        number: usize,
        step: String,
        #[source]
        source: Box<Error>,
    },

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    #[error("Invalid scenario file: {0}")]
    ScenarioParse(String),

    // === IO Errors ===
    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a transport error for a request to `url`
    pub fn transport(url: &str, source: reqwest::Error) -> Self {
        Self::Transport {
            url: url.to_string(),
            source,
        }
    }

    /// Create a decode error with a description of what was being decoded
    pub fn decode(context: impl Into<String>, reason: impl ToString) -> Self {
        Self::Decode {
            context: context.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a rejection error; `code` is absent when the body carried none
    pub fn rejected(operation: &str, status: u16, code: Option<i64>, message: &str) -> Self {
        Self::Rejected {
            operation: operation.to_string(),
            status,
            code: code.map_or_else(|| "none".to_string(), |c| c.to_string()),
            message: message.to_string(),
        }
    }

    /// Create a value mismatch error
    pub fn mismatch(what: &str, expected: impl ToString, actual: impl ToString) -> Self {
        Self::Mismatch {
            what: what.to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Wrap an error with the step that produced it
    pub fn step_failed(number: usize, step: impl ToString, source: Error) -> Self {
        Self::StepFailed {
            number,
            step: step.to_string(),
            source: Box::new(source),
        }
    }

    /// Taxonomy class of this error; step failures report their cause
    pub fn kind(&self) -> FailureKind {
        match self {
            Error::Transport { .. } | Error::InvalidUrl(_) | Error::Decode { .. } => {
                FailureKind::Transport
            }
            Error::Json(_) => FailureKind::Transport,
            Error::Rejected { .. } => FailureKind::BusinessRule,
            Error::Mismatch { .. } | Error::TestAssertion(_) => FailureKind::Assertion,
            Error::StepFailed { source, .. } => source.kind(),
            Error::MissingBinding(_)
            | Error::Config(_)
            | Error::ConfigParse(_)
            | Error::ScenarioParse(_)
            | Error::FileRead { .. } => FailureKind::Setup,
        }
    }
}
