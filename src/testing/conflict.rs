//! Benign conflict predicates
//!
//! Some operations report "already done" as a failure envelope. Which
//! envelopes count as such is configuration, not code.

use serde::{Deserialize, Serialize};

use crate::api::Envelope;

/// Predicate over a non-successful envelope
///
/// Matches when the envelope code is listed in `codes` (only for envelopes
/// delivered with a 2xx status) or when the message contains any of
/// `message_contains`. An empty predicate matches nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct BenignConflict {
    #[serde(default)]
    pub codes: Vec<i64>,
    #[serde(default)]
    pub message_contains: Vec<String>,
}

impl BenignConflict {
    pub fn codes(codes: impl IntoIterator<Item = i64>) -> Self {
        Self {
            codes: codes.into_iter().collect(),
            message_contains: Vec::new(),
        }
    }

    pub fn message_contains<S: Into<String>>(needles: impl IntoIterator<Item = S>) -> Self {
        Self {
            codes: Vec::new(),
            message_contains: needles.into_iter().map(Into::into).collect(),
        }
    }

    pub fn matches<T>(&self, envelope: &Envelope<T>) -> bool {
        if envelope.is_success() {
            return false;
        }

        let delivered = (200..300).contains(&envelope.status);
        let code_hit = delivered && envelope.code.is_some_and(|code| self.codes.contains(&code));

        let message_hit = self
            .message_contains
            .iter()
            .any(|needle| !needle.is_empty() && envelope.message.contains(needle.as_str()));

        code_hit || message_hit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(status: u16, code: Option<i64>, message: &str) -> Envelope<()> {
        Envelope {
            status,
            code,
            message: message.to_string(),
            payload: None,
        }
    }

    #[test]
    fn test_code_predicate() {
        let rule = BenignConflict::codes([400]);
        assert!(rule.matches(&envelope(200, Some(400), "phone number may already be registered")));
        assert!(!rule.matches(&envelope(200, Some(401), "")));
        // A 400 envelope behind an HTTP error is not the service's conflict signal
        assert!(!rule.matches(&envelope(500, Some(400), "")));
    }

    #[test]
    fn test_message_predicate() {
        let rule = BenignConflict::message_contains(["Already enrolled"]);
        assert!(rule.matches(&envelope(200, Some(400), "Already enrolled in this course")));
        assert!(!rule.matches(&envelope(200, Some(400), "Missing required fields")));
        assert!(!rule.matches(&envelope(200, Some(400), "already enrolled")));
    }

    #[test]
    fn test_success_is_never_a_conflict() {
        let rule = BenignConflict::codes([200]);
        assert!(!rule.matches(&envelope(200, Some(200), "ok")));
    }

    #[test]
    fn test_empty_predicate_matches_nothing() {
        let rule = BenignConflict {
            codes: Vec::new(),
            message_contains: vec![String::new()],
        };
        assert!(!rule.matches(&envelope(200, Some(400), "anything")));
    }
}
