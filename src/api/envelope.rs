//! Typed response envelope
//!
//! Every operation answers with `{code, message, <payload key>: ...}`. The
//! payload key differs between routes, so it is named at the call site.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::common::{Error, Result};

use super::client::Response;

/// Envelope code that marks success
pub const SUCCESS_CODE: i64 = 200;

/// Longest raw body quoted in a diagnostic
const RAW_EXCERPT_LEN: usize = 300;

/// Decoded response envelope
#[derive(Debug, Clone)]
pub struct Envelope<T> {
    /// HTTP status of the response carrying the envelope
    pub status: u16,
    /// Envelope code; absent only on error statuses without a JSON envelope
    pub code: Option<i64>,
    pub message: String,
    pub payload: Option<T>,
}

impl<T: DeserializeOwned> Envelope<T> {
    /// Decode `response`, reading the payload from `payload_key`
    ///
    /// The payload of a rejected envelope is ignored, so a rejection is never
    /// reported as a decode error.
    pub fn decode(response: &Response, payload_key: &str, operation: &str) -> Result<Self> {
        let (code, message, mut fields) = split(response, operation)?;
        let mut envelope = Self {
            status: response.status,
            code,
            message,
            payload: None,
        };
        if !envelope.is_success() {
            return Ok(envelope);
        }
        envelope.payload = match fields.remove(payload_key) {
            None | Some(Value::Null) => None,
            Some(value) => Some(serde_json::from_value(value).map_err(|e| {
                Error::decode(format!("{} payload '{}'", operation, payload_key), e)
            })?),
        };
        Ok(envelope)
    }

    /// Take the payload of a successful envelope
    pub fn into_payload(self, operation: &str) -> Result<T> {
        self.payload
            .ok_or_else(|| Error::decode(format!("{} response", operation), "payload missing"))
    }
}

impl Envelope<()> {
    /// Decode an envelope whose payload the caller does not consume
    pub fn bare(response: &Response, operation: &str) -> Result<Self> {
        let (code, message, _) = split(response, operation)?;
        Ok(Self {
            status: response.status,
            code,
            message,
            payload: None,
        })
    }
}

impl<T> Envelope<T> {
    /// HTTP success status and envelope code 200
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status) && self.code == Some(SUCCESS_CODE)
    }

    /// Business-rule error describing this envelope
    pub fn rejection(&self, operation: &str) -> Error {
        Error::rejected(operation, self.status, self.code, &self.message)
    }

    /// Pass successful envelopes through, turn the rest into a rejection
    pub fn require_success(self, operation: &str) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(self.rejection(operation))
        }
    }
}

fn split(response: &Response, operation: &str) -> Result<(Option<i64>, String, Map<String, Value>)> {
    let object = match &response.body {
        Some(Value::Object(map)) => Some(map.clone()),
        Some(_) if response.is_success() => {
            return Err(Error::decode(
                format!("{} response", operation),
                "body is not a JSON object",
            ));
        }
        _ => None,
    };

    let Some(mut fields) = object else {
        if response.is_success() {
            return Err(Error::decode(format!("{} response", operation), "empty body"));
        }
        // Error status without an envelope: surface the raw text instead
        return Ok((None, excerpt(&response.raw), Map::new()));
    };

    let code = match fields.remove("code") {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    };
    if code.is_none() && response.is_success() {
        return Err(Error::decode(
            format!("{} response", operation),
            "envelope has no numeric 'code'",
        ));
    }

    // Framework error bodies carry `error` rather than `message`
    let message = [fields.remove("message"), fields.remove("error")]
        .into_iter()
        .flatten()
        .find_map(|v| v.as_str().map(str::to_string))
        .unwrap_or_default();

    Ok((code, message, fields))
}

fn excerpt(raw: &str) -> String {
    if raw.chars().count() > RAW_EXCERPT_LEN {
        let cut: String = raw.chars().take(RAW_EXCERPT_LEN).collect();
        format!("{}...", cut)
    } else {
        raw.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::protocol::{Course, UserSnapshot};
    use crate::common::FailureKind;
    use serde_json::json;

    fn response(status: u16, body: Value) -> Response {
        Response {
            status,
            raw: body.to_string(),
            body: Some(body),
        }
    }

    #[test]
    fn test_decodes_payload_under_named_key() {
        let resp = response(
            200,
            json!({"code": 200, "message": "Course created successfully",
                   "course": {"courseId": "c-1", "courseName": "Integration 101", "courseStatus": null}}),
        );
        let envelope = Envelope::<Course>::decode(&resp, "course", "create course").unwrap();
        assert!(envelope.is_success());
        let course = envelope.into_payload("create course").unwrap();
        assert_eq!(course.course_id.to_string(), "c-1");
        assert_eq!(course.course_name, "Integration 101");
    }

    #[test]
    fn test_wrong_payload_shape_is_decode_error() {
        let resp = response(200, json!({"code": 200, "course": {"courseName": "x"}}));
        let err = Envelope::<Course>::decode(&resp, "course", "create course").unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
        assert_eq!(err.kind(), FailureKind::Transport);
    }

    #[test]
    fn test_missing_payload_is_decode_error() {
        let resp = response(200, json!({"code": 200, "message": "ok"}));
        let envelope = Envelope::<Course>::decode(&resp, "course", "create course").unwrap();
        let err = envelope.into_payload("create course").unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
    }

    #[test]
    fn test_non_200_code_is_rejection() {
        let resp = response(200, json!({"code": 404, "message": "Answer not found"}));
        let err = Envelope::bare(&resp, "grade answer")
            .unwrap()
            .require_success("grade answer")
            .unwrap_err();
        assert_eq!(err.kind(), FailureKind::BusinessRule);
        assert!(err.to_string().contains("Answer not found"));
    }

    #[test]
    fn test_rejected_envelope_with_bad_payload_is_rejection() {
        let resp = response(
            200,
            json!({"code": 401, "message": "Invalid credentials", "user": {}}),
        );
        let envelope = Envelope::<UserSnapshot>::decode(&resp, "user", "login").unwrap();
        assert!(envelope.payload.is_none());
        let err = envelope.require_success("login").unwrap_err();
        assert!(matches!(err, Error::Rejected { .. }));
        assert_eq!(err.kind(), FailureKind::BusinessRule);
        assert!(err.to_string().contains("Invalid credentials"));
    }

    #[test]
    fn test_error_status_with_framework_body() {
        let resp = response(403, json!({"status": 403, "error": "Forbidden", "path": "/api/courses"}));
        let envelope = Envelope::bare(&resp, "create course").unwrap();
        assert!(!envelope.is_success());
        assert_eq!(envelope.code, None);
        assert_eq!(envelope.message, "Forbidden");
    }

    #[test]
    fn test_error_status_without_json() {
        let resp = Response {
            status: 502,
            body: None,
            raw: "Bad Gateway".to_string(),
        };
        let envelope = Envelope::bare(&resp, "login").unwrap();
        assert!(!envelope.is_success());
        assert_eq!(envelope.message, "Bad Gateway");
    }

    #[test]
    fn test_success_status_without_code_is_decode_error() {
        let resp = response(200, json!({"message": "hello"}));
        assert!(matches!(
            Envelope::bare(&resp, "login"),
            Err(Error::Decode { .. })
        ));
    }

    #[test]
    fn test_code_200_on_error_status_is_not_success() {
        let resp = response(500, json!({"code": 200, "message": "confused"}));
        assert!(!Envelope::bare(&resp, "login").unwrap().is_success());
    }
}
