//! Wire types for the course-management API
//!
//! Field names follow the service's camelCase JSON. Only the fields the
//! runner consumes are typed; everything else is ignored on the way in.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Route table, relative to the configured base URL
pub mod routes {
    pub const REGISTER: &str = "/users/register";
    pub const LOGIN: &str = "/users/login";
    pub const UPDATE_USER: &str = "/users/update";
    pub const COURSES: &str = "/courses";
    pub const ENROLL: &str = "/enrollments/enroll";
    pub const CHECK_ENROLLMENT: &str = "/enrollments/check";
    pub const ASSIGNMENTS: &str = "/assignments";
    pub const SUBMIT_ANSWER: &str = "/answers/submit";
    pub const GRADE_ANSWER: &str = "/answers/grade";
    pub const MY_ANSWER: &str = "/answers/my";

    /// Route for fetching a single user record
    pub fn user(id: &super::Id) -> String {
        format!("/users/{}", id)
    }
}

/// Opaque identifier assigned by the service
///
/// Accepted as a JSON string or number and serialized back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Id(Value);

impl Id {
    pub fn new(value: impl Into<String>) -> Self {
        Self(Value::String(value.into()))
    }
}

impl<'de> Deserialize<'de> for Id {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            value @ (Value::String(_) | Value::Number(_)) => Ok(Self(value)),
            other => Err(de::Error::custom(format!(
                "identifier must be a string or number, got {}",
                other
            ))),
        }
    }
}

impl std::fmt::Display for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.0 {
            Value::String(s) => f.write_str(s),
            other => write!(f, "{}", other),
        }
    }
}

/// Bearer credential issued at login
#[derive(Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Token(String);

impl Token {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Token(***)")
    }
}

/// Actor role, fixed at registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Teacher,
    Student,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Teacher => "teacher",
            Role::Student => "student",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// === Requests ===

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest<'a> {
    pub phone_number: &'a str,
    pub password: &'a str,
    pub role: Role,
    pub username: &'a str,
    pub real_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teacher_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_id: Option<&'a str>,
    /// SMS verification code, for deployments that require one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest<'a> {
    pub phone_number: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCourseRequest<'a> {
    pub course_name: &'a str,
    pub teacher_id: &'a Id,
    pub course_description: &'a str,
    pub course_semester: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollRequest<'a> {
    pub student_id: &'a Id,
    pub course_id: &'a Id,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAssignmentRequest<'a> {
    pub course_id: &'a Id,
    pub teacher_id: &'a Id,
    pub assignment_title: &'a str,
    pub assignment_content: &'a str,
    pub start_time: &'a str,
    pub end_time: &'a str,
    pub assignment_status: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAnswerRequest<'a> {
    pub assignment_id: &'a Id,
    pub student_id: &'a Id,
    pub answer_content: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeRequest<'a> {
    pub answer_id: &'a Id,
    pub score: f64,
    pub feedback: &'a str,
}

// === Payloads ===

/// Actor snapshot returned by login
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSnapshot {
    pub user_id: Id,
    pub role: String,
    #[serde(default)]
    pub real_name: Option<String>,
    pub token: Token,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub course_id: Id,
    pub course_name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub assignment_id: Id,
    pub assignment_title: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub answer_id: Id,
}

/// Graded answer as seen by the student
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeRecord {
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub teacher_feedback: Option<String>,
}

/// Full user record as returned by the fetch-user route
///
/// The update route replaces the whole record, so every field the runner
/// does not touch is carried through `rest` untouched.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default)]
    pub real_name: Option<String>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_id_accepts_string_and_number() {
        let id: Id = serde_json::from_value(json!("c-42")).unwrap();
        assert_eq!(id.to_string(), "c-42");

        let id: Id = serde_json::from_value(json!(42)).unwrap();
        assert_eq!(id.to_string(), "42");
        assert_eq!(serde_json::to_value(&id).unwrap(), json!(42));

        assert!(serde_json::from_value::<Id>(json!({"id": 1})).is_err());
        assert!(serde_json::from_value::<Id>(Value::Null).is_err());
    }

    #[test]
    fn test_token_debug_is_redacted() {
        let token = Token::new("secret-jwt");
        assert_eq!(format!("{:?}", token), "Token(***)");
        assert_eq!(token.as_str(), "secret-jwt");
    }

    #[test]
    fn test_register_request_omits_other_role_id() {
        let request = RegisterRequest {
            phone_number: "13800001001",
            password: "password123",
            role: Role::Teacher,
            username: "TeacherTest",
            real_name: "Mr. Teacher",
            teacher_id: Some("T001"),
            student_id: None,
            code: None,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["role"], "teacher");
        assert_eq!(value["teacherId"], "T001");
        assert!(value.get("studentId").is_none());
        assert!(value.get("code").is_none());
    }

    #[test]
    fn test_profile_keeps_unknown_fields() {
        let mut profile: UserProfile = serde_json::from_value(json!({
            "userId": "u-7",
            "realName": "Student A",
            "college": "Engineering",
            "email": null
        }))
        .unwrap();
        profile.real_name = Some("Student A Updated".to_string());

        let value = serde_json::to_value(&profile).unwrap();
        assert_eq!(value["userId"], "u-7");
        assert_eq!(value["realName"], "Student A Updated");
        assert_eq!(value["college"], "Engineering");
        assert!(value.as_object().unwrap().contains_key("email"));
    }

    #[test]
    fn test_user_route_embeds_id() {
        assert_eq!(routes::user(&Id::new("u-7")), "/users/u-7");
    }
}
