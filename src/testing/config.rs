//! Scenario data
//!
//! Defines the actors and entity fields a run uses. A scenario can be loaded
//! from YAML; sections left out keep the built-in values.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::api::protocol::Role;
use crate::common::{Error, Result};

/// Data for one scenario run
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct TestScenario {
    /// Name of the scenario
    pub name: String,
    /// Optional description of what the run verifies
    pub description: Option<String>,
    pub teacher: ActorConfig,
    pub student: ActorConfig,
    pub course: CourseConfig,
    pub assignment: AssignmentConfig,
    pub answer: AnswerConfig,
    pub grade: GradeConfig,
    pub profile: ProfileConfig,
}

/// Registration and login data for one actor
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ActorConfig {
    /// Unique natural key of the account
    pub phone_number: String,
    pub password: String,
    pub username: String,
    /// Display name
    pub real_name: String,
    /// Role-scoped id (`teacherId` or `studentId`)
    pub role_id: String,
    /// Verification code, for deployments whose registration requires one
    #[serde(default)]
    pub sms_code: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct CourseConfig {
    pub name: String,
    pub description: String,
    pub semester: String,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct AssignmentConfig {
    pub title: String,
    pub content: String,
    /// Window start, `YYYY-MM-DDTHH:MM:SS`
    pub start_time: String,
    /// Window end, `YYYY-MM-DDTHH:MM:SS`
    pub end_time: String,
    pub status: String,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct AnswerConfig {
    pub content: String,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct GradeConfig {
    pub score: f64,
    pub feedback: String,
}

/// Display-name change applied at the end of the run
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ProfileConfig {
    /// Whose profile is updated
    #[serde(default = "default_profile_actor")]
    pub actor: Role,
    /// New display name
    pub real_name: String,
}

fn default_profile_actor() -> Role {
    Role::Student
}

impl Default for TestScenario {
    fn default() -> Self {
        Self {
            name: "Course workflow".to_string(),
            description: Some(
                "Onboarding, enrollment, assignment lifecycle, grading and profile update"
                    .to_string(),
            ),
            teacher: ActorConfig {
                phone_number: "13800001001".to_string(),
                password: "password123".to_string(),
                username: "TeacherTest".to_string(),
                real_name: "Mr. Teacher".to_string(),
                role_id: "T001".to_string(),
                sms_code: None,
            },
            student: ActorConfig {
                phone_number: "13900002002".to_string(),
                password: "password123".to_string(),
                username: "StudentTest".to_string(),
                real_name: "Student A".to_string(),
                role_id: "S001".to_string(),
                sms_code: None,
            },
            course: CourseConfig {
                name: "Integration 101".to_string(),
                description: "Integration Test Course".to_string(),
                semester: "2026-Spring".to_string(),
            },
            assignment: AssignmentConfig {
                title: "Test Assignment 1".to_string(),
                content: "Calculate 1+1".to_string(),
                start_time: "2026-01-01T00:00:00".to_string(),
                end_time: "2026-12-31T23:59:59".to_string(),
                status: "Published".to_string(),
            },
            answer: AnswerConfig {
                content: "The answer is 2".to_string(),
            },
            grade: GradeConfig {
                score: 95.0,
                feedback: "Great job!".to_string(),
            },
            profile: ProfileConfig {
                actor: Role::Student,
                real_name: "Student A Updated".to_string(),
            },
        }
    }
}

impl TestScenario {
    /// Load a scenario from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        Self::parse(&content)
    }

    /// Parse a scenario from YAML text
    pub fn parse(content: &str) -> Result<Self> {
        let scenario: Self =
            serde_yaml::from_str(content).map_err(|e| Error::ScenarioParse(e.to_string()))?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Data for the actor with `role`
    pub fn actor(&self, role: Role) -> &ActorConfig {
        match role {
            Role::Teacher => &self.teacher,
            Role::Student => &self.student,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.teacher.phone_number == self.student.phone_number {
            return Err(Error::ScenarioParse(format!(
                "teacher and student share phone number {}",
                self.teacher.phone_number
            )));
        }
        if !self.grade.score.is_finite() {
            return Err(Error::ScenarioParse("grade.score must be a finite number".to_string()));
        }
        if self.profile.real_name == self.actor(self.profile.actor).real_name {
            return Err(Error::ScenarioParse(
                "profile.real_name must differ from the current display name".to_string(),
            ));
        }
        Ok(())
    }
}
