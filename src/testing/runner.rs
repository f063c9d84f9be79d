//! Scenario runner
//!
//! Executes the workflow steps in order against the service. Every step
//! reads its inputs from the bindings produced by earlier steps and either
//! returns an outcome or an error; the first error ends the run.

use std::time::{Duration, Instant};

use colored::Colorize;

use crate::api::protocol::{
    routes, Answer, Assignment, Course, CreateAssignmentRequest, CreateCourseRequest,
    EnrollRequest, GradeRecord, GradeRequest, Id, LoginRequest, RegisterRequest, Role,
    SubmitAnswerRequest, Token, UserProfile, UserSnapshot,
};
use crate::api::{ApiClient, Envelope, Request};
use crate::common::config::{ChecksConfig, Config};
use crate::common::{Error, Result};

use super::config::{ActorConfig, TestScenario};

/// One step of the workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Register(Role),
    Login(Role),
    CreateCourse,
    Enroll,
    CheckEnrollment,
    RoleIsolation,
    CreateAssignment,
    SubmitAnswer,
    GradeAnswer,
    CheckGrade,
    UpdateProfile,
    VerifyProfile,
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Step::Register(role) => write!(f, "register {}", role),
            Step::Login(role) => write!(f, "login {}", role),
            Step::CreateCourse => f.write_str("create course"),
            Step::Enroll => f.write_str("enroll student"),
            Step::CheckEnrollment => f.write_str("check enrollment"),
            Step::RoleIsolation => f.write_str("role isolation"),
            Step::CreateAssignment => f.write_str("create assignment"),
            Step::SubmitAnswer => f.write_str("submit answer"),
            Step::GradeAnswer => f.write_str("grade answer"),
            Step::CheckGrade => f.write_str("check grade"),
            Step::UpdateProfile => f.write_str("update profile"),
            Step::VerifyProfile => f.write_str("verify profile"),
        }
    }
}

/// Ordered step list for a run
///
/// Optional checks are slotted in right after the step whose result they
/// inspect.
pub fn plan(checks: &ChecksConfig) -> Vec<Step> {
    let mut steps = vec![
        Step::Register(Role::Teacher),
        Step::Login(Role::Teacher),
        Step::Register(Role::Student),
        Step::Login(Role::Student),
        Step::CreateCourse,
    ];
    if checks.role_isolation {
        steps.push(Step::RoleIsolation);
    }
    steps.push(Step::Enroll);
    if checks.enrollment {
        steps.push(Step::CheckEnrollment);
    }
    steps.extend([
        Step::CreateAssignment,
        Step::SubmitAnswer,
        Step::GradeAnswer,
        Step::CheckGrade,
        Step::UpdateProfile,
        Step::VerifyProfile,
    ]);
    steps
}

/// How a step passed
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    Passed(String),
    /// A whitelisted "already done" response
    SoftPassed(String),
}

impl StepOutcome {
    pub fn detail(&self) -> &str {
        match self {
            StepOutcome::Passed(detail) | StepOutcome::SoftPassed(detail) => detail,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StepRecord {
    pub number: usize,
    pub step: Step,
    pub outcome: StepOutcome,
}

/// Result of a completed run
#[derive(Debug)]
pub struct RunReport {
    pub name: String,
    pub steps: Vec<StepRecord>,
    pub elapsed: Duration,
}

impl RunReport {
    pub fn soft_passes(&self) -> usize {
        self.steps
            .iter()
            .filter(|r| matches!(r.outcome, StepOutcome::SoftPassed(_)))
            .count()
    }
}

/// Authenticated actor
#[derive(Debug, Clone)]
struct Session {
    user_id: Id,
    token: Token,
}

/// Grade exactly as submitted by the grading step
#[derive(Debug, Clone)]
struct SubmittedGrade {
    score: f64,
    feedback: String,
}

/// Values produced by earlier steps of the current run
#[derive(Debug, Default)]
struct Bindings {
    teacher: Option<Session>,
    student: Option<Session>,
    course: Option<Course>,
    assignment: Option<Assignment>,
    answer: Option<Answer>,
    grade: Option<SubmittedGrade>,
    updated_name: Option<String>,
}

impl Bindings {
    fn session(&self, role: Role) -> Result<&Session> {
        match role {
            Role::Teacher => self.teacher.as_ref().ok_or(Error::MissingBinding("teacher session")),
            Role::Student => self.student.as_ref().ok_or(Error::MissingBinding("student session")),
        }
    }

    fn set_session(&mut self, role: Role, session: Session) {
        match role {
            Role::Teacher => self.teacher = Some(session),
            Role::Student => self.student = Some(session),
        }
    }

    fn course(&self) -> Result<&Course> {
        self.course.as_ref().ok_or(Error::MissingBinding("course"))
    }

    fn assignment(&self) -> Result<&Assignment> {
        self.assignment.as_ref().ok_or(Error::MissingBinding("assignment"))
    }

    fn answer(&self) -> Result<&Answer> {
        self.answer.as_ref().ok_or(Error::MissingBinding("answer"))
    }

    fn grade(&self) -> Result<&SubmittedGrade> {
        self.grade.as_ref().ok_or(Error::MissingBinding("submitted grade"))
    }

    fn updated_name(&self) -> Result<&str> {
        self.updated_name
            .as_deref()
            .ok_or(Error::MissingBinding("updated display name"))
    }
}

/// Drives one scenario against the service
pub struct Runner {
    client: ApiClient,
    config: Config,
    scenario: TestScenario,
    verbose: bool,
}

impl Runner {
    pub fn new(config: Config, scenario: TestScenario) -> Result<Self> {
        let client = ApiClient::new(&config.server)?;
        Ok(Self {
            client,
            config,
            scenario,
            verbose: false,
        })
    }

    /// Print step details as well as step names
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn plan(&self) -> Vec<Step> {
        plan(&self.config.checks)
    }

    /// Run every step in order, stopping at the first failure
    pub async fn run(&self) -> Result<RunReport> {
        let started = Instant::now();
        let steps = self.plan();

        println!(
            "\n{} {}",
            "Running Workflow:".blue().bold(),
            self.scenario.name.white().bold()
        );
        if let Some(desc) = &self.scenario.description {
            println!("  {}", desc.dimmed());
        }
        println!("  {}", self.client.base_url().dimmed());

        let delay = self.config.server.ready_delay();
        if !delay.is_zero() {
            println!("\n{}", format!("Waiting {}s for the service...", delay.as_secs()).cyan());
            tokio::time::sleep(delay).await;
        }

        println!("\n{}", "Steps:".cyan());

        let mut bindings = Bindings::default();
        let mut records = Vec::with_capacity(steps.len());

        for (i, step) in steps.iter().enumerate() {
            let number = i + 1;
            tracing::info!(number, step = %step, "Executing step");

            match self.execute_step(*step, &mut bindings).await {
                Ok(outcome) => {
                    self.print_outcome(number, *step, &outcome);
                    records.push(StepRecord {
                        number,
                        step: *step,
                        outcome,
                    });
                }
                Err(e) => {
                    println!("  {} Step {}: {}", "✗".red(), number, step);
                    return Err(Error::step_failed(number, step, e));
                }
            }
        }

        let report = RunReport {
            name: self.scenario.name.clone(),
            steps: records,
            elapsed: started.elapsed(),
        };

        println!(
            "\n{} {} ({} steps, {} soft, {:.1}s)\n",
            "✓".green().bold(),
            "Workflow Passed".green().bold(),
            report.steps.len(),
            report.soft_passes(),
            report.elapsed.as_secs_f64()
        );

        Ok(report)
    }

    fn print_outcome(&self, number: usize, step: Step, outcome: &StepOutcome) {
        match outcome {
            StepOutcome::Passed(detail) => {
                println!("  {} Step {}: {}", "✓".green(), number, step);
                if self.verbose {
                    println!("      {}", detail.dimmed());
                }
            }
            StepOutcome::SoftPassed(detail) => {
                println!(
                    "  {} Step {}: {} ({})",
                    "✓".yellow(),
                    number,
                    step,
                    detail.yellow()
                );
            }
        }
    }

    /// Execute a single step
    async fn execute_step(&self, step: Step, bindings: &mut Bindings) -> Result<StepOutcome> {
        match step {
            Step::Register(role) => self.register_step(role).await,
            Step::Login(role) => self.login_step(role, bindings).await,
            Step::CreateCourse => self.create_course_step(bindings).await,
            Step::Enroll => self.enroll_step(bindings).await,
            Step::CheckEnrollment => self.check_enrollment_step(bindings).await,
            Step::RoleIsolation => self.role_isolation_step(bindings).await,
            Step::CreateAssignment => self.create_assignment_step(bindings).await,
            Step::SubmitAnswer => self.submit_answer_step(bindings).await,
            Step::GradeAnswer => self.grade_answer_step(bindings).await,
            Step::CheckGrade => self.check_grade_step(bindings).await,
            Step::UpdateProfile => self.update_profile_step(bindings).await,
            Step::VerifyProfile => self.verify_profile_step(bindings).await,
        }
    }

    async fn register_step(&self, role: Role) -> Result<StepOutcome> {
        let operation = Step::Register(role).to_string();
        let actor = self.scenario.actor(role);
        let request = RegisterRequest {
            phone_number: &actor.phone_number,
            password: &actor.password,
            role,
            username: &actor.username,
            real_name: &actor.real_name,
            teacher_id: (role == Role::Teacher).then_some(actor.role_id.as_str()),
            student_id: (role == Role::Student).then_some(actor.role_id.as_str()),
            code: actor.sms_code.as_deref(),
        };

        let response = self
            .client
            .send(Request::post(routes::REGISTER).json(&request)?)
            .await?;
        let envelope = Envelope::bare(&response, &operation)?;

        if envelope.is_success() {
            return Ok(StepOutcome::Passed(format!(
                "Registered {} {}",
                role, actor.phone_number
            )));
        }
        if self.config.conflicts.registration.matches(&envelope) {
            tracing::warn!(phone = %actor.phone_number, code = ?envelope.code, "Actor already registered");
            return Ok(StepOutcome::SoftPassed(format!(
                "{} already exists: {}",
                actor.phone_number, envelope.message
            )));
        }
        Err(envelope.rejection(&operation))
    }

    async fn login(&self, operation: &str, actor: &ActorConfig) -> Result<UserSnapshot> {
        let request = LoginRequest {
            phone_number: &actor.phone_number,
            password: &actor.password,
        };
        let response = self
            .client
            .send(Request::post(routes::LOGIN).json(&request)?)
            .await?;
        Envelope::<UserSnapshot>::decode(&response, "user", operation)?
            .require_success(operation)?
            .into_payload(operation)
    }

    async fn login_step(&self, role: Role, bindings: &mut Bindings) -> Result<StepOutcome> {
        let operation = Step::Login(role).to_string();
        let actor = self.scenario.actor(role);
        let user = self.login(&operation, actor).await?;

        if !user.role.eq_ignore_ascii_case(role.as_str()) {
            return Err(Error::mismatch("login role", role, &user.role));
        }

        let detail = format!(
            "Logged in {} as {} (user {})",
            actor.phone_number, user.role, user.user_id
        );
        bindings.set_session(
            role,
            Session {
                user_id: user.user_id,
                token: user.token,
            },
        );
        Ok(StepOutcome::Passed(detail))
    }

    async fn create_course_step(&self, bindings: &mut Bindings) -> Result<StepOutcome> {
        let operation = Step::CreateCourse.to_string();
        let teacher = bindings.session(Role::Teacher)?;
        let data = &self.scenario.course;
        let request = CreateCourseRequest {
            course_name: &data.name,
            teacher_id: &teacher.user_id,
            course_description: &data.description,
            course_semester: &data.semester,
        };

        let response = self
            .client
            .send(
                Request::post(routes::COURSES)
                    .json(&request)?
                    .bearer(&teacher.token),
            )
            .await?;
        let course = Envelope::<Course>::decode(&response, "course", &operation)?
            .require_success(&operation)?
            .into_payload(&operation)?;

        let detail = format!("Created course {} (id {})", course.course_name, course.course_id);
        bindings.course = Some(course);
        Ok(StepOutcome::Passed(detail))
    }

    async fn enroll_step(&self, bindings: &mut Bindings) -> Result<StepOutcome> {
        let operation = Step::Enroll.to_string();
        let student = bindings.session(Role::Student)?;
        let course = bindings.course()?;
        let request = EnrollRequest {
            student_id: &student.user_id,
            course_id: &course.course_id,
        };

        let response = self
            .client
            .send(
                Request::post(routes::ENROLL)
                    .json(&request)?
                    .bearer(&student.token),
            )
            .await?;
        let envelope = Envelope::bare(&response, &operation)?;

        if envelope.is_success() {
            return Ok(StepOutcome::Passed(format!(
                "Student {} enrolled in {}",
                student.user_id, course.course_id
            )));
        }
        if self.config.conflicts.enrollment.matches(&envelope) {
            tracing::warn!(student = %student.user_id, course = %course.course_id, "Student already enrolled");
            return Ok(StepOutcome::SoftPassed(format!(
                "already enrolled: {}",
                envelope.message
            )));
        }
        Err(envelope.rejection(&operation))
    }

    async fn check_enrollment_step(&self, bindings: &Bindings) -> Result<StepOutcome> {
        let operation = Step::CheckEnrollment.to_string();
        let student = bindings.session(Role::Student)?;
        let course = bindings.course()?;

        let response = self
            .client
            .send(
                Request::get(routes::CHECK_ENROLLMENT)
                    .query("studentId", &student.user_id)
                    .query("courseId", &course.course_id)
                    .bearer(&student.token),
            )
            .await?;
        let enrolled = Envelope::<bool>::decode(&response, "enrolled", &operation)?
            .require_success(&operation)?
            .into_payload(&operation)?;

        if !enrolled {
            return Err(Error::mismatch("enrolled", true, false));
        }
        Ok(StepOutcome::Passed(format!(
            "Enrollment of {} in {} confirmed",
            student.user_id, course.course_id
        )))
    }

    async fn role_isolation_step(&self, bindings: &Bindings) -> Result<StepOutcome> {
        let operation = Step::RoleIsolation.to_string();
        let student = bindings.session(Role::Student)?;
        let data = &self.scenario.course;
        let name = format!("{} (student attempt)", data.name);
        let request = CreateCourseRequest {
            course_name: &name,
            teacher_id: &student.user_id,
            course_description: &data.description,
            course_semester: &data.semester,
        };

        let response = self
            .client
            .send(
                Request::post(routes::COURSES)
                    .json(&request)?
                    .bearer(&student.token),
            )
            .await?;
        let envelope = Envelope::bare(&response, &operation)?;

        if envelope.is_success() {
            return Err(Error::TestAssertion(
                "a student token was allowed to create a course".to_string(),
            ));
        }
        Ok(StepOutcome::Passed(format!(
            "Student course creation rejected (HTTP {}, code {})",
            envelope.status,
            envelope.code.map_or_else(|| "none".to_string(), |c| c.to_string())
        )))
    }

    async fn create_assignment_step(&self, bindings: &mut Bindings) -> Result<StepOutcome> {
        let operation = Step::CreateAssignment.to_string();
        let teacher = bindings.session(Role::Teacher)?;
        let course = bindings.course()?;
        let data = &self.scenario.assignment;
        let request = CreateAssignmentRequest {
            course_id: &course.course_id,
            teacher_id: &teacher.user_id,
            assignment_title: &data.title,
            assignment_content: &data.content,
            start_time: &data.start_time,
            end_time: &data.end_time,
            assignment_status: &data.status,
        };

        let response = self
            .client
            .send(
                Request::post(routes::ASSIGNMENTS)
                    .json(&request)?
                    .bearer(&teacher.token),
            )
            .await?;
        let assignment = Envelope::<Assignment>::decode(&response, "assignment", &operation)?
            .require_success(&operation)?
            .into_payload(&operation)?;

        let detail = format!(
            "Published assignment {} (id {})",
            assignment.assignment_title, assignment.assignment_id
        );
        bindings.assignment = Some(assignment);
        Ok(StepOutcome::Passed(detail))
    }

    async fn submit_answer_step(&self, bindings: &mut Bindings) -> Result<StepOutcome> {
        let operation = Step::SubmitAnswer.to_string();
        let student = bindings.session(Role::Student)?;
        let assignment = bindings.assignment()?;
        let request = SubmitAnswerRequest {
            assignment_id: &assignment.assignment_id,
            student_id: &student.user_id,
            answer_content: &self.scenario.answer.content,
        };

        let response = self
            .client
            .send(
                Request::post(routes::SUBMIT_ANSWER)
                    .json(&request)?
                    .bearer(&student.token),
            )
            .await?;
        let answer = Envelope::<Answer>::decode(&response, "data", &operation)?
            .require_success(&operation)?
            .into_payload(&operation)?;

        let detail = format!("Submitted answer {}", answer.answer_id);
        bindings.answer = Some(answer);
        Ok(StepOutcome::Passed(detail))
    }

    async fn grade_answer_step(&self, bindings: &mut Bindings) -> Result<StepOutcome> {
        let operation = Step::GradeAnswer.to_string();
        let teacher = bindings.session(Role::Teacher)?;
        let answer = bindings.answer()?;
        let data = &self.scenario.grade;
        let request = GradeRequest {
            answer_id: &answer.answer_id,
            score: data.score,
            feedback: &data.feedback,
        };

        let response = self
            .client
            .send(
                Request::post(routes::GRADE_ANSWER)
                    .json(&request)?
                    .bearer(&teacher.token),
            )
            .await?;
        Envelope::bare(&response, &operation)?.require_success(&operation)?;

        let detail = format!("Graded answer {} with score {}", answer.answer_id, data.score);
        bindings.grade = Some(SubmittedGrade {
            score: data.score,
            feedback: data.feedback.clone(),
        });
        Ok(StepOutcome::Passed(detail))
    }

    async fn check_grade_step(&self, bindings: &Bindings) -> Result<StepOutcome> {
        let operation = Step::CheckGrade.to_string();
        let student = bindings.session(Role::Student)?;
        let assignment = bindings.assignment()?;
        let expected = bindings.grade()?;

        let response = self
            .client
            .send(
                Request::get(routes::MY_ANSWER)
                    .query("assignmentId", &assignment.assignment_id)
                    .query("studentId", &student.user_id)
                    .bearer(&student.token),
            )
            .await?;
        let record = Envelope::<GradeRecord>::decode(&response, "data", &operation)?
            .require_success(&operation)?
            .into_payload(&operation)?;

        match record.score {
            Some(score) if score == expected.score => {}
            Some(score) => return Err(Error::mismatch("score", expected.score, score)),
            None => return Err(Error::mismatch("score", expected.score, "no score")),
        }
        let feedback = record.teacher_feedback.unwrap_or_default();
        if feedback != expected.feedback {
            return Err(Error::mismatch(
                "feedback",
                format!("'{}'", expected.feedback),
                format!("'{}'", feedback),
            ));
        }

        Ok(StepOutcome::Passed(format!(
            "Score {} with feedback '{}'",
            expected.score, feedback
        )))
    }

    async fn update_profile_step(&self, bindings: &mut Bindings) -> Result<StepOutcome> {
        let operation = Step::UpdateProfile.to_string();
        let role = self.scenario.profile.actor;
        let new_name = &self.scenario.profile.real_name;
        let session = bindings.session(role)?;

        // The update route replaces the whole record, so start from the current one
        let response = self
            .client
            .send(Request::get(routes::user(&session.user_id)).bearer(&session.token))
            .await?;
        let mut profile = Envelope::<UserProfile>::decode(&response, "data", "fetch profile")?
            .require_success("fetch profile")?
            .into_payload("fetch profile")?;

        let previous = profile.real_name.replace(new_name.clone());

        let response = self
            .client
            .send(
                Request::post(routes::UPDATE_USER)
                    .json(&profile)?
                    .bearer(&session.token),
            )
            .await?;
        Envelope::bare(&response, &operation)?.require_success(&operation)?;

        bindings.updated_name = Some(new_name.clone());
        Ok(StepOutcome::Passed(format!(
            "Renamed {} from '{}' to '{}'",
            role,
            previous.unwrap_or_default(),
            new_name
        )))
    }

    async fn verify_profile_step(&self, bindings: &mut Bindings) -> Result<StepOutcome> {
        let operation = Step::VerifyProfile.to_string();
        let role = self.scenario.profile.actor;
        let expected = bindings.updated_name()?.to_string();
        let user = self.login(&operation, self.scenario.actor(role)).await?;

        let actual = user.real_name.unwrap_or_default();
        if actual != expected {
            return Err(Error::mismatch(
                "display name after re-login",
                format!("'{}'", expected),
                format!("'{}'", actual),
            ));
        }

        bindings.set_session(
            role,
            Session {
                user_id: user.user_id,
                token: user.token,
            },
        );
        Ok(StepOutcome::Passed(format!("Display name '{}' persisted", actual)))
    }
}
