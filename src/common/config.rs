//! Configuration file handling

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use super::paths::config_path;
use super::{Error, Result};
use crate::testing::BenignConflict;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// Service under test
    #[serde(default)]
    pub server: ServerConfig,

    /// Outcomes that count as success despite a non-200 envelope
    #[serde(default)]
    pub conflicts: ConflictConfig,

    /// Optional extra verification steps
    #[serde(default)]
    pub checks: ChecksConfig,
}

/// Connection settings for the backend
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Base URL every route is appended to
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Fixed wait before the first request
    #[serde(default = "default_ready_delay")]
    pub ready_delay_secs: u64,

    /// Timeout applied to each request
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            ready_delay_secs: default_ready_delay(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl ServerConfig {
    pub fn ready_delay(&self) -> Duration {
        Duration::from_secs(self.ready_delay_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn default_base_url() -> String {
    "http://localhost:8080/api".to_string()
}
fn default_ready_delay() -> u64 {
    5
}
fn default_request_timeout() -> u64 {
    30
}

/// Benign conflict predicates per operation
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConflictConfig {
    /// Registering a phone number that already exists
    #[serde(default = "default_registration_conflict")]
    pub registration: BenignConflict,

    /// Enrolling a student that is already enrolled
    #[serde(default = "default_enrollment_conflict")]
    pub enrollment: BenignConflict,
}

impl Default for ConflictConfig {
    fn default() -> Self {
        Self {
            registration: default_registration_conflict(),
            enrollment: default_enrollment_conflict(),
        }
    }
}

fn default_registration_conflict() -> BenignConflict {
    BenignConflict::codes([400])
}
fn default_enrollment_conflict() -> BenignConflict {
    BenignConflict::message_contains(["Already enrolled"])
}

/// Optional checks that extend the base scenario
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ChecksConfig {
    /// Query the enrollment after enrolling and require `enrolled == true`
    #[serde(default)]
    pub enrollment: bool,

    /// Require the service to reject course creation with a student token
    #[serde(default)]
    pub role_isolation: bool,
}

impl Config {
    /// Load configuration
    ///
    /// An explicit `path` must exist. Without one, the default config file is
    /// used when present, otherwise the built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_file(path),
            None => match config_path() {
                Some(path) if path.exists() => Self::load_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    fn load_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| Error::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Render the configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }

    fn validate(&self) -> Result<()> {
        let base = &self.server.base_url;
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(Error::ConfigParse(format!(
                "server.base_url must be an http(s) URL, got '{}'",
                base
            )));
        }
        if self.server.request_timeout_secs == 0 {
            return Err(Error::ConfigParse(
                "server.request_timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Apply command-line overrides on top of the loaded values
    pub fn with_overrides(mut self, base_url: Option<String>, ready_delay_secs: Option<u64>) -> Result<Self> {
        if let Some(base_url) = base_url {
            self.server.base_url = base_url;
        }
        if let Some(delay) = ready_delay_secs {
            self.server.ready_delay_secs = delay;
        }
        self.validate()?;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_backend() {
        let config = Config::default();
        assert_eq!(config.server.base_url, "http://localhost:8080/api");
        assert_eq!(config.server.ready_delay(), Duration::from_secs(5));
        assert_eq!(config.conflicts.registration.codes, vec![400]);
        assert_eq!(
            config.conflicts.enrollment.message_contains,
            vec!["Already enrolled".to_string()]
        );
        assert!(!config.checks.enrollment);
        assert!(!config.checks.role_isolation);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = Config::parse(
            r#"
            [server]
            base_url = "http://backend:9000/api"

            [checks]
            role_isolation = true
            "#,
        )
        .unwrap();
        assert_eq!(config.server.base_url, "http://backend:9000/api");
        assert_eq!(config.server.request_timeout_secs, 30);
        assert!(config.checks.role_isolation);
        assert_eq!(config.conflicts.registration.codes, vec![400]);
    }

    #[test]
    fn test_conflict_predicates_are_configurable() {
        let config = Config::parse(
            r#"
            [conflicts.enrollment]
            codes = [409]
            message_contains = []
            "#,
        )
        .unwrap();
        assert_eq!(config.conflicts.enrollment.codes, vec![409]);
        assert!(config.conflicts.enrollment.message_contains.is_empty());
    }

    #[test]
    fn test_rejects_non_http_base_url() {
        let err = Config::parse("[server]\nbase_url = \"localhost:8080\"\n").unwrap_err();
        assert!(matches!(err, Error::ConfigParse(_)));
    }

    #[test]
    fn test_overrides_win_over_file() {
        let config = Config::default()
            .with_overrides(Some("http://127.0.0.1:1234/api".to_string()), Some(0))
            .unwrap();
        assert_eq!(config.server.base_url, "http://127.0.0.1:1234/api");
        assert_eq!(config.server.ready_delay_secs, 0);
    }

    #[test]
    fn test_toml_output_parses_back() {
        let text = Config::default().to_toml().unwrap();
        let config = Config::parse(&text).unwrap();
        assert_eq!(config.server.base_url, "http://localhost:8080/api");
    }

    #[test]
    fn test_load_explicit_file() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nready_delay_secs = 0\nrequest_timeout_secs = 3").unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.server.ready_delay_secs, 0);
        assert_eq!(config.server.request_timeout(), Duration::from_secs(3));
        assert_eq!(config.server.base_url, "http://localhost:8080/api");
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let err = Config::load(Some(Path::new("/nonexistent/course-verify.toml"))).unwrap_err();
        assert!(matches!(err, Error::FileRead { .. }));
    }
}
