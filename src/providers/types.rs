use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DashboardError;
use crate::reference::{BuildRef, PipelineRef};

/// One of the supported CI/CD platforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vendor {
    Jenkins,
    GitHub,
    GitLab,
}

impl Vendor {
    pub const ALL: [Vendor; 3] = [Vendor::Jenkins, Vendor::GitHub, Vendor::GitLab];

    pub fn as_str(self) -> &'static str {
        match self {
            Vendor::Jenkins => "jenkins",
            Vendor::GitHub => "github",
            Vendor::GitLab => "gitlab",
        }
    }

    /// Base URL used when an integration setup omits one.
    pub fn default_base_url(self) -> Option<&'static str> {
        match self {
            Vendor::Jenkins => None,
            Vendor::GitHub => Some("https://api.github.com"),
            Vendor::GitLab => Some("https://gitlab.com"),
        }
    }
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Vendor {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "jenkins" => Ok(Vendor::Jenkins),
            "github" => Ok(Vendor::GitHub),
            "gitlab" => Ok(Vendor::GitLab),
            other => Err(DashboardError::InvalidReference(format!(
                "unknown vendor '{other}'"
            ))),
        }
    }
}

/// Username and password (or personal access token) for one vendor.
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Integration setup request, accepted from the API and from the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrationSetup {
    #[serde(flatten)]
    pub credentials: Credentials,

    #[serde(default, alias = "base-url")]
    pub base_url: Option<String>,

    /// GitHub repositories (`owner/repo`) whose workflow runs are listed as pipelines
    #[serde(default)]
    pub repositories: Vec<String>,

    /// GitLab project ids whose pipelines are listed
    #[serde(default)]
    pub projects: Vec<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Connected,
    Error,
}

/// Public view of a live vendor connection. Never carries credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionInfo {
    pub vendor: Vendor,
    pub username: String,
    pub base_url: String,
    /// Identity reported by the vendor (login, username, instance url)
    pub account: Option<String>,
    pub connected_at: DateTime<Utc>,
    pub status: ConnectionStatus,
    pub message: String,
}

/// A pipeline as listed by any vendor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    pub id: PipelineRef,
    pub vendor: Vendor,
    pub name: String,
    /// Raw vendor status (Jenkins ball color, GitHub conclusion, GitLab status)
    pub status: Option<String>,
    pub branch: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BuildStatus {
    Success,
    Failure,
    Unstable,
    Aborted,
    Running,
}

/// One execution of a pipeline, normalized across vendors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildRecord {
    pub id: BuildRef,
    pub pipeline: PipelineRef,
    pub vendor: Vendor,
    pub name: Option<String>,
    /// `None` when the vendor reports no usable result yet
    pub status: Option<BuildStatus>,
    /// Duration in milliseconds
    pub duration: u64,
    /// Start time as milliseconds since the Unix epoch
    pub timestamp: Option<i64>,
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logs: Option<String>,
}

impl BuildRecord {
    pub fn is_success(&self) -> bool {
        self.status == Some(BuildStatus::Success)
    }

    pub fn is_failure(&self) -> bool {
        self.status == Some(BuildStatus::Failure)
    }
}

/// A repository or project that can be watched by an integration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectSummary {
    pub id: String,
    pub name: String,
    pub url: Option<String>,
}

/// Milliseconds between two optional instants, zero when either is missing.
#[allow(clippy::cast_sign_loss)]
pub(crate) fn elapsed_ms(started: Option<DateTime<Utc>>, finished: Option<DateTime<Utc>>) -> u64 {
    match (started, finished) {
        (Some(start), Some(end)) if end >= start => (end - start).num_milliseconds() as u64,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vendor_parses_case_insensitively() {
        assert_eq!("GitHub".parse::<Vendor>().unwrap(), Vendor::GitHub);
        assert_eq!("jenkins".parse::<Vendor>().unwrap(), Vendor::Jenkins);
        assert!("circleci".parse::<Vendor>().is_err());
    }

    #[test]
    fn credentials_debug_hides_password() {
        let credentials = Credentials {
            username: "ci-bot".to_string(),
            password: "ghp_secret".to_string(),
        };
        let debug = format!("{credentials:?}");
        assert!(debug.contains("ci-bot"));
        assert!(!debug.contains("ghp_secret"));
    }

    #[test]
    fn integration_setup_accepts_flat_credentials() {
        let setup: IntegrationSetup = serde_json::from_str(
            r#"{"username": "bot", "password": "glpat-abc", "base_url": "https://gitlab.example.com", "projects": [7]}"#,
        )
        .unwrap();
        assert_eq!(setup.credentials.username, "bot");
        assert_eq!(setup.base_url.as_deref(), Some("https://gitlab.example.com"));
        assert_eq!(setup.projects, vec![7]);
        assert!(setup.repositories.is_empty());
    }

    #[test]
    fn build_status_uses_upper_case_wire_names() {
        assert_eq!(
            serde_json::to_string(&BuildStatus::Failure).unwrap(),
            "\"FAILURE\""
        );
    }

    #[test]
    fn elapsed_ms_handles_missing_and_reversed_instants() {
        let start = DateTime::parse_from_rfc3339("2024-05-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let end = DateTime::parse_from_rfc3339("2024-05-01T10:01:30Z")
            .unwrap()
            .with_timezone(&Utc);

        assert_eq!(elapsed_ms(Some(start), Some(end)), 90_000);
        assert_eq!(elapsed_ms(Some(end), Some(start)), 0);
        assert_eq!(elapsed_ms(None, Some(end)), 0);
    }
}
