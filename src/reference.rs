//! Composite pipeline and build identifiers.
//!
//! Every pipeline and build exposed by the dashboard is addressed by a
//! colon-delimited string whose first segment names the vendor:
//!
//! | Kind     | Jenkins                    | GitHub                            | GitLab                              |
//! |----------|----------------------------|-----------------------------------|-------------------------------------|
//! | pipeline | `jenkins:job`              | `github:owner/repo:run_id`        | `gitlab:project_id:pipeline_id`     |
//! | build    | `jenkins:job:build_number` | `github:owner/repo:run_id:job_id` | `gitlab:project_id:pipeline_id:job_id` |
//!
//! Parsing only accepts the canonical form, so `parse` followed by `to_string`
//! always reproduces the input.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{DashboardError, Result};
use crate::providers::Vendor;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum PipelineRef {
    Jenkins { job: String },
    GitHub { owner: String, repo: String, run_id: u64 },
    GitLab { project_id: u64, pipeline_id: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum BuildRef {
    Jenkins {
        job: String,
        number: u64,
    },
    GitHub {
        owner: String,
        repo: String,
        run_id: u64,
        job_id: u64,
    },
    GitLab {
        project_id: u64,
        pipeline_id: u64,
        job_id: u64,
    },
}

impl PipelineRef {
    pub fn vendor(&self) -> Vendor {
        match self {
            Self::Jenkins { .. } => Vendor::Jenkins,
            Self::GitHub { .. } => Vendor::GitHub,
            Self::GitLab { .. } => Vendor::GitLab,
        }
    }

    /// Parses a pipeline reference, rejecting anything that is not canonical.
    ///
    /// # Errors
    ///
    /// Returns `InvalidReference` when the vendor tag is unknown, the segment
    /// count is wrong, or a segment is empty or not a canonical number.
    pub fn parse(input: &str) -> Result<Self> {
        let segments: Vec<&str> = input.split(':').collect();

        match segments.as_slice() {
            ["jenkins", job] => Ok(Self::Jenkins {
                job: job_name(input, job)?,
            }),
            ["github", repo_path, run_id] => {
                let (owner, repo) = repo_path_parts(input, repo_path)?;
                Ok(Self::GitHub {
                    owner,
                    repo,
                    run_id: numeric(input, run_id)?,
                })
            }
            ["gitlab", project_id, pipeline_id] => Ok(Self::GitLab {
                project_id: numeric(input, project_id)?,
                pipeline_id: numeric(input, pipeline_id)?,
            }),
            _ => Err(invalid(input, "expected jenkins:job, github:owner/repo:run or gitlab:project:pipeline")),
        }
    }

    /// Builds the reference of a build belonging to this pipeline.
    ///
    /// Jenkins builds are keyed by build number, GitHub and GitLab builds by job id.
    pub fn build(&self, id: u64) -> BuildRef {
        match self {
            Self::Jenkins { job } => BuildRef::Jenkins {
                job: job.clone(),
                number: id,
            },
            Self::GitHub {
                owner,
                repo,
                run_id,
            } => BuildRef::GitHub {
                owner: owner.clone(),
                repo: repo.clone(),
                run_id: *run_id,
                job_id: id,
            },
            Self::GitLab {
                project_id,
                pipeline_id,
            } => BuildRef::GitLab {
                project_id: *project_id,
                pipeline_id: *pipeline_id,
                job_id: id,
            },
        }
    }
}

impl BuildRef {
    pub fn vendor(&self) -> Vendor {
        self.pipeline().vendor()
    }

    /// Parses a build reference, rejecting anything that is not canonical.
    ///
    /// # Errors
    ///
    /// Returns `InvalidReference` for malformed input; partial matches such as a
    /// pipeline reference are never accepted as a build.
    pub fn parse(input: &str) -> Result<Self> {
        let segments: Vec<&str> = input.split(':').collect();

        match segments.as_slice() {
            ["jenkins", job, number] => Ok(Self::Jenkins {
                job: job_name(input, job)?,
                number: numeric(input, number)?,
            }),
            ["github", repo_path, run_id, job_id] => {
                let (owner, repo) = repo_path_parts(input, repo_path)?;
                Ok(Self::GitHub {
                    owner,
                    repo,
                    run_id: numeric(input, run_id)?,
                    job_id: numeric(input, job_id)?,
                })
            }
            ["gitlab", project_id, pipeline_id, job_id] => Ok(Self::GitLab {
                project_id: numeric(input, project_id)?,
                pipeline_id: numeric(input, pipeline_id)?,
                job_id: numeric(input, job_id)?,
            }),
            _ => Err(invalid(
                input,
                "expected jenkins:job:number, github:owner/repo:run:job or gitlab:project:pipeline:job",
            )),
        }
    }

    /// The pipeline this build belongs to.
    pub fn pipeline(&self) -> PipelineRef {
        match self {
            Self::Jenkins { job, .. } => PipelineRef::Jenkins { job: job.clone() },
            Self::GitHub {
                owner,
                repo,
                run_id,
                ..
            } => PipelineRef::GitHub {
                owner: owner.clone(),
                repo: repo.clone(),
                run_id: *run_id,
            },
            Self::GitLab {
                project_id,
                pipeline_id,
                ..
            } => PipelineRef::GitLab {
                project_id: *project_id,
                pipeline_id: *pipeline_id,
            },
        }
    }
}

impl fmt::Display for PipelineRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Jenkins { job } => write!(f, "jenkins:{job}"),
            Self::GitHub {
                owner,
                repo,
                run_id,
            } => write!(f, "github:{owner}/{repo}:{run_id}"),
            Self::GitLab {
                project_id,
                pipeline_id,
            } => write!(f, "gitlab:{project_id}:{pipeline_id}"),
        }
    }
}

impl fmt::Display for BuildRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Jenkins { job, number } => write!(f, "jenkins:{job}:{number}"),
            Self::GitHub {
                owner,
                repo,
                run_id,
                job_id,
            } => write!(f, "github:{owner}/{repo}:{run_id}:{job_id}"),
            Self::GitLab {
                project_id,
                pipeline_id,
                job_id,
            } => write!(f, "gitlab:{project_id}:{pipeline_id}:{job_id}"),
        }
    }
}

impl FromStr for PipelineRef {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl FromStr for BuildRef {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl From<PipelineRef> for String {
    fn from(value: PipelineRef) -> Self {
        value.to_string()
    }
}

impl From<BuildRef> for String {
    fn from(value: BuildRef) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for PipelineRef {
    type Error = DashboardError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl TryFrom<String> for BuildRef {
    type Error = DashboardError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

fn invalid(input: &str, reason: &str) -> DashboardError {
    DashboardError::InvalidReference(format!("'{input}': {reason}"))
}

fn job_name(input: &str, segment: &str) -> Result<String> {
    if segment.is_empty() {
        return Err(invalid(input, "job name is empty"));
    }
    Ok(segment.to_string())
}

fn repo_path_parts(input: &str, segment: &str) -> Result<(String, String)> {
    match segment.split('/').collect::<Vec<_>>().as_slice() {
        [owner, repo] if !owner.is_empty() && !repo.is_empty() => {
            Ok(((*owner).to_string(), (*repo).to_string()))
        }
        _ => Err(invalid(input, "repository must be in format 'owner/repo'")),
    }
}

/// Accepts only canonical decimal numbers so formatting reproduces the input.
fn numeric(input: &str, segment: &str) -> Result<u64> {
    let canonical = !segment.is_empty()
        && segment.bytes().all(|b| b.is_ascii_digit())
        && (segment == "0" || !segment.starts_with('0'));

    if !canonical {
        return Err(invalid(input, &format!("'{segment}' is not a valid numeric id")));
    }

    segment
        .parse()
        .map_err(|_| invalid(input, &format!("'{segment}' is out of range")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn github_build_reference_parses_into_parts() {
        let reference = BuildRef::parse("github:acme/widgets:55:7").unwrap();

        assert_eq!(
            reference,
            BuildRef::GitHub {
                owner: "acme".to_string(),
                repo: "widgets".to_string(),
                run_id: 55,
                job_id: 7,
            }
        );
        assert_eq!(reference.to_string(), "github:acme/widgets:55:7");
    }

    #[test]
    fn references_round_trip_for_every_vendor() {
        for input in [
            "jenkins:nightly-build",
            "github:acme/widgets:55",
            "gitlab:42:1001",
        ] {
            assert_eq!(PipelineRef::parse(input).unwrap().to_string(), input);
        }

        for input in [
            "jenkins:nightly-build:12",
            "github:acme/widgets:55:7",
            "gitlab:42:1001:9",
        ] {
            assert_eq!(BuildRef::parse(input).unwrap().to_string(), input);
        }
    }

    #[test]
    fn build_reference_knows_its_pipeline() {
        let build = BuildRef::parse("gitlab:42:1001:9").unwrap();
        assert_eq!(build.pipeline().to_string(), "gitlab:42:1001");
        assert_eq!(build.vendor(), Vendor::GitLab);
        assert_eq!(build.pipeline().build(9), build);
    }

    #[test]
    fn malformed_references_are_rejected() {
        for input in [
            "",
            "jenkins",
            "jenkins:",
            "circleci:job",
            "github:acme:55",
            "github:acme/widgets/extra:55",
            "github:/widgets:55",
            "gitlab:42",
            "gitlab:42:abc",
            "gitlab:42:1001:9:1",
        ] {
            let err = PipelineRef::parse(input).unwrap_err();
            assert!(
                matches!(err, DashboardError::InvalidReference(_)),
                "expected InvalidReference for {input:?}"
            );
        }
    }

    #[test]
    fn pipeline_reference_is_not_accepted_as_build() {
        assert!(BuildRef::parse("gitlab:42:1001").is_err());
        assert!(BuildRef::parse("jenkins:nightly").is_err());
        assert!(PipelineRef::parse("jenkins:nightly:3").is_err());
    }

    #[test]
    fn non_canonical_numbers_are_rejected() {
        assert!(BuildRef::parse("jenkins:job:007").is_err());
        assert!(BuildRef::parse("jenkins:job:+7").is_err());
        assert!(BuildRef::parse("jenkins:job:-7").is_err());
        assert!(BuildRef::parse("jenkins:job:0").is_ok());
    }

    #[test]
    fn references_serialize_as_strings() {
        let reference = PipelineRef::parse("github:acme/widgets:55").unwrap();
        let json = serde_json::to_string(&reference).unwrap();
        assert_eq!(json, "\"github:acme/widgets:55\"");

        let back: PipelineRef = serde_json::from_str(&json).unwrap();
        assert_eq!(back, reference);

        assert!(serde_json::from_str::<BuildRef>("\"github:acme:1:2\"").is_err());
    }
}
