use async_trait::async_trait;
use chrono::Utc;
use log::{info, warn};

use super::types::{GitLabJob, GitLabPipeline, GitLabProject, GitLabUser};
use crate::error::{DashboardError, Result};
use crate::providers::http::{Auth, HttpClient, HttpSettings};
use crate::providers::{
    foreign_reference, BuildRecord, ConnectionInfo, ConnectionStatus, Credentials,
    PipelineSummary, ProjectSummary, Vendor, VendorClient,
};
use crate::reference::{BuildRef, PipelineRef};

/// Pipelines listed per watched project.
const PIPELINES_PER_PROJECT: usize = 20;

/// GitLab REST (`/api/v4`) client.
///
/// Pipelines are listed for the watched project ids; each pipeline job is a build.
pub struct GitLabClient {
    http: HttpClient,
    username: String,
    projects: Vec<u64>,
}

impl GitLabClient {
    /// Creates a GitLab client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - GitLab instance base URL (e.g., <https://gitlab.com>)
    /// * `credentials` - Username and password, or a `glpat-` personal access token
    /// * `projects` - Watched project ids
    /// * `settings` - Shared HTTP settings
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the HTTP client cannot be built.
    pub fn new(
        base_url: &str,
        credentials: &Credentials,
        projects: Vec<u64>,
        settings: &HttpSettings,
    ) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::CONTENT_TYPE,
            reqwest::header::HeaderValue::from_static("application/json"),
        );

        let http = HttpClient::new(
            base_url,
            Auth::select(Vendor::GitLab, credentials),
            settings,
            headers,
        )?;

        Ok(Self {
            http,
            username: credentials.username.clone(),
            projects,
        })
    }

    fn pipeline_parts(pipeline: &PipelineRef) -> Result<(u64, u64)> {
        match pipeline {
            PipelineRef::GitLab {
                project_id,
                pipeline_id,
            } => Ok((*project_id, *pipeline_id)),
            other => Err(foreign_reference(Vendor::GitLab, other)),
        }
    }

    fn job_parts(build: &BuildRef) -> Result<(u64, u64, u64)> {
        match build {
            BuildRef::GitLab {
                project_id,
                pipeline_id,
                job_id,
            } => Ok((*project_id, *pipeline_id, *job_id)),
            other => Err(foreign_reference(Vendor::GitLab, other)),
        }
    }

    async fn fetch_pipelines(&self, project_id: u64) -> Result<Vec<GitLabPipeline>> {
        let project = project_id.to_string();
        self.http
            .get_json(
                &["api", "v4", "projects", &project, "pipelines"],
                &[("per_page", PIPELINES_PER_PROJECT.to_string())],
            )
            .await
    }

    fn to_summary(project_id: u64, pipeline: GitLabPipeline) -> PipelineSummary {
        let branch = pipeline.ref_.clone();
        let name = match (&pipeline.ref_, &pipeline.source) {
            (Some(ref_), Some(source)) => format!("{ref_} #{} ({source})", pipeline.id),
            (Some(ref_), None) => format!("{ref_} #{}", pipeline.id),
            _ => format!("pipeline #{}", pipeline.id),
        };

        PipelineSummary {
            id: PipelineRef::GitLab {
                project_id,
                pipeline_id: pipeline.id,
            },
            vendor: Vendor::GitLab,
            name,
            status: Some(pipeline.status),
            branch,
            url: pipeline.web_url,
        }
    }

    fn to_record(pipeline: &PipelineRef, job: GitLabJob) -> BuildRecord {
        BuildRecord {
            id: pipeline.build(job.id),
            pipeline: pipeline.clone(),
            vendor: Vendor::GitLab,
            status: job.build_status(),
            duration: job.duration_ms(),
            timestamp: job.started_at.map(|t| t.timestamp_millis()),
            name: Some(job.name),
            url: job.web_url,
            logs: None,
        }
    }
}

#[async_trait]
impl VendorClient for GitLabClient {
    fn vendor(&self) -> Vendor {
        Vendor::GitLab
    }

    async fn connect(&self) -> Result<ConnectionInfo> {
        let user: GitLabUser = self
            .http
            .get_json(&["api", "v4", "user"], &[])
            .await
            .map_err(|e| DashboardError::Connect {
                vendor: Vendor::GitLab,
                reason: e.to_string(),
            })?;

        info!("Connected to GitLab as {}", user.username);

        Ok(ConnectionInfo {
            vendor: Vendor::GitLab,
            username: self.username.clone(),
            base_url: self.http.base_url().to_string(),
            message: format!("Successfully connected to GitLab as {}", user.username),
            account: Some(user.username),
            connected_at: Utc::now(),
            status: ConnectionStatus::Connected,
        })
    }

    async fn list_pipelines(&self) -> Result<Vec<PipelineSummary>> {
        let mut pipelines = Vec::new();

        for &project_id in &self.projects {
            match self.fetch_pipelines(project_id).await {
                Ok(found) => pipelines.extend(
                    found
                        .into_iter()
                        .map(|pipeline| Self::to_summary(project_id, pipeline)),
                ),
                Err(e) => warn!("Failed to fetch pipelines for GitLab project {project_id}: {e}"),
            }
        }

        Ok(pipelines)
    }

    async fn get_pipeline(&self, pipeline: &PipelineRef) -> Result<PipelineSummary> {
        let (project_id, pipeline_id) = Self::pipeline_parts(pipeline)?;
        let found: GitLabPipeline = self
            .http
            .get_json(
                &[
                    "api",
                    "v4",
                    "projects",
                    &project_id.to_string(),
                    "pipelines",
                    &pipeline_id.to_string(),
                ],
                &[],
            )
            .await?;

        Ok(Self::to_summary(project_id, found))
    }

    async fn list_builds(&self, pipeline: &PipelineRef, limit: usize) -> Result<Vec<BuildRecord>> {
        let (project_id, pipeline_id) = Self::pipeline_parts(pipeline)?;
        let jobs: Vec<GitLabJob> = self
            .http
            .get_json(
                &[
                    "api",
                    "v4",
                    "projects",
                    &project_id.to_string(),
                    "pipelines",
                    &pipeline_id.to_string(),
                    "jobs",
                ],
                &[("per_page", limit.clamp(1, 100).to_string())],
            )
            .await?;

        Ok(jobs
            .into_iter()
            .take(limit)
            .map(|job| Self::to_record(pipeline, job))
            .collect())
    }

    /// Fetches a job and checks it belongs to the pipeline named by the reference.
    async fn get_build(&self, build: &BuildRef) -> Result<BuildRecord> {
        let (project_id, pipeline_id, job_id) = Self::job_parts(build)?;
        let job: GitLabJob = self
            .http
            .get_json(
                &[
                    "api",
                    "v4",
                    "projects",
                    &project_id.to_string(),
                    "jobs",
                    &job_id.to_string(),
                ],
                &[],
            )
            .await?;

        if let Some(actual) = job.pipeline.as_ref().map(|p| p.id) {
            if actual != pipeline_id {
                return Err(DashboardError::NotFound(format!(
                    "GitLab job {job_id} belongs to pipeline {actual}, not {pipeline_id}"
                )));
            }
        }

        Ok(Self::to_record(&build.pipeline(), job))
    }

    async fn get_logs(&self, build: &BuildRef) -> Result<String> {
        let (project_id, _, job_id) = Self::job_parts(build)?;
        self.http
            .get_text(&[
                "api",
                "v4",
                "projects",
                &project_id.to_string(),
                "jobs",
                &job_id.to_string(),
                "trace",
            ])
            .await
    }

    async fn list_projects(&self) -> Result<Vec<ProjectSummary>> {
        let projects: Vec<GitLabProject> = self
            .http
            .get_json(
                &["api", "v4", "projects"],
                &[
                    ("membership", "true".to_string()),
                    ("per_page", "100".to_string()),
                ],
            )
            .await?;

        Ok(projects
            .into_iter()
            .map(|p| ProjectSummary {
                id: p.id.to_string(),
                name: p.path_with_namespace,
                url: p.web_url,
            })
            .collect())
    }
}
