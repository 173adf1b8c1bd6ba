use async_trait::async_trait;
use chrono::Utc;
use log::info;
use reqwest::header::HeaderMap;

use super::types::{JenkinsBuild, JenkinsJob, JenkinsRoot};
use crate::error::{DashboardError, Result};
use crate::providers::http::{Auth, HttpClient, HttpSettings};
use crate::providers::{
    foreign_reference, BuildRecord, ConnectionInfo, ConnectionStatus, Credentials,
    PipelineSummary, Vendor, VendorClient,
};
use crate::reference::{BuildRef, PipelineRef};

const JOB_TREE: &str = "jobs[name,url,color,description]";
const JOB_DETAIL_TREE: &str = "name,url,color,description";
const BUILD_FIELDS: &str = "number,url,timestamp,result,duration,description,building";

/// Jenkins REST (`/api/json`) client. Always authenticates with basic auth,
/// where the password is usually a Jenkins API token.
pub struct JenkinsClient {
    http: HttpClient,
    username: String,
}

impl JenkinsClient {
    /// Creates a Jenkins client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Controller URL, including any path prefix (e.g. "https://ci.example.com/jenkins")
    /// * `credentials` - Username and API token or password
    /// * `settings` - Shared HTTP settings (timeout, user agent)
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the HTTP client cannot be built.
    pub fn new(base_url: &str, credentials: &Credentials, settings: &HttpSettings) -> Result<Self> {
        let http = HttpClient::new(
            base_url,
            Auth::select(Vendor::Jenkins, credentials),
            settings,
            HeaderMap::new(),
        )?;

        Ok(Self {
            http,
            username: credentials.username.clone(),
        })
    }

    fn job_name(pipeline: &PipelineRef) -> Result<&str> {
        match pipeline {
            PipelineRef::Jenkins { job } => Ok(job),
            other => Err(foreign_reference(Vendor::Jenkins, other)),
        }
    }

    fn build_parts(build: &BuildRef) -> Result<(&str, String)> {
        match build {
            BuildRef::Jenkins { job, number } => Ok((job, number.to_string())),
            other => Err(foreign_reference(Vendor::Jenkins, other)),
        }
    }

    fn to_summary(job: JenkinsJob) -> PipelineSummary {
        PipelineSummary {
            id: PipelineRef::Jenkins {
                job: job.name.clone(),
            },
            vendor: Vendor::Jenkins,
            name: job.name,
            status: job.color,
            branch: None,
            url: job.url,
        }
    }

    fn to_record(job: &str, build: JenkinsBuild) -> BuildRecord {
        let pipeline = PipelineRef::Jenkins {
            job: job.to_string(),
        };

        BuildRecord {
            id: pipeline.build(build.number),
            status: build.status(),
            name: Some(
                build
                    .full_display_name
                    .unwrap_or_else(|| format!("{job} #{}", build.number)),
            ),
            duration: build.duration,
            timestamp: build.timestamp,
            url: build.url,
            logs: None,
            vendor: Vendor::Jenkins,
            pipeline,
        }
    }
}

#[async_trait]
impl VendorClient for JenkinsClient {
    fn vendor(&self) -> Vendor {
        Vendor::Jenkins
    }

    async fn connect(&self) -> Result<ConnectionInfo> {
        let root: JenkinsRoot = self
            .http
            .get_json(&["api", "json"], &[])
            .await
            .map_err(|e| DashboardError::Connect {
                vendor: Vendor::Jenkins,
                reason: e.to_string(),
            })?;

        info!("Connected to Jenkins at {}", self.http.base_url());

        Ok(ConnectionInfo {
            vendor: Vendor::Jenkins,
            username: self.username.clone(),
            base_url: self.http.base_url().to_string(),
            account: root.url,
            connected_at: Utc::now(),
            status: ConnectionStatus::Connected,
            message: "Successfully connected to Jenkins".to_string(),
        })
    }

    async fn list_pipelines(&self) -> Result<Vec<PipelineSummary>> {
        let root: JenkinsRoot = self
            .http
            .get_json(&["api", "json"], &[("tree", JOB_TREE.to_string())])
            .await?;

        Ok(root.jobs.into_iter().map(Self::to_summary).collect())
    }

    async fn get_pipeline(&self, pipeline: &PipelineRef) -> Result<PipelineSummary> {
        let job = Self::job_name(pipeline)?;
        let job: JenkinsJob = self
            .http
            .get_json(
                &["job", job, "api", "json"],
                &[("tree", JOB_DETAIL_TREE.to_string())],
            )
            .await?;

        Ok(Self::to_summary(job))
    }

    async fn list_builds(&self, pipeline: &PipelineRef, limit: usize) -> Result<Vec<BuildRecord>> {
        let job_name = Self::job_name(pipeline)?;
        let tree = format!("builds[{BUILD_FIELDS}]{{0,{limit}}}");

        let job: JenkinsJob = self
            .http
            .get_json(&["job", job_name, "api", "json"], &[("tree", tree)])
            .await?;

        Ok(job
            .builds
            .into_iter()
            .take(limit)
            .map(|build| Self::to_record(job_name, build))
            .collect())
    }

    async fn get_build(&self, build: &BuildRef) -> Result<BuildRecord> {
        let (job, number) = Self::build_parts(build)?;
        let details: JenkinsBuild = self
            .http
            .get_json(&["job", job, &number, "api", "json"], &[])
            .await?;

        Ok(Self::to_record(job, details))
    }

    async fn get_logs(&self, build: &BuildRef) -> Result<String> {
        let (job, number) = Self::build_parts(build)?;
        self.http.get_text(&["job", job, &number, "consoleText"]).await
    }

    async fn trigger_build(&self, pipeline: &PipelineRef) -> Result<()> {
        let job = Self::job_name(pipeline)?;
        self.http.post_empty(&["job", job, "build"]).await?;

        info!("Triggered Jenkins build for {job}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use mockito::Matcher;

    use super::*;

    const BASIC_ADMIN: &str = "Basic YWRtaW46YXBpLXRva2Vu";

    fn client(base_url: &str) -> JenkinsClient {
        JenkinsClient::new(
            base_url,
            &Credentials {
                username: "admin".to_string(),
                password: "api-token".to_string(),
            },
            &HttpSettings::default(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn connect_uses_basic_auth() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/json")
            .match_header("authorization", BASIC_ADMIN)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"description": null, "url": "https://ci.example.com/", "jobs": []}"#)
            .create_async()
            .await;

        let info = client(&server.url()).connect().await.unwrap();

        mock.assert_async().await;
        assert_eq!(info.vendor, Vendor::Jenkins);
        assert_eq!(info.username, "admin");
        assert_eq!(info.status, ConnectionStatus::Connected);
        assert_eq!(info.account.as_deref(), Some("https://ci.example.com/"));
    }

    #[tokio::test]
    async fn connect_failure_is_a_connect_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/json")
            .with_status(401)
            .with_body("Invalid password/token for user: admin")
            .create_async()
            .await;

        let err = client(&server.url()).connect().await.unwrap_err();
        match err {
            DashboardError::Connect { vendor, reason } => {
                assert_eq!(vendor, Vendor::Jenkins);
                assert!(reason.contains("401"));
            }
            other => panic!("expected Connect, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn list_pipelines_maps_jobs() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/json")
            .match_query(Matcher::UrlEncoded("tree".into(), JOB_TREE.into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"jobs": [
                    {"name": "api-server", "url": "https://ci/job/api-server/", "color": "blue"},
                    {"name": "web", "url": "https://ci/job/web/", "color": "red", "description": "frontend"}
                ]}"#,
            )
            .create_async()
            .await;

        let pipelines = client(&server.url()).list_pipelines().await.unwrap();

        assert_eq!(pipelines.len(), 2);
        assert_eq!(pipelines[0].id.to_string(), "jenkins:api-server");
        assert_eq!(pipelines[1].status.as_deref(), Some("red"));
    }

    #[tokio::test]
    async fn list_builds_requests_bounded_tree_and_normalizes() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/job/api-server/api/json")
            .match_query(Matcher::UrlEncoded(
                "tree".into(),
                format!("builds[{BUILD_FIELDS}]{{0,5}}"),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"name": "api-server", "builds": [
                    {"number": 12, "url": "https://ci/job/api-server/12/", "timestamp": 1714557600000, "result": "FAILURE", "duration": 42000, "building": false},
                    {"number": 13, "timestamp": 1714561200000, "result": null, "duration": 0, "building": true}
                ]}"#,
            )
            .create_async()
            .await;

        let pipeline = PipelineRef::parse("jenkins:api-server").unwrap();
        let builds = client(&server.url()).list_builds(&pipeline, 5).await.unwrap();

        assert_eq!(builds.len(), 2);
        assert_eq!(builds[0].id.to_string(), "jenkins:api-server:12");
        assert!(builds[0].is_failure());
        assert_eq!(builds[0].duration, 42_000);
        assert_eq!(builds[0].timestamp, Some(1_714_557_600_000));
        assert_eq!(builds[1].status, Some(crate::providers::BuildStatus::Running));
    }

    #[tokio::test]
    async fn get_logs_reads_console_text() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/job/api-server/12/consoleText")
            .with_status(200)
            .with_body("Started by user admin\nFinished: FAILURE\n")
            .create_async()
            .await;

        let build = BuildRef::parse("jenkins:api-server:12").unwrap();
        let logs = client(&server.url()).get_logs(&build).await.unwrap();

        assert!(logs.ends_with("Finished: FAILURE\n"));
    }

    #[tokio::test]
    async fn missing_build_is_a_fetch_error_with_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/job/api-server/99/api/json")
            .with_status(404)
            .with_body("Not Found")
            .create_async()
            .await;

        let build = BuildRef::parse("jenkins:api-server:99").unwrap();
        let err = client(&server.url()).get_build(&build).await.unwrap_err();

        assert!(matches!(
            err,
            DashboardError::Fetch { status: Some(404), ref body } if body == "Not Found"
        ));
    }

    #[tokio::test]
    async fn trigger_posts_to_build_endpoint() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/job/api-server/build")
            .with_status(201)
            .create_async()
            .await;

        let pipeline = PipelineRef::parse("jenkins:api-server").unwrap();
        client(&server.url()).trigger_build(&pipeline).await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn foreign_reference_is_rejected_without_a_request() {
        let pipeline = PipelineRef::parse("gitlab:1:2").unwrap();
        let err = client("http://127.0.0.1:9")
            .list_builds(&pipeline, 5)
            .await
            .unwrap_err();

        assert!(matches!(err, DashboardError::InvalidReference(_)));
    }
}
