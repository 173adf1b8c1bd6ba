use mockito::Matcher;

use super::client::GitHubClient;
use crate::error::DashboardError;
use crate::providers::{BuildStatus, Credentials, HttpSettings, VendorClient};
use crate::reference::{BuildRef, PipelineRef};

fn client(base_url: &str, password: &str, repositories: &[&str]) -> GitHubClient {
    let repositories: Vec<String> = repositories.iter().map(ToString::to_string).collect();
    GitHubClient::new(
        base_url,
        &Credentials {
            username: "octo".to_string(),
            password: password.to_string(),
        },
        &repositories,
        &HttpSettings::default(),
    )
    .unwrap()
}

#[test]
fn test_github_client_invalid_repo_path() {
    let result = GitHubClient::new(
        "https://api.github.com",
        &Credentials {
            username: "octo".to_string(),
            password: "ghp_x".to_string(),
        },
        &["invalid-path".to_string()],
        &HttpSettings::default(),
    );

    let err = result.err().unwrap();
    assert!(matches!(err, DashboardError::Config(_)));
    assert!(err.to_string().contains("owner/repo"));
}

#[test]
fn test_github_client_repo_path_with_multiple_slashes() {
    let result = GitHubClient::new(
        "https://api.github.com",
        &Credentials {
            username: "octo".to_string(),
            password: "ghp_x".to_string(),
        },
        &["owner/repo/extra".to_string()],
        &HttpSettings::default(),
    );

    assert!(result.is_err());
}

#[tokio::test]
async fn test_connect_sends_pat_as_token_header() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/user")
        .match_header("authorization", "token ghp_abc123")
        .match_header("accept", "application/vnd.github.v3+json")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"login": "octocat"}"#)
        .create_async()
        .await;

    let info = client(&server.url(), "ghp_abc123", &[])
        .connect()
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(info.account.as_deref(), Some("octocat"));
    assert_eq!(info.message, "Successfully connected to GitHub as octocat");
}

#[tokio::test]
async fn test_connect_falls_back_to_basic_auth() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/user")
        .match_header("authorization", "Basic b2N0bzpodW50ZXIy")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"login": "octo"}"#)
        .create_async()
        .await;

    client(&server.url(), "hunter2", &[])
        .connect()
        .await
        .unwrap();

    mock.assert_async().await;
}

#[tokio::test]
async fn test_list_pipelines_without_watched_repositories_is_empty() {
    let pipelines = client("http://127.0.0.1:9", "ghp_x", &[])
        .list_pipelines()
        .await
        .unwrap();

    assert!(pipelines.is_empty());
}

#[tokio::test]
async fn test_list_pipelines_skips_failing_repository() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/repos/acme/widgets/actions/runs")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"total_count": 1, "workflow_runs": [
                {"id": 55, "name": "CI", "head_branch": "main", "status": "completed",
                 "conclusion": "failure", "html_url": "https://github.com/acme/widgets/actions/runs/55"}
            ]}"#,
        )
        .create_async()
        .await;
    server
        .mock("GET", "/repos/acme/gone/actions/runs")
        .match_query(Matcher::Any)
        .with_status(404)
        .with_body(r#"{"message": "Not Found"}"#)
        .create_async()
        .await;

    let pipelines = client(&server.url(), "ghp_x", &["acme/widgets", "acme/gone"])
        .list_pipelines()
        .await
        .unwrap();

    assert_eq!(pipelines.len(), 1);
    assert_eq!(pipelines[0].id.to_string(), "github:acme/widgets:55");
    assert_eq!(pipelines[0].status.as_deref(), Some("failure"));
    assert_eq!(pipelines[0].branch.as_deref(), Some("main"));
}

#[tokio::test]
async fn test_list_builds_maps_jobs_of_a_run() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/repos/acme/widgets/actions/runs/55/jobs")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"total_count": 2, "jobs": [
                {"id": 7, "run_id": 55, "name": "test", "status": "completed", "conclusion": "failure",
                 "started_at": "2024-05-01T10:00:00Z", "completed_at": "2024-05-01T10:02:00Z"},
                {"id": 8, "run_id": 55, "name": "deploy", "status": "in_progress", "conclusion": null,
                 "started_at": "2024-05-01T10:02:00Z", "completed_at": null}
            ]}"#,
        )
        .create_async()
        .await;

    let pipeline = PipelineRef::parse("github:acme/widgets:55").unwrap();
    let builds = client(&server.url(), "ghp_x", &[])
        .list_builds(&pipeline, 5)
        .await
        .unwrap();

    assert_eq!(builds.len(), 2);
    assert_eq!(builds[0].id.to_string(), "github:acme/widgets:55:7");
    assert_eq!(builds[0].status, Some(BuildStatus::Failure));
    assert_eq!(builds[0].duration, 120_000);
    assert_eq!(builds[1].status, Some(BuildStatus::Running));
    assert_eq!(builds[1].duration, 0);
}

#[tokio::test]
async fn test_get_logs_fetches_job_logs() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/repos/acme/widgets/actions/jobs/7/logs")
        .with_status(200)
        .with_body("2024-05-01T10:00:01Z Run cargo test\n")
        .create_async()
        .await;

    let build = BuildRef::parse("github:acme/widgets:55:7").unwrap();
    let logs = client(&server.url(), "ghp_x", &[])
        .get_logs(&build)
        .await
        .unwrap();

    assert!(logs.contains("cargo test"));
}

#[tokio::test]
async fn test_get_build_checks_the_owning_run() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/repos/acme/widgets/actions/jobs/7")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"id": 7, "run_id": 55, "name": "test", "status": "completed", "conclusion": "failure",
                "started_at": "2024-05-01T10:00:00Z", "completed_at": "2024-05-01T10:02:00Z"}"#,
        )
        .create_async()
        .await;
    let client = client(&server.url(), "ghp_x", &[]);

    let build = BuildRef::parse("github:acme/widgets:55:7").unwrap();
    let record = client.get_build(&build).await.unwrap();
    assert_eq!(record.id, build);
    assert_eq!(record.status, Some(BuildStatus::Failure));
    assert_eq!(record.duration, 120_000);

    let wrong = BuildRef::parse("github:acme/widgets:1:7").unwrap();
    let err = client.get_build(&wrong).await.unwrap_err();
    assert!(matches!(err, DashboardError::NotFound(_)), "got {err:?}");
}

#[tokio::test]
async fn test_trigger_is_unsupported() {
    let pipeline = PipelineRef::parse("github:acme/widgets:55").unwrap();
    let err = client("http://127.0.0.1:9", "ghp_x", &[])
        .trigger_build(&pipeline)
        .await
        .unwrap_err();

    assert!(matches!(err, DashboardError::Unsupported(_)));
}
