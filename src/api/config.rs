use std::collections::BTreeMap;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    Json,
};
use serde::Serialize;

use super::{ApiResponse, ApiResult, AppState};
use crate::error::DashboardError;
use crate::providers::{
    client_for, ConnectionInfo, IntegrationSetup, ProjectSummary, Vendor,
};

#[derive(Debug, Serialize)]
pub struct ServerSummary {
    pub version: &'static str,
    pub vendors: [Vendor; 3],
    pub http_timeout_secs: u64,
    pub alert_list_limit: usize,
    pub github_webhook_secret: bool,
    pub gitlab_webhook_secret: bool,
}

/// Non-secret view of the running configuration.
pub async fn get_config(State(state): State<AppState>) -> ApiResponse<ServerSummary> {
    let summary = ServerSummary {
        version: env!("CARGO_PKG_VERSION"),
        vendors: Vendor::ALL,
        http_timeout_secs: state.http.timeout.as_secs(),
        alert_list_limit: state.alerts.lock().await.default_limit(),
        github_webhook_secret: state.secrets.github.is_some(),
        gitlab_webhook_secret: state.secrets.gitlab.is_some(),
    };

    ApiResponse::ok(summary, "Configuration retrieved")
}

pub async fn list_integrations(
    State(state): State<AppState>,
) -> ApiResponse<BTreeMap<Vendor, ConnectionInfo>> {
    let status = state.aggregator.read().await.connection_status();
    let count = status.len();
    ApiResponse::ok(status, "Integration status retrieved").with_count(count)
}

pub async fn test_integrations(
    State(state): State<AppState>,
) -> ApiResponse<BTreeMap<Vendor, ConnectionInfo>> {
    let checks = state.aggregator.read().await.check_connections().await;
    let results = state.aggregator.write().await.record_checks(checks);
    let count = results.len();
    ApiResponse::ok(results, "Connection tests completed").with_count(count)
}

pub async fn disconnect_all(State(state): State<AppState>) -> ApiResponse<usize> {
    let removed = state.aggregator.write().await.disconnect_all();
    ApiResponse::ok(removed, "All services disconnected successfully")
}

/// Verifies the credentials first and only then replaces the live connection,
/// so a failed attempt keeps the previous client.
pub async fn connect_integration(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    payload: Result<Json<IntegrationSetup>, JsonRejection>,
) -> ApiResult<ApiResponse<ConnectionInfo>> {
    let Path(vendor) = path?;
    let vendor: Vendor = vendor.parse()?;
    let Json(setup) = payload?;

    let client = client_for(vendor, &setup, &state.http).map_err(|e| match e {
        DashboardError::Config(message) => DashboardError::InvalidPayload(message),
        other => other,
    })?;
    let info = client.connect().await?;

    state
        .aggregator
        .write()
        .await
        .insert(client, info.clone());

    let message = info.message.clone();
    Ok(ApiResponse::ok(info, message))
}

pub async fn disconnect_integration(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> ApiResult<ApiResponse<Vendor>> {
    let Path(vendor) = path?;
    let vendor: Vendor = vendor.parse()?;
    state.aggregator.write().await.disconnect(vendor)?;
    Ok(ApiResponse::ok(
        vendor,
        format!("{vendor} service disconnected successfully"),
    ))
}

pub async fn list_projects(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> ApiResult<ApiResponse<Vec<ProjectSummary>>> {
    let Path(vendor) = path?;
    let vendor: Vendor = vendor.parse()?;
    let projects = state.aggregator.read().await.projects(vendor).await?;
    let count = projects.len();
    Ok(ApiResponse::ok(projects, format!("Projects retrieved from {vendor}")).with_count(count))
}
