use axum::extract::{
    rejection::{PathRejection, QueryRejection},
    Path, Query, State,
};
use serde::Deserialize;

use super::{ApiResponse, ApiResult, AppState};
use crate::aggregator::VendorListing;
use crate::providers::{BuildRecord, PipelineSummary};
use crate::reference::PipelineRef;

const DEFAULT_PIPELINE_BUILDS: usize = 20;
const MAX_PIPELINE_BUILDS: usize = 100;

#[derive(Debug, Default, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

pub async fn list_pipelines(
    State(state): State<AppState>,
) -> ApiResponse<VendorListing<PipelineSummary>> {
    let pipelines = state.aggregator.read().await.all_pipelines().await;
    let total = pipelines.total;
    ApiResponse::ok(pipelines, "Pipelines retrieved").with_total(total)
}

pub async fn get_pipeline(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> ApiResult<ApiResponse<PipelineSummary>> {
    let Path(id) = path?;
    let pipeline = PipelineRef::parse(&id)?;
    let summary = state.aggregator.read().await.pipeline(&pipeline).await?;
    Ok(ApiResponse::ok(summary, "Pipeline retrieved"))
}

pub async fn pipeline_builds(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    query: Result<Query<LimitQuery>, QueryRejection>,
) -> ApiResult<ApiResponse<Vec<BuildRecord>>> {
    let Path(id) = path?;
    let pipeline = PipelineRef::parse(&id)?;
    let Query(query) = query?;
    let limit = query
        .limit
        .unwrap_or(DEFAULT_PIPELINE_BUILDS)
        .clamp(1, MAX_PIPELINE_BUILDS);

    let builds = state
        .aggregator
        .read()
        .await
        .builds_for(&pipeline, limit)
        .await?;
    let count = builds.len();
    Ok(ApiResponse::ok(builds, format!("Builds retrieved for {pipeline}")).with_count(count))
}

pub async fn trigger_build(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> ApiResult<ApiResponse<PipelineRef>> {
    let Path(id) = path?;
    let pipeline = PipelineRef::parse(&id)?;
    state.aggregator.read().await.trigger(&pipeline).await?;
    let message = format!("Build triggered for {pipeline}");
    Ok(ApiResponse::ok(pipeline, message))
}
