use axum::extract::{
    rejection::{PathRejection, QueryRejection},
    Path, Query, State,
};
use serde::Serialize;

use super::pipelines::LimitQuery;
use super::{ApiResponse, ApiResult, AppState};
use crate::aggregator::{VendorListing, DEFAULT_BUILD_LIMIT};
use crate::providers::BuildRecord;
use crate::reference::BuildRef;

#[derive(Debug, Serialize)]
pub struct BuildLogs {
    pub id: BuildRef,
    pub logs: String,
}

pub async fn list_builds(
    State(state): State<AppState>,
    query: Result<Query<LimitQuery>, QueryRejection>,
) -> ApiResult<ApiResponse<VendorListing<BuildRecord>>> {
    let Query(query) = query?;
    let limit = query.limit.unwrap_or(DEFAULT_BUILD_LIMIT).max(1);

    let builds = state.aggregator.read().await.all_builds(limit).await;
    let total = builds.total;
    Ok(ApiResponse::ok(builds, "Builds retrieved").with_total(total))
}

pub async fn get_build(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> ApiResult<ApiResponse<BuildRecord>> {
    let Path(id) = path?;
    let build = BuildRef::parse(&id)?;
    let record = state.aggregator.read().await.build(&build).await?;
    Ok(ApiResponse::ok(record, "Build retrieved"))
}

pub async fn get_logs(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> ApiResult<ApiResponse<BuildLogs>> {
    let Path(id) = path?;
    let build = BuildRef::parse(&id)?;
    let logs = state.aggregator.read().await.logs(&build).await?;
    Ok(ApiResponse::ok(BuildLogs { id: build, logs }, "Build logs retrieved"))
}
