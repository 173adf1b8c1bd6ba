use axum::extract::{rejection::QueryRejection, Query, State};
use serde::Deserialize;

use super::{ApiResponse, ApiResult, AppState};
use crate::metrics::{DashboardMetrics, PipelineMetrics, TrendMetrics};

const DEFAULT_TREND_DAYS: u32 = 7;

#[derive(Debug, Deserialize)]
pub struct TrendQuery {
    pub days: Option<u32>,
}

pub async fn dashboard(State(state): State<AppState>) -> ApiResponse<DashboardMetrics> {
    let metrics = state.aggregator.read().await.dashboard_metrics().await;
    ApiResponse::ok(metrics, "Dashboard metrics retrieved")
}

pub async fn pipelines(State(state): State<AppState>) -> ApiResponse<PipelineMetrics> {
    let metrics = state.aggregator.read().await.pipeline_metrics().await;
    ApiResponse::ok(metrics, "Pipeline metrics retrieved")
}

pub async fn trends(
    State(state): State<AppState>,
    query: Result<Query<TrendQuery>, QueryRejection>,
) -> ApiResult<ApiResponse<TrendMetrics>> {
    let Query(query) = query?;
    let days = query.days.unwrap_or(DEFAULT_TREND_DAYS);

    let trends = state.aggregator.read().await.trend_metrics(days).await;
    let count = trends.trends.len();
    Ok(ApiResponse::ok(trends, "Trend metrics retrieved").with_count(count))
}
