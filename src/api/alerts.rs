use axum::{
    body::Bytes,
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use super::{optional_json, ApiError, ApiResponse, ApiResult, AppState};
use crate::alerts::{
    Alert, AlertFilter, AlertRule, AlertStats, AlertUpdate, NewAlert, NewRule, RuleUpdate,
};

const DEFAULT_DEMO_COUNT: usize = 10;
const DEFAULT_USER: &str = "system";

#[derive(Debug, Deserialize)]
pub struct DemoRequest {
    #[serde(default = "default_demo_count")]
    pub count: usize,
}

impl Default for DemoRequest {
    fn default() -> Self {
        Self {
            count: DEFAULT_DEMO_COUNT,
        }
    }
}

fn default_demo_count() -> usize {
    DEFAULT_DEMO_COUNT
}

#[derive(Debug, Default, Deserialize)]
pub struct AcknowledgeRequest {
    pub user: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResolveRequest {
    pub user: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Removed {
    pub removed: usize,
}

pub async fn list_alerts(
    State(state): State<AppState>,
    filter: Result<Query<AlertFilter>, QueryRejection>,
) -> ApiResult<ApiResponse<Vec<Alert>>> {
    let Query(filter) = filter?;
    let store = state.alerts.lock().await;
    let alerts = store.list(&filter);
    let total = store.len();
    let count = alerts.len();

    Ok(ApiResponse::ok(alerts, "Alerts retrieved")
        .with_count(count)
        .with_total(total))
}

pub async fn create_alert(
    State(state): State<AppState>,
    payload: Result<Json<NewAlert>, JsonRejection>,
) -> ApiResult<(StatusCode, ApiResponse<Alert>)> {
    let Json(fields) = payload?;
    let alert = state.alerts.lock().await.create(fields)?;
    Ok((StatusCode::CREATED, ApiResponse::ok(alert, "Alert created")))
}

pub async fn alert_stats(State(state): State<AppState>) -> ApiResponse<AlertStats> {
    let stats = state.alerts.lock().await.stats();
    ApiResponse::ok(stats, "Alert statistics retrieved")
}

pub async fn generate_demo(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<(StatusCode, ApiResponse<Vec<Alert>>)> {
    let request: DemoRequest = optional_json(&body)?;
    let created = state.alerts.lock().await.generate_demo(request.count)?;
    let count = created.len();

    Ok((
        StatusCode::CREATED,
        ApiResponse::ok(created, format!("Generated {count} demo alerts")).with_count(count),
    ))
}

pub async fn clear_demo(State(state): State<AppState>) -> ApiResponse<Removed> {
    let removed = state.alerts.lock().await.clear_demo();
    ApiResponse::ok(Removed { removed }, format!("Removed {removed} demo alerts"))
}

pub async fn get_alert(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> ApiResult<ApiResponse<Alert>> {
    let Path(id) = path?;
    let alert = state
        .alerts
        .lock()
        .await
        .get(&id)
        .cloned()
        .ok_or_else(|| ApiError::not_found(format!("Alert '{id}' not found")))?;
    Ok(ApiResponse::ok(alert, "Alert retrieved"))
}

pub async fn update_alert(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    payload: Result<Json<AlertUpdate>, JsonRejection>,
) -> ApiResult<ApiResponse<Alert>> {
    let Path(id) = path?;
    let Json(changes) = payload?;
    let alert = state.alerts.lock().await.update(&id, changes)?;
    Ok(ApiResponse::ok(alert, "Alert updated"))
}

pub async fn delete_alert(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> ApiResult<ApiResponse<Alert>> {
    let Path(id) = path?;
    let alert = state.alerts.lock().await.delete(&id)?;
    Ok(ApiResponse::ok(alert, "Alert deleted"))
}

pub async fn acknowledge_alert(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    body: Bytes,
) -> ApiResult<ApiResponse<Alert>> {
    let Path(id) = path?;
    let request: AcknowledgeRequest = optional_json(&body)?;
    let user = request.user.as_deref().unwrap_or(DEFAULT_USER);
    let alert = state.alerts.lock().await.acknowledge(&id, user)?;
    Ok(ApiResponse::ok(alert, "Alert acknowledged"))
}

pub async fn resolve_alert(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    body: Bytes,
) -> ApiResult<ApiResponse<Alert>> {
    let Path(id) = path?;
    let request: ResolveRequest = optional_json(&body)?;
    let user = request.user.as_deref().unwrap_or(DEFAULT_USER);
    let alert = state
        .alerts
        .lock()
        .await
        .resolve(&id, user, request.notes)?;
    Ok(ApiResponse::ok(alert, "Alert resolved"))
}

pub async fn list_rules(State(state): State<AppState>) -> ApiResponse<Vec<AlertRule>> {
    let rules = state.alerts.lock().await.list_rules();
    let count = rules.len();
    ApiResponse::ok(rules, "Alert rules retrieved").with_count(count)
}

pub async fn create_rule(
    State(state): State<AppState>,
    payload: Result<Json<NewRule>, JsonRejection>,
) -> ApiResult<(StatusCode, ApiResponse<AlertRule>)> {
    let Json(fields) = payload?;
    let rule = state.alerts.lock().await.create_rule(fields)?;
    Ok((StatusCode::CREATED, ApiResponse::ok(rule, "Alert rule created")))
}

pub async fn update_rule(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    payload: Result<Json<RuleUpdate>, JsonRejection>,
) -> ApiResult<ApiResponse<AlertRule>> {
    let Path(id) = path?;
    let Json(changes) = payload?;
    let rule = state.alerts.lock().await.update_rule(&id, changes)?;
    Ok(ApiResponse::ok(rule, "Alert rule updated"))
}

pub async fn delete_rule(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> ApiResult<ApiResponse<AlertRule>> {
    let Path(id) = path?;
    let rule = state.alerts.lock().await.delete_rule(&id)?;
    Ok(ApiResponse::ok(rule, "Alert rule deleted"))
}
