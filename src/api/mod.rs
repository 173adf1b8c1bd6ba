//! REST API served under `/api/v1`.

mod alerts;
mod builds;
mod config;
mod error;
mod metrics;
mod pipelines;
mod webhooks;

use std::sync::Arc;

use axum::{
    body::Bytes,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};
use tokio::sync::{Mutex, RwLock};
use tower_http::cors::CorsLayer;

pub use error::{ApiError, ApiResult};

use crate::aggregator::Aggregator;
use crate::alerts::AlertStore;
use crate::providers::HttpSettings;
use crate::webhooks::WebhookSecrets;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<RwLock<Aggregator>>,
    pub alerts: Arc<Mutex<AlertStore>>,
    pub http: Arc<HttpSettings>,
    pub secrets: Arc<WebhookSecrets>,
}

impl AppState {
    pub fn new(
        aggregator: Aggregator,
        alerts: AlertStore,
        http: HttpSettings,
        secrets: WebhookSecrets,
    ) -> Self {
        Self {
            aggregator: Arc::new(RwLock::new(aggregator)),
            alerts: Arc::new(Mutex::new(alerts)),
            http: Arc::new(http),
            secrets: Arc::new(secrets),
        }
    }
}

/// Success envelope: `{success, data, message, timestamp, [count], [total]}`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<usize>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data,
            message: message.into(),
            timestamp: Utc::now(),
            count: None,
            total: None,
        }
    }

    #[must_use]
    pub fn with_count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }

    #[must_use]
    pub fn with_total(mut self, total: usize) -> Self {
        self.total = Some(total);
        self
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// Parses an optional JSON body; an empty body yields the default.
pub(crate) fn optional_json<T: DeserializeOwned + Default>(body: &Bytes) -> ApiResult<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| ApiError::bad_request(format!("Invalid JSON body: {e}")))
}

async fn health() -> Json<Value> {
    Json(json!({"status": "healthy", "service": "cicd-dashboard"}))
}

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        // Configuration and integrations
        .route("/config", get(config::get_config))
        .route(
            "/config/integrations",
            get(config::list_integrations).delete(config::disconnect_all),
        )
        .route("/config/integrations/test", post(config::test_integrations))
        .route(
            "/config/integrations/{vendor}",
            post(config::connect_integration).delete(config::disconnect_integration),
        )
        .route(
            "/config/integrations/{vendor}/projects",
            get(config::list_projects),
        )
        // Pipelines and builds
        .route("/pipelines", get(pipelines::list_pipelines))
        .route("/pipelines/{id}", get(pipelines::get_pipeline))
        .route("/pipelines/{id}/builds", get(pipelines::pipeline_builds))
        .route("/pipelines/{id}/trigger", post(pipelines::trigger_build))
        .route("/builds", get(builds::list_builds))
        .route("/builds/{id}", get(builds::get_build))
        .route("/builds/{id}/logs", get(builds::get_logs))
        // Metrics
        .route("/metrics", get(metrics::dashboard))
        .route("/metrics/pipelines", get(metrics::pipelines))
        .route("/metrics/trends", get(metrics::trends))
        // Alerts
        .route("/alerts", get(alerts::list_alerts).post(alerts::create_alert))
        .route("/alerts/stats", get(alerts::alert_stats))
        .route(
            "/alerts/demo",
            post(alerts::generate_demo).delete(alerts::clear_demo),
        )
        .route(
            "/alerts/rules",
            get(alerts::list_rules).post(alerts::create_rule),
        )
        .route(
            "/alerts/rules/{id}",
            put(alerts::update_rule).delete(alerts::delete_rule),
        )
        .route(
            "/alerts/{id}",
            get(alerts::get_alert)
                .put(alerts::update_alert)
                .delete(alerts::delete_alert),
        )
        .route("/alerts/{id}/acknowledge", post(alerts::acknowledge_alert))
        .route("/alerts/{id}/resolve", post(alerts::resolve_alert))
        // Webhooks
        .route("/webhooks/github", post(webhooks::github))
        .route("/webhooks/gitlab", post(webhooks::gitlab))
        .route("/webhooks/jenkins", post(webhooks::jenkins));

    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api)
        .layer(CorsLayer::permissive())
        .with_state(state)
}
