use axum::{body::Bytes, extract::State, http::HeaderMap};

use super::{ApiResponse, ApiResult, AppState};
use crate::providers::Vendor;
use crate::webhooks::{ingest, WebhookReceipt};

async fn receive(
    state: &AppState,
    vendor: Vendor,
    headers: &HeaderMap,
    body: &[u8],
) -> ApiResult<ApiResponse<WebhookReceipt>> {
    let mut store = state.alerts.lock().await;
    let receipt = ingest(vendor, headers, body, &state.secrets, &mut store)?;

    let message = if receipt.alert.is_some() {
        format!("{vendor} webhook processed, alert created")
    } else {
        format!("{vendor} webhook received")
    };
    Ok(ApiResponse::ok(receipt, message))
}

pub async fn github(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<ApiResponse<WebhookReceipt>> {
    receive(&state, Vendor::GitHub, &headers, &body).await
}

pub async fn gitlab(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<ApiResponse<WebhookReceipt>> {
    receive(&state, Vendor::GitLab, &headers, &body).await
}

pub async fn jenkins(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<ApiResponse<WebhookReceipt>> {
    receive(&state, Vendor::Jenkins, &headers, &body).await
}
