use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use log::{error, warn};
use serde_json::json;

use crate::error::DashboardError;

/// Error response in the standard envelope: `{success: false, message, error, timestamp}`.
#[derive(Debug)]
pub struct ApiError {
    pub status_code: StatusCode,
    pub message: String,
    pub error_code: &'static str,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status_code: StatusCode::BAD_REQUEST,
            message: message.into(),
            error_code: "BAD_REQUEST",
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status_code: StatusCode::NOT_FOUND,
            message: message.into(),
            error_code: "NOT_FOUND",
        }
    }
}

impl From<DashboardError> for ApiError {
    fn from(err: DashboardError) -> Self {
        let (status_code, error_code) = match &err {
            DashboardError::InvalidReference(_) => (StatusCode::BAD_REQUEST, "INVALID_REFERENCE"),
            DashboardError::InvalidPayload(_) => (StatusCode::BAD_REQUEST, "INVALID_PAYLOAD"),
            DashboardError::Connect { .. } => (StatusCode::BAD_REQUEST, "CONNECT_FAILED"),
            DashboardError::NotConnected(_) => (StatusCode::BAD_REQUEST, "NOT_CONNECTED"),
            DashboardError::Unsupported(_) => (StatusCode::BAD_REQUEST, "UNSUPPORTED"),
            DashboardError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            DashboardError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            DashboardError::Fetch {
                status: Some(404), ..
            } => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            DashboardError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            DashboardError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "CONFIG_ERROR"),
            DashboardError::Fetch { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "FETCH_FAILED"),
            DashboardError::Json(_) | DashboardError::Io(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        };

        Self {
            status_code,
            message: err.to_string(),
            error_code,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self {
            status_code: StatusCode::BAD_REQUEST,
            message: rejection.body_text(),
            error_code: "INVALID_PAYLOAD",
        }
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status_code.is_server_error() {
            error!("Request failed: {}", self.message);
        } else {
            warn!("Request rejected ({}): {}", self.status_code, self.message);
        }

        let body = json!({
            "success": false,
            "message": self.message,
            "error": self.error_code,
            "timestamp": Utc::now(),
        });

        (self.status_code, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::Vendor;

    #[test]
    fn dashboard_errors_map_to_status_codes() {
        let cases = [
            (DashboardError::InvalidReference("x".into()), StatusCode::BAD_REQUEST),
            (DashboardError::NotConnected(Vendor::GitHub), StatusCode::BAD_REQUEST),
            (DashboardError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED),
            (DashboardError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (DashboardError::Conflict("x".into()), StatusCode::CONFLICT),
            (DashboardError::Config("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (
                DashboardError::Fetch {
                    status: Some(404),
                    body: "gone".into(),
                },
                StatusCode::NOT_FOUND,
            ),
            (
                DashboardError::Fetch {
                    status: Some(502),
                    body: "bad gateway".into(),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status_code, expected);
        }
    }
}
