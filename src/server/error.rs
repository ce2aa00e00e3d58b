use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::error;

use crate::core::{Chain, TimeRange, ValidationError};
use crate::upstream::UpstreamError;

/// Failure of one inbound query, rendered as a JSON error body
#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Upstream failure of a resource the flow cannot do without.
    #[error("{context}: {source}")]
    Upstream {
        context: &'static str,
        not_found: &'static str,
        #[source]
        source: UpstreamError,
    },

    #[error("{0}")]
    NotFound(&'static str),

    #[error("{0}")]
    InvalidUpstreamData(&'static str),
}

impl ApiError {
    /// Wrap an upstream failure with the flow's generic and not-found messages.
    pub fn upstream(context: &'static str, not_found: &'static str) -> impl FnOnce(UpstreamError) -> ApiError {
        move |source| ApiError::Upstream {
            context,
            not_found,
            source,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Upstream { source, .. } => match source {
                UpstreamError::Remote { status, .. } => StatusCode::from_u16(*status)
                    .ok()
                    .filter(|s| s.is_client_error() || s.is_server_error())
                    .unwrap_or(StatusCode::BAD_GATEWAY),
                UpstreamError::Transport { .. } | UpstreamError::Decode { .. } => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidUpstreamData(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn body(&self) -> Value {
        match self {
            ApiError::Validation(e) => {
                let mut body = json!({ "error": e.to_string() });
                match e {
                    ValidationError::UnsupportedChain(_) => {
                        body["supportedChains"] = json!(Chain::supported_names());
                    }
                    ValidationError::UnsupportedTimeRange(_) => {
                        body["supportedTimeframes"] = json!(TimeRange::supported_names());
                    }
                    _ => {}
                }
                body
            }
            ApiError::Upstream {
                context,
                not_found,
                source,
            } => {
                let message = match source.status() {
                    Some(401) => "API key invalid or missing",
                    Some(404) => not_found,
                    Some(429) => "Rate limit exceeded",
                    _ => context,
                };
                json!({
                    "error": message,
                    "details": source.details(),
                    "timestamp": Utc::now().to_rfc3339(),
                })
            }
            ApiError::NotFound(message) | ApiError::InvalidUpstreamData(message) => {
                json!({ "error": message })
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "Request failed");
        }
        (status, Json(self.body())).into_response()
    }
}
