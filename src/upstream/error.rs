use serde_json::Value;
use thiserror::Error;

/// Uniform failure shape for upstream market-data calls
#[derive(Error, Debug, Clone)]
pub enum UpstreamError {
    /// Network failure or timeout; no HTTP status was received.
    #[error("Upstream transport failure for {url}: {message}")]
    Transport {
        url: String,
        message: String,
        timed_out: bool,
    },

    /// The upstream answered with a non-success status.
    #[error("Upstream rejected {url} with HTTP {status}")]
    Remote { url: String, status: u16, body: Value },

    /// A success status whose body is not JSON.
    #[error("Invalid response from {url}: {message}")]
    Decode { url: String, message: String },
}

impl UpstreamError {
    pub fn status(&self) -> Option<u16> {
        match self {
            UpstreamError::Remote { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn url(&self) -> &str {
        match self {
            UpstreamError::Transport { url, .. }
            | UpstreamError::Remote { url, .. }
            | UpstreamError::Decode { url, .. } => url,
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, UpstreamError::Transport { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, UpstreamError::Transport { timed_out: true, .. })
    }

    /// Diagnostic detail for error responses: the upstream `error` field when
    /// the body carries one, the raw body otherwise.
    pub fn details(&self) -> Value {
        match self {
            UpstreamError::Remote { body, .. } => body
                .get("error")
                .filter(|e| !e.is_null())
                .cloned()
                .unwrap_or_else(|| body.clone()),
            UpstreamError::Transport {
                message,
                timed_out: true,
                ..
            } => Value::String(format!("Upstream request timed out: {}", message)),
            UpstreamError::Transport { message, .. } | UpstreamError::Decode { message, .. } => {
                Value::String(message.clone())
            }
        }
    }
}
