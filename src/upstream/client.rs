/// Market-data API client
///
/// Every call is an authenticated GET. Failures are mapped into
/// `UpstreamError` and logged once here; successes are silent.

use std::time::Duration;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::warn;
use url::Url;

use crate::config::UpstreamConfig;
use crate::core::API_KEY_HEADER;
use super::error::UpstreamError;
use super::page::{Params, RawResourcePage};

/// Seam between the aggregation flows and the upstream API
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Fetch one page of `path` (relative to the upstream base URL).
    async fn fetch_resource(&self, path: &str, params: &Params) -> Result<RawResourcePage, UpstreamError>;
}

pub struct UpstreamClient {
    client: Client,
    base_url: Url,
    api_key: String,
}

impl UpstreamClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("Failed to create upstream HTTP client")?;

        // Url::join replaces the last segment unless the base ends with '/'
        let mut base = config.base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)
            .with_context(|| format!("Invalid upstream base URL: {}", config.base_url))?;

        Ok(Self {
            client,
            base_url,
            api_key: config.api_key.clone(),
        })
    }

    pub fn resource_url(&self, path: &str) -> Result<Url, UpstreamError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| UpstreamError::Transport {
                url: format!("{}{}", self.base_url, path),
                message: format!("invalid resource path: {}", e),
                timed_out: false,
            })
    }

    async fn execute(&self, url: Url, params: &Params) -> Result<RawResourcePage, UpstreamError> {
        let display_url = url.to_string();

        let response = self
            .client
            .get(url)
            .header("accept", "application/json")
            .header(API_KEY_HEADER, &self.api_key)
            .query(params.as_pairs())
            .send()
            .await
            .map_err(|e| UpstreamError::Transport {
                url: display_url.clone(),
                message: e.to_string(),
                timed_out: e.is_timeout(),
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| UpstreamError::Transport {
            url: display_url.clone(),
            message: format!("failed to read response body: {}", e),
            timed_out: e.is_timeout(),
        })?;

        if !status.is_success() {
            let body = serde_json::from_str::<Value>(&text).unwrap_or(Value::String(text));
            return Err(UpstreamError::Remote {
                url: display_url,
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = serde_json::from_str(&text).map_err(|e| UpstreamError::Decode {
            url: display_url,
            message: e.to_string(),
        })?;

        Ok(RawResourcePage::from_value(body))
    }
}

#[async_trait]
impl MarketDataSource for UpstreamClient {
    async fn fetch_resource(&self, path: &str, params: &Params) -> Result<RawResourcePage, UpstreamError> {
        let result = match self.resource_url(path) {
            Ok(url) => self.execute(url, params).await,
            Err(e) => Err(e),
        };

        if let Err(e) = &result {
            warn!(
                url = %e.url(),
                status = ?e.status(),
                timed_out = e.is_timeout(),
                params = ?params.as_pairs(),
                details = %e.details(),
                "Upstream request failed"
            );
        }

        result
    }
}
