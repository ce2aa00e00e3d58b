/// In-process fake upstream for flow and router tests

use std::sync::Mutex;
use async_trait::async_trait;
use serde_json::{json, Value};

use crate::upstream::{MarketDataSource, Params, RawResourcePage, UpstreamError};

type Responder = dyn Fn(&str, &Params) -> Result<Value, UpstreamError> + Send + Sync;

/// Answers every call through a closure and records what was requested.
pub struct ScriptedUpstream {
    responder: Box<Responder>,
    calls: Mutex<Vec<(String, Params)>>,
}

impl ScriptedUpstream {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&str, &Params) -> Result<Value, UpstreamError> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Upstream that fails the test if it is ever called.
    pub fn unreachable() -> Self {
        Self::new(|path, _| panic!("unexpected upstream call to {}", path))
    }

    pub fn remote_error(path: &str, status: u16) -> UpstreamError {
        UpstreamError::Remote {
            url: format!("https://upstream.test/{}", path),
            status,
            body: json!({"error": format!("scripted failure {}", status)}),
        }
    }

    pub fn transport_error(path: &str) -> UpstreamError {
        UpstreamError::Transport {
            url: format!("https://upstream.test/{}", path),
            message: "connection reset by peer".to_string(),
            timed_out: false,
        }
    }

    pub fn calls(&self) -> Vec<(String, Params)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls_to(&self, path: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|(p, _)| p == path).count()
    }
}

#[async_trait]
impl MarketDataSource for ScriptedUpstream {
    async fn fetch_resource(&self, path: &str, params: &Params) -> Result<RawResourcePage, UpstreamError> {
        self.calls.lock().unwrap().push((path.to_string(), params.clone()));
        (self.responder)(path, params).map(RawResourcePage::from_value)
    }
}

/// Response body in the upstream envelope.
pub fn page(items: Vec<Value>, has_next: Option<bool>) -> Value {
    match has_next {
        Some(flag) => json!({"data": items, "pagination": {"has_next": flag}}),
        None => json!({"data": items}),
    }
}

/// `count` entities with sequential ids starting at `start`.
pub fn entities(start: usize, count: usize) -> Vec<Value> {
    (start..start + count)
        .map(|i| json!({"id": format!("entity-{}", i), "name": format!("Entity {}", i)}))
        .collect()
}
