/// HTTP surface: shared state, router and serve loop

pub mod error;
pub mod query;
pub mod routes;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;

use crate::aggregation::Aggregator;
use crate::upstream::MarketDataSource;

pub use error::ApiError;
pub use query::RawQuery;
pub use routes::router;

#[derive(Clone)]
pub struct AppState {
    pub source: Arc<dyn MarketDataSource>,
    pub max_pages: usize,
}

impl AppState {
    pub fn new(source: Arc<dyn MarketDataSource>, max_pages: usize) -> Self {
        Self { source, max_pages }
    }

    pub fn aggregator(&self) -> Aggregator<'_> {
        Aggregator::new(self.source.as_ref(), self.max_pages)
    }
}

/// Serve until `shutdown` resolves; in-flight requests are allowed to finish.
pub async fn run<F>(addr: SocketAddr, state: AppState, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("🌐 Listening on http://{}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server error")?;
    Ok(())
}
