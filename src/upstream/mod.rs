/// Upstream market-data API access

pub mod client;
pub mod error;
pub mod page;

pub use client::{MarketDataSource, UpstreamClient};
pub use error::UpstreamError;
pub use page::{Params, RawResourcePage};
