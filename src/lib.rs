// Domain types and field coercion
pub mod core;

// Upstream access and pagination
pub mod upstream;
pub mod pagination;
pub mod aggregation;

// Shaping and scoring
pub mod normalize;
pub mod scoring;

// Query flows and HTTP surface
pub mod handlers;
pub mod server;

pub mod config;
pub mod logging;

#[cfg(test)]
pub mod testing;

pub use config::Config;
pub use server::{router, AppState};
