/// Query flows
///
/// Each flow validates its query, fetches the upstream resources it needs
/// through an `Aggregator` and shapes the response body. Flows never touch
/// HTTP types; routing lives in `server::routes`.

pub mod market_insights;
pub mod marketplace;
pub mod nft_analytics;
pub mod prediction;
pub mod wallet;
pub mod washtrade;
