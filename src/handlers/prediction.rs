/// Prediction Data Handler
///
/// Collection-level inputs for price prediction: analytics, scores, traders
/// and wash-trade, each paginated to exhaustion on its own.

use serde::Serialize;
use tracing::instrument;

use crate::aggregation::{Aggregator, ResourceRequest};
use crate::core::{paths, Chain, SortOrder, TimeRange, COLLECTION_PAGE_SIZE};
use crate::pagination::{FailurePolicy, PageRequest, Termination};
use crate::server::{ApiError, RawQuery};
use crate::upstream::Params;

const ANALYTICS: &str = "analytics";
const SCORES: &str = "scores";
const TRADERS: &str = "traders";
const WASHTRADE: &str = "washtrade";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionInputs {
    pub assets: f64,
    pub floor_price: f64,
    pub sales: f64,
    pub transactions: f64,
    pub volume: f64,
    pub royalty_price: f64,
    pub minting_revenue: f64,
    pub traders_count: f64,
    pub washtrade_volume: f64,
}

#[instrument(skip(aggregator, query))]
pub async fn prediction_data(aggregator: &Aggregator<'_>, query: &RawQuery) -> Result<PredictionInputs, ApiError> {
    let contract = query.require_contract()?;
    let chain = query.chain_or(Chain::Ethereum)?;
    let range = query.time_range_or(TimeRange::Last24Hours)?;

    let request = |name: &'static str, path: &'static str, sort_by: &str| {
        let params = Params::new()
            .with("blockchain", chain)
            .with("contract_address", contract)
            .with("time_range", range)
            .with("sort_by", sort_by)
            .with("sort_order", SortOrder::Desc);
        ResourceRequest::paginated(
            name,
            PageRequest::new(path, params, COLLECTION_PAGE_SIZE)
                .terminating_on(Termination::HasNextFlag)
                .on_failure(FailurePolicy::FailFast),
        )
    };

    let settled = aggregator
        .aggregate(vec![
            request(ANALYTICS, paths::COLLECTION_ANALYTICS, "sales"),
            request(SCORES, paths::COLLECTION_SCORES, "market_cap"),
            request(TRADERS, paths::COLLECTION_TRADERS, "traders"),
            request(WASHTRADE, paths::COLLECTION_WASHTRADE, "washtrade_assets"),
        ])
        .await;

    let analytics = settled.snapshot(ANALYTICS);
    let scores = settled.snapshot(SCORES);
    Ok(PredictionInputs {
        assets: analytics.number("assets"),
        floor_price: analytics.number("floor_price"),
        sales: analytics.number("sales"),
        transactions: analytics.number("transactions"),
        volume: analytics.number("volume"),
        royalty_price: scores.number("royalty_price"),
        minting_revenue: scores.number("minting_revenue"),
        traders_count: settled.snapshot(TRADERS).number("traders"),
        washtrade_volume: settled.snapshot(WASHTRADE).number("washtrade_volume"),
    })
}
