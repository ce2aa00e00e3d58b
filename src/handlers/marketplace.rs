/// Marketplace Health Handler
///
/// Ranks marketplaces by wash-trade exposure: every trader record is joined
/// with its wash-trade record by `id` and scored.

use std::collections::HashMap;
use serde::Serialize;
use tracing::{info, instrument};

use crate::aggregation::{Aggregator, ResourceRequest};
use crate::core::{fields, paths, Chain, Entity, SortOrder, TimeRange, MARKETPLACE_PAGE_SIZE};
use crate::pagination::{FailurePolicy, IdentityKey, PageRequest, Termination};
use crate::scoring::{HealthScorer, MarketplaceRiskLevel};
use crate::server::{ApiError, RawQuery};
use crate::upstream::Params;

const TRADERS: &str = "traders";
const WASHTRADE: &str = "washtrade";
const NO_DATA: &str = "No data available";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketplaceMetrics {
    pub suspect_sales_ratio: f64,
    pub wash_trade_wallets: i64,
    pub total_traders: i64,
    pub wash_trade_assets: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketplaceHealth {
    pub id: serde_json::Value,
    pub name: serde_json::Value,
    pub url: serde_json::Value,
    pub health_score: f64,
    pub risk_level: MarketplaceRiskLevel,
    pub buyers: i64,
    pub sellers: i64,
    pub wash_trade_volume: f64,
    pub metrics: MarketplaceMetrics,
}

fn listing(path: &'static str, params: Params) -> PageRequest {
    PageRequest::new(path, params, MARKETPLACE_PAGE_SIZE)
        .terminating_on(Termination::ShortPage)
        .on_failure(FailurePolicy::BestEffort)
        .identified_by(IdentityKey::Field("id"))
}

#[instrument(skip(aggregator, query))]
pub async fn marketplace_health(aggregator: &Aggregator<'_>, query: &RawQuery) -> Result<Vec<MarketplaceHealth>, ApiError> {
    let chain = query.chain_or(Chain::Ethereum)?;
    let range = query.time_range_or(TimeRange::AllTime)?;
    let sort_order = query.sort_order_or(SortOrder::Desc)?;
    let params = Params::new()
        .with("blockchain", chain)
        .with("time_range", range)
        .with("sort_by", query.sort_by_or("name"))
        .with("sort_order", sort_order);

    let settled = aggregator
        .aggregate(vec![
            ResourceRequest::paginated(TRADERS, listing(paths::MARKETPLACE_TRADERS, params.clone())),
            ResourceRequest::paginated(WASHTRADE, listing(paths::MARKETPLACE_WASHTRADE, params)),
        ])
        .await;

    let traders = settled.items(TRADERS);
    let washtrade = settled.items(WASHTRADE);
    if traders.is_empty() && washtrade.is_empty() {
        return Err(ApiError::NotFound(NO_DATA));
    }

    let ranked = join_and_score(traders, washtrade);
    info!(%chain, %range, marketplaces = ranked.len(), "Marketplace health computed");
    Ok(ranked)
}

/// Left join on `id`: every trader record yields one row, with an empty
/// wash-trade record when there is no match.
pub fn join_and_score(traders: &[Entity], washtrade: &[Entity]) -> Vec<MarketplaceHealth> {
    let by_id: HashMap<String, &Entity> = washtrade
        .iter()
        .filter_map(|w| IdentityKey::Field("id").key_of(w).map(|id| (id, w)))
        .collect();
    let empty = Entity::new();
    let scorer = HealthScorer::new();

    traders
        .iter()
        .map(|trader| {
            let wash = IdentityKey::Field("id")
                .key_of(trader)
                .and_then(|id| by_id.get(&id).copied())
                .unwrap_or(&empty);
            let health_score = scorer.score(trader, wash);
            let raw = |key: &str| trader.get(key).cloned().unwrap_or_default();

            MarketplaceHealth {
                id: raw("id"),
                name: raw("name"),
                url: raw("url"),
                health_score,
                risk_level: MarketplaceRiskLevel::from_score(health_score),
                buyers: fields::integer(trader, "traders_buyers").unwrap_or(0),
                sellers: fields::integer(trader, "traders_sellers").unwrap_or(0),
                wash_trade_volume: fields::number(wash, "washtrade_volume").unwrap_or(0.0),
                metrics: MarketplaceMetrics {
                    suspect_sales_ratio: fields::number(wash, "washtrade_suspect_sales_ratio").unwrap_or(0.0),
                    wash_trade_wallets: fields::integer(wash, "washtrade_wallets").unwrap_or(0),
                    total_traders: fields::integer(trader, "traders").unwrap_or(0),
                    wash_trade_assets: fields::integer(wash, "washtrade_assets").unwrap_or(0),
                },
            }
        })
        .collect()
}
