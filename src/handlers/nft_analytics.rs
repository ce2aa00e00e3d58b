/// NFT Analytics Handler
///
/// Single-NFT snapshot combining analytics, wash-trade, scores, recent
/// transactions and the price estimate. Each resource settles on its own;
/// missing ones fall back to documented defaults.

use serde::Serialize;
use serde_json::Value;
use tracing::instrument;

use crate::aggregation::{Aggregator, ResourceRequest, Snapshot};
use crate::core::fields::NOT_AVAILABLE;
use crate::core::{paths, Chain, Entity, SortOrder, TimeRange, DEFAULT_PAGE_LIMIT};
use crate::server::{ApiError, RawQuery};
use crate::upstream::Params;

const ANALYTICS: &str = "analytics";
const WASHTRADE: &str = "washtrade";
const SCORES: &str = "scores";
const TRANSACTIONS: &str = "transactions";
const PRICE_ESTIMATE: &str = "price_estimate";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NftTransaction {
    pub date: Value,
    pub price: Value,
    #[serde(rename = "type")]
    pub kind: Value,
    pub is_wash_trade: bool,
    pub marketplace: Value,
}

impl NftTransaction {
    fn from_entity(tx: &Entity) -> Self {
        let raw = |key: &str| tx.get(key).cloned().unwrap_or_default();
        Self {
            date: raw("timestamp"),
            price: raw("sale_price_usd"),
            kind: raw("transaction_type"),
            is_wash_trade: tx.get("is_washtrade").and_then(Value::as_str) == Some("Washtrade"),
            marketplace: raw("marketplace"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceEstimate {
    pub estimate: Value,
    pub lower_bound: Value,
    pub upper_bound: Value,
    pub percentile: Value,
    pub collection_drivers: Value,
    pub sales_drivers: Value,
    pub rarity_drivers: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NftSnapshot {
    pub current_price: String,
    pub floor_price: Value,
    pub all_time_high: String,
    pub all_time_low: String,
    pub total_transactions: String,
    pub sales: String,
    pub total_transfers: String,
    pub volume: String,
    pub suspect_transactions: String,
    pub connected_wallets: String,
    pub wash_trade_volume: String,
    pub wash_trade_status: &'static str,
    pub estimated_price: String,
    pub start_price: String,
    pub rarity_rank: String,
    pub rarity_score: String,
    pub transactions: Vec<NftTransaction>,
    pub price_estimate: PriceEstimate,
}

impl NftSnapshot {
    fn build(analytics: Snapshot<'_>, wash: Snapshot<'_>, scores: Snapshot<'_>, transactions: &[Entity], estimate: Snapshot<'_>) -> Self {
        let floor_price = analytics
            .record()
            .and_then(|r| r.get("floor_price"))
            .filter(|v| !v.is_null())
            .cloned()
            .unwrap_or_else(|| Value::String(NOT_AVAILABLE.to_string()));

        Self {
            current_price: scores.fixed2("price"),
            floor_price,
            all_time_high: scores.fixed2("max_price"),
            all_time_low: scores.fixed2("all_time_low"),
            total_transactions: analytics.display_or("transactions", "0"),
            sales: analytics.display_or("sales", "0"),
            total_transfers: analytics.display_or("transfers", "0"),
            volume: analytics.fixed2_or("volume", "0"),
            suspect_transactions: wash.display_or("washtrade_suspect_transactions", "0"),
            connected_wallets: wash.display_or("washtrade_wallets", "0"),
            wash_trade_volume: wash.fixed2_or("washtrade_volume", "0"),
            wash_trade_status: if wash.number("washtrade_suspect_transactions") > 0.0 {
                "Active"
            } else {
                "Clear"
            },
            estimated_price: scores.fixed2("estimated_price"),
            start_price: scores.fixed2("start_price"),
            rarity_rank: scores.display_or("rarity_rank", NOT_AVAILABLE),
            rarity_score: scores.display_or("rarity_score", NOT_AVAILABLE),
            transactions: transactions.iter().map(NftTransaction::from_entity).collect(),
            price_estimate: PriceEstimate {
                estimate: estimate.truthy_or_not_available("price_estimate"),
                lower_bound: estimate.truthy_or_not_available("price_estimate_lower_bound"),
                upper_bound: estimate.truthy_or_not_available("price_estimate_upper_bound"),
                percentile: estimate.truthy_or_not_available("prediction_percentile"),
                collection_drivers: estimate.truthy_or_not_available("collection_drivers"),
                sales_drivers: estimate.truthy_or_not_available("nft_sales_drivers"),
                rarity_drivers: estimate.truthy_or_not_available("nft_rarity_drivers"),
            },
        }
    }
}

#[instrument(skip(aggregator, query))]
pub async fn nft_analytics(aggregator: &Aggregator<'_>, query: &RawQuery) -> Result<NftSnapshot, ApiError> {
    let contract = query.require_contract()?;
    let token = query.require_token()?;
    let chain = query.chain_or(Chain::Ethereum)?;
    let range = query.time_range_or(TimeRange::AllTime)?;
    let sort_order = query.sort_order_or(SortOrder::Desc)?;
    let offset = query.offset_or(0)?;
    let limit = query.limit_or(DEFAULT_PAGE_LIMIT)?;

    let base = Params::new()
        .with("contract_address", contract)
        .with("token_id", token)
        .with("blockchain", chain);
    // highest-ranked record only
    let top_one = |sort_by: &str| {
        base.clone()
            .with("sort_by", sort_by)
            .with("sort_order", SortOrder::Desc)
            .with("offset", 0)
            .with("limit", 1)
    };

    let settled = aggregator
        .aggregate(vec![
            ResourceRequest::single(
                ANALYTICS,
                paths::NFT_ANALYTICS,
                base.clone()
                    .with("time_range", range)
                    .with("sort_by", query.sort_by_or("sales"))
                    .with("sort_order", sort_order)
                    .with("offset", offset)
                    .with("limit", limit),
            ),
            ResourceRequest::single(WASHTRADE, paths::NFT_WASHTRADE, top_one("washtrade_volume").with("time_range", range)),
            ResourceRequest::single(SCORES, paths::NFT_SCORES, top_one("max_price").with("time_range", TimeRange::AllTime)),
            ResourceRequest::single(
                TRANSACTIONS,
                paths::NFT_TRANSACTIONS,
                base.clone()
                    .with("time_range", TimeRange::Last90Days)
                    .with("offset", 0)
                    .with("limit", DEFAULT_PAGE_LIMIT),
            ),
            ResourceRequest::single(PRICE_ESTIMATE, paths::NFT_PRICE_ESTIMATE, base.clone()),
        ])
        .await;

    Ok(NftSnapshot::build(
        settled.snapshot(ANALYTICS),
        settled.snapshot(WASHTRADE),
        settled.snapshot(SCORES),
        settled.items(TRANSACTIONS),
        settled.snapshot(PRICE_ESTIMATE),
    ))
}
