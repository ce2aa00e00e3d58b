/// Wallet Handler
///
/// Holdings, analytics listing, scores, marketplace profile and the derived
/// portfolio summary for a single wallet address.

use std::collections::BTreeMap;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::aggregation::{Aggregator, Snapshot};
use crate::core::{
    paths, Chain, Entity, SortOrder, TimeRange, DEFAULT_PAGE_LIMIT, WALLET_ANALYSIS_PAGE_SIZE,
    WALLET_PORTFOLIO_PAGE_SIZE,
};
use crate::pagination::{FailurePolicy, IdentityKey, PageRequest, Termination};
use crate::scoring::PortfolioSummary;
use crate::server::{ApiError, RawQuery};
use crate::upstream::Params;

const UNKNOWN_COLLECTION: &str = "Unknown Collection";
const HOLDING_IDENTITY: &[&str] = &["contract_address", "token_id"];
const WALLET_NOT_FOUND: &str = "Wallet data not found";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionHoldings {
    pub contract_address: Value,
    pub tokens: Vec<Value>,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioPagination {
    pub total: usize,
    pub has_next: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WalletPortfolio {
    pub collections: BTreeMap<String, CollectionHoldings>,
    pub pagination: PortfolioPagination,
}

/// Group holdings by collection name, keeping first-seen order of tokens.
pub fn group_by_collection(holdings: &[Entity]) -> BTreeMap<String, CollectionHoldings> {
    let mut collections: BTreeMap<String, CollectionHoldings> = BTreeMap::new();
    for nft in holdings {
        let name = match nft.get("collection") {
            Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => UNKNOWN_COLLECTION.to_string(),
        };
        let entry = collections.entry(name).or_insert_with(|| CollectionHoldings {
            contract_address: nft.get("contract_address").cloned().unwrap_or_default(),
            tokens: Vec::new(),
            count: 0,
        });
        entry.tokens.push(nft.get("token_id").cloned().unwrap_or_default());
        entry.count += 1;
    }
    collections
}

#[instrument(skip(aggregator, query))]
pub async fn wallet_portfolio(aggregator: &Aggregator<'_>, query: &RawQuery) -> Result<WalletPortfolio, ApiError> {
    let wallet = query.require_wallet()?;
    let chain = query.chain_or(Chain::Ethereum)?;
    let params = Params::new()
        .with("wallet", wallet)
        .with("blockchain", chain)
        .with("time_range", TimeRange::AllTime)
        .with("sort_by", "volume");

    let request = PageRequest::new(paths::WALLET_NFT_BALANCE, params, WALLET_PORTFOLIO_PAGE_SIZE)
        .terminating_on(Termination::HasNextFlag)
        .on_failure(FailurePolicy::FailFast)
        .identified_by(IdentityKey::Fields(HOLDING_IDENTITY));

    let holdings = aggregator
        .paginator()
        .fetch_all(&request)
        .await
        .map_err(ApiError::upstream("Failed to fetch data from API", WALLET_NOT_FOUND))?;

    let collections = group_by_collection(&holdings);
    info!(nfts = holdings.len(), collections = collections.len(), "Wallet portfolio assembled");
    Ok(WalletPortfolio {
        pagination: PortfolioPagination {
            total: collections.len(),
            has_next: false,
        },
        collections,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisPagination {
    pub total_items: usize,
    pub limit: usize,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WalletAnalysis {
    pub data: Vec<Entity>,
    pub pagination: AnalysisPagination,
}

#[instrument(skip(aggregator, query))]
pub async fn wallet_analysis(aggregator: &Aggregator<'_>, query: &RawQuery) -> Result<WalletAnalysis, ApiError> {
    let wallet = query.require_wallet()?;
    let chain = query.chain_or(Chain::Ethereum)?;
    let range = query.time_range_or(TimeRange::Last24Hours)?;
    let sort_order = query.sort_order_or(SortOrder::Desc)?;
    let params = Params::new()
        .with("wallet", wallet)
        .with("blockchain", chain)
        .with("time_range", range)
        .with("sort_by", query.sort_by_or("volume"))
        .with("sort_order", sort_order);

    let request = PageRequest::new(paths::WALLET_ANALYTICS, params, WALLET_ANALYSIS_PAGE_SIZE)
        .terminating_on(Termination::ShortPage)
        .on_failure(FailurePolicy::FailFast);

    let data = aggregator
        .paginator()
        .fetch_all(&request)
        .await
        .map_err(ApiError::upstream("Failed to fetch wallet analysis", WALLET_NOT_FOUND))?;

    debug!(records = data.len(), "Wallet analysis fetched");
    Ok(WalletAnalysis {
        pagination: AnalysisPagination {
            total_items: data.len(),
            limit: WALLET_ANALYSIS_PAGE_SIZE,
            offset: 0,
        },
        data,
    })
}

#[instrument(skip(aggregator, query))]
pub async fn wallet_scores(aggregator: &Aggregator<'_>, query: &RawQuery) -> Result<Entity, ApiError> {
    let wallet = query.require_wallet()?;
    let chain = query.chain_or(Chain::Ethereum)?;
    let range = query.time_range_or(TimeRange::AllTime)?;
    let sort_order = query.sort_order_or(SortOrder::Desc)?;
    let params = Params::new()
        .with("wallet", wallet)
        .with("blockchain", chain)
        .with("sort_by", query.sort_by_or("portfolio_value"))
        .with("sort_order", sort_order)
        .with("time_range", range)
        .with("offset", query.offset_or(0)?)
        .with("limit", query.limit_or(DEFAULT_PAGE_LIMIT)?);

    aggregator
        .fetch_one(paths::WALLET_SCORES, &params)
        .await
        .map_err(ApiError::upstream("Failed to fetch wallet scores", WALLET_NOT_FOUND))?
        .into_first()
        .ok_or(ApiError::NotFound(WALLET_NOT_FOUND))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileStats {
    pub collection_count: i64,
    pub nft_count: i64,
    pub is_shark: bool,
    pub is_whale: bool,
    pub washtrade_nft_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileRisk {
    pub is_sanctioned: bool,
    pub risk_level: String,
    pub is_custodial: bool,
    pub is_contract: bool,
}

/// Marketplace rewards and AML profile of a wallet
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WalletProfile {
    pub blur: f64,
    pub looks: f64,
    pub stats: ProfileStats,
    pub risk: ProfileRisk,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

impl WalletProfile {
    pub fn from_record(record: Option<&Entity>) -> Self {
        let profile = Snapshot::new(record);
        let rewards = profile.nested("nft_marketplace_reward");
        let risk_level = match record {
            Some(_) => profile.text_or("aml_risk_level", "low"),
            None => "unknown".to_string(),
        };

        Self {
            blur: rewards.number("blur"),
            looks: rewards.number("looks"),
            stats: ProfileStats {
                collection_count: profile.integer("collection_count"),
                nft_count: profile.integer("nft_count"),
                is_shark: profile.flag("is_shark"),
                is_whale: profile.flag("is_whale"),
                washtrade_nft_count: profile.integer("washtrade_nft_count"),
            },
            risk: ProfileRisk {
                is_sanctioned: profile.flag("aml_is_sanctioned"),
                risk_level,
                is_custodial: profile.flag("is_custodial"),
                is_contract: profile.flag("is_contract"),
            },
            message: record
                .is_none()
                .then_some("No data found for the provided wallet address"),
        }
    }
}

#[instrument(skip(aggregator, query))]
pub async fn wallet_profile(aggregator: &Aggregator<'_>, query: &RawQuery) -> Result<WalletProfile, ApiError> {
    let wallet = query.require_wallet()?;
    let params = Params::new()
        .with("wallet", wallet)
        .with("offset", 0)
        .with("limit", DEFAULT_PAGE_LIMIT);

    let page = aggregator
        .fetch_one(paths::WALLET_PROFILE, &params)
        .await
        .map_err(ApiError::upstream("Failed to fetch marketplace rewards", WALLET_NOT_FOUND))?;

    if page.is_empty() {
        info!(wallet = %wallet, "No profile data for wallet");
    }
    Ok(WalletProfile::from_record(page.first()))
}

#[instrument(skip(aggregator, query))]
pub async fn wallet_summary(aggregator: &Aggregator<'_>, query: &RawQuery) -> Result<PortfolioSummary, ApiError> {
    let wallet = query.require_wallet()?;
    let chain = query.chain_or(Chain::Ethereum)?;
    let range = query.time_range_or(TimeRange::AllTime)?;
    let params = Params::new()
        .with("wallet", wallet)
        .with("blockchain", chain)
        .with("time_range", range)
        .with("sort_by", "volume")
        .with("sort_order", SortOrder::Desc)
        .with("offset", 0)
        .with("limit", WALLET_ANALYSIS_PAGE_SIZE);

    let page = aggregator
        .fetch_one(paths::WALLET_ANALYTICS, &params)
        .await
        .map_err(ApiError::upstream("Failed to fetch wallet analysis", WALLET_NOT_FOUND))?;

    Ok(PortfolioSummary::from_record(page.first()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::PortfolioRiskLabel;
    use crate::testing::{page, ScriptedUpstream};
    use serde_json::json;

    fn for_wallet() -> RawQuery {
        RawQuery {
            wallet: Some("0xd8da6bf26964af9d7eed9e03e53415d37aa96045".to_string()),
            ..RawQuery::default()
        }
    }

    #[tokio::test]
    async fn test_portfolio_groups_all_pages() {
        // 150 NFTs over two collections, 100 per page
        let upstream = ScriptedUpstream::new(|_, params| {
            let offset: usize = params.get("offset").unwrap().parse().unwrap();
            let limit: usize = params.get("limit").unwrap().parse().unwrap();
            let end = (offset + limit).min(150);
            let items = (offset..end)
                .map(|i| {
                    let (collection, contract) = if i % 3 == 0 { ("Azuki", "0xaz") } else { ("Doodles", "0xdd") };
                    json!({"collection": collection, "contract_address": contract, "token_id": i.to_string()})
                })
                .collect();
            Ok(page(items, Some(end < 150)))
        });
        let aggregator = Aggregator::new(&upstream, 50);

        let portfolio = wallet_portfolio(&aggregator, &for_wallet()).await.unwrap();

        assert_eq!(portfolio.collections.len(), 2);
        let total: usize = portfolio.collections.values().map(|c| c.tokens.len()).sum();
        assert_eq!(total, 150);
        for holdings in portfolio.collections.values() {
            assert_eq!(holdings.count, holdings.tokens.len());
        }
        assert_eq!(portfolio.collections["Azuki"].count, 50);
        assert_eq!(portfolio.collections["Azuki"].contract_address, json!("0xaz"));
        assert_eq!(portfolio.pagination, PortfolioPagination { total: 2, has_next: false });
        assert_eq!(upstream.call_count(), 2);
    }

    #[test]
    fn test_unnamed_collections_and_repeated_holdings() {
        let holdings: Vec<Entity> = vec![
            json!({"contract_address": "0x1", "token_id": "1"}),
            json!({"collection": "", "contract_address": "0x1", "token_id": "2"}),
            json!({"collection": "Punks", "contract_address": "0x2", "token_id": "9"}),
        ]
        .into_iter()
        .map(|v| v.as_object().cloned().unwrap())
        .collect();

        let grouped = group_by_collection(&holdings);
        assert_eq!(grouped[UNKNOWN_COLLECTION].count, 2);
        assert_eq!(grouped["Punks"].tokens, vec![json!("9")]);
    }

    #[tokio::test]
    async fn test_portfolio_failure_propagates() {
        let upstream = ScriptedUpstream::new(|path, _| Err(ScriptedUpstream::remote_error(path, 401)));
        let aggregator = Aggregator::new(&upstream, 50);
        let err = wallet_portfolio(&aggregator, &for_wallet()).await.unwrap_err();
        assert_eq!(err.status().as_u16(), 401);
    }

    #[tokio::test]
    async fn test_analysis_short_page_listing() {
        let upstream = ScriptedUpstream::new(|_, params| {
            let offset: usize = params.get("offset").unwrap().parse().unwrap();
            let count = if offset == 0 { 30 } else { 12 };
            Ok(page((0..count).map(|i| json!({"blockchain": "ethereum", "i": offset + i})).collect(), None))
        });
        let aggregator = Aggregator::new(&upstream, 50);

        let analysis = wallet_analysis(&aggregator, &for_wallet()).await.unwrap();
        assert_eq!(analysis.data.len(), 42);
        assert_eq!(analysis.pagination.total_items, 42);
        assert_eq!(analysis.pagination.limit, 30);
        assert_eq!(upstream.calls()[0].1.get("time_range"), Some("24h"));
    }

    #[tokio::test]
    async fn test_scores_primary_record_or_not_found() {
        let upstream = ScriptedUpstream::new(|_, _| Ok(page(vec![json!({"portfolio_value": 12.0})], None)));
        let aggregator = Aggregator::new(&upstream, 50);
        let scores = wallet_scores(&aggregator, &for_wallet()).await.unwrap();
        assert_eq!(scores["portfolio_value"], json!(12.0));

        let upstream = ScriptedUpstream::new(|_, _| Ok(page(vec![], None)));
        let aggregator = Aggregator::new(&upstream, 50);
        let err = wallet_scores(&aggregator, &for_wallet()).await.unwrap_err();
        assert_eq!(err.status().as_u16(), 404);
    }

    #[tokio::test]
    async fn test_profile_defaults_when_empty() {
        let upstream = ScriptedUpstream::new(|_, _| Ok(page(vec![], None)));
        let aggregator = Aggregator::new(&upstream, 50);

        let profile = wallet_profile(&aggregator, &for_wallet()).await.unwrap();
        assert_eq!(profile.blur, 0.0);
        assert_eq!(profile.risk.risk_level, "unknown");
        assert!(profile.message.is_some());
    }

    #[tokio::test]
    async fn test_profile_from_record() {
        let upstream = ScriptedUpstream::new(|_, _| {
            Ok(page(
                vec![json!({
                    "nft_marketplace_reward": {"blur": 310.5, "looks": 2},
                    "collection_count": 4, "nft_count": 19, "is_whale": true
                })],
                None,
            ))
        });
        let aggregator = Aggregator::new(&upstream, 50);

        let profile = wallet_profile(&aggregator, &for_wallet()).await.unwrap();
        assert_eq!(profile.blur, 310.5);
        assert_eq!(profile.looks, 2.0);
        assert!(profile.stats.is_whale);
        assert_eq!(profile.stats.nft_count, 19);
        assert_eq!(profile.risk.risk_level, "low");
        let rendered = serde_json::to_value(&profile).unwrap();
        assert!(rendered.get("message").is_none());
    }

    #[tokio::test]
    async fn test_profile_blank_risk_level_reads_as_low() {
        let upstream = ScriptedUpstream::new(|_, _| {
            Ok(page(vec![json!({"aml_risk_level": "", "aml_is_sanctioned": false})], None))
        });
        let aggregator = Aggregator::new(&upstream, 50);

        let profile = wallet_profile(&aggregator, &for_wallet()).await.unwrap();
        assert_eq!(profile.risk.risk_level, "low");
    }

    #[tokio::test]
    async fn test_summary_scores_primary_record() {
        let upstream = ScriptedUpstream::new(|_, _| {
            Ok(page(
                vec![json!({"buy_volume": 10, "sell_volume": 25, "wash_trade_volume": 3, "sales": 10, "floor_price": 1})],
                None,
            ))
        });
        let aggregator = Aggregator::new(&upstream, 50);

        let summary = wallet_summary(&aggregator, &for_wallet()).await.unwrap();
        assert_eq!(summary.realized_profit, "15.00");
        // wash volume and a 0.3 suspect ratio
        assert_eq!(summary.risk_score, 45.0);
        assert_eq!(summary.risk_label, PortfolioRiskLabel::ModerateRisk);
    }

    #[tokio::test]
    async fn test_wallet_is_required() {
        let upstream = ScriptedUpstream::unreachable();
        let aggregator = Aggregator::new(&upstream, 50);
        let err = wallet_summary(&aggregator, &RawQuery::default()).await.unwrap_err();
        assert_eq!(err.status().as_u16(), 400);
    }
}
