/// Market Insights Handler
///
/// Chain-level time series from the analytics, holders and traders
/// resources, plus the multi-chain comparison built on top of it.

use futures_util::future::join_all;
use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::aggregation::{Aggregator, BucketGranularity, ResourceRequest, SettledResources, TimeBuckets};
use crate::core::{paths, Chain, TimeRange, ValidationError};
use crate::normalize::{metric_block, parallel_records, MetricColumn, SeriesMetadata, SeriesPayload, SeriesPoint};
use crate::server::{ApiError, RawQuery};
use crate::upstream::Params;

const ANALYTICS: &str = "analytics";
const HOLDERS: &str = "holders";
const TRADERS: &str = "traders";

const FETCH_FAILED: &str = "Failed to fetch market data";
const NOT_FOUND: &str = "Market data not found";
const INVALID_STRUCTURE: &str = "Invalid data structure received from API";

/// Comparison metric names and the series field each one reads.
pub const COMPARISON_METRICS: [(&str, &str); 7] = [
    ("volume", "volume_trend"),
    ("sales", "sales_trend"),
    ("transactions", "transactions_trend"),
    ("holders", "holders_trend"),
    ("traders", "traders_trend"),
    ("buyers", "traders_buyers_trend"),
    ("sellers", "traders_sellers_trend"),
];

#[instrument(skip(aggregator, query))]
pub async fn chart_data(aggregator: &Aggregator<'_>, query: &RawQuery) -> Result<SeriesPayload, ApiError> {
    let (chain, range) = query.market_window(Chain::Ethereum, TimeRange::Last24Hours)?;
    fetch_series(aggregator, chain, range).await
}

async fn fetch_series(aggregator: &Aggregator<'_>, chain: Chain, range: TimeRange) -> Result<SeriesPayload, ApiError> {
    let params = Params::new()
        .with("blockchain", chain)
        .with("time_range", range);

    let settled = aggregator
        .aggregate(vec![
            ResourceRequest::single(ANALYTICS, paths::MARKET_INSIGHTS_ANALYTICS, params.clone()),
            ResourceRequest::single(HOLDERS, paths::MARKET_INSIGHTS_HOLDERS, params.clone()),
            ResourceRequest::single(TRADERS, paths::MARKET_INSIGHTS_TRADERS, params),
        ])
        .await;

    if let Some(e) = settled.failure(ANALYTICS) {
        return Err(ApiError::upstream(FETCH_FAILED, NOT_FOUND)(e.clone()));
    }
    build_series(&settled, chain, range)
}

fn build_series(settled: &SettledResources, chain: Chain, range: TimeRange) -> Result<SeriesPayload, ApiError> {
    let analytics = settled.snapshot(ANALYTICS);
    let holders = settled.snapshot(HOLDERS);
    let traders = settled.snapshot(TRADERS);

    let dates = analytics.array("block_dates").ok_or_else(|| {
        warn!(%chain, %range, "Analytics record has no block_dates");
        ApiError::InvalidUpstreamData(INVALID_STRUCTURE)
    })?;

    let columns = [
        MetricColumn::new("volume_trend", analytics, "volume_trend"),
        MetricColumn::new("sales_trend", analytics, "sales_trend"),
        MetricColumn::new("transactions_trend", analytics, "transactions_trend"),
        MetricColumn::new("holders_trend", holders, "holders_trend"),
        MetricColumn::new("traders_trend", traders, "traders_trend"),
        MetricColumn::new("traders_buyers_trend", traders, "traders_buyers_trend"),
        MetricColumn::new("traders_sellers_trend", traders, "traders_sellers_trend"),
    ];
    let data = parallel_records(dates, BucketGranularity::for_series(chain, range), &columns);

    let totals = metric_block(&[
        MetricColumn::new("volume", analytics, "volume"),
        MetricColumn::new("sales", analytics, "sales"),
        MetricColumn::new("transactions", analytics, "transactions"),
        MetricColumn::new("holders", holders, "holders"),
        MetricColumn::new("traders", traders, "traders"),
    ]);
    let changes = metric_block(&[
        MetricColumn::new("volume_change", analytics, "volume_change"),
        MetricColumn::new("sales_change", analytics, "sales_change"),
        MetricColumn::new("transactions_change", analytics, "transactions_change"),
        MetricColumn::new("holders_change", holders, "holders_change"),
        MetricColumn::new("traders_change", traders, "traders_change"),
    ]);

    debug!(%chain, %range, points = data.len(), "Market insight series built");
    Ok(SeriesPayload {
        data,
        metadata: SeriesMetadata {
            time_frame: range,
            chain,
            totals,
            changes,
        },
    })
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonMetadata {
    pub time_frame: TimeRange,
    pub chains: Vec<Chain>,
    pub metrics: Vec<&'static str>,
    pub failed_chains: Vec<Chain>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComparisonPayload {
    pub data: Vec<SeriesPoint>,
    pub metadata: ComparisonMetadata,
}

fn comparison_metrics(query: &RawQuery) -> Result<Vec<(&'static str, &'static str)>, ValidationError> {
    let names = query.metric_names();
    if names.is_empty() {
        return Ok(vec![COMPARISON_METRICS[0]]);
    }
    let mut selected = Vec::new();
    for name in names {
        let metric = COMPARISON_METRICS
            .iter()
            .copied()
            .find(|(metric, _)| metric.eq_ignore_ascii_case(name))
            .ok_or_else(|| ValidationError::UnsupportedMetric(name.to_string()))?;
        if !selected.contains(&metric) {
            selected.push(metric);
        }
    }
    Ok(selected)
}

/// Several chains' series merged onto one time axis. Each bucket carries
/// `<series field>_<chain>` entries for the selected metrics.
#[instrument(skip(aggregator, query))]
pub async fn compare_chains(aggregator: &Aggregator<'_>, query: &RawQuery) -> Result<ComparisonPayload, ApiError> {
    let range = query.time_range_or(TimeRange::Last24Hours)?;
    let chains = query.chain_list(range)?;
    let metrics = comparison_metrics(query)?;

    let results = join_all(chains.iter().map(|chain| fetch_series(aggregator, *chain, range))).await;

    let mut buckets: TimeBuckets<SeriesPoint> = TimeBuckets::new(BucketGranularity::for_comparison(range));
    let mut failed_chains = Vec::new();
    let mut first_error = None;

    for (chain, result) in chains.iter().zip(results) {
        match result {
            Ok(series) => {
                for point in series.data {
                    let key = buckets.key_for(point.date);
                    let bucket = buckets.entry(point.date);
                    bucket.date = key;
                    for (_, field) in &metrics {
                        bucket
                            .metrics
                            .insert(format!("{}_{}", field, chain), point.metric(field));
                    }
                }
            }
            Err(e) => {
                warn!(%chain, error = %e, "Chain excluded from comparison");
                failed_chains.push(*chain);
                first_error.get_or_insert(e);
            }
        }
    }

    if failed_chains.len() == chains.len() {
        if let Some(e) = first_error {
            return Err(e);
        }
    }

    Ok(ComparisonPayload {
        data: buckets.into_points().into_iter().map(|(_, point)| point).collect(),
        metadata: ComparisonMetadata {
            time_frame: range,
            chains,
            metrics: metrics.into_iter().map(|(name, _)| name).collect(),
            failed_chains,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{page, ScriptedUpstream};
    use chrono::{Duration, TimeZone, Utc};
    use serde_json::{json, Value};

    fn query(pairs: &[(&str, &str)]) -> RawQuery {
        let mut q = RawQuery::default();
        for (key, value) in pairs {
            let value = Some(value.to_string());
            match *key {
                "chain" => q.chain = value,
                "timeFrame" => q.time_frame = value,
                "chains" => q.chains = value,
                "metrics" => q.metrics = value,
                other => panic!("unexpected key {}", other),
            }
        }
        q
    }

    fn hourly_dates(count: i64) -> Vec<Value> {
        let start = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        (0..count)
            .map(|h| json!((start + Duration::hours(h)).format("%Y-%m-%dT%H:%M:%SZ").to_string()))
            .collect()
    }

    fn market_upstream(dates: Vec<Value>) -> ScriptedUpstream {
        let n = dates.len();
        let trend = |scale: f64| (0..n).map(|i| json!(i as f64 * scale)).collect::<Vec<_>>();
        let analytics = json!({
            "block_dates": dates,
            "volume_trend": trend(1.0),
            "sales_trend": trend(2.0),
            "transactions_trend": trend(3.0),
            "volume": 1200.5, "sales": 300, "transactions": "450",
            "volume_change": 0.12, "sales_change": -0.05, "transactions_change": 0.3
        });
        let holders = json!({"holders_trend": trend(4.0), "holders": 90, "holders_change": 0.01});
        let traders = json!({
            "traders_trend": trend(5.0),
            "traders_buyers_trend": trend(6.0),
            "traders_sellers_trend": trend(7.0),
            "traders": 40, "traders_change": 0.2
        });
        ScriptedUpstream::new(move |path, _| match path {
            paths::MARKET_INSIGHTS_ANALYTICS => Ok(page(vec![analytics.clone()], None)),
            paths::MARKET_INSIGHTS_HOLDERS => Ok(page(vec![holders.clone()], None)),
            paths::MARKET_INSIGHTS_TRADERS => Ok(page(vec![traders.clone()], None)),
            other => panic!("unexpected path {}", other),
        })
    }

    #[tokio::test]
    async fn test_ethereum_daily_window_yields_ordered_records() {
        let upstream = market_upstream(hourly_dates(24));
        let aggregator = Aggregator::new(&upstream, 50);

        let payload = chart_data(&aggregator, &query(&[("chain", "ethereum"), ("timeFrame", "24h")]))
            .await
            .unwrap();

        assert_eq!(payload.data.len(), 24);
        assert!(payload.data.windows(2).all(|w| w[0].date < w[1].date));
        for (i, point) in payload.data.iter().enumerate() {
            assert_eq!(point.metrics.len(), 7);
            assert_eq!(point.metric("traders_sellers_trend"), i as f64 * 7.0);
        }
        assert_eq!(payload.metadata.totals.len(), 5);
        assert_eq!(payload.metadata.totals["transactions"], 450.0);
        assert_eq!(payload.metadata.changes["holders_change"], 0.01);
        assert_eq!(upstream.call_count(), 3);

        let (_, params) = &upstream.calls()[0];
        assert_eq!(params.get("blockchain"), Some("ethereum"));
        assert_eq!(params.get("time_range"), Some("24h"));
    }

    #[tokio::test]
    async fn test_bitcoin_daily_window_collapses_sub_hour_samples() {
        let dates = vec![
            json!("2024-06-01T00:10:00Z"),
            json!("2024-06-01T00:40:00Z"),
            json!("2024-06-01T01:05:00Z"),
        ];
        let upstream = market_upstream(dates);
        let aggregator = Aggregator::new(&upstream, 50);

        let payload = chart_data(&aggregator, &query(&[("chain", "bitcoin"), ("timeFrame", "24h")]))
            .await
            .unwrap();

        assert_eq!(payload.data.len(), 2);
        assert_eq!(payload.data[0].date, Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap());
        // last sample in the hour wins
        assert_eq!(payload.data[0].metric("volume_trend"), 1.0);
        assert_eq!(payload.data[1].metric("volume_trend"), 2.0);
    }

    #[tokio::test]
    async fn test_secondary_failures_default_to_zero() {
        let upstream = ScriptedUpstream::new(|path, _| match path {
            paths::MARKET_INSIGHTS_ANALYTICS => Ok(page(
                vec![json!({"block_dates": ["2024-06-01"], "volume_trend": [9]})],
                None,
            )),
            _ => Err(ScriptedUpstream::remote_error(path, 500)),
        });
        let aggregator = Aggregator::new(&upstream, 50);

        let payload = chart_data(&aggregator, &RawQuery::default()).await.unwrap();
        assert_eq!(payload.data.len(), 1);
        assert_eq!(payload.data[0].metric("volume_trend"), 9.0);
        assert_eq!(payload.data[0].metric("holders_trend"), 0.0);
        assert_eq!(payload.metadata.totals["traders"], 0.0);
    }

    #[tokio::test]
    async fn test_primary_failure_and_missing_dates() {
        let upstream = ScriptedUpstream::new(|path, _| Err(ScriptedUpstream::remote_error(path, 429)));
        let aggregator = Aggregator::new(&upstream, 50);
        let err = chart_data(&aggregator, &RawQuery::default()).await.unwrap_err();
        assert_eq!(err.status().as_u16(), 429);

        let upstream = ScriptedUpstream::new(|_, _| Ok(page(vec![json!({"volume": 1})], None)));
        let aggregator = Aggregator::new(&upstream, 50);
        let err = chart_data(&aggregator, &RawQuery::default()).await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidUpstreamData(_)));
    }

    #[tokio::test]
    async fn test_invalid_window_never_calls_upstream() {
        let upstream = ScriptedUpstream::unreachable();
        let aggregator = Aggregator::new(&upstream, 50);
        let err = chart_data(&aggregator, &query(&[("chain", "ethereum"), ("timeFrame", "all")]))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(ValidationError::UnsupportedPair { .. })));
    }

    #[tokio::test]
    async fn test_comparison_merges_chains_on_shared_buckets() {
        let upstream = ScriptedUpstream::new(|path, params| {
            let chain = params.get("blockchain").unwrap_or_default().to_string();
            if chain == "linea" {
                return Err(ScriptedUpstream::transport_error(path));
            }
            let (dates, volume) = if chain == "bitcoin" {
                (json!(["2024-06-01T00:20:00Z", "2024-06-01T01:50:00Z"]), json!([1, 2]))
            } else {
                (json!(["2024-06-01T00:00:00Z", "2024-06-01T01:00:00Z"]), json!([10, 20]))
            };
            Ok(page(vec![json!({"block_dates": dates, "volume_trend": volume})], None))
        });
        let aggregator = Aggregator::new(&upstream, 50);

        let payload = compare_chains(
            &aggregator,
            &query(&[("chains", "bitcoin,solana,linea"), ("timeFrame", "24h"), ("metrics", "volume")]),
        )
        .await
        .unwrap();

        assert_eq!(payload.data.len(), 2);
        assert_eq!(payload.data[0].metric("volume_trend_bitcoin"), 1.0);
        assert_eq!(payload.data[0].metric("volume_trend_solana"), 10.0);
        assert_eq!(payload.data[1].metric("volume_trend_solana"), 20.0);
        assert!(!payload.data[0].metrics.contains_key("volume_trend_linea"));
        assert_eq!(payload.metadata.failed_chains, vec![Chain::Linea]);
        assert_eq!(payload.metadata.metrics, vec!["volume"]);
    }

    #[tokio::test]
    async fn test_comparison_rejects_unknown_metric() {
        let upstream = ScriptedUpstream::unreachable();
        let aggregator = Aggregator::new(&upstream, 50);
        let err = compare_chains(&aggregator, &query(&[("chains", "solana"), ("metrics", "market_cap")]))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(ValidationError::UnsupportedMetric(_))));
    }

    #[tokio::test]
    async fn test_comparison_fails_when_every_chain_fails() {
        let upstream = ScriptedUpstream::new(|path, _| Err(ScriptedUpstream::remote_error(path, 401)));
        let aggregator = Aggregator::new(&upstream, 50);
        let err = compare_chains(&aggregator, &query(&[("chains", "solana,polygon")]))
            .await
            .unwrap_err();
        assert_eq!(err.status().as_u16(), 401);
    }
}
