/// Wash Trade Handler
///
/// Wash-trade time series for one chain and window. Every chain and window
/// pair is forwarded as-is and points keep their exact upstream timestamps.

use tracing::{debug, instrument};

use crate::aggregation::{Aggregator, BucketGranularity, Snapshot};
use crate::core::{paths, Chain, TimeRange};
use crate::normalize::{metric_block, parallel_records, MetricColumn, SeriesMetadata, SeriesPayload};
use crate::server::{ApiError, RawQuery};
use crate::upstream::Params;

const FETCH_FAILED: &str = "Failed to fetch wash trade data";
const NOT_FOUND: &str = "Wash trade data not found";
const INVALID_STRUCTURE: &str = "Invalid data structure received from API";

#[instrument(skip(aggregator, query))]
pub async fn washtrade_series(aggregator: &Aggregator<'_>, query: &RawQuery) -> Result<SeriesPayload, ApiError> {
    let chain = query.chain_or(Chain::Ethereum)?;
    let range = query.time_range_or(TimeRange::Last24Hours)?;
    let params = Params::new()
        .with("blockchain", chain)
        .with("time_range", range);

    let page = aggregator
        .fetch_one(paths::MARKET_INSIGHTS_WASHTRADE, &params)
        .await
        .map_err(ApiError::upstream(FETCH_FAILED, NOT_FOUND))?;

    let record = Snapshot::new(page.first());
    let dates = record
        .array("block_dates")
        .ok_or(ApiError::InvalidUpstreamData(INVALID_STRUCTURE))?;

    let data = parallel_records(
        dates,
        BucketGranularity::Exact,
        &[
            MetricColumn::new("assets", record, "washtrade_assets_trend"),
            MetricColumn::new("suspectSales", record, "washtrade_suspect_sales_trend"),
            MetricColumn::new("suspectTransactions", record, "washtrade_suspect_transactions_trend"),
            MetricColumn::new("volume", record, "washtrade_volume_trend"),
            MetricColumn::new("wallets", record, "washtrade_wallets_trend"),
        ],
    );
    let totals = metric_block(&[
        MetricColumn::new("assets", record, "washtrade_assets"),
        MetricColumn::new("suspectSales", record, "washtrade_suspect_sales"),
        MetricColumn::new("suspectTransactions", record, "washtrade_suspect_transactions"),
        MetricColumn::new("volume", record, "washtrade_volume"),
        MetricColumn::new("wallets", record, "washtrade_wallets"),
    ]);
    let changes = metric_block(&[
        MetricColumn::new("assets_change", record, "washtrade_assets_change"),
        MetricColumn::new("suspect_sales_change", record, "washtrade_suspect_sales_change"),
        MetricColumn::new("suspect_transactions_change", record, "washtrade_suspect_transactions_change"),
        MetricColumn::new("volume_change", record, "washtrade_volume_change"),
        MetricColumn::new("wallets_change", record, "washtrade_wallets_change"),
    ]);

    debug!(%chain, %range, points = data.len(), "Wash-trade series built");
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
