/// Time-series payload shapes
///
/// Upstream resources return one record holding a date array plus parallel
/// metric arrays. These helpers turn that into one object per timestamp and
/// lift the scalar totals and changes into separate metadata blocks.

use std::collections::BTreeMap;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::aggregation::{align_series, BucketGranularity, Snapshot};
use crate::core::{Chain, TimeRange};
use super::timestamps::serialize_iso;

pub type MetricBlock = BTreeMap<String, f64>;

/// One point of a merged series
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SeriesPoint {
    #[serde(serialize_with = "serialize_iso")]
    pub date: DateTime<Utc>,
    #[serde(flatten)]
    pub metrics: MetricBlock,
}

impl SeriesPoint {
    pub fn new(date: DateTime<Utc>) -> Self {
        Self {
            date,
            metrics: MetricBlock::new(),
        }
    }

    pub fn metric(&self, name: &str) -> f64 {
        self.metrics.get(name).copied().unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SeriesMetadata {
    #[serde(rename = "timeFrame")]
    pub time_frame: TimeRange,
    pub chain: Chain,
    pub totals: MetricBlock,
    pub changes: MetricBlock,
}

#[derive(Debug, Clone, Serialize)]
pub struct SeriesPayload {
    pub data: Vec<SeriesPoint>,
    pub metadata: SeriesMetadata,
}

/// Output field `name` read from `key` of a source record.
#[derive(Debug, Clone, Copy)]
pub struct MetricColumn<'a> {
    pub name: &'static str,
    pub source: Snapshot<'a>,
    pub key: &'static str,
}

impl<'a> MetricColumn<'a> {
    pub fn new(name: &'static str, source: Snapshot<'a>, key: &'static str) -> Self {
        Self { name, source, key }
    }
}

/// Build the ordered point list from a primary date array and parallel metric
/// arrays, which may live on different records.
pub fn parallel_records(dates: &[Value], granularity: BucketGranularity, columns: &[MetricColumn<'_>]) -> Vec<SeriesPoint> {
    align_series(dates, granularity, |date, index| SeriesPoint {
        date,
        metrics: columns
            .iter()
            .map(|column| (column.name.to_string(), column.source.at(column.key, index)))
            .collect(),
    })
}

/// Scalar metadata block; missing fields read as 0.
pub fn metric_block(columns: &[MetricColumn<'_>]) -> MetricBlock {
    columns
        .iter()
        .map(|column| (column.name.to_string(), column.source.number(column.key)))
        .collect()
}
