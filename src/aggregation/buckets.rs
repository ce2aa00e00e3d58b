/// Timestamp bucketing for time-series merges

use std::collections::BTreeMap;
use chrono::{DateTime, Datelike, DurationRound, TimeDelta, TimeZone, Utc};
use serde_json::Value;
use tracing::warn;

use crate::core::{Chain, TimeRange};
use crate::normalize::timestamps::parse_timestamp_value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketGranularity {
    Exact,
    Hour,
    Month,
}

impl BucketGranularity {
    /// Single-chain series: sub-hourly chains collapse to hourly points on the
    /// shortest window, everything else keeps upstream timestamps.
    pub fn for_series(chain: Chain, range: TimeRange) -> Self {
        if chain.samples_sub_hourly() && range.is_shortest() {
            BucketGranularity::Hour
        } else {
            BucketGranularity::Exact
        }
    }

    /// Shared key when several chains are merged onto one axis.
    pub fn for_comparison(range: TimeRange) -> Self {
        match range {
            TimeRange::Last24Hours => BucketGranularity::Hour,
            TimeRange::AllTime => BucketGranularity::Month,
            _ => BucketGranularity::Exact,
        }
    }

    pub fn truncate(&self, ts: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            BucketGranularity::Exact => ts,
            BucketGranularity::Hour => ts.duration_trunc(TimeDelta::hours(1)).unwrap_or(ts),
            BucketGranularity::Month => Utc
                .with_ymd_and_hms(ts.year(), ts.month(), 1, 0, 0, 0)
                .single()
                .unwrap_or(ts),
        }
    }
}

/// Time-ordered buckets; a later sample in the same bucket replaces the earlier one.
#[derive(Debug, Clone)]
pub struct TimeBuckets<T> {
    granularity: BucketGranularity,
    buckets: BTreeMap<DateTime<Utc>, T>,
}

impl<T> TimeBuckets<T> {
    pub fn new(granularity: BucketGranularity) -> Self {
        Self {
            granularity,
            buckets: BTreeMap::new(),
        }
    }

    pub fn key_for(&self, ts: DateTime<Utc>) -> DateTime<Utc> {
        self.granularity.truncate(ts)
    }

    pub fn insert(&mut self, ts: DateTime<Utc>, value: T) {
        let key = self.key_for(ts);
        self.buckets.insert(key, value);
    }

    pub fn entry(&mut self, ts: DateTime<Utc>) -> &mut T
    where
        T: Default,
    {
        let key = self.key_for(ts);
        self.buckets.entry(key).or_default()
    }

    pub fn into_points(self) -> Vec<(DateTime<Utc>, T)> {
        self.buckets.into_iter().collect()
    }
}

/// Walk a primary date array and build one record per bucket. `build` gets the
/// bucket timestamp and the positional index into the parallel metric arrays.
/// Unparseable dates are skipped.
pub fn align_series<T, F>(dates: &[Value], granularity: BucketGranularity, mut build: F) -> Vec<T>
where
    F: FnMut(DateTime<Utc>, usize) -> T,
{
    let mut buckets = TimeBuckets::new(granularity);
    let mut skipped = 0usize;

    for (index, raw) in dates.iter().enumerate() {
        match parse_timestamp_value(raw) {
            Some(ts) => {
                let key = buckets.key_for(ts);
                buckets.insert(key, build(key, index));
            }
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        warn!(skipped, total = dates.len(), "Skipped unparseable series dates");
    }
    buckets.into_points().into_iter().map(|(_, record)| record).collect()
}
