/// Multi-resource aggregation: concurrent fan-out, snapshot and time-series merges

pub mod buckets;
pub mod settle;
pub mod snapshot;

pub use buckets::{align_series, BucketGranularity, TimeBuckets};
pub use settle::{Aggregator, ResourceOutcome, ResourceRequest, SettledResources};
pub use snapshot::Snapshot;
