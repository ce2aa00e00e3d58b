/// Response shaping: time-series records, metadata blocks and timestamps

pub mod series;
pub mod timestamps;

pub use series::{metric_block, parallel_records, MetricBlock, MetricColumn, SeriesMetadata, SeriesPayload, SeriesPoint};
pub use timestamps::{format_iso, parse_timestamp, parse_timestamp_value};
