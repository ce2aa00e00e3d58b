/// Query vocabulary shared by every aggregation flow

use std::fmt;
use std::str::FromStr;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One upstream record: a flat JSON object whose field set depends on the resource.
pub type Entity = serde_json::Map<String, serde_json::Value>;

/// Blockchains the upstream market-data API indexes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    Ethereum,
    Binance,
    Avalanche,
    Linea,
    Solana,
    Polygon,
    Bitcoin,
}

impl Chain {
    pub const ALL: [Chain; 7] = [
        Chain::Ethereum,
        Chain::Binance,
        Chain::Avalanche,
        Chain::Linea,
        Chain::Solana,
        Chain::Polygon,
        Chain::Bitcoin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Chain::Ethereum => "ethereum",
            Chain::Binance => "binance",
            Chain::Avalanche => "avalanche",
            Chain::Linea => "linea",
            Chain::Solana => "solana",
            Chain::Polygon => "polygon",
            Chain::Bitcoin => "bitcoin",
        }
    }

    pub fn supported_names() -> Vec<&'static str> {
        Self::ALL.iter().map(Chain::as_str).collect()
    }

    /// Whether market-insight resources exist for this chain over `range`.
    /// Ethereum has no all-time window upstream.
    pub fn supports(&self, range: TimeRange) -> bool {
        !matches!((self, range), (Chain::Ethereum, TimeRange::AllTime))
    }

    /// Chains whose date arrays carry sub-hour samples on the shortest window.
    pub fn samples_sub_hourly(&self) -> bool {
        matches!(self, Chain::Bitcoin)
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Chain {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Chain::ALL
            .iter()
            .copied()
            .find(|chain| chain.as_str() == normalized)
            .ok_or_else(|| ValidationError::UnsupportedChain(s.to_string()))
    }
}

/// Time windows accepted by the upstream `time_range` parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeRange {
    #[serde(rename = "24h")]
    Last24Hours,
    #[serde(rename = "7d")]
    Last7Days,
    #[serde(rename = "30d")]
    Last30Days,
    #[serde(rename = "90d")]
    Last90Days,
    #[serde(rename = "all")]
    AllTime,
}

impl TimeRange {
    pub const ALL: [TimeRange; 5] = [
        TimeRange::Last24Hours,
        TimeRange::Last7Days,
        TimeRange::Last30Days,
        TimeRange::Last90Days,
        TimeRange::AllTime,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeRange::Last24Hours => "24h",
            TimeRange::Last7Days => "7d",
            TimeRange::Last30Days => "30d",
            TimeRange::Last90Days => "90d",
            TimeRange::AllTime => "all",
        }
    }

    pub fn supported_names() -> Vec<&'static str> {
        Self::ALL.iter().map(TimeRange::as_str).collect()
    }

    pub fn is_shortest(&self) -> bool {
        matches!(self, TimeRange::Last24Hours)
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeRange {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        TimeRange::ALL
            .iter()
            .copied()
            .find(|range| range.as_str() == normalized)
            .ok_or_else(|| ValidationError::UnsupportedTimeRange(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            _ => Err(ValidationError::UnsupportedSortOrder(s.to_string())),
        }
    }
}

/// Rejections raised before any upstream call is made
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Invalid chain parameter: {0}")]
    UnsupportedChain(String),

    #[error("Invalid timeFrame parameter: {0}. Supported values are: 24h, 7d, 30d, 90d, all")]
    UnsupportedTimeRange(String),

    #[error("{range} time frame not supported for {chain}")]
    UnsupportedPair { chain: Chain, range: TimeRange },

    #[error("Invalid sort_order parameter: {0}")]
    UnsupportedSortOrder(String),

    #[error("Invalid metric parameter: {0}")]
    UnsupportedMetric(String),

    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Invalid {field} parameter: {value}")]
    InvalidNumber { field: &'static str, value: String },

    #[error("Invalid query string: {0}")]
    MalformedQuery(String),
}
