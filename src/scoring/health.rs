/// Marketplace health scoring
///
/// A marketplace's score is a weighted blend of four wash-trade ratios taken
/// from its trader record and the matching wash-trade record. Higher means
/// more wash-trade exposure. Scores are always in [0, 100].

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::core::fields::{self, parse_number};
use crate::core::Entity;

pub const SUSPECT_SALES_WEIGHT: f64 = 0.35;
pub const WALLET_RATIO_WEIGHT: f64 = 0.30;
pub const VOLUME_RATIO_WEIGHT: f64 = 0.25;
pub const ASSETS_RATIO_WEIGHT: f64 = 0.10;

/// Score used when none of the fallback inputs can be read.
pub const NEUTRAL_SCORE: f64 = 50.0;

const FALLBACK_SCALE: f64 = 50.0;
const MAX_TIME_WEIGHT: f64 = 1.5;

/// Trader-side fields read by the primary formula
const TRADER_FIELDS: [&str; 3] = ["traders", "volume", "total_assets"];
/// Wash-trade-side fields read by the primary formula
const WASH_FIELDS: [&str; 4] = [
    "washtrade_suspect_sales_ratio",
    "washtrade_wallets",
    "washtrade_volume",
    "washtrade_assets",
];

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScoringError {
    #[error("Field {0} is present but not numeric")]
    NonNumeric(&'static str),

    #[error("Non-finite intermediate: {0}")]
    NonFinite(&'static str),
}

/// Normalized ratios feeding the weighted sum
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseMetrics {
    pub suspect_sales_ratio: f64,
    pub wash_trade_wallets_ratio: f64,
    pub volume_ratio: f64,
    pub assets_ratio: f64,
    pub total_volume: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightedComponents {
    pub suspect_sales: f64,
    pub wallet_ratio: f64,
    pub volume_ratio: f64,
    pub assets_ratio: f64,
}

impl WeightedComponents {
    pub fn from_metrics(metrics: &BaseMetrics) -> Self {
        Self {
            suspect_sales: metrics.suspect_sales_ratio * SUSPECT_SALES_WEIGHT,
            wallet_ratio: metrics.wash_trade_wallets_ratio * WALLET_RATIO_WEIGHT,
            volume_ratio: metrics.volume_ratio * VOLUME_RATIO_WEIGHT,
            assets_ratio: metrics.assets_ratio * ASSETS_RATIO_WEIGHT,
        }
    }

    pub fn sum(&self) -> f64 {
        self.suspect_sales + self.wallet_ratio + self.volume_ratio + self.assets_ratio
    }
}

/// Everything computed for one marketplace. `time_weight`, `volume_severity`
/// and `risk_multiplier` are diagnostics only; the score is the weighted sum.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthBreakdown {
    pub score: f64,
    pub risk_level: MarketplaceRiskLevel,
    pub metrics: Option<BaseMetrics>,
    pub components: Option<WeightedComponents>,
    pub time_weight: f64,
    pub volume_severity: f64,
    pub risk_multiplier: f64,
    pub used_fallback: bool,
}

/// Label scale for marketplace health scores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MarketplaceRiskLevel {
    #[serde(rename = "Extreme Risk")]
    Extreme,
    #[serde(rename = "Very High Risk")]
    VeryHigh,
    #[serde(rename = "High Risk")]
    High,
    #[serde(rename = "Moderate Risk")]
    Moderate,
    #[serde(rename = "Low Risk")]
    Low,
}

impl MarketplaceRiskLevel {
    pub fn from_score(score: f64) -> Self {
        if score >= 75.0 {
            MarketplaceRiskLevel::Extreme
        } else if score >= 50.0 {
            MarketplaceRiskLevel::VeryHigh
        } else if score >= 25.0 {
            MarketplaceRiskLevel::High
        } else if score >= 10.0 {
            MarketplaceRiskLevel::Moderate
        } else {
            MarketplaceRiskLevel::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MarketplaceRiskLevel::Extreme => "Extreme Risk",
            MarketplaceRiskLevel::VeryHigh => "Very High Risk",
            MarketplaceRiskLevel::High => "High Risk",
            MarketplaceRiskLevel::Moderate => "Moderate Risk",
            MarketplaceRiskLevel::Low => "Low Risk",
        }
    }
}

pub struct HealthScorer;

impl HealthScorer {
    pub fn new() -> Self {
        Self
    }

    /// Health score for one joined trader/wash-trade record pair.
    pub fn score(&self, trader: &Entity, wash: &Entity) -> f64 {
        self.assess(trader, wash).score
    }

    pub fn assess(&self, trader: &Entity, wash: &Entity) -> HealthBreakdown {
        match self.primary(trader, wash) {
            Ok((metrics, components, score)) => {
                let riskiest = risk_multiplier(&metrics);
                HealthBreakdown {
                    score,
                    risk_level: MarketplaceRiskLevel::from_score(score),
                    metrics: Some(metrics),
                    components: Some(components),
                    time_weight: time_weight(fields::number(trader, "activity_duration")),
                    volume_severity: volume_severity(metrics.total_volume),
                    risk_multiplier: riskiest,
                    used_fallback: false,
                }
            }
            Err(e) => {
                let score = fallback_score(trader, wash);
                debug!(error = %e, score, "Health score fell back to partial metrics");
                HealthBreakdown {
                    score,
                    risk_level: MarketplaceRiskLevel::from_score(score),
                    metrics: None,
                    components: None,
                    time_weight: 1.0,
                    volume_severity: 1.0,
                    risk_multiplier: 0.0,
                    used_fallback: true,
                }
            }
        }
    }

    fn primary(&self, trader: &Entity, wash: &Entity) -> Result<(BaseMetrics, WeightedComponents, f64), ScoringError> {
        ensure_numeric(trader, &TRADER_FIELDS)?;
        ensure_numeric(wash, &WASH_FIELDS)?;

        let metrics = base_metrics(trader, wash);
        let components = WeightedComponents::from_metrics(&metrics);
        let raw = components.sum() * 100.0;
        if raw.is_nan() {
            return Err(ScoringError::NonFinite("weighted score"));
        }
        Ok((metrics, components, round2(raw.clamp(0.0, 100.0))))
    }
}

impl Default for HealthScorer {
    fn default() -> Self {
        Self::new()
    }
}

fn ensure_numeric(entity: &Entity, keys: &[&'static str]) -> Result<(), ScoringError> {
    for key in keys {
        if fields::is_present(entity, key) && fields::number(entity, key).is_none() {
            return Err(ScoringError::NonNumeric(key));
        }
    }
    Ok(())
}

/// Zero or missing divisors count as 1.
fn divisor(value: Option<f64>) -> f64 {
    match value {
        Some(v) if v != 0.0 => v,
        _ => 1.0,
    }
}

pub fn base_metrics(trader: &Entity, wash: &Entity) -> BaseMetrics {
    let total_traders = divisor(fields::integer(trader, "traders").map(|n| n as f64));
    let total_volume = divisor(fields::number(trader, "volume"));
    let total_assets = divisor(fields::integer(trader, "total_assets").map(|n| n as f64));

    BaseMetrics {
        suspect_sales_ratio: fields::number(wash, "washtrade_suspect_sales_ratio").unwrap_or(0.0),
        wash_trade_wallets_ratio: fields::integer(wash, "washtrade_wallets").unwrap_or(0) as f64 / total_traders,
        volume_ratio: fields::number(wash, "washtrade_volume").unwrap_or(0.0) / total_volume,
        assets_ratio: fields::integer(wash, "washtrade_assets").unwrap_or(0) as f64 / total_assets,
        total_volume,
    }
}

/// Longer-lived marketplaces weigh up to 1.5x; unknown duration is neutral.
pub fn time_weight(activity_duration_days: Option<f64>) -> f64 {
    match activity_duration_days.map(f64::trunc) {
        Some(days) if days > 0.0 => (1.0 + (days / 30.0).log10() / 2.0).min(MAX_TIME_WEIGHT),
        _ => 1.0,
    }
}

/// Log-scaled around 1M of volume.
pub fn volume_severity(total_volume: f64) -> f64 {
    if total_volume > 0.0 {
        1.0 + (total_volume / 1_000_000.0).log10() / 4.0
    } else {
        1.0
    }
}

pub fn risk_multiplier(metrics: &BaseMetrics) -> f64 {
    metrics
        .suspect_sales_ratio
        .max(metrics.wash_trade_wallets_ratio)
        .max(metrics.volume_ratio)
}

/// Mean of whichever of suspect-sales ratio, trader volume and wash-trade
/// wallets parse, scaled by 50.
pub fn fallback_score(trader: &Entity, wash: &Entity) -> f64 {
    let available: Vec<f64> = [
        wash.get("washtrade_suspect_sales_ratio"),
        trader.get("volume"),
        wash.get("washtrade_wallets"),
    ]
    .into_iter()
    .flatten()
    .filter_map(parse_number)
    .collect();

    if available.is_empty() {
        return NEUTRAL_SCORE;
    }
    let mean = available.iter().sum::<f64>() / available.len() as f64;
    let score = mean * FALLBACK_SCALE;
    if score.is_nan() {
        NEUTRAL_SCORE
    } else {
        score.clamp(0.0, 100.0)
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
