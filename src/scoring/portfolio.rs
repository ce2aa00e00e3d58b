/// Wallet portfolio risk status and P&L summary
///
/// The risk status starts from a clean 100 and subtracts fixed penalties. It
/// is a safety score, so its label scale runs the opposite way from
/// marketplace health.

use serde::Serialize;

use crate::core::fields::{self, NOT_AVAILABLE};
use crate::core::Entity;

pub const CLEAN_SCORE: f64 = 100.0;
pub const WASH_VOLUME_PENALTY: f64 = 40.0;
pub const SUSPECT_RATIO_PENALTY: f64 = 15.0;
pub const CONNECTED_WALLETS_PENALTY: f64 = 15.0;
pub const MISSING_FLOOR_PENALTY: f64 = 10.0;

const SUSPECT_RATIO_THRESHOLD: f64 = 0.1;
const CONNECTED_WALLETS_THRESHOLD: f64 = 5.0;

/// Rendering used for money fields when the wallet has no analytics record.
const EMPTY_AMOUNT: &str = "0.0000";

/// Inputs read from a wallet analytics record
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PortfolioRiskInputs {
    pub wash_trade_volume: f64,
    pub sales: f64,
    pub transfers: f64,
    pub transactions: f64,
    pub floor_price: Option<f64>,
}

impl PortfolioRiskInputs {
    pub fn from_entity(entity: &Entity) -> Self {
        let transactions = fields::number(entity, "transactions").unwrap_or(0.0);
        Self {
            wash_trade_volume: fields::number(entity, "wash_trade_volume").unwrap_or(0.0),
            sales: fields::number(entity, "sales").unwrap_or(0.0),
            transfers: fields::number(entity, "transfers").unwrap_or(0.0),
            transactions: if transactions == 0.0 { 1.0 } else { transactions },
            floor_price: fields::number(entity, "floor_price"),
        }
    }
}

pub fn portfolio_risk_score(inputs: &PortfolioRiskInputs) -> f64 {
    let mut score = CLEAN_SCORE;

    if inputs.wash_trade_volume > 0.0 {
        score -= WASH_VOLUME_PENALTY;
    }

    let suspect_ratio = if inputs.sales > 0.0 {
        inputs.wash_trade_volume / inputs.sales
    } else {
        0.0
    };
    if suspect_ratio > SUSPECT_RATIO_THRESHOLD {
        score -= SUSPECT_RATIO_PENALTY;
    }

    let transactions = if inputs.transactions == 0.0 { 1.0 } else { inputs.transactions };
    if inputs.transfers / transactions > CONNECTED_WALLETS_THRESHOLD {
        score -= CONNECTED_WALLETS_PENALTY;
    }

    if inputs.floor_price.map_or(true, |price| price == 0.0) {
        score -= MISSING_FLOOR_PENALTY;
    }

    score.clamp(0.0, 100.0)
}

/// Label scale for wallet portfolio risk status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PortfolioRiskLabel {
    #[serde(rename = "Very Safe")]
    VerySafe,
    Safe,
    #[serde(rename = "Moderate Risk")]
    ModerateRisk,
    #[serde(rename = "High Risk")]
    HighRisk,
    #[serde(rename = "Very High Risk")]
    VeryHighRisk,
    Unknown,
}

impl PortfolioRiskLabel {
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            PortfolioRiskLabel::VerySafe
        } else if score >= 60.0 {
            PortfolioRiskLabel::Safe
        } else if score >= 40.0 {
            PortfolioRiskLabel::ModerateRisk
        } else if score >= 20.0 {
            PortfolioRiskLabel::HighRisk
        } else {
            PortfolioRiskLabel::VeryHighRisk
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradingSummary {
    pub nfts_bought: i64,
    pub nfts_sold: i64,
    pub buy_volume: String,
    pub sell_volume: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskAnalysis {
    pub suspicious_activity_detected: bool,
    pub wash_traded_nfts: i64,
    pub wash_traded_volume: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NftOverview {
    pub minted: i64,
    pub burnt: i64,
    pub transferred: i64,
    pub received: i64,
}

/// Derived wallet P&L, risk status and activity overview
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioSummary {
    pub realized_profit: String,
    pub unrealized_profit: String,
    #[serde(rename = "totalPL")]
    pub total_pl: String,
    pub estimated_portfolio_value: String,
    pub total_volume: String,
    pub risk_score: f64,
    pub risk_label: PortfolioRiskLabel,
    pub trading: TradingSummary,
    pub risk_analysis: RiskAnalysis,
    pub nft_overview: NftOverview,
}

/// Transaction count above which activity is flagged as suspicious.
const SUSPICIOUS_TRANSACTIONS: f64 = 100.0;
const WASH_ESTIMATE_SHARE: f64 = 0.1;

impl PortfolioSummary {
    /// Summary for the wallet's primary analytics record; `None` yields the
    /// empty summary labelled `Unknown`.
    pub fn from_record(record: Option<&Entity>) -> Self {
        let Some(record) = record else {
            return Self::empty();
        };
        let value = |key: &str| fields::number(record, key).unwrap_or(0.0);
        let whole = |key: &str| fields::integer(record, key).unwrap_or(0);

        let buy_volume = value("buy_volume");
        let sell_volume = value("sell_volume");
        let minted_value = value("minted_value");
        let realized = sell_volume - buy_volume;
        let risk_score = portfolio_risk_score(&PortfolioRiskInputs::from_entity(record));

        Self {
            realized_profit: fixed2(realized),
            unrealized_profit: fixed2(minted_value),
            total_pl: fixed2(realized + minted_value),
            estimated_portfolio_value: fixed2(minted_value + buy_volume),
            total_volume: fixed2(buy_volume + sell_volume),
            risk_score,
            risk_label: PortfolioRiskLabel::from_score(risk_score),
            trading: TradingSummary {
                nfts_bought: whole("nft_bought"),
                nfts_sold: whole("nft_sold"),
                buy_volume: fixed2(buy_volume),
                sell_volume: fixed2(sell_volume),
            },
            risk_analysis: RiskAnalysis {
                suspicious_activity_detected: value("transactions") > SUSPICIOUS_TRANSACTIONS,
                wash_traded_nfts: (value("transfers") * WASH_ESTIMATE_SHARE).floor() as i64,
                wash_traded_volume: (sell_volume * WASH_ESTIMATE_SHARE).floor() as i64,
            },
            nft_overview: NftOverview {
                minted: whole("nft_mint"),
                burnt: whole("nft_burn"),
                transferred: whole("nft_transfer"),
                received: whole("transfers"),
            },
        }
    }

    pub fn empty() -> Self {
        Self {
            realized_profit: EMPTY_AMOUNT.to_string(),
            unrealized_profit: EMPTY_AMOUNT.to_string(),
            total_pl: EMPTY_AMOUNT.to_string(),
            estimated_portfolio_value: EMPTY_AMOUNT.to_string(),
            total_volume: EMPTY_AMOUNT.to_string(),
            risk_score: 0.0,
            risk_label: PortfolioRiskLabel::Unknown,
            trading: TradingSummary {
                nfts_bought: 0,
                nfts_sold: 0,
                buy_volume: EMPTY_AMOUNT.to_string(),
                sell_volume: EMPTY_AMOUNT.to_string(),
            },
            risk_analysis: RiskAnalysis {
                suspicious_activity_detected: false,
                wash_traded_nfts: 0,
                wash_traded_volume: 0,
            },
            nft_overview: NftOverview {
                minted: 0,
                burnt: 0,
                transferred: 0,
                received: 0,
            },
        }
    }
}

fn fixed2(value: f64) -> String {
    if value.is_finite() {
        format!("{:.2}", value)
    } else {
        NOT_AVAILABLE.to_string()
    }
}
