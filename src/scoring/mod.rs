/// Derived risk and health scores

pub mod health;
pub mod portfolio;

pub use health::{HealthBreakdown, HealthScorer, MarketplaceRiskLevel, ScoringError};
pub use portfolio::{portfolio_risk_score, PortfolioRiskInputs, PortfolioRiskLabel, PortfolioSummary};
