/// Route table
///
/// Every endpoint is a GET taking its arguments from the query string. The
/// wrappers here only extract state and query and hand off to `handlers`.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;

use crate::core::Entity;
use crate::handlers::market_insights::{self, ComparisonPayload};
use crate::handlers::marketplace::{self, MarketplaceHealth};
use crate::handlers::nft_analytics::{self, NftSnapshot};
use crate::handlers::prediction::{self, PredictionInputs};
use crate::handlers::wallet::{self, WalletAnalysis, WalletPortfolio, WalletProfile};
use crate::handlers::washtrade;
use crate::normalize::SeriesPayload;
use crate::scoring::PortfolioSummary;

use super::{ApiError, AppState, RawQuery};

type ApiResult<T> = Result<Json<T>, ApiError>;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/chartdata", get(chart_data))
        .route("/api/chartdata/compare", get(compare_chains))
        .route("/api/washtradedata", get(washtrade_data))
        .route("/api/marketplacedata", get(marketplace_data))
        .route("/api/nftanalytics", get(nft_analytics))
        .route("/api/nftscore", get(nft_score))
        .route("/api/marketplacerewards", get(marketplace_rewards))
        .route("/api/walletportfolio", get(wallet_portfolio))
        .route("/api/walletanalysis", get(wallet_analysis))
        .route("/api/walletsummary", get(wallet_summary))
        .route("/api/predictiondata", get(prediction_data))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

async fn chart_data(State(state): State<AppState>, query: RawQuery) -> ApiResult<SeriesPayload> {
    market_insights::chart_data(&state.aggregator(), &query).await.map(Json)
}

async fn compare_chains(State(state): State<AppState>, query: RawQuery) -> ApiResult<ComparisonPayload> {
    market_insights::compare_chains(&state.aggregator(), &query).await.map(Json)
}

async fn washtrade_data(State(state): State<AppState>, query: RawQuery) -> ApiResult<SeriesPayload> {
    washtrade::washtrade_series(&state.aggregator(), &query).await.map(Json)
}

async fn marketplace_data(State(state): State<AppState>, query: RawQuery) -> ApiResult<Vec<MarketplaceHealth>> {
    marketplace::marketplace_health(&state.aggregator(), &query).await.map(Json)
}

async fn nft_analytics(State(state): State<AppState>, query: RawQuery) -> ApiResult<NftSnapshot> {
    nft_analytics::nft_analytics(&state.aggregator(), &query).await.map(Json)
}

async fn nft_score(State(state): State<AppState>, query: RawQuery) -> ApiResult<Entity> {
    wallet::wallet_scores(&state.aggregator(), &query).await.map(Json)
}

async fn marketplace_rewards(State(state): State<AppState>, query: RawQuery) -> ApiResult<WalletProfile> {
    wallet::wallet_profile(&state.aggregator(), &query).await.map(Json)
}

async fn wallet_portfolio(State(state): State<AppState>, query: RawQuery) -> ApiResult<WalletPortfolio> {
    wallet::wallet_portfolio(&state.aggregator(), &query).await.map(Json)
}

async fn wallet_analysis(State(state): State<AppState>, query: RawQuery) -> ApiResult<WalletAnalysis> {
    wallet::wallet_analysis(&state.aggregator(), &query).await.map(Json)
}

async fn wallet_summary(State(state): State<AppState>, query: RawQuery) -> ApiResult<PortfolioSummary> {
    wallet::wallet_summary(&state.aggregator(), &query).await.map(Json)
}

async fn prediction_data(State(state): State<AppState>, query: RawQuery) -> ApiResult<PredictionInputs> {
    prediction::prediction_data(&state.aggregator(), &query).await.map(Json)
}
