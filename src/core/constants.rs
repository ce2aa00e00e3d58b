/// Upstream resource paths and per-flow paging constants

pub const DEFAULT_UPSTREAM_BASE_URL: &str = "https://api.unleashnfts.com/api/v2";
pub const API_KEY_HEADER: &str = "x-api-key";

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_PAGES: usize = 50;

/// Resource paths relative to the upstream base URL.
pub mod paths {
    pub const MARKET_INSIGHTS_ANALYTICS: &str = "nft/market-insights/analytics";
    pub const MARKET_INSIGHTS_HOLDERS: &str = "nft/market-insights/holders";
    pub const MARKET_INSIGHTS_TRADERS: &str = "nft/market-insights/traders";
    pub const MARKET_INSIGHTS_WASHTRADE: &str = "nft/market-insights/washtrade";

    pub const MARKETPLACE_TRADERS: &str = "nft/marketplace/traders";
    pub const MARKETPLACE_WASHTRADE: &str = "nft/marketplace/washtrade";

    pub const NFT_ANALYTICS: &str = "nft/analytics";
    pub const NFT_WASHTRADE: &str = "nft/washtrade";
    pub const NFT_SCORES: &str = "nft/scores";
    pub const NFT_TRANSACTIONS: &str = "nft/transactions";
    pub const NFT_PRICE_ESTIMATE: &str = "nft/liquify/price_estimate";

    pub const WALLET_SCORES: &str = "nft/wallet/scores";
    pub const WALLET_PROFILE: &str = "nft/wallet/profile";
    pub const WALLET_ANALYTICS: &str = "nft/wallet/analytics";
    pub const WALLET_NFT_BALANCE: &str = "wallet/balance/nft";

    pub const COLLECTION_ANALYTICS: &str = "nft/collection/analytics";
    pub const COLLECTION_SCORES: &str = "nft/collection/scores";
    pub const COLLECTION_TRADERS: &str = "nft/collection/traders";
    pub const COLLECTION_WASHTRADE: &str = "nft/collection/washtrade";
}

/// Page sizes the upstream flows are tuned for.
pub const MARKETPLACE_PAGE_SIZE: usize = 30;
pub const WALLET_PORTFOLIO_PAGE_SIZE: usize = 100;
pub const WALLET_ANALYSIS_PAGE_SIZE: usize = 30;
pub const COLLECTION_PAGE_SIZE: usize = 30;
pub const DEFAULT_PAGE_LIMIT: u64 = 30;
