/// Inbound query parameters and their validation
///
/// Every check here runs before a flow touches the upstream API. Empty
/// parameters are treated as absent.

use axum::extract::{FromRequestParts, Query};
use axum::http::request::Parts;
use serde::Deserialize;

use crate::core::{Chain, SortOrder, TimeRange, ValidationError};
use super::ApiError;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawQuery {
    #[serde(alias = "blockchain")]
    pub chain: Option<String>,
    #[serde(rename = "timeFrame", alias = "time_range")]
    pub time_frame: Option<String>,
    pub wallet: Option<String>,
    pub contract_address: Option<String>,
    pub token_id: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub offset: Option<String>,
    pub limit: Option<String>,
    /// Comma-separated chain list for comparisons.
    pub chains: Option<String>,
    /// Comma-separated metric names for comparisons.
    pub metrics: Option<String>,
}

/// Undecodable query strings (e.g. a parameter given under both its name
/// and its alias) are answered with the JSON validation body.
impl<S> FromRequestParts<S> for RawQuery
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Query::<RawQuery>::from_request_parts(parts, state)
            .await
            .map(|Query(query)| query)
            .map_err(|rejection| ValidationError::MalformedQuery(rejection.body_text()).into())
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|v| !v.is_empty())
}

impl RawQuery {
    pub fn chain_or(&self, default: Chain) -> Result<Chain, ValidationError> {
        present(&self.chain).map_or(Ok(default), |raw| raw.parse())
    }

    pub fn time_range_or(&self, default: TimeRange) -> Result<TimeRange, ValidationError> {
        present(&self.time_frame).map_or(Ok(default), |raw| raw.parse())
    }

    /// Chain and window for market-insight flows, rejecting pairs upstream
    /// has no data for.
    pub fn market_window(&self, chain: Chain, range: TimeRange) -> Result<(Chain, TimeRange), ValidationError> {
        let range = self.time_range_or(range)?;
        let chain = self.chain_or(chain)?;
        ensure_supported(chain, range)?;
        Ok((chain, range))
    }

    /// Chains to compare, in request order without repeats.
    pub fn chain_list(&self, range: TimeRange) -> Result<Vec<Chain>, ValidationError> {
        let raw = present(&self.chains).ok_or(ValidationError::MissingParameter("chains"))?;
        let mut chains = Vec::new();
        for name in split_list(raw) {
            let chain: Chain = name.parse()?;
            ensure_supported(chain, range)?;
            if !chains.contains(&chain) {
                chains.push(chain);
            }
        }
        if chains.is_empty() {
            return Err(ValidationError::MissingParameter("chains"));
        }
        Ok(chains)
    }

    pub fn metric_names(&self) -> Vec<&str> {
        present(&self.metrics).map(|raw| split_list(raw).collect()).unwrap_or_default()
    }

    pub fn require_wallet(&self) -> Result<&str, ValidationError> {
        present(&self.wallet).ok_or(ValidationError::MissingParameter("wallet"))
    }

    pub fn require_contract(&self) -> Result<&str, ValidationError> {
        present(&self.contract_address).ok_or(ValidationError::MissingParameter("contract_address"))
    }

    pub fn require_token(&self) -> Result<&str, ValidationError> {
        present(&self.token_id).ok_or(ValidationError::MissingParameter("token_id"))
    }

    pub fn sort_by_or<'a>(&'a self, default: &'a str) -> &'a str {
        present(&self.sort_by).unwrap_or(default)
    }

    pub fn sort_order_or(&self, default: SortOrder) -> Result<SortOrder, ValidationError> {
        present(&self.sort_order).map_or(Ok(default), |raw| raw.parse())
    }

    pub fn offset_or(&self, default: u64) -> Result<u64, ValidationError> {
        parse_count(&self.offset, "offset", default)
    }

    pub fn limit_or(&self, default: u64) -> Result<u64, ValidationError> {
        parse_count(&self.limit, "limit", default)
    }
}

fn ensure_supported(chain: Chain, range: TimeRange) -> Result<(), ValidationError> {
    if chain.supports(range) {
        Ok(())
    } else {
        Err(ValidationError::UnsupportedPair { chain, range })
    }
}

fn parse_count(value: &Option<String>, field: &'static str, default: u64) -> Result<u64, ValidationError> {
    match present(value) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|_| ValidationError::InvalidNumber {
            field,
            value: raw.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(pairs: &[(&str, &str)]) -> RawQuery {
        let encoded = pairs
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");
        let uri: axum::http::Uri = format!("/api/test?{}", encoded).parse().unwrap();
        axum::extract::Query::<RawQuery>::try_from_uri(&uri).unwrap().0
    }

    #[test]
    fn test_aliases_and_defaults() {
        let q = query(&[("blockchain", "solana"), ("time_range", "7d")]);
        assert_eq!(
            q.market_window(Chain::Ethereum, TimeRange::Last24Hours),
            Ok((Chain::Solana, TimeRange::Last7Days))
        );

        let q = query(&[("chain", ""), ("timeFrame", "")]);
        assert_eq!(
            q.market_window(Chain::Ethereum, TimeRange::Last24Hours),
            Ok((Chain::Ethereum, TimeRange::Last24Hours))
        );
    }

    #[test]
    fn test_every_valid_pair_except_ethereum_all_time() {
        for chain in Chain::ALL {
            for range in TimeRange::ALL {
                let q = query(&[("chain", chain.as_str()), ("timeFrame", range.as_str())]);
                let result = q.market_window(Chain::Ethereum, TimeRange::Last24Hours);
                if chain == Chain::Ethereum && range == TimeRange::AllTime {
                    assert_eq!(result, Err(ValidationError::UnsupportedPair { chain, range }));
                } else {
                    assert_eq!(result, Ok((chain, range)));
                }
            }
        }
    }

    #[test]
    fn test_out_of_set_values() {
        let q = query(&[("chain", "tron")]);
        assert!(matches!(
            q.market_window(Chain::Ethereum, TimeRange::Last24Hours),
            Err(ValidationError::UnsupportedChain(_))
        ));
        let q = query(&[("timeFrame", "1y")]);
        assert!(matches!(
            q.market_window(Chain::Ethereum, TimeRange::Last24Hours),
            Err(ValidationError::UnsupportedTimeRange(_))
        ));
        let q = query(&[("sort_order", "sideways"), ("limit", "ten")]);
        assert!(q.sort_order_or(SortOrder::Desc).is_err());
        assert!(matches!(q.limit_or(30), Err(ValidationError::InvalidNumber { field: "limit", .. })));
    }

    #[test]
    fn test_chain_list() {
        let q = query(&[("chains", "bitcoin,solana,bitcoin,")]);
        assert_eq!(q.chain_list(TimeRange::Last7Days), Ok(vec![Chain::Bitcoin, Chain::Solana]));

        let q = query(&[("chains", "polygon,ethereum")]);
        assert!(q.chain_list(TimeRange::AllTime).is_err());
        assert_eq!(
            RawQuery::default().chain_list(TimeRange::Last24Hours),
            Err(ValidationError::MissingParameter("chains"))
        );
    }

    #[test]
    fn test_required_identifiers() {
        let q = query(&[("wallet", "%20%20")]);
        assert_eq!(q.require_wallet(), Err(ValidationError::MissingParameter("wallet")));
        let q = query(&[("contract_address", "0xabc"), ("token_id", "42")]);
        assert_eq!(q.require_contract(), Ok("0xabc"));
        assert_eq!(q.require_token(), Ok("42"));
    }
}
