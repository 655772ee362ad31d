//! GeckoTerminal pool price client
//!
//! `GET /networks/{network}/pools/{address}` and read
//! `data.attributes.base_token_price_usd`. One attempt per call; the
//! tracking scheduler retries on its next cycle.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::ports::price_source::{PriceSource, PriceSourceError};

pub const GECKOTERMINAL_API: &str = "https://api.geckoterminal.com/api/v2";

const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Map engine network identifiers to GeckoTerminal's own naming. Upstream
/// naming is not assumed stable, so the table lives here, not in callers.
fn upstream_network(network: &str) -> &str {
    match network {
        "polygon_pos" => "polygon-pos",
        "eth" | "bsc" | "base" | "solana" | "avax" | "arbitrum" => network,
        other => other,
    }
}

#[derive(Debug, Clone)]
pub struct GeckoTerminalClient {
    http: Client,
    api_url: String,
}

impl GeckoTerminalClient {
    pub fn new() -> Result<Self, PriceSourceError> {
        Self::with_api_url(GECKOTERMINAL_API, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_api_url(api_url: &str, timeout: Duration) -> Result<Self, PriceSourceError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl PriceSource for GeckoTerminalClient {
    async fn current_price(
        &self,
        network: &str,
        pool_address: &str,
    ) -> Result<f64, PriceSourceError> {
        let url = format!(
            "{}/networks/{}/pools/{}",
            self.api_url,
            upstream_network(network),
            pool_address
        );

        let response = self.http.get(&url).send().await?;
        match response.status() {
            StatusCode::OK => {}
            StatusCode::NOT_FOUND => {
                return Err(PriceSourceError::NotFound {
                    network: network.to_string(),
                    pool_address: pool_address.to_string(),
                })
            }
            status => return Err(PriceSourceError::Status(status.as_u16())),
        }

        let body: PoolResponse = response
            .json()
            .await
            .map_err(|e| PriceSourceError::Parse(e.to_string()))?;

        parse_price(&body)
    }
}

fn parse_price(body: &PoolResponse) -> Result<f64, PriceSourceError> {
    let raw = body
        .data
        .attributes
        .base_token_price_usd
        .as_deref()
        .ok_or(PriceSourceError::MissingPrice)?;

    let price: f64 = raw
        .parse()
        .map_err(|_| PriceSourceError::Parse(format!("unparseable price: {}", raw)))?;

    if price > 0.0 {
        Ok(price)
    } else {
        Err(PriceSourceError::MissingPrice)
    }
}

// GeckoTerminal serializes prices as strings.
#[derive(Debug, Deserialize)]
struct PoolResponse {
    data: PoolData,
}

#[derive(Debug, Deserialize)]
struct PoolData {
    attributes: PoolAttributes,
}

#[derive(Debug, Deserialize)]
struct PoolAttributes {
    base_token_price_usd: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = GeckoTerminalClient::new();
        assert!(client.is_ok());
    }

    #[test]
    fn test_network_mapping() {
        assert_eq!(upstream_network("polygon_pos"), "polygon-pos");
        assert_eq!(upstream_network("eth"), "eth");
        assert_eq!(upstream_network("solana"), "solana");
        // Unknown networks pass through unchanged
        assert_eq!(upstream_network("fantom"), "fantom");
    }

    #[test]
    fn test_parse_pool_response() {
        let json = r#"{
            "data": {
                "id": "eth_0xabc",
                "type": "pool",
                "attributes": {
                    "base_token_price_usd": "0.00000123",
                    "name": "PEPE / WETH"
                }
            }
        }"#;

        let body: PoolResponse = serde_json::from_str(json).unwrap();
        let price = parse_price(&body).unwrap();
        assert!((price - 0.00000123).abs() < 1e-15);
    }

    #[test]
    fn test_missing_price_field() {
        let json = r#"{"data": {"attributes": {}}}"#;
        let body: PoolResponse = serde_json::from_str(json).unwrap();
        assert!(matches!(
            parse_price(&body),
            Err(PriceSourceError::MissingPrice)
        ));
    }

    #[test]
    fn test_zero_price_rejected() {
        let json = r#"{"data": {"attributes": {"base_token_price_usd": "0"}}}"#;
        let body: PoolResponse = serde_json::from_str(json).unwrap();
        assert!(matches!(
            parse_price(&body),
            Err(PriceSourceError::MissingPrice)
        ));
    }

    #[test]
    fn test_garbage_price_is_parse_error() {
        let json = r#"{"data": {"attributes": {"base_token_price_usd": "n/a"}}}"#;
        let body: PoolResponse = serde_json::from_str(json).unwrap();
        assert!(matches!(parse_price(&body), Err(PriceSourceError::Parse(_))));
    }
}
