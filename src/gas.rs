use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

/// Used when the price oracle cannot be reached or answers nonsense.
pub const FALLBACK_GAS_PRICE: u128 = 10_000_000_000; // 10 gwei
/// Percent applied to the oracle's reported price.
pub const PRICE_MARGIN: u128 = 110;

/// Unit price and unit budget for one ledger write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteCost {
    pub gas_price: u128,
    pub gas_limit: u64,
}

#[derive(Debug, Error)]
pub enum GasError {
    #[error("price oracle request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("price oracle answered {0:?}")]
    Malformed(String),
}

#[async_trait]
pub trait GasPriceSource: Send + Sync {
    /// Current network unit price in wei.
    async fn gas_price(&self) -> Result<u128, GasError>;
}

/// Etherscan-family `eth_gasPrice` proxy endpoint.
#[derive(Debug, Clone)]
pub struct GasOracle {
    client: Client,
    url: String,
    api_key: String,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct OracleResponse {
    #[serde(default)]
    result: String,
}

impl GasOracle {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(10),
        }
    }
}

#[async_trait]
impl GasPriceSource for GasOracle {
    async fn gas_price(&self) -> Result<u128, GasError> {
        let response: OracleResponse = self
            .client
            .get(&self.url)
            .query(&[
                ("module", "proxy"),
                ("action", "eth_gasPrice"),
                ("apikey", self.api_key.as_str()),
            ])
            .timeout(self.timeout)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let raw = response.result.trim();
        let digits = raw.strip_prefix("0x").ok_or_else(|| GasError::Malformed(raw.to_owned()))?;
        u128::from_str_radix(digits, 16).map_err(|_| GasError::Malformed(raw.to_owned()))
    }
}

/// Reported price plus the margin, or `None` if it does not fit in a `u128`.
pub fn escalate_price(reported: u128) -> Option<u128> {
    reported.checked_mul(PRICE_MARGIN).map(|p| p / 100)
}

/// Gas limit for a write whose simulation used `simulated` gas.
pub fn escalate_budget(simulated: u64, margin_percent: u64) -> u64 {
    simulated.saturating_mul(margin_percent) / 100
}

/// Escalated oracle price, or [`FALLBACK_GAS_PRICE`] if the oracle fails.
pub async fn unit_price(source: &dyn GasPriceSource) -> u128 {
    let escalated = source.gas_price().await.and_then(|reported| {
        escalate_price(reported).ok_or_else(|| GasError::Malformed(format!("{reported:#x}")))
    });
    match escalated {
        Ok(price) => {
            debug!("using gas price {price} wei");
            price
        }
        Err(e) => {
            warn!("{e}; falling back to {FALLBACK_GAS_PRICE} wei");
            FALLBACK_GAS_PRICE
        }
    }
}

#[cfg(test)]
pub struct FixedPrice(pub Option<u128>);

#[cfg(test)]
#[async_trait]
impl GasPriceSource for FixedPrice {
    async fn gas_price(&self) -> Result<u128, GasError> {
        self.0.ok_or_else(|| GasError::Malformed("offline".into()))
    }
}
