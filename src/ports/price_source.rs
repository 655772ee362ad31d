//! Price source port
//!
//! One attempt per call; retries are the caller's business (the scheduler
//! simply tries again next cycle).

use async_trait::async_trait;
use thiserror::Error;

/// Typed failures from a price lookup.
#[derive(Error, Debug)]
pub enum PriceSourceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("upstream returned status {0}")]
    Status(u16),

    #[error("no pool found for {network}/{pool_address}")]
    NotFound {
        network: String,
        pool_address: String,
    },

    #[error("upstream response missing a usable price")]
    MissingPrice,

    #[error("failed to parse upstream response: {0}")]
    Parse(String),
}

/// External pool-price lookup by network + pool address.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Current USD price of the pool's base token.
    async fn current_price(
        &self,
        network: &str,
        pool_address: &str,
    ) -> Result<f64, PriceSourceError>;
}
