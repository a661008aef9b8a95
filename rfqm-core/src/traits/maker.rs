use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ethers::types::{Address, U256};

use crate::error::{QuoteServerError, StoreResult};
use crate::types::{Job, RawOrderSignature};

/// Client for the market maker's quote server signing protocol.
#[async_trait]
pub trait QuoteServerClient: Send + Sync {
    /// Solicit the maker's last-look signature for `job`.
    ///
    /// `Ok(None)` is an explicit decline. Network failures and timeouts are
    /// errors; callers treat them as failed sign attempts, not declines.
    async fn sign_v2(
        &self,
        job: &Job,
        maker_uri: &str,
        timeout: Duration,
    ) -> Result<Option<RawOrderSignature>, QuoteServerError>;
}

/// Cached view of maker-side ERC-20 balances.
#[async_trait]
pub trait BalanceCache: Send + Sync {
    async fn get_erc20_owner_balances(
        &self,
        chain_id: u64,
        owner: Address,
        tokens: &[Address],
    ) -> StoreResult<Vec<U256>>;
}

/// Maker identity and cooldown/reputation bookkeeping.
#[async_trait]
pub trait MakerRegistry: Send + Sync {
    /// Resolve the maker id registered for a quote server URI.
    fn find_maker_id_with_rfqm_uri(&self, uri: &str) -> Option<String>;

    /// Place a maker on cooldown for a (chain, maker token, taker token)
    /// pair until the given instant.
    async fn add_maker_to_cooldown(
        &self,
        maker_id: &str,
        until: DateTime<Utc>,
        chain_id: u64,
        maker_token: Address,
        taker_token: Address,
    ) -> StoreResult<()>;
}
