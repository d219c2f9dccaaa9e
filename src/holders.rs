//! Holder balance snapshot
//!
//! Deduplicates the addresses seen across ingested transfers, queries each
//! balance plus the total supply at the snapshot block, and derives each
//! holder's percentage share with fixed-point math.

use crate::error::{Error, Result, RpcError};
use crate::event::TransferEvent;
use crate::retry::{BackoffPolicy, SharedRateLimiter};
use crate::rpc::ChainClient;
use alloy::primitives::{Address, U256};
use futures::stream::{self, StreamExt};
use rust_decimal::Decimal;
use std::collections::BTreeSet;
use std::sync::Arc;

/// One holder's balance and share at the snapshot block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HolderRecord {
    pub address: Address,
    pub balance: U256,
    pub percentage: Decimal,
}

/// Every address that appears as sender or receiver, deduplicated.
///
/// Ordered, so downstream queries and reports are deterministic.
pub fn unique_addresses(events: &[TransferEvent]) -> Vec<Address> {
    let set: BTreeSet<Address> = events
        .iter()
        .flat_map(|e| [e.from, e.to])
        .collect();
    set.into_iter().collect()
}

/// Percentage share with four fractional digits.
///
/// Integer math over U256 scaled to hundredths of a basis point; binary
/// floating point never touches balance or supply values.
pub fn percentage(balance: U256, total_supply: U256) -> Decimal {
    if total_supply.is_zero() {
        return Decimal::ZERO;
    }
    let scaled = balance.saturating_mul(U256::from(1_000_000u64)) / total_supply;
    let hundredths_of_bp = u64::try_from(scaled).unwrap_or(u64::MAX);
    Decimal::new(hundredths_of_bp as i64, 4)
}

/// Snapshot builder over a [`ChainClient`]
pub struct BalanceAggregator<C: ChainClient> {
    client: Arc<C>,
    limiter: SharedRateLimiter,
    backoff: BackoffPolicy,
    concurrency: usize,
}

impl<C: ChainClient> BalanceAggregator<C> {
    /// The limiter is shared with the scanner so balance queries stay under
    /// the same aggregate request ceiling.
    pub fn new(client: Arc<C>, limiter: SharedRateLimiter, concurrency: usize) -> Self {
        Self {
            client,
            limiter,
            backoff: BackoffPolicy::default(),
            concurrency: concurrency.max(1),
        }
    }

    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Balance and share for every address at `at_block`.
    ///
    /// Total supply is queried once, not per address. Zero-balance holders
    /// are retained — a historical holder who sold to zero is still
    /// reportable; callers filter if they want only current holders.
    /// Ordering: balance descending, ties by address ascending.
    pub async fn snapshot(&self, addresses: &[Address], at_block: u64) -> Result<Vec<HolderRecord>> {
        let total_supply = self
            .query_with_retry(|| self.client.get_total_supply(at_block))
            .await
            .map_err(Error::Rpc)?;

        tracing::info!(
            "querying {} balances at block {} (total supply {})",
            addresses.len(),
            at_block,
            total_supply
        );

        let results: Vec<std::result::Result<HolderRecord, RpcError>> =
            stream::iter(addresses.iter().copied().map(|address| async move {
                let balance = self
                    .query_with_retry(|| self.client.get_balance(address, at_block))
                    .await?;
                Ok(HolderRecord {
                    address,
                    balance,
                    percentage: percentage(balance, total_supply),
                })
            }))
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut records = Vec::with_capacity(results.len());
        for result in results {
            records.push(result.map_err(Error::Rpc)?);
        }

        records.sort_by(|a, b| b.balance.cmp(&a.balance).then(a.address.cmp(&b.address)));
        Ok(records)
    }

    /// Balance queries for distinct addresses are independent; each one gets
    /// the same bounded backoff the scanner uses, gated by the shared bucket.
    async fn query_with_retry<T, F, Fut>(&self, mut call: F) -> std::result::Result<T, RpcError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = std::result::Result<T, RpcError>>,
    {
        let mut attempt = 0u32;
        loop {
            self.limiter.until_ready().await;
            match call().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_recoverable() && attempt < self.backoff.max_retries => {
                    tokio::time::sleep(self.backoff.delay(attempt)).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
