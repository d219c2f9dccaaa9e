//! Chain client trait and HTTP implementation

use crate::error::RpcError;
use crate::event::{transfer_topic, TransferEvent};
use alloy::eips::BlockId;
use alloy::primitives::{Address, U256};
use alloy::providers::{Provider, ReqwestProvider};
use alloy::rpc::types::Filter;
use alloy::sol;
use async_trait::async_trait;
use std::time::Duration;

sol! {
    #[sol(rpc)]
    contract IERC20 {
        function balanceOf(address owner) external view returns (uint256);
        function totalSupply() external view returns (uint256);
        function decimals() external view returns (uint8);
    }
}

/// Remote chain access consumed by the scanner and the balance aggregator.
///
/// Rate-limit and timeout conditions surface as distinguishable [`RpcError`]
/// kinds, never as silent empty results. Implementations are shared across
/// workers, so methods take `&self`.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Transfer events for the configured token in `[from, to]` (inclusive),
    /// ordered as returned by the node.
    async fn get_logs(&self, from: u64, to: u64) -> Result<Vec<TransferEvent>, RpcError>;

    /// Token balance of `address` at `at_block`.
    async fn get_balance(&self, address: Address, at_block: u64) -> Result<U256, RpcError>;

    /// Token total supply at `at_block`.
    async fn get_total_supply(&self, at_block: u64) -> Result<U256, RpcError>;

    /// Token decimals (immutable per contract).
    async fn get_decimals(&self) -> Result<u8, RpcError>;

    /// Current chain head.
    async fn get_block_number(&self) -> Result<u64, RpcError>;
}

/// [`ChainClient`] over a single HTTP JSON-RPC endpoint
pub struct HttpClient {
    provider: ReqwestProvider,
    token: Address,
    timeout: Duration,
}

impl HttpClient {
    pub fn new(rpc_url: &str, token: Address, timeout: Duration) -> Result<Self, RpcError> {
        let url = rpc_url
            .parse()
            .map_err(|e| RpcError::Transport(format!("invalid RPC URL {}: {}", rpc_url, e)))?;

        Ok(Self {
            provider: ReqwestProvider::new_http(url),
            token,
            timeout,
        })
    }

    /// Apply the per-call timeout; a timeout is reported as its own error
    /// kind and treated like rate-limit pressure by the retry layer.
    async fn with_timeout<T, F>(&self, fut: F) -> Result<T, RpcError>
    where
        F: std::future::Future<Output = Result<T, RpcError>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(RpcError::Timeout(self.timeout.as_millis() as u64)),
        }
    }

    fn map_transport_error(e: impl std::fmt::Display) -> RpcError {
        let msg = e.to_string();
        let lowered = msg.to_lowercase();
        if lowered.contains("429")
            || lowered.contains("rate limit")
            || lowered.contains("too many requests")
        {
            RpcError::RateLimited(msg)
        } else {
            RpcError::Transport(msg)
        }
    }
}

#[async_trait]
impl ChainClient for HttpClient {
    async fn get_logs(&self, from: u64, to: u64) -> Result<Vec<TransferEvent>, RpcError> {
        let filter = Filter::new()
            .address(self.token)
            .event_signature(transfer_topic())
            .from_block(from)
            .to_block(to);

        let logs = self
            .with_timeout(async {
                self.provider
                    .get_logs(&filter)
                    .await
                    .map_err(Self::map_transport_error)
            })
            .await?;

        // Non-standard tokens can emit the Transfer topic with a different
        // layout (e.g. ERC-721 tokenId in topics). Those are not ERC-20
        // transfers; skip them.
        let events = logs
            .iter()
            .filter_map(|log| match TransferEvent::from_log(log) {
                Ok(event) => Some(event),
                Err(e) => {
                    tracing::debug!("skipping undecodable log: {}", e);
                    None
                }
            })
            .collect();

        Ok(events)
    }

    async fn get_balance(&self, address: Address, at_block: u64) -> Result<U256, RpcError> {
        let erc20 = IERC20::new(self.token, &self.provider);
        self.with_timeout(async {
            erc20
                .balanceOf(address)
                .block(BlockId::number(at_block))
                .call()
                .await
                .map(|ret| ret._0)
                .map_err(Self::map_transport_error)
        })
        .await
    }

    async fn get_total_supply(&self, at_block: u64) -> Result<U256, RpcError> {
        let erc20 = IERC20::new(self.token, &self.provider);
        self.with_timeout(async {
            erc20
                .totalSupply()
                .block(BlockId::number(at_block))
                .call()
                .await
                .map(|ret| ret._0)
                .map_err(Self::map_transport_error)
        })
        .await
    }

    async fn get_decimals(&self) -> Result<u8, RpcError> {
        let erc20 = IERC20::new(self.token, &self.provider);
        self.with_timeout(async {
            erc20
                .decimals()
                .call()
                .await
                .map(|ret| ret._0)
                .map_err(Self::map_transport_error)
        })
        .await
    }

    async fn get_block_number(&self) -> Result<u64, RpcError> {
        self.with_timeout(async {
            self.provider
                .get_block_number()
                .await
                .map_err(Self::map_transport_error)
        })
        .await
    }
}
