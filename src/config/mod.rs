//! Configuration types
//!
//! Process-wide configuration is an explicit immutable value passed into each
//! component at construction.

mod addresses;
mod file;

pub use addresses::{load_address_list, parse_address};
pub use file::{ConfigFile, Settings};

use crate::error::{ConfigError, Result};
use alloy::primitives::Address;
use std::path::PathBuf;
use std::str::FromStr;

/// Supported chains
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chain {
    Ethereum,
    Polygon,
    Bsc,
    Arbitrum,
    Optimism,
    Base,
    Avalanche,
    Custom(u64),
}

impl Chain {
    /// Numeric chain id
    pub fn chain_id(&self) -> u64 {
        match self {
            Chain::Ethereum => 1,
            Chain::Polygon => 137,
            Chain::Bsc => 56,
            Chain::Arbitrum => 42161,
            Chain::Optimism => 10,
            Chain::Base => 8453,
            Chain::Avalanche => 43114,
            Chain::Custom(id) => *id,
        }
    }

    /// Human-readable name
    pub fn display_name(&self) -> String {
        match self {
            Chain::Ethereum => "Ethereum".to_string(),
            Chain::Polygon => "Polygon".to_string(),
            Chain::Bsc => "BSC".to_string(),
            Chain::Arbitrum => "Arbitrum".to_string(),
            Chain::Optimism => "Optimism".to_string(),
            Chain::Base => "Base".to_string(),
            Chain::Avalanche => "Avalanche".to_string(),
            Chain::Custom(id) => format!("chain {}", id),
        }
    }
}

impl FromStr for Chain {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ethereum" | "mainnet" | "eth" => Ok(Chain::Ethereum),
            "polygon" | "matic" => Ok(Chain::Polygon),
            "bsc" | "binance" => Ok(Chain::Bsc),
            "arbitrum" => Ok(Chain::Arbitrum),
            "optimism" => Ok(Chain::Optimism),
            "base" => Ok(Chain::Base),
            "avalanche" | "avax" => Ok(Chain::Avalanche),
            other => other
                .parse::<u64>()
                .map(Chain::Custom)
                .map_err(|_| ConfigError::InvalidChain(other.to_string())),
        }
    }
}

/// A block position: a concrete number or the chain head
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockNumber {
    Number(u64),
    Latest,
}

impl FromStr for BlockNumber {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("latest") {
            Ok(BlockNumber::Latest)
        } else {
            s.parse::<u64>()
                .map(BlockNumber::Number)
                .map_err(|_| ConfigError::InvalidBlockNumber(s.to_string()))
        }
    }
}

/// Inclusive block range for a scan
#[derive(Debug, Clone, Copy)]
pub struct BlockRange {
    from: u64,
    to: BlockNumber,
}

impl BlockRange {
    pub fn new(from: u64, to: BlockNumber) -> Result<Self> {
        if let BlockNumber::Number(n) = to {
            if from > n {
                return Err(ConfigError::InvalidBlockRange { from, to: n }.into());
            }
        }
        Ok(Self { from, to })
    }

    pub fn from_block(&self) -> u64 {
        self.from
    }

    pub fn to_block(&self) -> BlockNumber {
        self.to
    }
}

/// Scan tuning knobs
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Blocks per getLogs window
    pub window_size: u64,
    /// Concurrent window fetches
    pub concurrency: usize,
    /// Aggregate outbound requests per second across all workers
    pub requests_per_second: u32,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Retry attempts per window span before shrinking
    pub max_retries: u32,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            window_size: 2_000,
            concurrency: 4,
            requests_per_second: 10,
            timeout_secs: 30,
            max_retries: 3,
        }
    }
}

/// Immutable engine configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Chain to query
    pub chain: Chain,
    /// Token contract address
    pub token: Address,
    /// RPC endpoint URL
    pub rpc_url: String,
    /// Block range to scan
    pub block_range: BlockRange,
    /// Scan tuning
    pub scan: ScanConfig,
    /// Directory for checkpoint files
    pub checkpoint_dir: PathBuf,
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for [`Config`]
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    chain: Option<Chain>,
    token: Option<String>,
    rpc_url: Option<String>,
    from_block: u64,
    to_block: Option<BlockNumber>,
    scan: ScanConfig,
    checkpoint_dir: Option<PathBuf>,
}

impl ConfigBuilder {
    pub fn chain(mut self, chain: Chain) -> Self {
        self.chain = Some(chain);
        self
    }

    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn rpc_url(mut self, url: impl Into<String>) -> Self {
        self.rpc_url = Some(url.into());
        self
    }

    pub fn from_block(mut self, block: u64) -> Self {
        self.from_block = block;
        self
    }

    pub fn to_block(mut self, block: BlockNumber) -> Self {
        self.to_block = Some(block);
        self
    }

    pub fn window_size(mut self, size: u64) -> Self {
        self.scan.window_size = size.max(1);
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.scan.concurrency = n.max(1);
        self
    }

    pub fn requests_per_second(mut self, n: u32) -> Self {
        self.scan.requests_per_second = n.max(1);
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.scan.timeout_secs = secs;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.scan.max_retries = n;
        self
    }

    pub fn checkpoint_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.checkpoint_dir = Some(dir.into());
        self
    }

    pub fn build(self) -> Result<Config> {
        let chain = self
            .chain
            .ok_or(ConfigError::MissingField("chain".to_string()))?;
        let token = self
            .token
            .ok_or(ConfigError::MissingField("token".to_string()))?;
        let rpc_url = self
            .rpc_url
            .ok_or(ConfigError::MissingField("rpc_url".to_string()))?;

        let token = parse_address(&token)?;
        let block_range =
            BlockRange::new(self.from_block, self.to_block.unwrap_or(BlockNumber::Latest))?;

        Ok(Config {
            chain,
            token,
            rpc_url,
            block_range,
            scan: self.scan,
            checkpoint_dir: self.checkpoint_dir.unwrap_or_else(|| PathBuf::from(".")),
        })
    }
}
