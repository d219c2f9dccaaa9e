//! token-flow - ERC-20 transfer ledger and holder snapshot engine
//!
//! A Rust library and CLI that ingests Transfer events for a single token
//! contract with resumable, rate-limited batched retrieval, then derives a
//! labeled buy/sell/transfer ledger against known exchange and tracked-user
//! address sets, or a point-in-time holder balance snapshot.
//!
//! # Example
//!
//! ```rust,no_run
//! use token_flow::{
//!     BlockNumber, Chain, CheckpointStore, Config, HttpClient, RoleBook, Scanner, ledger,
//! };
//! use std::path::Path;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::builder()
//!         .chain(Chain::Ethereum)
//!         .token("0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48")
//!         .rpc_url("https://eth.llamarpc.com")
//!         .from_block(18_000_000)
//!         .to_block(BlockNumber::Number(18_100_000))
//!         .build()?;
//!
//!     let client = Arc::new(HttpClient::new(
//!         &config.rpc_url,
//!         config.token,
//!         Duration::from_secs(config.scan.timeout_secs),
//!     )?);
//!     let store = CheckpointStore::open(
//!         &config.checkpoint_dir,
//!         config.token,
//!         config.chain.chain_id(),
//!     )?;
//!
//!     let mut scanner = Scanner::new(client, store, config.scan.clone());
//!     let events = scanner
//!         .scan(config.block_range.from_block(), config.block_range.to_block())
//!         .await?;
//!
//!     let roles = RoleBook::from_files(Path::new("dex.txt"), Path::new("users.txt"))?;
//!     let rows = ledger(&events, &roles);
//!
//!     println!("{} transfers, {} ledger rows", events.len(), rows.len());
//!     Ok(())
//! }
//! ```

pub mod checkpoint;
pub mod classify;
pub mod config;
pub mod error;
pub mod event;
pub mod holders;
pub mod output;
pub mod retry;
pub mod roles;
pub mod rpc;
pub mod scanner;

// Re-exports for convenience
pub use checkpoint::{CheckpointStore, ScanCheckpoint};
pub use classify::{classify, ledger, ClassifiedTransfer, TradeLabel};
pub use config::{
    load_address_list, parse_address, BlockNumber, BlockRange, Chain, Config, ConfigBuilder,
    ConfigFile, ScanConfig, Settings,
};
pub use error::{CheckpointError, ConfigError, Error, OutputError, Result, RpcError};
pub use event::{transfer_topic, EventKey, TransferEvent};
pub use holders::{percentage, unique_addresses, BalanceAggregator, HolderRecord};
pub use output::{format_token_amount, HolderWriter, LedgerWriter, SnapshotMetadata};
pub use retry::{rate_limiter, BackoffPolicy, SharedRateLimiter};
pub use roles::{AddressRole, RoleBook};
pub use rpc::{ChainClient, HttpClient};
pub use scanner::{ScanProgress, Scanner};
