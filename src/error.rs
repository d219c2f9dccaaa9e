//! Error types for token-flow

use thiserror::Error;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    /// RPC-related errors
    #[error("RPC error: {0}")]
    Rpc(#[from] RpcError),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Checkpoint errors
    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),

    /// Output errors
    #[error("Output error: {0}")]
    Output(#[from] OutputError),

    /// Scan stopped on a fatally failed window; the checkpoint is intact and
    /// a subsequent run resumes from `last_scanned_block + 1`.
    #[error("scan interrupted at block {last_scanned_block}: {source}")]
    ScanInterrupted {
        last_scanned_block: u64,
        #[source]
        source: RpcError,
    },

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

/// RPC-specific errors
#[derive(Error, Debug)]
pub enum RpcError {
    #[error("Rate limited by endpoint: {0}")]
    RateLimited(String),

    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid response from endpoint: {0}")]
    InvalidResponse(String),

    #[error("Retries exhausted for blocks {from}-{to}: {reason}")]
    RetriesExhausted { from: u64, to: u64, reason: String },
}

impl RpcError {
    /// Recoverable errors are retried with backoff; rate limits additionally
    /// trigger window shrinking.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            RpcError::RateLimited(_) | RpcError::Timeout(_) | RpcError::Transport(_)
        )
    }

    /// Timeouts count as rate-limit pressure for retry purposes.
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, RpcError::RateLimited(_) | RpcError::Timeout(_))
    }
}

/// Configuration errors — fail fast, before any network call
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid address format: {0}")]
    InvalidAddress(String),

    #[error("Address {0} appears in both the exchange and tracked-user lists")]
    OverlappingRole(String),

    #[error("Address list is empty: {0}")]
    EmptyAddressList(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid block range: from {from} > to {to}")]
    InvalidBlockRange { from: u64, to: u64 },

    #[error("Invalid block number: {0}")]
    InvalidBlockNumber(String),

    #[error("Invalid chain: {0}")]
    InvalidChain(String),

    #[error("Invalid config file: {0}")]
    InvalidFile(String),

    #[error("Config file parse error: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// Checkpoint-related errors
#[derive(Error, Debug)]
pub enum CheckpointError {
    #[error("Failed to read checkpoint: {0}")]
    ReadError(String),

    #[error("Failed to write checkpoint: {0}")]
    WriteError(String),

    #[error("Checkpoint corrupted: {0}")]
    Corrupted(String),
}

/// Output-related errors
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Failed to write CSV: {0}")]
    CsvWrite(String),

    #[error("Failed to create output file: {0}")]
    FileCreate(String),
}

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Other(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Other(s.to_string())
    }
}
